use std::cell::RefCell;

use crate::ops::Dialect;

/// Cycles `run` executes before giving up, unless overridden.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

#[derive(Clone, Copy)]
struct Env {
    /// `None` when disabled with `LMC_STEP_LIMIT=0`
    step_limit: Option<u64>,
    dialect: Dialect,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read configuration from the process environment. Unparseable values fall back to defaults.
pub fn init() {
    let value = Env {
        step_limit: parse_step_limit(std::env::var("LMC_STEP_LIMIT").ok().as_deref()),
        dialect: std::env::var("LMC_DIALECT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
    };
    set_env(value);
}

pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

pub fn dialect() -> Dialect {
    with_env(|env| env.dialect)
}

fn parse_step_limit(value: Option<&str>) -> Option<u64> {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(0)) => None,
        Some(Ok(limit)) => Some(limit),
        _ => Some(DEFAULT_STEP_LIMIT),
    }
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_limit_values() {
        assert_eq!(parse_step_limit(None), Some(DEFAULT_STEP_LIMIT));
        assert_eq!(parse_step_limit(Some("0")), None);
        assert_eq!(parse_step_limit(Some(" 250 ")), Some(250));
        assert_eq!(parse_step_limit(Some("lots")), Some(DEFAULT_STEP_LIMIT));
    }
}
