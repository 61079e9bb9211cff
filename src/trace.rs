use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal};

use console::Key;

use crate::alu;
use crate::error::Fault;
use crate::output::{Channel, Condition};
use crate::runtime::{input_fn, output_fn, Cpu, RunOutcome, RunStatus};
use crate::symbol::SymbolTable;

/// Settings for [`trace`].
#[derive(Clone, Debug, Default)]
pub struct TraceOptions {
    /// Read keys from this string instead of the terminal, separated by `;` or newlines
    pub command: Option<String>,
    /// Print outputs of 500 and above as negative
    pub signed: bool,
    /// Cycle limit once execution is continued
    pub step_limit: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Action {
    Step,
    Continue,
    Quit,
}

impl Action {
    fn from_command(command: &str) -> Option<Self> {
        match command.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "step" => Some(Action::Step),
            "c" | "continue" => Some(Action::Continue),
            "q" | "quit" => Some(Action::Quit),
            _ => None,
        }
    }
}

enum KeySource {
    /// Command-line argument
    Argument { buffer: String, cursor: usize },
    /// Stdin which is not attached to a terminal, i.e. piped
    Stdin(io::Stdin),
    /// Interactive unbuffered terminal
    Terminal(console::Term),
}

impl KeySource {
    fn from(argument: Option<String>) -> Self {
        if let Some(buffer) = argument {
            return KeySource::Argument { buffer, cursor: 0 };
        }
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return KeySource::Terminal(console::Term::stdout());
        }
        KeySource::Stdin(stdin)
    }

    /// `None` indicates EOF
    fn read(&mut self) -> Option<Action> {
        loop {
            let command = match self {
                Self::Terminal(term) => match term.read_key().ok()? {
                    Key::Enter | Key::Char('s') | Key::Char(' ') => return Some(Action::Step),
                    Key::Char('c') => return Some(Action::Continue),
                    Key::Char('q') | Key::Escape => return Some(Action::Quit),
                    _ => continue,
                },
                Self::Argument { buffer, cursor } => {
                    if *cursor >= buffer.len() {
                        return None;
                    }
                    let rest = &buffer[*cursor..];
                    let end = rest.find(|c| c == ';' || c == '\n').unwrap_or(rest.len());
                    *cursor += end + 1;
                    rest[..end].to_string()
                }
                Self::Stdin(stdin) => {
                    let mut line = String::new();
                    if stdin.lock().read_line(&mut line).ok()? == 0 {
                        return None;
                    }
                    line
                }
            };
            match Action::from_command(&command) {
                Some(action) => {
                    tprintln!(Always, "> {}", command.trim());
                    return Some(action);
                }
                None => tprintln!(Always, "unknown command `{}`, expected s, c or q", command.trim()),
            }
        }
    }
}

/// Ask the user for an input value once queued inputs run out.
///
/// Without a terminal there is nobody to ask, so input is exhausted.
fn prompt_input(term: Option<&console::Term>) -> Option<u16> {
    let term = term?;
    loop {
        tprint!(Always, "INP> ");
        let line = term.read_line().ok()?;
        match parse_input(&line) {
            Some(value) => return Some(value),
            None => tprintln!(Always, "expected a number from -500 to 999"),
        }
    }
}

fn parse_input(line: &str) -> Option<u16> {
    line.trim().parse::<i32>().ok().and_then(alu::tens_complement)
}

/// Single-step `cpu`, showing the machine before every cycle.
///
/// Values from `inputs` are used first, then the user is prompted on the terminal.
pub fn trace(
    cpu: &mut Cpu,
    inputs: VecDeque<u16>,
    symbols: Option<&SymbolTable>,
    options: TraceOptions,
) -> Result<RunOutcome, Fault> {
    let mut source = KeySource::from(options.command);
    let mut queue = inputs;
    let term = io::stdin().is_terminal().then(console::Term::stdout);
    let mut input = input_fn(|| {
        queue
            .pop_front()
            .or_else(|| prompt_input(term.as_ref()))
    });
    let mut output = output_fn(|value| Channel::Normal.print_value(value, options.signed));

    let outcome = loop {
        if cpu.status() != RunStatus::Running {
            break RunOutcome::Halted { steps: cpu.steps() };
        }
        print_state(cpu, symbols);
        match source.read().unwrap_or(Action::Quit) {
            Action::Step => {
                if let Err(fault) = cpu.step(&mut input, &mut output) {
                    print_state(cpu, symbols);
                    return Err(fault);
                }
            }
            Action::Continue => {
                match cpu.run_to_halt(&mut input, &mut output, options.step_limit) {
                    Ok(outcome) => break outcome,
                    Err(fault) => {
                        print_state(cpu, symbols);
                        return Err(fault);
                    }
                }
            }
            Action::Quit => break RunOutcome::Stopped { steps: cpu.steps() },
        }
    };
    print_state(cpu, symbols);
    Ok(outcome)
}

fn print_state(cpu: &Cpu, symbols: Option<&SymbolTable>) {
    let pc = cpu.registers().pc;
    tprintln!(Always, "\x1b[1mcycle {}", cpu.steps());
    Channel::Trace(Condition::Always)
        .print_registers(&cpu.registers(), cpu.state().carry());
    if cpu.status() == RunStatus::Running {
        let label = symbols.and_then(|symbols| symbols.label_at(pc));
        Channel::Trace(Condition::Always).print_next(
            cpu.memory(),
            pc,
            cpu.table(),
            label,
        );
    }
    Channel::Trace(Condition::Sometimes).print_memory(cpu.memory(), pc);
}
