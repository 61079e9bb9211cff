use std::cell::RefCell;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::alu;
use crate::image::{Image, MEMORY_SIZE};
use crate::ops::OpcodeTable;
use crate::state::Registers;

#[macro_export]
macro_rules! tprint {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            $fmt
            $($tt)*
        );
        $crate::output::Channel::Trace($cond).print_str(&s);
    }};
}

#[macro_export]
macro_rules! tprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Channel::Trace($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Channel::Trace($cond).print_str(&s);
    }};
}

/// Where a piece of text is going.
#[derive(Clone, Copy, Debug)]
pub enum Channel {
    /// Values the program writes with `OUT`, on stdout
    Normal,
    /// Tracer chatter, on stderr
    Trace(Condition),
}

/// Whether trace text survives `--minimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Channel {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => print!("{}", string),
            Self::Trace(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => eprint!("{}", ColoredString::from(string).blue()),
                // Always remove color if `--minimal`
                (true, Condition::Always) => eprint_colorless(string),
                (true, Condition::Sometimes) => (),
            },
        }
    }

    /// Print a value written by `OUT`.
    pub fn print_value(&self, value: u16, signed: bool) {
        if signed {
            self.print_str(&format!("{}\n", alu::to_signed(value)));
        } else {
            self.print_str(&format!("{}\n", value));
        }
    }

    pub fn print_registers(&self, reg: &Registers, carry: bool) {
        if Self::is_minimal() {
            self.print_str(&format!("{reg} C={}\n", carry as u8));
            return;
        }

        self.print_str("\x1b[2m┌──────────────────────────────────┐\x1b[0m\n");
        self.print_str(&format!(
            "\x1b[2m│\x1b[0m \x1b[1mACC\x1b[0m {:03}  \x1b[1mPC\x1b[0m {:02}   \x1b[1mZ\x1b[0m {} \x1b[1mP\x1b[0m {} \x1b[1mC\x1b[0m {}  \x1b[2m│\x1b[0m\n",
            reg.acc, reg.pc, reg.zero as u8, reg.positive as u8, carry as u8,
        ));
        self.print_str(&format!(
            "\x1b[2m│\x1b[0m \x1b[1mCIR\x1b[0m {:03}  \x1b[1mMAR\x1b[0m {:02}  \x1b[1mMDR\x1b[0m {:03}        \x1b[2m│\x1b[0m\n",
            reg.cir, reg.mar, reg.mdr,
        ));
        self.print_str("\x1b[2m└──────────────────────────────────┘\x1b[0m\n");
    }

    /// 10x10 grid of mailboxes, `pc` highlighted.
    pub fn print_memory(&self, mem: &Image, pc: u8) {
        let minimal = Self::is_minimal();
        if !minimal {
            self.print_str("\x1b[2m    ");
            for col in 0..10 {
                self.print_str(&format!("  +{col} "));
            }
            self.print_str("\x1b[0m\n");
        }
        for row in (0..MEMORY_SIZE).step_by(10) {
            if !minimal {
                self.print_str(&format!("\x1b[2m{row:02}\x1b[0m  "));
            }
            for addr in row..row + 10 {
                let cell = format!("{:03}", mem[addr]);
                match (minimal, addr == pc as usize) {
                    (true, _) => self.print_str(&format!("{cell} ")),
                    (false, true) => self.print_str(&format!("[\x1b[1m{cell}\x1b[0m]")),
                    (false, false) if mem[addr] == 0 => {
                        self.print_str(&format!(" \x1b[2m{cell}\x1b[0m "))
                    }
                    (false, false) => self.print_str(&format!(" {cell} ")),
                }
            }
            self.print_str("\n");
        }
    }

    /// `PC 04: ADD 12`, with the label bound there if known.
    pub fn print_next(&self, mem: &Image, pc: u8, table: &OpcodeTable, label: Option<&str>) {
        let instr = table.disassemble(mem[pc as usize]);
        match label {
            Some(label) => self.print_str(&format!("next  {pc:02}: {instr}  ({label})\n")),
            None => self.print_str(&format!("next  {pc:02}: {instr}\n")),
        }
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    eprint!("{}", Decolored::new(string).collect::<String>());
}
