use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::lexer::{Token, TokenKind};
use crate::state::Registers;
use crate::symbol::Span;

/// Failure to assemble a program. No image is produced.
#[derive(Clone, PartialEq, Debug)]
pub struct AsmError {
    pub kind: AsmErrorKind,
    /// 1-based source line
    pub line: usize,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub enum AsmErrorKind {
    /// Unknown mnemonic, malformed operand, or token in the wrong place.
    Syntax { expected: &'static str, found: String },
    /// Literal which does not fit in a mailbox.
    LiteralOutOfRange { value: u32 },
    DuplicateSymbol { name: String, first_line: usize },
    UndefinedSymbol { name: String },
    AddressOverflow(Overflow),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Overflow {
    /// `ORG` target beyond the last mailbox
    Origin { addr: u32 },
    /// Numeric operand beyond the last mailbox
    Operand { addr: u32 },
    /// Statement placed past the last mailbox
    ProgramTooLarge,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, line: usize, span: Span) -> Self {
        AsmError { kind, line, span }
    }

    pub(crate) fn unexpected(expected: &'static str, tok: &Token) -> Self {
        let found = match tok.kind {
            TokenKind::Instr(instr) => format!("instruction `{instr}`"),
            TokenKind::Dir(dir) => format!("directive `{dir}`"),
            TokenKind::Lit(val) => format!("numeric literal `{val}`"),
            kind => kind.to_string(),
        };
        Self::new(AsmErrorKind::Syntax { expected, found }, tok.line, tok.span)
    }

    pub(crate) fn literal_too_large(line: usize, span: Span) -> Self {
        let kind = AsmErrorKind::Syntax {
            expected: "numeric literal",
            found: "literal with too many digits".to_string(),
        };
        Self::new(kind, line, span)
    }

    /// Render as a diagnostic pointing into `src`.
    pub fn report(&self, src: &str) -> Report {
        let (code, help, label) = match &self.kind {
            AsmErrorKind::Syntax { .. } => (
                "parse::unexpected_token",
                "lines look like `[label] MNEMONIC [operand]`, `[label] DAT [value]` or `ORG address`",
                "unexpected token",
            ),
            AsmErrorKind::LiteralOutOfRange { .. } => (
                "parse::bad_lit",
                "mailboxes hold values from 0 to 999",
                "out-of-range literal",
            ),
            AsmErrorKind::DuplicateSymbol { .. } => (
                "asm::duplicate_label",
                "each label may only be defined once per file",
                "duplicate label",
            ),
            AsmErrorKind::UndefinedSymbol { .. } => (
                "asm::undefined_label",
                "define the label in front of an instruction or DAT",
                "undefined label",
            ),
            AsmErrorKind::AddressOverflow(Overflow::ProgramTooLarge) => (
                "asm::too_large",
                "the program must fit in 100 mailboxes, addresses 0 to 99",
                "does not fit in memory",
            ),
            AsmErrorKind::AddressOverflow(_) => (
                "asm::bad_address",
                "addresses range from 0 to 99",
                "out-of-range address",
            ),
        };
        miette!(
            severity = Severity::Error,
            code = code,
            help = help,
            labels = vec![LabeledSpan::at(self.span, label)],
            "{}",
            self
        )
        .with_source_code(src.to_string())
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::LiteralOutOfRange { value } => {
                write!(f, "literal {value} does not fit in a mailbox")
            }
            Self::DuplicateSymbol { name, first_line } => {
                write!(f, "label `{name}` is already defined on line {first_line}")
            }
            Self::UndefinedSymbol { name } => write!(f, "label `{name}` is never defined"),
            Self::AddressOverflow(Overflow::Origin { addr }) => {
                write!(f, "ORG address {addr} is past the last mailbox")
            }
            Self::AddressOverflow(Overflow::Operand { addr }) => {
                write!(f, "address {addr} is past the last mailbox")
            }
            Self::AddressOverflow(Overflow::ProgramTooLarge) => {
                write!(f, "program does not fit in memory")
            }
        }
    }
}

/// Fatal runtime error, with the registers as they were when it happened.
#[derive(Clone, PartialEq, Debug)]
pub struct Fault {
    pub kind: FaultKind,
    pub registers: Registers,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FaultKind {
    /// Word at `addr` is not an instruction
    InvalidInstruction { word: u16, addr: u8 },
    /// Word at `addr` uses the reserved opcode
    UnimplementedOpcode { opcode: u8, addr: u8 },
    /// Memory access outside of the 100 mailboxes
    Address { addr: u16 },
    /// `INP` with nothing left to read
    InputExhausted,
    /// `INP` given a value which does not fit in the accumulator
    InputOutOfRange { value: u16 },
}

impl Fault {
    pub fn report(&self) -> Report {
        let help = match self.kind {
            FaultKind::InvalidInstruction { .. } | FaultKind::UnimplementedOpcode { .. } => {
                "execution ran into a data cell; check for a missing HLT or a bad branch"
            }
            FaultKind::Address { .. } => "memory addresses range from 0 to 99",
            FaultKind::InputExhausted => "supply another input value",
            FaultKind::InputOutOfRange { .. } => "inputs range from 0 to 999",
        };
        miette!(
            severity = Severity::Error,
            code = "runtime::fault",
            help = help,
            "{}",
            self
        )
    }
}

impl Error for Fault {}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  registers: {}", self.kind, self.registers)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInstruction { word, addr } => {
                write!(f, "invalid instruction {word:03} at mailbox {addr:02}")
            }
            Self::UnimplementedOpcode { opcode, addr } => {
                write!(f, "unimplemented opcode {opcode} at mailbox {addr:02}")
            }
            Self::Address { addr } => write!(f, "address {addr} is out of range"),
            Self::InputExhausted => write!(f, "end of input"),
            Self::InputOutOfRange { value } => {
                write!(f, "input {value} is out of range (0..999)")
            }
        }
    }
}
