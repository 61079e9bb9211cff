// Output macros must be defined before any module using them
#[macro_use]
pub mod output;

// Assembling
mod lexer;
mod parser;
pub use parser::AsmParser;
mod air;
pub use air::{Air, AsmLine, Program};
mod symbol;
pub use symbol::{Symbol, SymbolTable};

// Running
pub mod alu;
mod image;
pub use image::{Image, ImageError, MEMORY_SIZE};
mod ops;
pub use ops::{DecodeError, Dialect, Instruction, OpcodeTable};
mod state;
pub use state::{MachineState, Registers};
mod runtime;
pub use runtime::{input_fn, output_fn, Cpu, Input, Output, Phase, RunOutcome, RunStatus};
mod trace;
pub use trace::{trace, TraceOptions};

mod error;
pub use error::{AsmError, AsmErrorKind, Fault, FaultKind, Overflow};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;

/// Assemble `src` with the standard opcode table.
pub fn assemble(src: &str) -> Result<Image, AsmError> {
    Ok(assemble_with(src, &OpcodeTable::standard())?.image)
}

/// Assemble `src`, keeping symbols and the listing alongside the image.
pub fn assemble_with(src: &str, table: &OpcodeTable) -> Result<Program, AsmError> {
    let air = AsmParser::new(src)?.parse()?;
    air.assemble(table)
}
