use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use lmc::output::Channel;
use lmc::{alu, Cpu, Dialect, Image, OpcodeTable, Program, RunOutcome, SymbolTable};
use lmc::{output_fn, TraceOptions};

/// Assembler and virtual machine for the Little Man Computer.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.lmc` file to run
    path: Option<PathBuf>,

    /// Opcode numbering: `standard` (7 BRP, 8 BRZ) or `classic` (7 BRZ, 8 BRP)
    #[arg(long, global = true)]
    dialect: Option<Dialect>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.lmc` source or `.mem` image, printing every output on its own line
    Run {
        /// `.lmc`, `.asm` or `.mem` file to run
        name: PathBuf,
        /// Values for `INP`, from -500 to 999
        #[arg(allow_negative_numbers = true)]
        inputs: Vec<i32>,
        /// Print outputs of 500 and above as negative numbers
        #[arg(short, long)]
        signed: bool,
        /// Give up after this many cycles, 0 for no limit [default: `LMC_STEP_LIMIT` or 10000]
        #[arg(long)]
        step_limit: Option<u64>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Step through a program one cycle at a time, showing registers and memory
    Trace {
        /// `.lmc`, `.asm` or `.mem` file to trace
        name: PathBuf,
        /// Values for `INP`, from -500 to 999. The user is prompted on a terminal once these run out
        #[arg(allow_negative_numbers = true)]
        inputs: Vec<i32>,
        /// Read trace keys from argument, separated by `;`
        #[arg(short, long)]
        command: Option<String>,
        /// Print outputs of 500 and above as negative numbers
        #[arg(short, long)]
        signed: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Create a `.mem` image to run later
    Compile {
        /// `.lmc` file to compile
        name: PathBuf,
        /// Destination to output `.mem` file
        dest: Option<PathBuf>,
        /// Print every emitted mailbox with its source line
        #[arg(short, long)]
        listing: bool,
    },
    /// Check a `.lmc` file without running or outputting an image
    Check {
        /// File to check
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    lmc::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(lmc::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let table = args.dialect.unwrap_or_else(lmc::env::dialect).table();

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, &[], &table, false, lmc::env::step_limit());
        }
        println!("\n~ lmc v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    };

    match command {
        Command::Run {
            name,
            inputs,
            signed,
            step_limit,
            minimal,
        } => {
            Channel::set_minimal(minimal);
            let step_limit = match step_limit {
                Some(0) => None,
                Some(limit) => Some(limit),
                None => lmc::env::step_limit(),
            };
            run(&name, &inputs, &table, signed, step_limit)
        }
        Command::Trace {
            name,
            inputs,
            command,
            signed,
            minimal,
        } => {
            Channel::set_minimal(minimal);
            let (image, symbols) = load(&name, &table)?;
            let inputs = queue_inputs(&inputs)?;
            let mut cpu = Cpu::new(table);
            cpu.load(&image);

            file_message(Green, "Tracing", &name);
            let options = TraceOptions {
                command,
                signed,
                step_limit: lmc::env::step_limit(),
            };
            match lmc::trace(&mut cpu, inputs, symbols.as_ref(), options) {
                Ok(RunOutcome::Halted { steps }) => {
                    message(Green, "Halted", &format!("after {steps} cycles"))
                }
                Ok(RunOutcome::Stopped { steps }) => {
                    message(Cyan, "Stopped", &format!("after {steps} cycles"))
                }
                Err(fault) => return Err(fault.report()),
            }
            Ok(())
        }
        Command::Compile {
            name,
            dest,
            listing,
        } => {
            file_message(Green, "Assembling", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let program = assemble(&src, &table)?;

            if listing {
                print_listing(&program, &table, &src);
            }

            let dest = dest.unwrap_or_else(|| name.with_extension("mem"));
            fs::write(&dest, program.image.to_string()).into_diagnostic()?;

            message(Green, "Finished", "emit image");
            file_message(Green, "Saved", &dest);
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let _ = assemble(&src, &table)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    if Channel::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(
    name: &Path,
    inputs: &[i32],
    table: &OpcodeTable,
    signed: bool,
    step_limit: Option<u64>,
) -> Result<()> {
    let (image, _) = load(name, table)?;
    let mut inputs = queue_inputs(inputs)?;
    let mut cpu = Cpu::new(*table);
    cpu.load(&image);

    message(MsgColor::Green, "Running", "loaded image");
    let mut output = output_fn(|value| Channel::Normal.print_value(value, signed));
    match cpu.run_to_halt(&mut inputs, &mut output, step_limit) {
        Ok(RunOutcome::Halted { steps }) => {
            message(MsgColor::Green, "Halted", &format!("after {steps} cycles"));
            file_message(MsgColor::Green, "Completed", name);
            Ok(())
        }
        Ok(RunOutcome::Stopped { steps }) => {
            bail!("program did not halt within {steps} cycles")
        }
        Err(fault) => Err(fault.report()),
    }
}

/// Assemble a source file or read an image, depending on extension.
fn load(name: &Path, table: &OpcodeTable) -> Result<(Image, Option<SymbolTable>)> {
    file_message(MsgColor::Green, "Loading", name);
    let Some(ext) = name.extension() else {
        bail!("File has no extension. Exiting...");
    };
    match ext.to_str() {
        Some("mem") => {
            let text = fs::read_to_string(name).into_diagnostic()?;
            let image = text.parse::<Image>().into_diagnostic()?;
            Ok((image, None))
        }
        Some("lmc" | "asm") => {
            let src = fs::read_to_string(name).into_diagnostic()?;
            let program = assemble(&src, table)?;
            Ok((program.image, Some(program.symbols)))
        }
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

fn assemble(src: &str, table: &OpcodeTable) -> Result<Program> {
    lmc::assemble_with(src, table).map_err(|err| err.report(src))
}

/// Convert command-line inputs to mailbox values.
fn queue_inputs(inputs: &[i32]) -> Result<VecDeque<u16>> {
    inputs
        .iter()
        .map(|&value| match alu::tens_complement(value) {
            Some(value) => Ok(value),
            None => bail!("input {value} is out of range, expected -500 to 999"),
        })
        .collect()
}

fn print_listing(program: &Program, table: &OpcodeTable, src: &str) {
    let lines: Vec<&str> = src.lines().collect();
    for entry in &program.listing {
        let label = entry.label.as_deref().unwrap_or("");
        let text = lines.get(entry.line - 1).map_or("", |line| line.trim());
        println!(
            "{:02}  {:03}  {:<8} {:<8}  {}",
            entry.addr,
            entry.value,
            label,
            table.disassemble(entry.value),
            format!("{:>3}| {text}", entry.line).as_str().dimmed(),
        );
    }
}

const LOGO: &str = r#"
  _
 | |_ __ ___   ___
 | | '_ ` _ \ / __|
 | | | | | | | (__
 |_|_| |_| |_|\___|"#;

const SHORT_INFO: &str = r"
An assembler and virtual machine for the Little Man Computer:
100 mailboxes, one accumulator and ten instructions.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
