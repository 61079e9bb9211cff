use crate::error::{AsmError, AsmErrorKind, Overflow};
use crate::image::{Image, MEMORY_SIZE};
use crate::ops::{Instruction, OpcodeTable};
use crate::symbol::{InstrKind, Span, Symbol, SymbolTable};

/// Assembly intermediate representation: parsed statements in source order.
#[derive(Debug, Default)]
pub struct Air {
    ast: Vec<AirStmt>,
}

/// Single LMC statement, from one source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub label: Option<Label>,
    pub kind: StmtKind,
    /// 1-based source line
    pub line: usize,
    /// Span of the mnemonic or directive
    pub span: Span,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StmtKind {
    Instr {
        kind: InstrKind,
        operand: Option<Operand>,
    },
    /// Data cell. Value is already checked to fit in a mailbox.
    Dat { value: Option<u16> },
    /// Move the location counter. Checked against memory size in the first pass.
    Org { addr: u32, span: Span },
}

/// Label as written in source, stored lower-cased.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Label {
    pub name: String,
    pub span: Span,
}

impl Label {
    pub fn new(name: &str, span: Span) -> Self {
        Label {
            name: name.to_ascii_lowercase(),
            span,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Label(Label),
    /// Numeric mailbox address, checked against memory size when resolved.
    Addr { addr: u32, span: Span },
}

/// Assembled program: the image along with what is needed to describe it.
#[derive(Clone, Debug)]
pub struct Program {
    pub image: Image,
    pub symbols: SymbolTable,
    /// One entry per emitted mailbox, in source order.
    pub listing: Vec<AsmLine>,
}

/// Emitted mailbox and where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AsmLine {
    pub addr: u8,
    pub value: u16,
    pub line: usize,
    pub label: Option<String>,
}

impl Air {
    pub fn new() -> Self {
        Air { ast: Vec::new() }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.ast.push(stmt)
    }

    pub fn get(&self, idx: usize) -> &AirStmt {
        &self.ast[idx]
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AirStmt> {
        self.ast.iter()
    }

    /// Resolve labels and produce the machine image.
    pub fn assemble(&self, table: &OpcodeTable) -> Result<Program, AsmError> {
        let (symbols, placed) = self.allocate()?;
        self.emit(table, symbols, &placed)
    }

    /// First pass: assign every statement a mailbox and bind labels.
    ///
    /// Returns the address of each statement, `None` for `ORG`.
    fn allocate(&self) -> Result<(SymbolTable, Vec<Option<u8>>), AsmError> {
        let mut symbols = SymbolTable::new();
        let mut placed = Vec::with_capacity(self.ast.len());
        // Not folded: running past the end means the program is too big
        let mut location: u32 = 0;

        for stmt in &self.ast {
            if let StmtKind::Org { addr, span } = stmt.kind {
                if addr as usize >= MEMORY_SIZE {
                    return Err(AsmError::new(
                        AsmErrorKind::AddressOverflow(Overflow::Origin { addr }),
                        stmt.line,
                        span,
                    ));
                }
                location = addr;
                placed.push(None);
                continue;
            }

            if location as usize >= MEMORY_SIZE {
                return Err(AsmError::new(
                    AsmErrorKind::AddressOverflow(Overflow::ProgramTooLarge),
                    stmt.line,
                    stmt.span,
                ));
            }
            let addr = location as u8;

            if let Some(label) = &stmt.label {
                let symbol = Symbol {
                    addr,
                    line: stmt.line,
                };
                if let Err(first) = symbols.insert(&label.name, symbol) {
                    return Err(AsmError::new(
                        AsmErrorKind::DuplicateSymbol {
                            name: label.name.clone(),
                            first_line: first.line,
                        },
                        stmt.line,
                        label.span,
                    ));
                }
            }

            placed.push(Some(addr));
            location += 1;
        }
        Ok((symbols, placed))
    }

    /// Second pass: encode every statement at its assigned mailbox.
    fn emit(
        &self,
        table: &OpcodeTable,
        symbols: SymbolTable,
        placed: &[Option<u8>],
    ) -> Result<Program, AsmError> {
        let mut image = Image::zeroed();
        let mut listing = Vec::with_capacity(placed.len());

        for (stmt, addr) in self.ast.iter().zip(placed) {
            let Some(addr) = *addr else {
                continue;
            };
            let value = match &stmt.kind {
                StmtKind::Instr { kind, operand } => {
                    let target = match operand {
                        Some(operand) => resolve(operand, &symbols, stmt.line)?,
                        None => 0,
                    };
                    table.encode(Instruction::from_kind(*kind, target))
                }
                StmtKind::Dat { value } => value.unwrap_or(0),
                StmtKind::Org { .. } => unreachable!("ORG does not occupy a mailbox"),
            };
            // Later statements win if `ORG` places two in one mailbox
            image.set(addr, value);
            listing.push(AsmLine {
                addr,
                value,
                line: stmt.line,
                label: stmt.label.as_ref().map(|label| label.name.clone()),
            });
        }

        Ok(Program {
            image,
            symbols,
            listing,
        })
    }
}

fn resolve(operand: &Operand, symbols: &SymbolTable, line: usize) -> Result<u8, AsmError> {
    match operand {
        Operand::Label(label) => match symbols.get(&label.name) {
            Some(symbol) => Ok(symbol.addr),
            None => Err(AsmError::new(
                AsmErrorKind::UndefinedSymbol {
                    name: label.name.clone(),
                },
                line,
                label.span,
            )),
        },
        Operand::Addr { addr, span } => match *addr as usize {
            addr if addr < MEMORY_SIZE => Ok(addr as u8),
            _ => Err(AsmError::new(
                AsmErrorKind::AddressOverflow(Overflow::Operand { addr: *addr }),
                line,
                *span,
            )),
        },
    }
}

impl<'a> IntoIterator for &'a Air {
    type Item = &'a AirStmt;
    type IntoIter = std::slice::Iter<'a, AirStmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.ast.iter()
    }
}
