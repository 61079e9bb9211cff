use std::{fmt, ops::Range};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label -> mailbox address, in order of definition.
///
/// Owned by a single assembly job. Filled during the first pass and only read afterwards.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    map: FxMap<String, Symbol>,
}

/// A bound label.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub addr: u8,
    /// Line the label was defined on
    pub line: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Bind `name`. Returns the existing symbol if `name` is already bound.
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        match self.map.get(name) {
            Some(existing) => Err(*existing),
            None => {
                self.map.insert(name.to_string(), symbol);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.map.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Symbol)> + '_ {
        self.map.iter().map(|(name, sym)| (name.as_str(), *sym))
    }

    /// First label bound to `addr`, if any.
    pub fn label_at(&self, addr: u8) -> Option<&str> {
        self.map
            .iter()
            .find(|(_, sym)| sym.addr == addr)
            .map(|(name, _)| name.as_str())
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct SrcOffset(pub usize);

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn dummy() -> Self {
        Span {
            offs: SrcOffset(0),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.offs()..value.end()
    }
}

/// Instruction mnemonics. Opcode 4 deliberately has none.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InstrKind {
    Hlt,
    Add,
    Sub,
    Sta,
    Lda,
    Bra,
    Brp,
    Brz,
    Inp,
    Out,
}

impl InstrKind {
    /// Case-insensitive lookup. `COB` is an old name for `HLT`.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "hlt" | "cob" => InstrKind::Hlt,
            "add" => InstrKind::Add,
            "sub" => InstrKind::Sub,
            "sta" => InstrKind::Sta,
            "lda" => InstrKind::Lda,
            "bra" => InstrKind::Bra,
            "brp" => InstrKind::Brp,
            "brz" => InstrKind::Brz,
            "inp" => InstrKind::Inp,
            "out" => InstrKind::Out,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the instruction is followed by an address operand.
    pub fn takes_operand(self) -> bool {
        !matches!(self, InstrKind::Hlt | InstrKind::Inp | InstrKind::Out)
    }
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrKind::Hlt => "HLT",
            InstrKind::Add => "ADD",
            InstrKind::Sub => "SUB",
            InstrKind::Sta => "STA",
            InstrKind::Lda => "LDA",
            InstrKind::Bra => "BRA",
            InstrKind::Brp => "BRP",
            InstrKind::Brz => "BRZ",
            InstrKind::Inp => "INP",
            InstrKind::Out => "OUT",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirKind {
    /// Data cell with an optional initial value
    Dat,
    /// Move the location counter
    Org,
}

impl DirKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dat" => Some(DirKind::Dat),
            "org" => Some(DirKind::Org),
            _ => None,
        }
    }
}

impl fmt::Display for DirKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirKind::Dat => f.write_str("DAT"),
            DirKind::Org => f.write_str("ORG"),
        }
    }
}
