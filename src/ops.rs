use std::{fmt, str::FromStr};

use crate::image::MEMORY_SIZE;
use crate::symbol::InstrKind;

/// A decoded instruction. Operands are mailbox addresses.
///
/// Produced fresh from CIR every cycle and never stored.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Hlt,
    Add(u8),
    Sub(u8),
    Sta(u8),
    Lda(u8),
    Bra(u8),
    Brp(u8),
    Brz(u8),
    Inp,
    Out,
}

impl Instruction {
    /// Build from an assembler mnemonic and its resolved operand.
    ///
    /// The operand is ignored for instructions which address implicitly.
    pub fn from_kind(kind: InstrKind, addr: u8) -> Self {
        match kind {
            InstrKind::Hlt => Instruction::Hlt,
            InstrKind::Add => Instruction::Add(addr),
            InstrKind::Sub => Instruction::Sub(addr),
            InstrKind::Sta => Instruction::Sta(addr),
            InstrKind::Lda => Instruction::Lda(addr),
            InstrKind::Bra => Instruction::Bra(addr),
            InstrKind::Brp => Instruction::Brp(addr),
            InstrKind::Brz => Instruction::Brz(addr),
            InstrKind::Inp => Instruction::Inp,
            InstrKind::Out => Instruction::Out,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hlt => write!(f, "HLT"),
            Self::Add(addr) => write!(f, "ADD {addr:02}"),
            Self::Sub(addr) => write!(f, "SUB {addr:02}"),
            Self::Sta(addr) => write!(f, "STA {addr:02}"),
            Self::Lda(addr) => write!(f, "LDA {addr:02}"),
            Self::Bra(addr) => write!(f, "BRA {addr:02}"),
            Self::Brp(addr) => write!(f, "BRP {addr:02}"),
            Self::Brz(addr) => write!(f, "BRZ {addr:02}"),
            Self::Inp => write!(f, "INP"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

/// Why a word could not be decoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecodeError {
    /// The leading digit is set aside and has no behaviour.
    Reserved { opcode: u8 },
    /// No instruction has this opcode and operand combination.
    Invalid,
}

/// Numbering of operations, shared by the assembler and the CPU.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpcodeTable {
    hlt: u8,
    add: u8,
    sub: u8,
    sta: u8,
    reserved: u8,
    lda: u8,
    bra: u8,
    brp: u8,
    brz: u8,
    /// Leading digit shared by `INP` and `OUT`
    io: u8,
    /// Operand selecting `INP`
    inp: u8,
    /// Operand selecting `OUT`
    out: u8,
}

impl OpcodeTable {
    /// `7xx` is `BRP` and `8xx` is `BRZ`.
    pub const fn standard() -> Self {
        OpcodeTable {
            hlt: 0,
            add: 1,
            sub: 2,
            sta: 3,
            reserved: 4,
            lda: 5,
            bra: 6,
            brp: 7,
            brz: 8,
            io: 9,
            inp: 1,
            out: 2,
        }
    }

    /// Numbering found in most LMC literature: `7xx` is `BRZ` and `8xx` is `BRP`.
    pub const fn classic() -> Self {
        OpcodeTable {
            brp: 8,
            brz: 7,
            ..Self::standard()
        }
    }

    /// Use other operands to select `INP` and `OUT`.
    ///
    /// # Panics
    ///
    /// If either operand is not a mailbox address, or both are the same.
    pub const fn with_io(self, inp: u8, out: u8) -> Self {
        assert!(
            (inp as usize) < MEMORY_SIZE && (out as usize) < MEMORY_SIZE,
            "I/O operands must be below 100"
        );
        assert!(inp != out, "INP and OUT operands must differ");
        OpcodeTable { inp, out, ..self }
    }

    pub fn encode(&self, instr: Instruction) -> u16 {
        let (opcode, operand) = match instr {
            Instruction::Hlt => (self.hlt, 0),
            Instruction::Add(addr) => (self.add, addr),
            Instruction::Sub(addr) => (self.sub, addr),
            Instruction::Sta(addr) => (self.sta, addr),
            Instruction::Lda(addr) => (self.lda, addr),
            Instruction::Bra(addr) => (self.bra, addr),
            Instruction::Brp(addr) => (self.brp, addr),
            Instruction::Brz(addr) => (self.brz, addr),
            Instruction::Inp => (self.io, self.inp),
            Instruction::Out => (self.io, self.out),
        };
        u16::from(opcode) * 100 + u16::from(operand)
    }

    pub fn decode(&self, word: u16) -> Result<Instruction, DecodeError> {
        let opcode = (word / 100) as u8;
        let operand = (word % 100) as u8;
        let instr = match opcode {
            op if op == self.reserved => return Err(DecodeError::Reserved { opcode }),
            // `HLT` ignores its operand
            op if op == self.hlt => Instruction::Hlt,
            op if op == self.add => Instruction::Add(operand),
            op if op == self.sub => Instruction::Sub(operand),
            op if op == self.sta => Instruction::Sta(operand),
            op if op == self.lda => Instruction::Lda(operand),
            op if op == self.bra => Instruction::Bra(operand),
            op if op == self.brp => Instruction::Brp(operand),
            op if op == self.brz => Instruction::Brz(operand),
            op if op == self.io && operand == self.inp => Instruction::Inp,
            op if op == self.io && operand == self.out => Instruction::Out,
            _ => return Err(DecodeError::Invalid),
        };
        Ok(instr)
    }

    /// Render a mailbox as assembly. Words which are not instructions render as `DAT`.
    pub fn disassemble(&self, word: u16) -> String {
        match self.decode(word) {
            Ok(instr) => instr.to_string(),
            Err(_) => format!("DAT {word:03}"),
        }
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named opcode tables, for configuration.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Dialect {
    #[default]
    Standard,
    Classic,
}

impl Dialect {
    pub fn table(self) -> OpcodeTable {
        match self {
            Dialect::Standard => OpcodeTable::standard(),
            Dialect::Classic => OpcodeTable::classic(),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Dialect::Standard),
            "classic" => Ok(Dialect::Classic),
            other => Err(format!(
                "unknown dialect `{other}`, expected `standard` or `classic`"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_standard() {
        let table = OpcodeTable::standard();
        assert_eq!(table.decode(0), Ok(Instruction::Hlt));
        assert_eq!(table.decode(42), Ok(Instruction::Hlt));
        assert_eq!(table.decode(105), Ok(Instruction::Add(5)));
        assert_eq!(table.decode(299), Ok(Instruction::Sub(99)));
        assert_eq!(table.decode(310), Ok(Instruction::Sta(10)));
        assert_eq!(table.decode(520), Ok(Instruction::Lda(20)));
        assert_eq!(table.decode(600), Ok(Instruction::Bra(0)));
        assert_eq!(table.decode(701), Ok(Instruction::Brp(1)));
        assert_eq!(table.decode(802), Ok(Instruction::Brz(2)));
        assert_eq!(table.decode(901), Ok(Instruction::Inp));
        assert_eq!(table.decode(902), Ok(Instruction::Out));
    }

    #[test]
    fn decode_rejects_reserved_and_invalid() {
        let table = OpcodeTable::standard();
        assert_eq!(table.decode(400), Err(DecodeError::Reserved { opcode: 4 }));
        assert_eq!(table.decode(455), Err(DecodeError::Reserved { opcode: 4 }));
        assert_eq!(table.decode(900), Err(DecodeError::Invalid));
        assert_eq!(table.decode(903), Err(DecodeError::Invalid));
        assert_eq!(table.decode(999), Err(DecodeError::Invalid));
    }

    #[test]
    fn classic_swaps_conditional_branches() {
        let table = OpcodeTable::classic();
        assert_eq!(table.decode(712), Ok(Instruction::Brz(12)));
        assert_eq!(table.decode(812), Ok(Instruction::Brp(12)));
        assert_eq!(table.encode(Instruction::Brz(3)), 703);
        assert_eq!(table.encode(Instruction::Brp(3)), 803);
    }

    #[test]
    fn io_operands_are_configurable() {
        let table = OpcodeTable::standard().with_io(2, 1);
        assert_eq!(table.decode(901), Ok(Instruction::Out));
        assert_eq!(table.decode(902), Ok(Instruction::Inp));
        assert_eq!(table.encode(Instruction::Inp), 902);
    }

    #[test]
    #[should_panic(expected = "I/O operands must be below 100")]
    fn io_operand_must_be_an_address() {
        let _ = OpcodeTable::standard().with_io(150, 2);
    }

    #[test]
    #[should_panic(expected = "INP and OUT operands must differ")]
    fn io_operands_must_differ() {
        let _ = OpcodeTable::standard().with_io(5, 5);
    }

    #[test]
    fn encoded_io_fits_in_a_mailbox() {
        let table = OpcodeTable::standard().with_io(98, 99);
        assert_eq!(table.encode(Instruction::Inp), 998);
        assert_eq!(table.encode(Instruction::Out), 999);
    }

    #[test]
    fn encode_matches_decode() {
        let table = OpcodeTable::standard();
        for word in (0..1000).filter(|w| *w == 0 || *w >= 100) {
            if let Ok(instr) = table.decode(word) {
                if instr != Instruction::Hlt {
                    assert_eq!(table.encode(instr), word);
                }
            }
        }
    }

    #[test]
    fn disassemble() {
        let table = OpcodeTable::standard();
        assert_eq!(table.disassemble(105), "ADD 05");
        assert_eq!(table.disassemble(901), "INP");
        assert_eq!(table.disassemble(0), "HLT");
        assert_eq!(table.disassemble(405), "DAT 405");
        assert_eq!(table.disassemble(907), "DAT 907");
    }

    #[test]
    fn dialect_from_str() {
        assert_eq!("Classic".parse::<Dialect>(), Ok(Dialect::Classic));
        assert_eq!("standard".parse::<Dialect>(), Ok(Dialect::Standard));
        assert!("wikipedia".parse::<Dialect>().is_err());
    }
}
