use std::{error::Error, fmt, ops::Index, str::FromStr};

use crate::alu::BASE;

/// Number of mailboxes in LMC memory.
pub const MEMORY_SIZE: usize = 100;

/// Contents of every mailbox, indexed by address. Every cell is in `0..1000`.
///
/// This is the only thing passed from the assembler to the machine.
#[derive(Clone, PartialEq, Eq)]
pub struct Image([u16; MEMORY_SIZE]);

/// Error reading a machine image.
#[derive(Debug, PartialEq)]
pub enum ImageError {
    TooManyCells { count: usize },
    NotANumber { index: usize, text: String },
    ValueOutOfRange { index: usize, value: u32 },
}

impl Image {
    /// Image with every mailbox set to zero.
    pub fn zeroed() -> Self {
        Image([0; MEMORY_SIZE])
    }

    pub fn new(cells: [u16; MEMORY_SIZE]) -> Result<Self, ImageError> {
        if let Some((index, &value)) = cells.iter().enumerate().find(|&(_, &v)| v >= BASE) {
            return Err(ImageError::ValueOutOfRange {
                index,
                value: u32::from(value),
            });
        }
        Ok(Image(cells))
    }

    /// Build from a prefix of cells, padding the rest with zeroes.
    pub fn from_slice(cells: &[u16]) -> Result<Self, ImageError> {
        if cells.len() > MEMORY_SIZE {
            return Err(ImageError::TooManyCells { count: cells.len() });
        }
        let mut padded = [0; MEMORY_SIZE];
        padded[..cells.len()].copy_from_slice(cells);
        Image::new(padded)
    }

    pub fn cells(&self) -> &[u16; MEMORY_SIZE] {
        &self.0
    }

    /// Caller guarantees `addr < MEMORY_SIZE` and `value < BASE`.
    pub(crate) fn set(&mut self, addr: u8, value: u16) {
        debug_assert!((addr as usize) < MEMORY_SIZE && value < BASE);
        self.0[addr as usize] = value;
    }
}

impl Default for Image {
    fn default() -> Self {
        Image::zeroed()
    }
}

impl Index<usize> for Image {
    type Output = u16;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// One zero-padded three-digit cell per line.
impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in self.0 {
            writeln!(f, "{cell:03}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trailing zeroes are noise in test failures
        let used = self.0.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1);
        f.debug_tuple("Image").field(&&self.0[..used]).finish()
    }
}

impl FromStr for Image {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::with_capacity(MEMORY_SIZE);
        for (index, word) in s.split_whitespace().enumerate() {
            let value = word.parse::<u32>().map_err(|_| ImageError::NotANumber {
                index,
                text: word.to_string(),
            })?;
            if value >= u32::from(BASE) {
                return Err(ImageError::ValueOutOfRange { index, value });
            }
            cells.push(value as u16);
        }
        Image::from_slice(&cells)
    }
}

impl Error for ImageError {}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyCells { count } => {
                write!(f, "image has {count} cells, memory only holds {MEMORY_SIZE}")
            }
            Self::NotANumber { index, text } => {
                write!(f, "cell {index} is not a decimal number: `{text}`")
            }
            Self::ValueOutOfRange { index, value } => {
                write!(f, "cell {index} holds {value}, which does not fit in three digits")
            }
        }
    }
}
