//! Three-digit decimal arithmetic.
//!
//! The accumulator holds values `0..1000`. Results are folded back into that range, and
//! subtraction is performed by adding the ten's complement of the subtrahend.

/// One past the largest value a mailbox or the accumulator can hold.
pub const BASE: u16 = 1000;

/// Add two words, folding the sum into `0..BASE`.
///
/// The returned flag is set when the sum carried out of the hundreds digit.
pub fn add(a: u16, b: u16) -> (u16, bool) {
    debug_assert!(a < BASE && b < BASE);
    fold(a + b)
}

/// Subtract `b` from `a` as `a + (BASE - b)`.
///
/// The carry is set when no borrow occurred, i.e. when `a >= b`.
pub fn sub(a: u16, b: u16) -> (u16, bool) {
    debug_assert!(a < BASE && b < BASE);
    fold(a + (BASE - b))
}

#[inline]
fn fold(sum: u16) -> (u16, bool) {
    (sum % BASE, sum >= BASE)
}

/// Convert a signed value into its ten's complement word.
///
/// Accepts `-500..=999`; anything else cannot be represented.
pub fn tens_complement(value: i32) -> Option<u16> {
    match value {
        -500..=-1 => Some((i32::from(BASE) + value) as u16),
        0..=999 => Some(value as u16),
        _ => None,
    }
}

/// Read a word as a ten's complement signed value in `-500..=499`.
pub fn to_signed(value: u16) -> i16 {
    let value = (value % BASE) as i16;
    if value >= (BASE / 2) as i16 {
        value - BASE as i16
    } else {
        value
    }
}
