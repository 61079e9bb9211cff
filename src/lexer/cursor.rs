// Modelled on the cursor in `rustc_lexer`.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Returned by [`Cursor::first`] when no characters remain.
pub const EOF_CHAR: char = '\0';

/// Peekable iterator over a char sequence.
///
/// Tracks the length of the token currently being consumed, and the absolute offset of its start.
pub struct Cursor<'a> {
    src: &'a str,
    /// Bytes left at the start of the current token
    len_remaining: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            src: input,
            len_remaining: input.len(),
            chars: input.chars(),
        }
    }

    /// Peek the next char without consuming it.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Byte offset of the current token's start
    pub fn token_start(&self) -> usize {
        self.src.len() - self.len_remaining
    }

    /// Length in bytes of the token consumed so far
    pub fn pos_in_token(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    /// Text of the token consumed so far
    pub fn token_text(&self) -> &'a str {
        let start = self.token_start();
        &self.src[start..start + self.pos_in_token()]
    }

    /// Begin a new token at the current position.
    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume chars while `predicate` holds.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }
}
