use std::fmt;

use crate::error::AsmError;
use crate::lexer::cursor::Cursor;
use crate::symbol::{DirKind, InstrKind, Span, SrcOffset};

pub mod cursor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based line of the token's first character
    pub line: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Label definition or reference
    Ident,
    /// Unsigned decimal literal
    Lit(u32),
    Instr(InstrKind),
    Dir(DirKind),
    /// Optional terminator of a label definition
    Colon,
    /// Statements are terminated by line ends
    Newline,
    Comment,
    Whitespace,
    Unknown,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident => f.write_str("label"),
            TokenKind::Lit(_) => f.write_str("numeric literal"),
            TokenKind::Instr(_) => f.write_str("instruction"),
            TokenKind::Dir(_) => f.write_str("directive"),
            TokenKind::Colon => f.write_str("`:`"),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Comment => f.write_str("comment"),
            TokenKind::Whitespace => f.write_str("whitespace"),
            TokenKind::Unknown => f.write_str("unknown character"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

/// Test if a character is considered to be whitespace. Line ends are significant.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

pub(crate) fn is_id_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

pub struct Lexer<'a> {
    cur: Cursor<'a>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            cur: Cursor::new(src),
            line: 1,
        }
    }

    pub fn advance_token(&mut self) -> Result<Token, AsmError> {
        let line = self.line;
        let first_char = match self.cur.bump() {
            Some(c) => c,
            None => {
                let span = Span::new(SrcOffset(self.cur.token_start()), 0);
                return Ok(Token { kind: TokenKind::Eof, span, line });
            }
        };
        let kind = match first_char {
            '\n' => {
                self.line += 1;
                TokenKind::Newline
            }
            ':' => TokenKind::Colon,
            '#' => {
                self.cur.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            '/' if self.cur.first() == '/' => {
                self.cur.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            c if is_whitespace(c) => {
                self.cur.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            c if is_id_start(c) => {
                self.cur.take_while(is_id);
                let text = self.cur.token_text();
                if let Some(instr) = InstrKind::from_name(text) {
                    TokenKind::Instr(instr)
                } else if let Some(dir) = DirKind::from_name(text) {
                    TokenKind::Dir(dir)
                } else {
                    TokenKind::Ident
                }
            }
            '0'..='9' => {
                self.cur.take_while(|c| c.is_ascii_digit());
                let span = self.token_span();
                match self.cur.token_text().parse::<u32>() {
                    Ok(val) => TokenKind::Lit(val),
                    Err(_) => return Err(AsmError::literal_too_large(line, span)),
                }
            }
            _ => TokenKind::Unknown,
        };
        let span = self.token_span();
        self.cur.reset_pos();
        Ok(Token { kind, span, line })
    }

    fn token_span(&self) -> Span {
        Span::new(SrcOffset(self.cur.token_start()), self.cur.pos_in_token())
    }
}

/// Split source into tokens, dropping whitespace and comments.
///
/// The returned stream always ends in a single [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, AsmError> {
    let mut lexer = Lexer::new(src);
    let mut toks = Vec::new();
    loop {
        let tok = lexer.advance_token()?;
        match tok.kind {
            TokenKind::Whitespace | TokenKind::Comment => continue,
            TokenKind::Eof => {
                toks.push(tok);
                break;
            }
            _ => toks.push(tok),
        }
    }
    Ok(toks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().iter().map(|tok| tok.kind).collect()
    }

    #[test]
    fn labelled_dat() {
        assert_eq!(
            kinds("five DAT 5"),
            vec![
                TokenKind::Ident,
                TokenKind::Dir(DirKind::Dat),
                TokenKind::Lit(5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines() {
        assert_eq!(
            kinds("# header\n\n  inp // read\nOUT"),
            vec![
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Instr(InstrKind::Inp),
                TokenKind::Newline,
                TokenKind::Instr(InstrKind::Out),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn spans_and_lines() {
        let toks = tokenize("inp\n  sta value").unwrap();
        let sta = toks[2];
        assert_eq!(sta.kind, TokenKind::Instr(InstrKind::Sta));
        assert_eq!(sta.line, 2);
        assert_eq!(Into::<std::ops::Range<usize>>::into(sta.span), 6..9);
        assert_eq!(toks[3].span.offs(), 10);
        assert_eq!(toks[3].span.len(), 5);
    }

    #[test]
    fn unknown_characters() {
        assert_eq!(
            kinds("dat -1"),
            vec![
                TokenKind::Dir(DirKind::Dat),
                TokenKind::Unknown,
                TokenKind::Lit(1),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("/"), vec![TokenKind::Unknown, TokenKind::Eof]);
    }

    #[test]
    fn colon_after_label() {
        assert_eq!(
            kinds("five: DAT 5"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Dir(DirKind::Dat),
                TokenKind::Lit(5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn huge_literal_is_an_error() {
        assert!(tokenize("dat 99999999999").is_err());
    }
}
