use std::{iter::Peekable, vec::IntoIter};

use crate::{
    air::{Air, AirStmt, Label, Operand, StmtKind},
    alu::BASE,
    error::{AsmError, AsmErrorKind},
    lexer::{tokenize, Token, TokenKind},
    symbol::{DirKind, InstrKind, Span},
};

/// Transforms token stream into AIR
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Peekable iterator over tokens, without whitespace or comments
    toks: Peekable<IntoIter<Token>>,
    /// Returned once the stream runs dry
    eof: Token,
    /// Assembly intermediate representation
    air: Air,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Result<Self, AsmError> {
        let toks = tokenize(src)?;
        let eof = toks.last().copied().unwrap_or(Token {
            kind: TokenKind::Eof,
            span: Span::dummy(),
            line: 1,
        });
        Ok(AsmParser {
            src,
            toks: toks.into_iter().peekable(),
            eof,
            air: Air::new(),
        })
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.offs()..span.end()]
    }

    /// Create AIR out of token stream
    pub fn parse(mut self) -> Result<Air, AsmError> {
        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::Eof => break,
                // Blank line
                TokenKind::Newline => continue,
                // Prefix label
                TokenKind::Ident => {
                    let label = Label::new(self.get_span(tok.span), tok.span);
                    let mut head = self.next();
                    if head.kind == TokenKind::Colon {
                        head = self.next();
                    }
                    match head.kind {
                        TokenKind::Instr(kind) => self.parse_instr(Some(label), kind, head)?,
                        TokenKind::Dir(DirKind::Dat) => self.parse_dat(Some(label), head)?,
                        _ => {
                            return Err(AsmError::unexpected(
                                "instruction or DAT after label",
                                &head,
                            ))
                        }
                    }
                }
                TokenKind::Instr(kind) => self.parse_instr(None, kind, tok)?,
                TokenKind::Dir(DirKind::Dat) => self.parse_dat(None, tok)?,
                TokenKind::Dir(DirKind::Org) => self.parse_org(tok)?,
                TokenKind::Lit(_) | TokenKind::Colon | TokenKind::Unknown => {
                    return Err(AsmError::unexpected(
                        "label, instruction or directive",
                        &tok,
                    ))
                }
                // Never produced by `tokenize`
                TokenKind::Whitespace | TokenKind::Comment => unreachable!(),
            }
            self.expect_line_end()?;
        }
        // Consume self to return AIR
        Ok(self.air)
    }

    fn parse_instr(
        &mut self,
        label: Option<Label>,
        kind: InstrKind,
        head: Token,
    ) -> Result<(), AsmError> {
        let operand = if kind.takes_operand() {
            let tok = self.next();
            let operand = match tok.kind {
                TokenKind::Ident => {
                    Operand::Label(Label::new(self.get_span(tok.span), tok.span))
                }
                TokenKind::Lit(addr) => Operand::Addr {
                    addr,
                    span: tok.span,
                },
                _ => return Err(AsmError::unexpected("label or address", &tok)),
            };
            Some(operand)
        } else {
            None
        };
        self.push(label, StmtKind::Instr { kind, operand }, head);
        Ok(())
    }

    fn parse_dat(&mut self, label: Option<Label>, head: Token) -> Result<(), AsmError> {
        let value = match self.toks.peek() {
            Some(&Token {
                kind: TokenKind::Lit(value),
                span,
                line,
            }) => {
                self.toks.next();
                if value >= u32::from(BASE) {
                    return Err(AsmError::new(
                        AsmErrorKind::LiteralOutOfRange { value },
                        line,
                        span,
                    ));
                }
                Some(value as u16)
            }
            _ => None,
        };
        self.push(label, StmtKind::Dat { value }, head);
        Ok(())
    }

    fn parse_org(&mut self, head: Token) -> Result<(), AsmError> {
        let tok = self.next();
        let TokenKind::Lit(addr) = tok.kind else {
            return Err(AsmError::unexpected("address", &tok));
        };
        self.push(None, StmtKind::Org { addr, span: tok.span }, head);
        Ok(())
    }

    fn push(&mut self, label: Option<Label>, kind: StmtKind, head: Token) {
        self.air.add_stmt(AirStmt {
            label,
            kind,
            line: head.line,
            span: head.span,
        })
    }

    fn expect_line_end(&mut self) -> Result<(), AsmError> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Newline | TokenKind::Eof => Ok(()),
            _ => Err(AsmError::unexpected("end of line", &tok)),
        }
    }

    fn next(&mut self) -> Token {
        self.toks.next().unwrap_or(self.eof)
    }
}
