//! Main lexer implementation for the chasm assembler.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s, dispatching
//! on the first character of each token. Lexemes are copied into the arena so
//! the source string can be dropped once parsing completes.
//!
//! Lexing is fatal on the first error: [`Lexer::next_token`] returns the
//! [`LexError`] and the caller stops.

use bumpalo::Bump;
use chasm_core::{LexError, Span};

use super::cursor::{Cursor, Mark, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Lexer for chasm source code.
///
/// The `'src` lifetime is the source string being lexed (temporary).
/// The `'ast` lifetime is the arena where token lexemes are allocated (persists).
pub struct Lexer<'src, 'ast> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Arena for allocating token lexemes.
    arena: &'ast Bump,
    /// Set once the end-of-file token has been produced.
    finished: bool,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            finished: false,
        }
    }

    /// Scan and return the next token.
    ///
    /// Returns an [`TokenKind::Eof`] token at the end of input, repeatedly if
    /// called again.
    pub fn next_token(&mut self) -> Result<Token<'ast>, LexError> {
        self.cursor.skip_trivia();
        let start = self.cursor.mark();

        let Some(c) = self.cursor.peek() else {
            self.finished = true;
            return Ok(Token::new(TokenKind::Eof, "", start.point()));
        };

        match c {
            '"' => self.scan_string(start),
            _ if self.cursor.at_number() => self.scan_number(start),
            c if is_ident_start(c) => Ok(self.scan_identifier(start)),
            _ => self.scan_punctuation(c, start),
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    /// Create a token from `start` to the current position.
    /// Copies the lexeme into the arena.
    fn make_token(&self, kind: TokenKind, start: Mark) -> Token<'ast> {
        let lexeme = self.arena.alloc_str(self.cursor.lexeme_since(start));
        Token::new(kind, lexeme, self.cursor.span_since(start))
    }

    fn scan_identifier(&mut self, start: Mark) -> Token<'ast> {
        let text = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    /// Scan a numeric literal.
    ///
    /// Forms: `-?digits`, `-?digits.digits`, `-?0x<hex>`, `-?0b<binary>`.
    fn scan_number(&mut self, start: Mark) -> Result<Token<'ast>, LexError> {
        self.cursor.eat('-');

        let kind = if let Some(radix) = self.cursor.eat_radix_prefix() {
            if self.cursor.eat_while(|c| c.is_digit(radix)).is_empty() {
                return Err(LexError::InvalidNumber {
                    span: self.cursor.span_since(start),
                    detail: "expected digits after radix prefix".to_string(),
                });
            }
            TokenKind::BitsLiteral
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit());
            if self.cursor.eat_fraction() {
                TokenKind::FloatLiteral
            } else {
                TokenKind::IntLiteral
            }
        };

        // A number running straight into identifier characters (`12ab`, `0x1g`).
        if self.cursor.check(is_ident_continue) {
            self.cursor.eat_while(is_ident_continue);
            return Err(LexError::InvalidNumber {
                span: self.cursor.span_since(start),
                detail: format!("malformed number '{}'", self.cursor.lexeme_since(start)),
            });
        }
        Ok(self.make_token(kind, start))
    }

    /// Scan a double-quoted string literal, resolving escapes.
    fn scan_string(&mut self, start: Mark) -> Result<Token<'ast>, LexError> {
        self.cursor.advance(); // opening quote

        let unterminated = || LexError::UnterminatedString { span: start.point() };
        let mut value = String::new();
        loop {
            match self.cursor.advance() {
                None | Some('\n') => return Err(unterminated()),
                Some('"') => break,
                Some('\\') => {
                    let escape_line = self.cursor.line();
                    let escape_col = self.cursor.column() - 1;
                    let escaped = match self.cursor.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                span: Span::new(escape_line, escape_col, 2),
                            });
                        }
                        None => return Err(unterminated()),
                    };
                    value.push(escaped);
                }
                Some(ch) => value.push(ch),
            }
        }

        let lexeme = self.arena.alloc_str(&value);
        Ok(Token::new(TokenKind::StringLiteral, lexeme, self.cursor.span_since(start)))
    }

    fn scan_punctuation(&mut self, c: char, start: Mark) -> Result<Token<'ast>, LexError> {
        let kind = match c {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Equal,
            '*' => TokenKind::Star,
            '@' => TokenKind::At,
            '$' => TokenKind::Dollar,
            ch => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    span: Span::new(start.line, start.column, ch.len_utf8() as u32),
                });
            }
        };
        self.cursor.advance();
        Ok(self.make_token(kind, start))
    }
}

impl<'ast> Iterator for Lexer<'_, 'ast> {
    type Item = Result<Token<'ast>, LexError>;

    /// Yields every token including the final `Eof`, then `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        Lexer::new(source, &arena)
            .map(|t| t.unwrap().kind)
            .collect()
    }

    fn single<'ast>(source: &str, arena: &'ast Bump) -> Token<'ast> {
        let mut lexer = Lexer::new(source, arena);
        lexer.next_token().unwrap()
    }

    #[test]
    fn empty_source_is_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t # only a comment"), vec![TokenKind::Eof]);
    }

    #[test]
    fn method_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("method foo<*i32, u8>void {"),
            vec![Method, Identifier, Less, Star, Identifier, Comma, Identifier, Greater, Void, LeftBrace, Eof]
        );
    }

    #[test]
    fn statements() {
        use TokenKind::*;
        assert_eq!(
            kinds("$limstack = 4; @top: jmp top; # loop\n}"),
            vec![
                Dollar, Identifier, Equal, IntLiteral, Semicolon, At, Identifier, Colon, Identifier,
                Identifier, Semicolon, RightBrace, Eof
            ]
        );
    }

    #[test]
    fn numbers() {
        let arena = Bump::new();
        let tok = single("-42", &arena);
        assert_eq!(tok.kind, TokenKind::IntLiteral);
        assert_eq!(tok.lexeme, "-42");

        let tok = single("3.25", &arena);
        assert_eq!(tok.kind, TokenKind::FloatLiteral);
        assert_eq!(tok.lexeme, "3.25");

        let tok = single("0x3f800000", &arena);
        assert_eq!(tok.kind, TokenKind::BitsLiteral);
        assert_eq!(tok.span, Span::new(1, 1, 10));

        let tok = single("0b101", &arena);
        assert_eq!(tok.kind, TokenKind::BitsLiteral);
    }

    #[test]
    fn integer_followed_by_dot_is_not_float() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("1.", &arena);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::IntLiteral);
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::UnexpectedChar { ch: '.', .. })
        ));
    }

    #[test]
    fn malformed_numbers() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("0x;", &arena);
        assert!(matches!(lexer.next_token(), Err(LexError::InvalidNumber { .. })));

        let mut lexer = Lexer::new("12ab", &arena);
        assert!(matches!(lexer.next_token(), Err(LexError::InvalidNumber { .. })));
    }

    #[test]
    fn string_escapes() {
        let arena = Bump::new();
        let tok = single(r#""a\tb\n\"q\"""#, &arena);
        assert_eq!(tok.kind, TokenKind::StringLiteral);
        assert_eq!(tok.lexeme, "a\tb\n\"q\"");
        assert_eq!(tok.span.len, 13);
    }

    #[test]
    fn unterminated_string() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("\"abc\n\"", &arena);
        assert_eq!(
            lexer.next_token(),
            Err(LexError::UnterminatedString { span: Span::point(1, 1) })
        );
    }

    #[test]
    fn invalid_escape() {
        let arena = Bump::new();
        let mut lexer = Lexer::new(r#""a\q""#, &arena);
        assert_eq!(
            lexer.next_token(),
            Err(LexError::InvalidEscape { ch: 'q', span: Span::new(1, 3, 2) })
        );
    }

    #[test]
    fn unexpected_character() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("  %", &arena);
        assert_eq!(
            lexer.next_token(),
            Err(LexError::UnexpectedChar { ch: '%', span: Span::new(1, 3, 1) })
        );
    }

    #[test]
    fn spans_track_lines() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("method\n  ret;", &arena);
        assert_eq!(lexer.next_token().unwrap().span, Span::new(1, 1, 6));
        let ret = lexer.next_token().unwrap();
        assert_eq!(ret.lexeme, "ret");
        assert_eq!(ret.span, Span::new(2, 3, 3));
    }

    #[test]
    fn negative_radix_and_fraction_spans() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("  -0x10 -1.5 - 2", &arena);
        let bits = lexer.next_token().unwrap();
        assert_eq!((bits.kind, bits.lexeme, bits.span), (TokenKind::BitsLiteral, "-0x10", Span::new(1, 3, 5)));
        let float = lexer.next_token().unwrap();
        assert_eq!((float.kind, float.span), (TokenKind::FloatLiteral, Span::new(1, 9, 4)));
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::UnexpectedChar { ch: '-', .. })
        ));

        let mut lexer = Lexer::new("\n 0x1g", &arena);
        assert_eq!(
            lexer.next_token(),
            Err(LexError::InvalidNumber {
                span: Span::new(2, 2, 4),
                detail: "malformed number '0x1g'".to_string(),
            })
        );
    }

    #[test]
    fn iterator_stops_after_eof() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("ret", &arena);
        assert!(lexer.next().is_some());
        assert!(matches!(lexer.next(), Some(Ok(t)) if t.kind == TokenKind::Eof));
        assert!(lexer.next().is_none());
    }
}
