//! Recursive-descent parser for chasm source.
//!
//! The source is lexed up front (fatal on the first lex error), then parsed
//! with single-token lookahead. Parsing is also fatal on the first error.
//!
//! ```text
//! module      := ( '$' pragma | 'method' method | 'object' object )* EOF
//! pragma      := IDENT ( '=' (STRING | INT | FLOAT | IDENT) )? ';'
//! method      := IDENT '<' ( type (',' type)* )? '>' ( 'void' | type ) '{' statement* '}'
//! object      := IDENT '{' ( '$' pragma | type (',' type)* )* '}'
//! type        := '*'* IDENT
//! ```
//!
//! Statement rules live in `stmt_parser.rs`.

use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;
use chasm_core::{ParseError, ParseErrorKind, Span};

use crate::ast::nodes::*;
use crate::lexer::{Lexer, Token, TokenKind};

/// Parser state over a fully lexed token buffer.
pub struct Parser<'ast> {
    tokens: Vec<Token<'ast>>,
    pos: usize,
    /// Returned by `peek` once the buffer is exhausted.
    eof: Token<'ast>,
    pub(crate) arena: &'ast Bump,
}

impl<'ast> Parser<'ast> {
    /// Parse a complete source file into a module allocated in `arena`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<Module<'ast>, ParseError> {
        let mut parser = Self::new(source, arena)?;
        parser.parse_module()
    }

    fn new(source: &str, arena: &'ast Bump) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        for token in Lexer::new(source, arena) {
            tokens.push(token?);
        }
        let eof = match tokens.last() {
            Some(last) if last.is(TokenKind::Eof) => *last,
            _ => Token::new(TokenKind::Eof, "", Span::point(1, 1)),
        };
        Ok(Self {
            tokens,
            pos: 0,
            eof,
            arena,
        })
    }

    // =========================================
    // Token helpers
    // =========================================

    pub(crate) fn peek(&self) -> &Token<'ast> {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token<'ast> {
        let token = *self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume a token of the given kind or fail.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = *self.peek();
        if token.is(TokenKind::Eof) {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedEof,
                token.span,
                format!("expected {}", kind.description()),
            ));
        }
        Err(ParseError::expected_token(
            token.span,
            kind.description(),
            &describe(&token),
        ))
    }

    pub(crate) fn expect_ident(&mut self) -> Result<Ident<'ast>, ParseError> {
        match self.eat(TokenKind::Identifier) {
            Some(token) => Ok(Ident::new(token.lexeme, token.span)),
            None => {
                let token = *self.peek();
                if token.is(TokenKind::Eof) {
                    return Err(ParseError::unexpected_eof(token.span));
                }
                Err(ParseError::expected_identifier(token.span, &describe(&token)))
            }
        }
    }

    /// Consume a closing brace, reporting `None` if the current token is not one.
    ///
    /// Hitting end of file while looking for it is an error.
    pub(crate) fn eat_closing_brace(&mut self) -> Result<Option<Token<'ast>>, ParseError> {
        if self.is_eof() {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedEof,
                self.peek().span,
                "expected '}'",
            ));
        }
        Ok(self.eat(TokenKind::RightBrace))
    }

    // =========================================
    // Declarations
    // =========================================

    fn parse_module(&mut self) -> Result<Module<'ast>, ParseError> {
        let mut items = BVec::new_in(self.arena);

        while !self.is_eof() {
            let token = *self.peek();
            let item = match token.kind {
                TokenKind::Dollar => {
                    self.advance();
                    Item::Pragma(self.parse_pragma(token.span)?)
                }
                TokenKind::Method => {
                    self.advance();
                    let method = self.parse_method(token.span)?;
                    Item::Method(self.arena.alloc(method))
                }
                TokenKind::Object => {
                    self.advance();
                    let object = self.parse_object(token.span)?;
                    Item::Object(self.arena.alloc(object))
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        token.span,
                        format!("expected pragma, method, or object, found {}", describe(&token)),
                    ));
                }
            };
            items.push(item);
        }

        Ok(Module {
            items: items.into_bump_slice(),
        })
    }

    /// Parse a pragma after its `$`.
    pub(crate) fn parse_pragma(&mut self, start: Span) -> Result<Pragma<'ast>, ParseError> {
        let key = self.expect_ident()?;
        let arg = if self.eat(TokenKind::Equal).is_some() {
            Some(self.parse_literal()?)
        } else {
            None
        };
        let end = self.expect(TokenKind::Semicolon)?;
        Ok(Pragma {
            key,
            arg,
            span: start.merge(end.span),
        })
    }

    /// Parse a method after the `method` keyword.
    fn parse_method(&mut self, start: Span) -> Result<Method<'ast>, ParseError> {
        let name = self.expect_ident()?;

        self.expect(TokenKind::Less)?;
        let mut params = BVec::new_in(self.arena);
        if !self.check(TokenKind::Greater) {
            params.push(self.parse_type()?);
            while self.eat(TokenKind::Comma).is_some() {
                params.push(self.parse_type()?);
            }
        }
        self.expect(TokenKind::Greater)?;

        let return_type = if self.eat(TokenKind::Void).is_some() {
            None
        } else {
            Some(self.parse_type()?)
        };

        self.expect(TokenKind::LeftBrace)?;
        let mut body = BVec::new_in(self.arena);
        let end = loop {
            if let Some(end) = self.eat_closing_brace()? {
                break end;
            }
            body.push(self.parse_statement()?);
        };

        Ok(Method {
            name,
            params: params.into_bump_slice(),
            return_type,
            body: body.into_bump_slice(),
            span: start.merge(end.span),
        })
    }

    /// Parse an object after the `object` keyword.
    fn parse_object(&mut self, start: Span) -> Result<Object<'ast>, ParseError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut fields = BVec::new_in(self.arena);
        let mut pragmas = BVec::new_in(self.arena);
        let end = loop {
            if let Some(end) = self.eat_closing_brace()? {
                break end;
            }
            if let Some(dollar) = self.eat(TokenKind::Dollar) {
                pragmas.push(self.parse_pragma(dollar.span)?);
                continue;
            }
            fields.push(self.parse_type()?);
            while self.eat(TokenKind::Comma).is_some() {
                fields.push(self.parse_type()?);
            }
        };

        Ok(Object {
            name,
            fields: fields.into_bump_slice(),
            pragmas: pragmas.into_bump_slice(),
            span: start.merge(end.span),
        })
    }

    /// Parse a type reference: `'*'* IDENT`.
    pub(crate) fn parse_type(&mut self) -> Result<TypeRef<'ast>, ParseError> {
        let start = self.peek().span;
        let mut depth = 0u32;
        while self.eat(TokenKind::Star).is_some() {
            depth += 1;
        }
        if !self.check(TokenKind::Identifier) {
            let token = *self.peek();
            return Err(ParseError::expected_type(token.span, &describe(&token)));
        }
        let name = self.expect_ident()?;
        Ok(TypeRef {
            name,
            depth,
            span: start.merge(name.span),
        })
    }

    /// Parse a pragma or instruction argument.
    pub(crate) fn parse_literal(&mut self) -> Result<Literal<'ast>, ParseError> {
        let token = *self.peek();
        let kind = match token.kind {
            TokenKind::IntLiteral => LiteralKind::Int(parse_int(&token)?),
            TokenKind::BitsLiteral => LiteralKind::Bits(parse_bits(&token)?),
            TokenKind::FloatLiteral => LiteralKind::Float(parse_float(&token)?),
            TokenKind::StringLiteral => LiteralKind::String(token.lexeme),
            TokenKind::Identifier => LiteralKind::Ident(token.lexeme),
            TokenKind::Eof => return Err(ParseError::unexpected_eof(token.span)),
            _ => {
                return Err(ParseError::expected_token(
                    token.span,
                    "literal or identifier",
                    &describe(&token),
                ));
            }
        };
        self.advance();
        Ok(Literal {
            kind,
            span: token.span,
        })
    }
}

/// Describe a token for "found ..." messages.
pub(crate) fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Identifier | TokenKind::IntLiteral | TokenKind::BitsLiteral | TokenKind::FloatLiteral => {
            format!("{} '{}'", token.kind.description(), token.lexeme)
        }
        kind => kind.description().to_string(),
    }
}

fn invalid_literal(token: &Token<'_>, detail: &str) -> ParseError {
    ParseError::new(
        ParseErrorKind::InvalidLiteral,
        token.span,
        format!("{} '{}': {detail}", token.kind.description(), token.lexeme),
    )
}

fn parse_int(token: &Token<'_>) -> Result<i128, ParseError> {
    token
        .lexeme
        .parse::<i128>()
        .map_err(|e| invalid_literal(token, &e.to_string()))
}

fn parse_bits(token: &Token<'_>) -> Result<i128, ParseError> {
    let (negative, text) = match token.lexeme.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.lexeme),
    };
    let (radix, digits) = match text.get(..2) {
        Some("0x" | "0X") => (16, &text[2..]),
        Some("0b" | "0B") => (2, &text[2..]),
        _ => return Err(invalid_literal(token, "missing radix prefix")),
    };
    let value = i128::from_str_radix(digits, radix).map_err(|e| invalid_literal(token, &e.to_string()))?;
    Ok(if negative { -value } else { value })
}

fn parse_float(token: &Token<'_>) -> Result<f64, ParseError> {
    let value = token
        .lexeme
        .parse::<f64>()
        .map_err(|e| invalid_literal(token, &e.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid_literal(token, "value is not finite"))
    }
}
