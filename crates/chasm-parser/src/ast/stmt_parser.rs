//! Statement parsing for method bodies.
//!
//! ```text
//! statement   := '$' pragma | '@' IDENT ':' | 'try' try | OPCODE argument? ';'
//! try         := '{' statement* '}' except+
//! except      := 'except' IDENT '{' statement* '}'
//! ```

use bumpalo::collections::Vec as BVec;
use chasm_core::{OpCode, ParseError, ParseErrorKind, Span};

use super::parser::{Parser, describe};
use crate::ast::nodes::*;
use crate::lexer::TokenKind;

impl<'ast> Parser<'ast> {
    /// Parse one statement of a method body.
    pub fn parse_statement(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let token = *self.peek();

        match token.kind {
            TokenKind::Dollar => {
                self.advance();
                Ok(Stmt::Pragma(self.parse_pragma(token.span)?))
            }
            TokenKind::At => self.parse_label(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Identifier => self.parse_instruction(),
            TokenKind::Eof => Err(ParseError::unexpected_eof(token.span)),
            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedStatement,
                token.span,
                format!("expected pragma, label, try, or instruction, found {}", describe(&token)),
            )),
        }
    }

    /// `'@' IDENT ':'`
    fn parse_label(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let at = self.expect(TokenKind::At)?;
        let name = self.expect_ident()?;
        let colon = self.expect(TokenKind::Colon)?;
        Ok(Stmt::Label(Ident::new(name.name, at.span.merge(colon.span))))
    }

    /// `'{' statement* '}'`, returning the statements and the closing brace span.
    fn parse_block(&mut self) -> Result<(&'ast [Stmt<'ast>], Span), ParseError> {
        self.expect(TokenKind::LeftBrace)?;
        let mut body = BVec::new_in(self.arena);
        loop {
            if let Some(end) = self.eat_closing_brace()? {
                return Ok((body.into_bump_slice(), end.span));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_try(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Try)?.span;
        let (body, _) = self.parse_block()?;

        let mut handlers = BVec::new_in(self.arena);
        while let Some(except) = self.eat(TokenKind::Except) {
            let exception = self.expect_ident()?;
            let (handler_body, end) = self.parse_block()?;
            handlers.push(ExceptClause {
                exception,
                body: handler_body,
                span: except.span.merge(end),
            });
        }

        let end = match handlers.last() {
            Some(last) => last.span,
            None => {
                let token = *self.peek();
                return Err(ParseError::new(
                    ParseErrorKind::MissingHandler,
                    token.span,
                    format!("try block needs at least one except handler, found {}", describe(&token)),
                ));
            }
        };

        let stmt = self.arena.alloc(TryStmt {
            body,
            handlers: handlers.into_bump_slice(),
            span: start.merge(end),
        });
        Ok(Stmt::Try(stmt))
    }

    /// `OPCODE argument? ';'`
    fn parse_instruction(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let mnemonic = self.expect_ident()?;
        let Some(opcode) = OpCode::from_mnemonic(mnemonic.name) else {
            return Err(ParseError::new(
                ParseErrorKind::UnknownOpcode,
                mnemonic.span,
                format!("'{}' is not an instruction", mnemonic.name),
            ));
        };

        let arg = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_literal()?)
        };
        let end = self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Instruction(InstructionStmt {
            opcode,
            mnemonic,
            arg,
            span: mnemonic.span.merge(end.span),
        }))
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;

    use super::*;

    fn body<'ast>(source: &str, arena: &'ast Bump) -> &'ast [Stmt<'ast>] {
        let wrapped = format!("method m<>void {{\n{source}\n}}");
        let module = Parser::parse(&wrapped, arena).unwrap();
        module.methods().next().unwrap().body
    }

    fn body_err(source: &str) -> ParseError {
        let arena = Bump::new();
        let wrapped = format!("method m<>void {{\n{source}\n}}");
        Parser::parse(&wrapped, &arena).unwrap_err()
    }

    #[test]
    fn instructions_with_and_without_arguments() {
        let arena = Bump::new();
        let stmts = body("psh_b 5; add_q; ldsc \"hi\";", &arena);
        assert_eq!(stmts.len(), 3);
        let Stmt::Instruction(psh) = stmts[0] else {
            panic!("expected instruction");
        };
        assert_eq!(psh.opcode, OpCode::PshB);
        assert_eq!(psh.arg.map(|a| a.kind), Some(LiteralKind::Int(5)));
        assert_eq!(psh.span, Span::new(2, 1, 8));
        let Stmt::Instruction(add) = stmts[1] else {
            panic!("expected instruction");
        };
        assert_eq!(add.opcode, OpCode::AddQ);
        assert!(add.arg.is_none());
        let Stmt::Instruction(ldsc) = stmts[2] else {
            panic!("expected instruction");
        };
        assert_eq!(ldsc.arg.map(|a| a.kind), Some(LiteralKind::String("hi")));
    }

    #[test]
    fn labels_and_pragmas() {
        let arena = Bump::new();
        let stmts = body("$limstack = 2;\n@loop:\njmp loop;", &arena);
        assert!(matches!(stmts[0], Stmt::Pragma(p) if p.key.name == "limstack"));
        assert!(matches!(stmts[1], Stmt::Label(l) if l.name == "loop"));
        assert!(matches!(
            stmts[2],
            Stmt::Instruction(i) if i.opcode == OpCode::Jmp
                && i.arg.map(|a| a.kind) == Some(LiteralKind::Ident("loop"))
        ));
    }

    #[test]
    fn try_with_handlers() {
        let arena = Bump::new();
        let stmts = body(
            "try { call \"risky\"; } except io_error { pop; } except any { pop; pop; }",
            &arena,
        );
        let Stmt::Try(try_stmt) = stmts[0] else {
            panic!("expected try");
        };
        assert_eq!(try_stmt.body.len(), 1);
        assert_eq!(try_stmt.handlers.len(), 2);
        assert_eq!(try_stmt.handlers[0].exception.name, "io_error");
        assert_eq!(try_stmt.handlers[1].body.len(), 2);
    }

    #[test]
    fn nested_try() {
        let arena = Bump::new();
        let stmts = body("try { try { nop; } except a { } } except b { }", &arena);
        let Stmt::Try(outer) = stmts[0] else {
            panic!("expected try");
        };
        assert!(matches!(outer.body[0], Stmt::Try(inner) if inner.handlers[0].exception.name == "a"));
    }

    #[test]
    fn try_without_handler() {
        let err = body_err("try { nop; } ret;");
        assert_eq!(err.kind, ParseErrorKind::MissingHandler);
    }

    #[test]
    fn unknown_opcode() {
        let err = body_err("push 5;");
        assert_eq!(err.kind, ParseErrorKind::UnknownOpcode);
        assert_eq!(err.span, Span::new(2, 1, 4));
    }

    #[test]
    fn missing_semicolon() {
        let err = body_err("psh_b 5 ret;");
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
    }

    #[test]
    fn statement_cannot_start_with_literal() {
        let err = body_err("5;");
        assert_eq!(err.kind, ParseErrorKind::ExpectedStatement);
    }
}
