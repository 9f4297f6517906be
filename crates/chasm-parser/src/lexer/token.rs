//! Token types and definitions for the chasm lexer.

use chasm_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The `'ast` lifetime refers to the arena where the lexeme string is allocated.
/// For string literals the lexeme is the unescaped content without quotes;
/// for everything else it is the source text.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    /// The type of token.
    pub kind: TokenKind,
    /// The text of this token (allocated in arena).
    pub lexeme: &'ast str,
    /// Location in source.
    pub span: Span,
}

impl<'ast> Token<'ast> {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    /// Whether this token has the given kind.
    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All token types of the assembler language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Decimal integer literal: `42`, `-7`
    IntLiteral,
    /// Raw-bits literal: `0xFF`, `0b1010`
    BitsLiteral,
    /// Float literal: `3.14`, `-0.5`
    FloatLiteral,
    /// String literal: `"hello\n"`
    StringLiteral,

    // =========================================
    // Identifiers and keywords
    // =========================================
    /// Identifier, including opcode mnemonics.
    Identifier,
    Method,
    Object,
    Try,
    Except,
    Void,

    // =========================================
    // Punctuation
    // =========================================
    LeftBrace,
    RightBrace,
    Less,
    Greater,
    Semicolon,
    Comma,
    Colon,
    Equal,
    Star,
    At,
    Dollar,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Check if this token is a keyword.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Method | TokenKind::Object | TokenKind::Try | TokenKind::Except | TokenKind::Void
        )
    }

    /// Check if this token is a literal.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::BitsLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
        )
    }

    /// A description of this token kind for error messages.
    pub fn description(self) -> &'static str {
        match self {
            TokenKind::IntLiteral => "integer literal",
            TokenKind::BitsLiteral => "bits literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Identifier => "identifier",
            TokenKind::Method => "'method'",
            TokenKind::Object => "'object'",
            TokenKind::Try => "'try'",
            TokenKind::Except => "'except'",
            TokenKind::Void => "'void'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Equal => "'='",
            TokenKind::Star => "'*'",
            TokenKind::At => "'@'",
            TokenKind::Dollar => "'$'",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Look up a keyword by its text.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "method" => TokenKind::Method,
        "object" => TokenKind::Object,
        "try" => TokenKind::Try,
        "except" => TokenKind::Except,
        "void" => TokenKind::Void,
        _ => return None,
    })
}
