//! Unified error types for the chasm assembler.
//!
//! Every phase of assembly reports failures through one of the types below.
//! All of them are fatal: a run stops at the first error and produces no
//! output.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ChasmError (top-level wrapper)
//! ├── LexError         - Tokenization errors
//! ├── ParseError       - Parser errors (with ParseErrorKind)
//! └── CompilationError - Main pass, backpatching and emission errors
//!     └── WidthError   - Fixed-width numeric domain errors
//! ```
//!
//! [`DecodeError`] is separate; it is produced when reading an instruction
//! stream back, never while assembling.

use thiserror::Error;

use crate::{Number, Span, Width};

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during lexical analysis (tokenization).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    /// A string literal was not properly terminated.
    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    /// A string literal contains an unknown escape sequence.
    #[error("invalid escape sequence '\\{ch}' at {span}")]
    InvalidEscape { ch: char, span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::InvalidEscape { span, .. } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of file.
    UnexpectedEof,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// A type was expected.
    ExpectedType,
    /// A statement was expected.
    ExpectedStatement,
    /// A top-level declaration was expected.
    ExpectedDeclaration,
    /// An identifier in opcode position is not a known mnemonic.
    UnknownOpcode,
    /// A try block has no except handlers.
    MissingHandler,
    /// A literal value could not be parsed.
    InvalidLiteral,
    /// A lexer error surfaced while parsing.
    InvalidToken,
}

impl ParseErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::UnknownOpcode => "unknown opcode",
            ParseErrorKind::MissingHandler => "missing except handler",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::InvalidToken => "invalid token",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "unexpected token" error.
    pub fn unexpected_token(span: Span, token: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            format!("unexpected token: {token}"),
        )
    }

    /// Create an "unexpected EOF" error.
    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedEof,
            span,
            "unexpected end of file".to_string(),
        )
    }

    /// Create an "expected identifier" error.
    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    /// Create an "expected type" error.
    pub fn expected_type(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedType,
            span,
            format!("expected type, found {found}"),
        )
    }

    /// Format the error with source context for display.
    pub fn display_with_source(&self, source: &str) -> String {
        render_with_source(&self.kind.to_string(), &self.message, self.span, source)
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ParseErrorKind::InvalidToken, err.span(), err.to_string())
    }
}

// ============================================================================
// Width Errors
// ============================================================================

/// Errors from the fixed-width numeric domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WidthError {
    /// A width tag that names none of the fixed widths.
    #[error("unknown width '{0}'")]
    UnknownWidth(String),

    /// A value outside the bounds of its width.
    #[error("value {value} out of range for {width} ({min}..={max})", min = .width.min(), max = .width.max())]
    OutOfRange { value: Number, width: Width },

    /// A float given where an integer width is required.
    #[error("value {value} is not an integer, {width} requires one")]
    NotInteger { value: Number, width: Width },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors raised by the main pass, backpatching, and emission.
///
/// Everything except [`CompilationError::Internal`] is caused by the input
/// program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A pragma key the enclosing scope does not recognize.
    #[error("at {span}: unknown pragma '{name}'")]
    UnknownPragma { name: String, span: Span },

    /// A pragma that takes no argument was given one.
    #[error("at {span}: pragma '{name}' does not take an argument")]
    PragmaArgumentForbidden { name: String, span: Span },

    /// A pragma that requires an argument was given none.
    #[error("at {span}: pragma '{name}' requires an argument")]
    PragmaArgumentRequired { name: String, span: Span },

    /// A pragma argument of the wrong literal kind.
    #[error("at {span}: pragma '{name}' expects {expected}, found {found}")]
    PragmaArgumentKind {
        name: String,
        expected: &'static str,
        found: String,
        span: Span,
    },

    /// Pragmas outside a method body are not implemented.
    #[error("at {span}: pragma '{name}' is not supported in {scope} scope")]
    UnsupportedPragmaScope {
        name: String,
        scope: &'static str,
        span: Span,
    },

    /// A literal that does not fit its declared width.
    #[error("at {span}: {source}")]
    ValueOutOfRange { source: WidthError, span: Span },

    /// An argument given to an opcode that takes none.
    #[error("at {span}: '{opcode}' does not take an argument")]
    UnexpectedArgument { opcode: String, span: Span },

    /// An opcode that requires an argument was given none.
    #[error("at {span}: '{opcode}' requires an argument")]
    MissingArgument { opcode: String, span: Span },

    /// An argument of the wrong literal kind for its opcode.
    #[error("at {span}: '{opcode}' expects {expected}, found {found}")]
    InvalidArgument {
        opcode: String,
        expected: &'static str,
        found: String,
        span: Span,
    },

    /// A label defined twice in the same method.
    #[error("at {span}: duplicate label '{name}'")]
    DuplicateLabel { name: String, span: Span },

    /// A jump to a label not defined in the enclosing method.
    #[error("at {span}: unresolved jump to label '{label}'")]
    UnresolvedJump { label: String, span: Span },

    /// An offset or count that does not fit in 32 bits.
    #[error("at {span}: {what} exceeds the 32-bit limit")]
    TooLarge { what: &'static str, span: Span },

    /// Internal invariant violation: a pass ran out of order.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownPragma { span, .. } => *span,
            CompilationError::PragmaArgumentForbidden { span, .. } => *span,
            CompilationError::PragmaArgumentRequired { span, .. } => *span,
            CompilationError::PragmaArgumentKind { span, .. } => *span,
            CompilationError::UnsupportedPragmaScope { span, .. } => *span,
            CompilationError::ValueOutOfRange { span, .. } => *span,
            CompilationError::UnexpectedArgument { span, .. } => *span,
            CompilationError::MissingArgument { span, .. } => *span,
            CompilationError::InvalidArgument { span, .. } => *span,
            CompilationError::DuplicateLabel { span, .. } => *span,
            CompilationError::UnresolvedJump { span, .. } => *span,
            CompilationError::TooLarge { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    /// Create an internal-invariant error.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }

    /// Whether this is a pipeline bug rather than a problem in the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, CompilationError::Internal { .. })
    }
}

// ============================================================================
// Decode Errors
// ============================================================================

/// Errors from reading a raw instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A byte that is not an opcode.
    #[error("unknown opcode byte {byte:#04x} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    /// The stream ends inside an immediate.
    #[error("truncated immediate for '{opcode}' at offset {offset}")]
    Truncated { opcode: &'static str, offset: usize },
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Any error from assembling a source file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChasmError {
    /// A lexer error.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A parse error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A compilation error.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}

impl ChasmError {
    /// Check if this is a lexer error.
    pub fn is_lex(&self) -> bool {
        matches!(self, ChasmError::Lex(_))
    }

    /// Check if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, ChasmError::Parse(_))
    }

    /// Check if this is a compilation error.
    pub fn is_compilation(&self) -> bool {
        matches!(self, ChasmError::Compilation(_))
    }

    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ChasmError::Lex(e) => e.span(),
            ChasmError::Parse(e) => e.span,
            ChasmError::Compilation(e) => e.span(),
        }
    }

    /// Format the error with source context for display.
    pub fn display_with_source(&self, source: &str) -> String {
        match self {
            ChasmError::Parse(e) => e.display_with_source(source),
            ChasmError::Lex(e) => render_with_source("lex error", &e.to_string(), e.span(), source),
            ChasmError::Compilation(e) if e.is_internal() => format!("{e}\n"),
            ChasmError::Compilation(e) => {
                render_with_source("compilation error", &e.to_string(), e.span(), source)
            }
        }
    }
}

/// Render a header, a message, and the source line under `span` with a caret.
fn render_with_source(header: &str, message: &str, span: Span, source: &str) -> String {
    let mut output = format!("Error at {}:{}: {}\n", span.line, span.col, header);

    if !message.is_empty() {
        output.push_str(&format!("  {message}\n"));
    }

    let line_text = (span.line > 0)
        .then(|| source.lines().nth(span.line as usize - 1))
        .flatten();
    if let Some(line_text) = line_text {
        output.push_str("  |\n");
        output.push_str(&format!("{:>3} | {}\n", span.line, line_text));

        let indent = " ".repeat(span.col.saturating_sub(1) as usize);
        let pointer = if span.len <= 1 {
            "^".to_string()
        } else {
            "^".to_string() + &"~".repeat((span.len - 1) as usize)
        };
        output.push_str(&format!("  | {indent}{pointer}\n"));
    }

    output
}
