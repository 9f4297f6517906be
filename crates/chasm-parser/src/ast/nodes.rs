//! AST nodes for chasm source.
//!
//! All nodes are `Copy` and borrow their children and text from the parse
//! arena. The tree mirrors the source: a module holds pragmas, methods and
//! objects; a method body holds pragmas, labels, try blocks and
//! instructions.

use std::fmt;

use chasm_core::{OpCode, Span};

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A parsed source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Module<'ast> {
    /// Top-level declarations in source order.
    pub items: &'ast [Item<'ast>],
}

impl<'ast> Module<'ast> {
    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &'ast Method<'ast>> + 'ast {
        self.items.iter().filter_map(|item| match item {
            Item::Method(m) => Some(*m),
            _ => None,
        })
    }

    /// Objects in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = &'ast Object<'ast>> + 'ast {
        self.items.iter().filter_map(|item| match item {
            Item::Object(o) => Some(*o),
            _ => None,
        })
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    Pragma(Pragma<'ast>),
    Method(&'ast Method<'ast>),
    Object(&'ast Object<'ast>),
}

impl Item<'_> {
    pub fn span(&self) -> Span {
        match self {
            Item::Pragma(p) => p.span,
            Item::Method(m) => m.span,
            Item::Object(o) => o.span,
        }
    }
}

/// `$key;` or `$key = value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pragma<'ast> {
    pub key: Ident<'ast>,
    pub arg: Option<Literal<'ast>>,
    pub span: Span,
}

/// A type reference: a base name behind zero or more `*` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'ast> {
    pub name: Ident<'ast>,
    /// Number of leading `*` markers.
    pub depth: u32,
    pub span: Span,
}

/// Renders the type glob: `depth` stars followed by the name.
impl fmt::Display for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("*")?;
        }
        f.write_str(self.name.name)
    }
}

/// `method name<params> rtype { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Method<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [TypeRef<'ast>],
    /// `None` for `void`.
    pub return_type: Option<TypeRef<'ast>>,
    pub body: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// `object name { fields }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Object<'ast> {
    pub name: Ident<'ast>,
    pub fields: &'ast [TypeRef<'ast>],
    /// Pragmas written inside the object body.
    pub pragmas: &'ast [Pragma<'ast>],
    pub span: Span,
}

/// A statement inside a method body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    Pragma(Pragma<'ast>),
    /// `@name:`
    Label(Ident<'ast>),
    Try(&'ast TryStmt<'ast>),
    Instruction(InstructionStmt<'ast>),
}

impl Stmt<'_> {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Pragma(p) => p.span,
            Stmt::Label(l) => l.span,
            Stmt::Try(t) => t.span,
            Stmt::Instruction(i) => i.span,
        }
    }
}

/// `try { body } except E { ... } ...`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TryStmt<'ast> {
    pub body: &'ast [Stmt<'ast>],
    /// Never empty.
    pub handlers: &'ast [ExceptClause<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExceptClause<'ast> {
    /// The exception type name.
    pub exception: Ident<'ast>,
    pub body: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// `opcode arg?;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstructionStmt<'ast> {
    pub opcode: OpCode,
    /// The mnemonic as written, for diagnostics.
    pub mnemonic: Ident<'ast>,
    pub arg: Option<Literal<'ast>>,
    pub span: Span,
}

/// A pragma or instruction argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Literal<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    /// Decimal integer.
    Int(i128),
    /// `0x`/`0b` integer. Float operands reinterpret these as raw bits.
    Bits(i128),
    Float(f64),
    /// Unescaped string content.
    String(&'ast str),
    Ident(&'ast str),
}

impl LiteralKind<'_> {
    /// A description of this literal kind for error messages.
    pub fn description(&self) -> &'static str {
        match self {
            LiteralKind::Int(_) => "integer literal",
            LiteralKind::Bits(_) => "bits literal",
            LiteralKind::Float(_) => "float literal",
            LiteralKind::String(_) => "string literal",
            LiteralKind::Ident(_) => "identifier",
        }
    }
}

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::Int(v) => write!(f, "{v}"),
            LiteralKind::Bits(v) if v < 0 => write!(f, "-{:#x}", v.unsigned_abs()),
            LiteralKind::Bits(v) => write!(f, "{v:#x}"),
            LiteralKind::Float(v) => write!(f, "{v:?}"),
            LiteralKind::String(s) => write!(f, "{s:?}"),
            LiteralKind::Ident(s) => f.write_str(s),
        }
    }
}
