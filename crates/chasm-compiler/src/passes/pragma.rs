//! Pragma tables and argument parsing.
//!
//! Each scope has a table of recognized pragma keys. Only methods recognize
//! any today; module and object pragmas are rejected by the main pass.

use chasm_core::{CompilationError, Number, Width};
use chasm_parser::ast::{LiteralKind, Pragma};

use crate::intern::Interner;
use crate::ir::PragmaSettings;
use crate::passes::operand::reinterpret_bits;

/// The literal kind a pragma argument must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Identifier,
    Integer,
    Float,
    String,
}

impl ValueKind {
    fn description(self) -> &'static str {
        match self {
            ValueKind::Identifier => "an identifier",
            ValueKind::Integer => "an integer",
            ValueKind::Float => "a float",
            ValueKind::String => "a string",
        }
    }
}

/// Whether a pragma takes an argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgPolicy {
    /// No argument; the pragma acts as a flag.
    Forbidden,
    /// The default is used when no argument is given.
    Optional(PragmaValue),
    Required,
}

/// The setting a pragma writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PragmaTarget {
    DebugSymbol,
    StackLimit,
    LocalLimit,
}

/// A parsed pragma argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PragmaValue {
    Flag(bool),
    Number(Number),
    /// String-table index of an identifier or string argument.
    Interned(u32),
}

/// One recognized pragma key.
#[derive(Debug, Clone, Copy)]
pub struct PragmaSpec {
    pub key: &'static str,
    pub kind: ValueKind,
    pub width: Option<Width>,
    pub policy: ArgPolicy,
    pub target: PragmaTarget,
}

/// Pragmas recognized inside a method body.
pub const METHOD_PRAGMAS: &[PragmaSpec] = &[
    PragmaSpec {
        key: "debugsym",
        kind: ValueKind::String,
        width: None,
        policy: ArgPolicy::Required,
        target: PragmaTarget::DebugSymbol,
    },
    PragmaSpec {
        key: "limstack",
        kind: ValueKind::Integer,
        width: Some(Width::U8),
        policy: ArgPolicy::Required,
        target: PragmaTarget::StackLimit,
    },
    PragmaSpec {
        key: "limlocal",
        kind: ValueKind::Integer,
        width: Some(Width::U8),
        policy: ArgPolicy::Required,
        target: PragmaTarget::LocalLimit,
    },
];

/// Look up a key in a scope's table.
pub fn lookup<'a>(table: &'a [PragmaSpec], key: &str) -> Option<&'a PragmaSpec> {
    table.iter().find(|spec| spec.key == key)
}

impl PragmaSpec {
    /// Check the argument policy and parse the argument.
    pub fn evaluate(&self, pragma: &Pragma<'_>, interner: &mut Interner) -> Result<PragmaValue, CompilationError> {
        let name = || pragma.key.name.to_string();
        match (pragma.arg, self.policy) {
            (Some(_), ArgPolicy::Forbidden) => Err(CompilationError::PragmaArgumentForbidden {
                name: name(),
                span: pragma.span,
            }),
            (None, ArgPolicy::Required) => Err(CompilationError::PragmaArgumentRequired {
                name: name(),
                span: pragma.span,
            }),
            (None, ArgPolicy::Forbidden) => Ok(PragmaValue::Flag(true)),
            (None, ArgPolicy::Optional(default)) => Ok(default),
            (Some(arg), _) => {
                let kind_error = || CompilationError::PragmaArgumentKind {
                    name: name(),
                    expected: self.kind.description(),
                    found: arg.kind.description().to_string(),
                    span: arg.span,
                };
                let value = match (self.kind, arg.kind) {
                    (ValueKind::Identifier | ValueKind::String, LiteralKind::Ident(s) | LiteralKind::String(s)) => {
                        return Ok(PragmaValue::Interned(interner.intern_string(s, arg.span)?));
                    }
                    (ValueKind::Integer, LiteralKind::Int(v) | LiteralKind::Bits(v)) => Number::Int(v),
                    (ValueKind::Float, LiteralKind::Int(v)) => Number::Float(v as f64),
                    (ValueKind::Float, LiteralKind::Bits(v)) => {
                        Number::Float(reinterpret_bits(v, self.width.unwrap_or(Width::F64), arg.span)?)
                    }
                    (ValueKind::Float, LiteralKind::Float(v)) => Number::Float(v),
                    _ => return Err(kind_error()),
                };
                let value = match self.width {
                    Some(width) => width
                        .restrict(value)
                        .map_err(|source| CompilationError::ValueOutOfRange { source, span: arg.span })?,
                    None => value,
                };
                Ok(PragmaValue::Number(value))
            }
        }
    }

    /// Store an evaluated value into the method's settings.
    pub fn apply(&self, value: PragmaValue, settings: &mut PragmaSettings) -> Result<(), CompilationError> {
        let mismatch = || CompilationError::internal(format!("pragma '{}' produced {value:?}", self.key));
        match (self.target, value) {
            (PragmaTarget::DebugSymbol, PragmaValue::Interned(idx)) => {
                settings.debug_symbol = idx;
                settings.debug_enabled = true;
            }
            (PragmaTarget::StackLimit, PragmaValue::Number(Number::Int(v))) => {
                settings.stack_limit = u8::try_from(v).map_err(|_| mismatch())?;
            }
            (PragmaTarget::LocalLimit, PragmaValue::Number(Number::Int(v))) => {
                settings.local_limit = u8::try_from(v).map_err(|_| mismatch())?;
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chasm_core::Span;
    use chasm_parser::ast::{Ident, Literal};

    use super::*;

    fn pragma(key: &'static str, arg: Option<LiteralKind<'static>>) -> Pragma<'static> {
        Pragma {
            key: Ident::new(key, Span::new(1, 2, key.len() as u32)),
            arg: arg.map(|kind| Literal {
                kind,
                span: Span::new(1, 20, 3),
            }),
            span: Span::new(1, 1, 24),
        }
    }

    fn run(key: &'static str, arg: Option<LiteralKind<'static>>) -> Result<PragmaSettings, CompilationError> {
        let mut interner = Interner::new();
        let mut settings = PragmaSettings::default();
        let spec = lookup(METHOD_PRAGMAS, key).unwrap();
        let value = spec.evaluate(&pragma(key, arg), &mut interner)?;
        spec.apply(value, &mut settings)?;
        Ok(settings)
    }

    #[test]
    fn limstack_sets_stack_limit() {
        let settings = run("limstack", Some(LiteralKind::Int(16))).unwrap();
        assert_eq!(settings.stack_limit, 16);
        assert_eq!(settings.local_limit, 0);
    }

    #[test]
    fn limlocal_is_width_checked() {
        let err = run("limlocal", Some(LiteralKind::Int(256))).unwrap_err();
        assert!(matches!(err, CompilationError::ValueOutOfRange { .. }));
        assert_eq!(err.span(), Span::new(1, 20, 3));
    }

    #[test]
    fn debugsym_interns_and_enables() {
        let settings = run("debugsym", Some(LiteralKind::String("main.csm"))).unwrap();
        assert_eq!(settings.debug_symbol, 0);
        assert!(settings.debug_enabled);
    }

    #[test]
    fn required_argument_missing() {
        let err = run("limstack", None).unwrap_err();
        assert!(matches!(err, CompilationError::PragmaArgumentRequired { .. }));
    }

    #[test]
    fn wrong_argument_kind() {
        let err = run("limstack", Some(LiteralKind::String("four"))).unwrap_err();
        assert!(matches!(
            err,
            CompilationError::PragmaArgumentKind { expected: "an integer", .. }
        ));
    }

    #[test]
    fn forbidden_and_optional_policies() {
        let mut interner = Interner::new();
        let flag = PragmaSpec {
            key: "flag",
            kind: ValueKind::Identifier,
            width: None,
            policy: ArgPolicy::Forbidden,
            target: PragmaTarget::DebugSymbol,
        };
        assert_eq!(
            flag.evaluate(&pragma("flag", None), &mut interner),
            Ok(PragmaValue::Flag(true))
        );
        let err = flag
            .evaluate(&pragma("flag", Some(LiteralKind::Ident("x"))), &mut interner)
            .unwrap_err();
        assert!(matches!(err, CompilationError::PragmaArgumentForbidden { .. }));

        let optional = PragmaSpec {
            policy: ArgPolicy::Optional(PragmaValue::Number(Number::Int(8))),
            kind: ValueKind::Integer,
            ..flag
        };
        assert_eq!(
            optional.evaluate(&pragma("flag", None), &mut interner),
            Ok(PragmaValue::Number(Number::Int(8)))
        );
    }

    #[test]
    fn float_pragmas_read_bits_as_ieee754() {
        let mut interner = Interner::new();
        let ratio = PragmaSpec {
            key: "ratio",
            kind: ValueKind::Float,
            width: Some(Width::F32),
            policy: ArgPolicy::Required,
            target: PragmaTarget::StackLimit,
        };
        assert_eq!(
            ratio.evaluate(&pragma("ratio", Some(LiteralKind::Bits(0x3fc0_0000))), &mut interner),
            Ok(PragmaValue::Number(Number::Float(1.5)))
        );
        assert_eq!(
            ratio.evaluate(&pragma("ratio", Some(LiteralKind::Int(2))), &mut interner),
            Ok(PragmaValue::Number(Number::Float(2.0)))
        );
        let err = ratio
            .evaluate(&pragma("ratio", Some(LiteralKind::Bits(0x7f80_0000))), &mut interner)
            .unwrap_err();
        assert!(matches!(err, CompilationError::ValueOutOfRange { .. }));

        let wide = PragmaSpec { width: None, ..ratio };
        assert_eq!(
            wide.evaluate(&pragma("ratio", Some(LiteralKind::Bits(0x4000_0000_0000_0000))), &mut interner),
            Ok(PragmaValue::Number(Number::Float(2.0)))
        );
    }

    #[test]
    fn lookup_borrows_from_the_table() {
        let spec = lookup(METHOD_PRAGMAS, "limlocal").unwrap();
        assert!(std::ptr::eq(spec, &METHOD_PRAGMAS[2]));
        assert_eq!(spec.target, PragmaTarget::LocalLimit);
    }

    #[test]
    fn unknown_key() {
        assert!(lookup(METHOD_PRAGMAS, "inline").is_none());
    }
}
