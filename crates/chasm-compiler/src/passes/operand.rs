//! Instruction argument validation and encoding.
//!
//! The opcode's [`Family`](chasm_core::Family) decides what argument is accepted and how it is
//! encoded. Jump opcodes keep their label name for backpatching; interned
//! opcodes store a table index instead of the literal.

use chasm_core::{CompilationError, InternKind, Number, Span, Width, WidthError};
use chasm_parser::ast::{Ident, InstructionStmt, Literal, LiteralKind};

use crate::intern::Interner;
use crate::ir::Immediate;

/// An encoded argument, or a label still to be resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'ast> {
    Immediate(Immediate),
    Jump(Ident<'ast>),
}

/// Validate and encode the argument of `instr`.
pub fn encode_operand<'ast>(
    instr: &InstructionStmt<'ast>,
    interner: &mut Interner,
) -> Result<Operand<'ast>, CompilationError> {
    let op = instr.opcode;

    let Some(width) = op.family().width() else {
        return match instr.arg {
            Some(_) => Err(CompilationError::UnexpectedArgument {
                opcode: op.mnemonic().to_string(),
                span: instr.span,
            }),
            None => Ok(Operand::Immediate(Immediate::None)),
        };
    };

    let Some(arg) = instr.arg else {
        return Err(CompilationError::MissingArgument {
            opcode: op.mnemonic().to_string(),
            span: instr.span,
        });
    };

    let invalid = |expected: &'static str| CompilationError::InvalidArgument {
        opcode: op.mnemonic().to_string(),
        expected,
        found: arg.kind.description().to_string(),
        span: arg.span,
    };

    if op.is_jump() {
        return match arg.kind {
            LiteralKind::Ident(name) => Ok(Operand::Jump(Ident::new(name, arg.span))),
            _ => Err(invalid("a label name")),
        };
    }

    if let Some(kind) = op.interned_arg() {
        let index = match (kind, arg.kind) {
            (InternKind::String, LiteralKind::String(s) | LiteralKind::Ident(s)) => {
                interner.intern_string(s, arg.span)?
            }
            (InternKind::String, _) => return Err(invalid("a string or identifier")),
            (InternKind::Int64, LiteralKind::Int(v) | LiteralKind::Bits(v)) => interner.intern_int64(v, arg.span)?,
            (InternKind::Int64, _) => return Err(invalid("an integer")),
            (InternKind::Float64, LiteralKind::Bits(v)) => {
                let value = reinterpret_bits(v, Width::F64, arg.span)?;
                interner.intern_float64(Number::Float(value), arg.span)?
            }
            (InternKind::Float64, LiteralKind::Int(v)) => interner.intern_float64(Number::Int(v), arg.span)?,
            (InternKind::Float64, LiteralKind::Float(v)) => interner.intern_float64(Number::Float(v), arg.span)?,
            (InternKind::Float64, _) => return Err(invalid("a number")),
        };
        return Ok(Operand::Immediate(Immediate::U32(index)));
    }

    encode_numeric(op.mnemonic(), width, &arg).map(Operand::Immediate)
}

/// Encode a literal numeric argument at a fixed width.
fn encode_numeric(mnemonic: &str, width: Width, arg: &Literal<'_>) -> Result<Immediate, CompilationError> {
    let out_of_range = |source: WidthError| CompilationError::ValueOutOfRange { source, span: arg.span };
    let expected = if width.is_float() { "a number" } else { "an integer" };

    let value = match (width.is_float(), arg.kind) {
        (true, LiteralKind::Bits(v)) => {
            let value = reinterpret_bits(v, width, arg.span)?;
            width.restrict(Number::Float(value)).map_err(out_of_range)?
        }
        (true, LiteralKind::Float(v)) => width.restrict(Number::Float(v)).map_err(out_of_range)?,
        (_, LiteralKind::Int(v) | LiteralKind::Bits(v)) => width.restrict(Number::Int(v)).map_err(out_of_range)?,
        _ => {
            return Err(CompilationError::InvalidArgument {
                opcode: mnemonic.to_string(),
                expected,
                found: arg.kind.description().to_string(),
                span: arg.span,
            });
        }
    };

    immediate_at(width, value).ok_or_else(|| {
        CompilationError::internal(format!("{value} was accepted for {width} but cannot be encoded"))
    })
}

/// Build the immediate for a value already restricted to `width`.
fn immediate_at(width: Width, value: Number) -> Option<Immediate> {
    Some(match (width, value) {
        (Width::F32, v) => Immediate::F32(v.as_float() as f32),
        (Width::F64, v) => Immediate::F64(v.as_float()),
        (Width::U8, Number::Int(v)) => Immediate::U8(u8::try_from(v).ok()?),
        (Width::U16, Number::Int(v)) => Immediate::U16(u16::try_from(v).ok()?),
        (Width::U32, Number::Int(v)) => Immediate::U32(u32::try_from(v).ok()?),
        (Width::U64, Number::Int(v)) => Immediate::U64(u64::try_from(v).ok()?),
        (Width::I8, Number::Int(v)) => Immediate::I8(i8::try_from(v).ok()?),
        (Width::I16, Number::Int(v)) => Immediate::I16(i16::try_from(v).ok()?),
        (Width::I32, Number::Int(v)) => Immediate::I32(i32::try_from(v).ok()?),
        (Width::I64, Number::Int(v)) => Immediate::I64(i64::try_from(v).ok()?),
        (_, Number::Float(_)) => return None,
    })
}

/// Reinterpret a raw-bits literal as an IEEE-754 value of `width`.
pub(crate) fn reinterpret_bits(bits: i128, width: Width, span: Span) -> Result<f64, CompilationError> {
    let out_of_range = |raw: Width| CompilationError::ValueOutOfRange {
        source: WidthError::OutOfRange {
            value: Number::Int(bits),
            width: raw,
        },
        span,
    };
    match width {
        Width::F32 => u32::try_from(bits)
            .map(|b| f32::from_bits(b) as f64)
            .map_err(|_| out_of_range(Width::U32)),
        _ => u64::try_from(bits)
            .map(f64::from_bits)
            .map_err(|_| out_of_range(Width::U64)),
    }
}
