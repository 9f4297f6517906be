//! Fixed-width numeric domain.
//!
//! [`Width`] is the single authority on which values fit which operand and
//! table widths. Every other component asks it instead of re-deriving bounds.

use std::fmt;
use std::str::FromStr;

use crate::error::WidthError;

/// A literal numeric value before it is narrowed to a fixed width.
///
/// `i128` covers the full range of both `u64` and `i64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    /// The value as a float, widening integers.
    pub fn as_float(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

enum Bounds {
    Int(i128, i128),
    Float(f64, f64),
}

/// One of the fixed-width numeric kinds of the bytecode format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Width {
    /// Every width, in tag order.
    pub const ALL: [Width; 10] = [
        Width::U8,
        Width::U16,
        Width::U32,
        Width::U64,
        Width::I8,
        Width::I16,
        Width::I32,
        Width::I64,
        Width::F32,
        Width::F64,
    ];

    /// The textual tag of this width (`"u8"`, `"f64"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Width::U8 => "u8",
            Width::U16 => "u16",
            Width::U32 => "u32",
            Width::U64 => "u64",
            Width::I8 => "i8",
            Width::I16 => "i16",
            Width::I32 => "i32",
            Width::I64 => "i64",
            Width::F32 => "f32",
            Width::F64 => "f64",
        }
    }

    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            Width::U8 | Width::I8 => 1,
            Width::U16 | Width::I16 => 2,
            Width::U32 | Width::I32 | Width::F32 => 4,
            Width::U64 | Width::I64 | Width::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Width::F32 | Width::F64)
    }

    fn bounds(self) -> Bounds {
        match self {
            Width::U8 => Bounds::Int(0, u8::MAX as i128),
            Width::U16 => Bounds::Int(0, u16::MAX as i128),
            Width::U32 => Bounds::Int(0, u32::MAX as i128),
            Width::U64 => Bounds::Int(0, u64::MAX as i128),
            Width::I8 => Bounds::Int(i8::MIN as i128, i8::MAX as i128),
            Width::I16 => Bounds::Int(i16::MIN as i128, i16::MAX as i128),
            Width::I32 => Bounds::Int(i32::MIN as i128, i32::MAX as i128),
            Width::I64 => Bounds::Int(i64::MIN as i128, i64::MAX as i128),
            Width::F32 => Bounds::Float(-(f32::MAX as f64), f32::MAX as f64),
            Width::F64 => Bounds::Float(f64::MIN, f64::MAX),
        }
    }

    /// Smallest representable value.
    pub fn min(self) -> Number {
        match self.bounds() {
            Bounds::Int(min, _) => Number::Int(min),
            Bounds::Float(min, _) => Number::Float(min),
        }
    }

    /// Largest representable value.
    pub fn max(self) -> Number {
        match self.bounds() {
            Bounds::Int(_, max) => Number::Int(max),
            Bounds::Float(_, max) => Number::Float(max),
        }
    }

    /// Whether `value` is representable at this width without coercion loss.
    ///
    /// Floats never fit integer widths; NaN never fits anything.
    pub fn contains(self, value: Number) -> bool {
        match (self.bounds(), value) {
            (Bounds::Int(min, max), Number::Int(v)) => v >= min && v <= max,
            (Bounds::Int(..), Number::Float(_)) => false,
            (Bounds::Float(min, max), v) => {
                let v = v.as_float();
                v >= min && v <= max
            }
        }
    }

    /// Coerce `value` into this width and validate it.
    ///
    /// Integers are widened to floats for float widths.
    pub fn restrict(self, value: Number) -> Result<Number, WidthError> {
        let coerced = match (self.is_float(), value) {
            (true, v) => Number::Float(v.as_float()),
            (false, Number::Int(v)) => Number::Int(v),
            (false, Number::Float(_)) => {
                return Err(WidthError::NotInteger { value, width: self });
            }
        };
        if self.contains(coerced) {
            Ok(coerced)
        } else {
            Err(WidthError::OutOfRange { value, width: self })
        }
    }

    /// Integer convenience form of [`restrict`](Self::restrict).
    pub fn restrict_int(self, value: i128) -> Result<i128, WidthError> {
        match self.restrict(Number::Int(value))? {
            Number::Int(v) => Ok(v),
            Number::Float(_) => Err(WidthError::NotInteger {
                value: Number::Int(value),
                width: self,
            }),
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Width {
    type Err = WidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Width::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| WidthError::UnknownWidth(s.to_string()))
    }
}
