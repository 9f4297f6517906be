//! Interning tables for module constants.
//!
//! Strings, 64-bit integers and 64-bit floats referenced by a module are
//! stored once each, in first-insertion order, and referenced by index.

use std::borrow::Borrow;
use std::hash::Hash;

use chasm_core::{CompilationError, Number, Span, Width};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// A bijection between values and dense, zero-based, insertion-ordered indices.
#[derive(Debug, Clone)]
pub struct InternTable<K> {
    /// Values in index order.
    values: Vec<K>,
    /// Deduplication index: maps value to its index.
    index: FxHashMap<K, u32>,
}

impl<K> Default for InternTable<K> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<K: Hash + Eq + Clone> InternTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get an existing value, returning its index.
    ///
    /// Returns `None` only when a new value would need an index past `u32::MAX`.
    pub fn intern<Q>(&mut self, value: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(&idx) = self.index.get(value) {
            return Some(idx);
        }

        let idx = u32::try_from(self.values.len()).ok()?;
        let owned = value.to_owned();
        self.values.push(owned.clone());
        self.index.insert(owned, idx);
        Some(idx)
    }

    /// Index of a value already in the table.
    pub fn get<Q>(&self, value: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(value).copied()
    }

    /// Values in index order.
    pub fn values(&self) -> &[K] {
        &self.values
    }

    pub fn into_values(self) -> Vec<K> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The three constant tables of one compilation run.
#[derive(Debug, Default)]
pub struct Interner {
    strings: InternTable<String>,
    int64s: InternTable<i64>,
    float64s: InternTable<OrderedFloat<f64>>,
}

/// Exported tables, index = position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternedTables {
    pub strings: Vec<String>,
    pub int64s: Vec<i64>,
    pub float64s: Vec<f64>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_string(&mut self, value: &str, span: Span) -> Result<u32, CompilationError> {
        self.strings.intern(value).ok_or(CompilationError::TooLarge {
            what: "string table",
            span,
        })
    }

    /// Intern a 64-bit integer after checking it fits `i64`.
    pub fn intern_int64(&mut self, value: i128, span: Span) -> Result<u32, CompilationError> {
        let value = Width::I64
            .restrict_int(value)
            .map_err(|source| CompilationError::ValueOutOfRange { source, span })?;
        // restrict_int guarantees the range
        let value = value as i64;
        self.int64s.intern(&value).ok_or(CompilationError::TooLarge {
            what: "int64 table",
            span,
        })
    }

    /// Intern a 64-bit float after checking it fits `f64`.
    pub fn intern_float64(&mut self, value: Number, span: Span) -> Result<u32, CompilationError> {
        let value = Width::F64
            .restrict(value)
            .map_err(|source| CompilationError::ValueOutOfRange { source, span })?
            .as_float();
        self.float64s
            .intern(&OrderedFloat(value))
            .ok_or(CompilationError::TooLarge {
                what: "float64 table",
                span,
            })
    }

    /// Export all three tables in index order.
    pub fn into_tables(self) -> InternedTables {
        InternedTables {
            strings: self.strings.into_values(),
            int64s: self.int64s.into_values(),
            float64s: self
                .float64s
                .into_values()
                .into_iter()
                .map(OrderedFloat::into_inner)
                .collect(),
        }
    }
}
