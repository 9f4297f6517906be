//! Shared vocabulary for the chasm assembler.
//!
//! This crate holds the types every stage of the pipeline agrees on:
//! - [`Span`] for source locations
//! - [`Width`] and [`Number`], the fixed-width numeric domain
//! - [`OpCode`] and its immediate [`Family`]
//! - The error hierarchy rooted at [`ChasmError`]

pub mod error;
pub mod opcode;
pub mod span;
pub mod width;

pub use error::{
    ChasmError, CompilationError, DecodeError, LexError, ParseError, ParseErrorKind, WidthError,
};
pub use opcode::{Family, InternKind, OpCode};
pub use span::Span;
pub use width::{Number, Width};
