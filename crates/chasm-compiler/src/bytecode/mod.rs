//! Byte-level encoding for the `csmx` format.
//!
//! - [`SegmentWriter`] - little-endian output buffer used by the emitter
//! - [`decode_instructions`] - reads a method's instruction stream back

mod decode;
mod writer;

pub use decode::{DecodedInstruction, decode_instructions, opcodes};
pub use writer::SegmentWriter;
