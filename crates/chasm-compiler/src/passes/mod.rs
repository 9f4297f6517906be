//! Compilation passes.
//!
//! Run in order:
//!
//! 1. [`MainPass`] walks the AST, validates arguments, interns constants and
//!    lowers `try`/`except` into groups.
//! 2. [`flatten_groups`] splices groups into flat bodies.
//! 3. [`backpatch`] substitutes label offsets into jumps.
//!
//! [`operand`] and [`pragma`] hold the per-instruction and per-pragma rules
//! the main pass applies.

mod backpatch;
mod flatten;
mod main_pass;
pub mod operand;
pub mod pragma;

pub use backpatch::backpatch;
pub use flatten::{flatten, flatten_groups};
pub use main_pass::MainPass;
