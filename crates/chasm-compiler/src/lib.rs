//! chasm compiler
//!
//! Turns a parsed assembler module into a `csmx` binary.
//!
//! ## Architecture
//!
//! - **Main pass**: scope tracking, label binding, argument validation,
//!   constant interning and try/except lowering
//! - **Flattening**: splices lowered groups into flat method bodies
//! - **Backpatching**: substitutes label offsets into jump instructions
//! - **Emission**: writes the resolved module section by section
//!
//! ## Modules
//!
//! - [`bytecode`]: Little-endian writer and instruction stream decoder
//! - [`emit`]: Segment emitter for the `csmx` format
//! - [`intern`]: First-seen-order constant tables
//! - [`ir`]: Resolved module, method and instruction model
//! - [`passes`]: Main pass, flattening and backpatching

pub mod bytecode;
pub mod emit;
pub mod intern;
pub mod ir;
pub mod passes;

pub use bytecode::{DecodedInstruction, SegmentWriter, decode_instructions};
pub use emit::{MAGIC, emit_module};
pub use intern::{InternTable, Interner};
pub use ir::{ExceptionEntry, Immediate, Instruction, MethodFlags, MethodIr, ModuleIr, Node, ObjectIr, PragmaSettings};
pub use passes::{MainPass, backpatch, flatten_groups};

// Re-export CompilationError from core for convenience
pub use chasm_core::CompilationError;

use chasm_parser::ast::Module;
use tracing::debug;

/// Run the main pass, flattening and backpatching.
///
/// The result has flat bodies with every jump resolved and is ready for
/// [`emit_module`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile<'ast>(module: &Module<'ast>) -> Result<ModuleIr<'ast>, CompilationError> {
    let mut ir = MainPass::new().run(module)?;

    flatten_groups(&mut ir);
    debug!(methods = ir.methods.len(), "flattened groups");

    backpatch(&mut ir)?;
    debug!(methods = ir.methods.len(), "backpatched jumps");

    Ok(ir)
}

/// Compile and serialize in one step.
pub fn compile_to_bytes(module: &Module<'_>) -> Result<Vec<u8>, CompilationError> {
    let ir = compile(module)?;
    emit_module(&ir)
}
