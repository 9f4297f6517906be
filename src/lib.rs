//! chasm - an assembler for a small stack-machine bytecode.
//!
//! Reads assembler source and produces a `csmx` binary module:
//!
//! ```text
//! source -> lexer -> parser -> main pass -> flatten -> backpatch -> emitter -> bytes
//! ```
//!
//! # Example
//!
//! ```
//! let bytes = chasm::assemble("method main<>void { psh_b 1; pop; ret; }").unwrap();
//! assert_eq!(&bytes[..4], b"csmx");
//! ```

use bumpalo::Bump;

pub use chasm_compiler::{
    self as compiler, DecodedInstruction, ExceptionEntry, Immediate, Instruction, MAGIC, MethodFlags, MethodIr,
    ModuleIr, Node, ObjectIr, decode_instructions,
};
pub use chasm_core::{
    ChasmError, CompilationError, DecodeError, Family, LexError, OpCode, ParseError, ParseErrorKind, Span, Width,
    WidthError,
};
pub use chasm_parser::{self as parser, Parser};

/// Parse and compile `source` into a resolved module.
///
/// The returned module borrows names from `arena`.
pub fn compile<'ast>(source: &str, arena: &'ast Bump) -> Result<ModuleIr<'ast>, ChasmError> {
    let module = Parser::parse(source, arena)?;
    Ok(chasm_compiler::compile(&module)?)
}

/// Assemble `source` into `csmx` bytes.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn assemble(source: &str) -> Result<Vec<u8>, ChasmError> {
    let arena = Bump::new();
    let module = compile(source, &arena)?;
    Ok(chasm_compiler::emit_module(&module)?)
}

/// Assemble `source` and render its listing.
pub fn listing(source: &str) -> Result<String, ChasmError> {
    let arena = Bump::new();
    Ok(compile(source, &arena)?.listing())
}
