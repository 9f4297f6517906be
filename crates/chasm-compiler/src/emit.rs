//! Segment emitter.
//!
//! Serializes a flattened, backpatched [`ModuleIr`] into the `csmx` binary
//! format. Sections are written in a fixed order: header, methods, objects,
//! strings, int64s, float64s. All integers are little-endian.
//!
//! Any [`Node::Group`] or [`Node::UnresolvedJump`] reaching the emitter is a
//! pass-ordering bug and is reported as [`CompilationError::Internal`].

use chasm_core::{CompilationError, Span};
use tracing::debug;

use crate::bytecode::SegmentWriter;
use crate::ir::{MethodIr, ModuleIr, Node, ObjectIr};

/// Magic bytes at the start of every module.
pub const MAGIC: &[u8; 4] = b"csmx";

/// Reserved status bytes after the magic.
pub const MODULE_STATUS_BYTES: usize = 4;
/// Reserved status bytes at the start of each method record.
pub const METHOD_STATUS_BYTES: usize = 2;
/// Reserved status byte at the start of each object record.
pub const OBJECT_STATUS_BYTES: usize = 1;

/// Serialize `module` to bytes.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn emit_module(module: &ModuleIr<'_>) -> Result<Vec<u8>, CompilationError> {
    let mut w = SegmentWriter::with_capacity(estimate_size(module));
    w.write_bytes(MAGIC);
    w.write_reserved(MODULE_STATUS_BYTES);

    w.write_u32(checked_count(module.method_count, module.methods.len(), "method")?);
    for method in &module.methods {
        emit_method(&mut w, method)?;
    }

    w.write_u32(checked_count(module.object_count, module.objects.len(), "object")?);
    for object in &module.objects {
        emit_object(&mut w, object);
    }

    w.write_u32(checked_count(module.string_count, module.strings.len(), "string")?);
    for string in &module.strings {
        let len = u32::try_from(string.len()).map_err(|_| CompilationError::TooLarge {
            what: "string constant",
            span: Span::default(),
        })?;
        w.write_u32(len);
        w.write_bytes(string.as_bytes());
    }

    w.write_u32(checked_count(module.int64_count, module.int64s.len(), "int64")?);
    for &value in &module.int64s {
        w.write_i64(value);
    }

    w.write_u32(checked_count(module.float64_count, module.float64s.len(), "float64")?);
    for &value in &module.float64s {
        w.write_f64(value);
    }

    debug!(bytes = w.len(), "emitted module");
    Ok(w.into_bytes())
}

fn emit_method(w: &mut SegmentWriter, method: &MethodIr<'_>) -> Result<(), CompilationError> {
    w.write_reserved(METHOD_STATUS_BYTES);
    w.write_u32(method.name_index);
    w.write_u32(method.pragmas.debug_symbol);
    w.write_u32(method.signature_index);
    w.write_u8(method.pragmas.stack_limit);
    w.write_u8(method.pragmas.local_limit);
    w.write_u32(method.byte_count);

    let start = w.len();
    for node in &method.body {
        match node {
            Node::Instr(instr) => {
                let position = w.len() - start;
                if position != instr.offset as usize {
                    return Err(CompilationError::internal(format!(
                        "'{}' in method '{}' recorded offset {} but lands at {}",
                        instr.op, method.name, instr.offset, position
                    )));
                }
                w.write_instruction(instr.op, &instr.imm);
            }
            Node::UnresolvedJump { label, .. } => {
                return Err(CompilationError::internal(format!(
                    "unresolved jump to '{}' in method '{}' reached the emitter",
                    label.name, method.name
                )));
            }
            Node::Group(_) => {
                return Err(CompilationError::internal(format!(
                    "unflattened group in method '{}' reached the emitter",
                    method.name
                )));
            }
        }
    }

    let written = w.len() - start;
    if written != method.byte_count as usize {
        return Err(CompilationError::internal(format!(
            "method '{}' declares {} instruction bytes but wrote {}",
            method.name, method.byte_count, written
        )));
    }

    let exception_count = u32::try_from(method.exceptions.len()).map_err(|_| CompilationError::TooLarge {
        what: "exception table",
        span: method.span,
    })?;
    w.write_u32(exception_count);
    for entry in &method.exceptions {
        w.write_u32(entry.type_index);
        w.write_u32(entry.start);
        w.write_u32(entry.end);
        w.write_u32(entry.target);
    }
    Ok(())
}

fn emit_object(w: &mut SegmentWriter, object: &ObjectIr<'_>) {
    w.write_reserved(OBJECT_STATUS_BYTES);
    w.write_u32(object.name_index);
    w.write_u32(object.field_block_index());
}

fn checked_count(count: u32, len: usize, what: &str) -> Result<u32, CompilationError> {
    if count as usize == len {
        Ok(count)
    } else {
        Err(CompilationError::internal(format!(
            "{what} count {count} does not match {len} entries"
        )))
    }
}

fn estimate_size(module: &ModuleIr<'_>) -> usize {
    let methods: usize = module
        .methods
        .iter()
        .map(|m| 24 + m.byte_count as usize + 16 * m.exceptions.len())
        .sum();
    let strings: usize = module.strings.iter().map(|s| 4 + s.len()).sum();
    28 + methods + 9 * module.objects.len() + strings + 8 * (module.int64s.len() + module.float64s.len())
}
