//! Jump backpatching.
//!
//! Replaces each [`Node::UnresolvedJump`] with a `u32`-immediate instruction
//! holding the byte offset bound to its label in the same method. Must run
//! after [`flatten_groups`](super::flatten_groups).

use chasm_core::CompilationError;
use tracing::trace;

use crate::ir::{Immediate, Instruction, MethodIr, ModuleIr, Node};

/// Resolve every jump in `module`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn backpatch(module: &mut ModuleIr<'_>) -> Result<(), CompilationError> {
    for method in &mut module.methods {
        backpatch_method(method)?;
    }
    Ok(())
}

fn backpatch_method(method: &mut MethodIr<'_>) -> Result<(), CompilationError> {
    let mut patched = 0usize;
    for node in &mut method.body {
        match node {
            Node::Instr(_) => {}
            Node::UnresolvedJump { op, label, offset, span } => {
                let target = method
                    .labels
                    .get(label.name)
                    .copied()
                    .ok_or_else(|| CompilationError::UnresolvedJump {
                        label: label.name.to_string(),
                        span: label.span,
                    })?;
                *node = Node::Instr(Instruction {
                    op: *op,
                    imm: Immediate::U32(target),
                    offset: *offset,
                    span: *span,
                });
                patched += 1;
            }
            Node::Group(_) => {
                return Err(CompilationError::internal(format!(
                    "group left in method '{}' before backpatching",
                    method.name
                )));
            }
        }
    }

    if patched > 0 {
        trace!(method = method.name, jumps = patched, "backpatched");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use chasm_core::OpCode;
    use chasm_parser::Parser;

    use super::*;
    use crate::passes::{MainPass, flatten_groups};

    fn lower<'ast>(source: &str, arena: &'ast Bump) -> Result<ModuleIr<'ast>, CompilationError> {
        let module = Parser::parse(source, arena).unwrap();
        let mut ir = MainPass::new().run(&module)?;
        flatten_groups(&mut ir);
        backpatch(&mut ir)?;
        Ok(ir)
    }

    #[test]
    fn forward_and_backward_jumps() {
        let arena = Bump::new();
        let ir = lower(
            "method f<>void { @top: ldl 0; jmp_eqz done; jmp top; @done: ret; }",
            &arena,
        )
        .unwrap();
        let jumps: Vec<(OpCode, Immediate)> = ir.methods[0]
            .instructions()
            .filter(|i| i.op.is_jump())
            .map(|i| (i.op, i.imm))
            .collect();
        assert_eq!(
            jumps,
            vec![(OpCode::JmpEqz, Immediate::U32(12)), (OpCode::Jmp, Immediate::U32(0))]
        );
        assert!(ir.methods[0].body.iter().all(|n| matches!(n, Node::Instr(_))));
    }

    #[test]
    fn label_at_end_of_body() {
        let arena = Bump::new();
        let ir = lower("method f<>void { jmp end; nop; @end: }", &arena).unwrap();
        let first = ir.methods[0].instructions().next().copied().unwrap();
        assert_eq!(first.imm, Immediate::U32(6));
    }

    #[test]
    fn jumps_inside_try_blocks() {
        let arena = Bump::new();
        let ir = lower(
            "method f<>void { try { jmp out; } except Err { nop; } @out: ret; }",
            &arena,
        )
        .unwrap();
        let first = ir.methods[0].instructions().next().copied().unwrap();
        assert_eq!(first.imm, Immediate::U32(6));
    }

    #[test]
    fn unresolved_label() {
        let arena = Bump::new();
        let err = lower("method f<>void { jmp nowhere; ret; }", &arena).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedJump { ref label, .. } if label == "nowhere"));
    }

    #[test]
    fn labels_do_not_cross_methods() {
        let arena = Bump::new();
        let err = lower("method a<>void { @L: ret; } method b<>void { jmp L; }", &arena).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedJump { .. }));
    }

    #[test]
    fn groups_are_rejected() {
        let arena = Bump::new();
        let module = Parser::parse("method f<>void { try { nop; } except E { nop; } }", &arena).unwrap();
        let mut ir = MainPass::new().run(&module).unwrap();
        let err = backpatch(&mut ir).unwrap_err();
        assert!(err.is_internal());
    }
}
