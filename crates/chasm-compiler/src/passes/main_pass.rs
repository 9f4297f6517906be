//! Main transformation pass.
//!
//! A single depth-first walk over the AST that:
//! - tracks the active scope (module, method, object) for pragma dispatch
//! - binds labels to byte offsets and validates instruction arguments
//! - interns constants, names and signature strings
//! - lowers `try`/`except` into [`Node::Group`]s plus exception-table entries
//!
//! Every node records the byte offset it starts at when it is created, so
//! the later passes never recompute layout.

use chasm_core::{CompilationError, Span};
use chasm_parser::ast::{ExceptClause, InstructionStmt, Item, Method, Module, Object, Pragma, Stmt, TryStmt, TypeRef};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::operand::{Operand, encode_operand};
use super::pragma::{self, METHOD_PRAGMAS};
use crate::intern::Interner;
use crate::ir::{ExceptionEntry, Instruction, MethodFlags, MethodIr, ModuleIr, Node, ObjectIr, PragmaSettings};

/// The kind of declaration currently being visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    Method,
    Object,
}

impl Scope {
    fn name(self) -> &'static str {
        match self {
            Scope::Module => "module",
            Scope::Method => "method",
            Scope::Object => "object",
        }
    }
}

/// Per-method state while its body is lowered.
#[derive(Debug, Default)]
struct MethodState<'ast> {
    labels: FxHashMap<&'ast str, u32>,
    /// Byte offset of the next instruction.
    offset: u32,
    instruction_count: u32,
    pragmas: PragmaSettings,
    /// Open try ranges, innermost last.
    ranges: Vec<(u32, u32)>,
    exceptions: Vec<ExceptionEntry>,
}

/// The main pass over one module.
#[derive(Debug, Default)]
pub struct MainPass<'ast> {
    interner: Interner,
    scopes: Vec<Scope>,
    methods: Vec<MethodIr<'ast>>,
    objects: Vec<ObjectIr<'ast>>,
}

impl<'ast> MainPass<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the pass, producing the module with unflattened, unpatched bodies.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, module: &Module<'ast>) -> Result<ModuleIr<'ast>, CompilationError> {
        self.scopes.push(Scope::Module);
        for item in module.items() {
            match item {
                Item::Pragma(pragma) => self.visit_pragma(pragma, None)?,
                Item::Method(method) => {
                    let method = self.visit_method(*method)?;
                    self.methods.push(method);
                }
                Item::Object(object) => {
                    let object = self.visit_object(*object)?;
                    self.objects.push(object);
                }
            }
        }
        self.scopes.pop();

        let tables = self.interner.into_tables();
        let module = ModuleIr {
            method_count: count(self.methods.len(), "method count")?,
            object_count: count(self.objects.len(), "object count")?,
            string_count: count(tables.strings.len(), "string count")?,
            int64_count: count(tables.int64s.len(), "int64 count")?,
            float64_count: count(tables.float64s.len(), "float64 count")?,
            methods: self.methods,
            objects: self.objects,
            strings: tables.strings,
            int64s: tables.int64s,
            float64s: tables.float64s,
        };

        debug!(
            methods = module.method_count,
            objects = module.object_count,
            strings = module.string_count,
            int64s = module.int64_count,
            float64s = module.float64_count,
            "main pass complete"
        );
        Ok(module)
    }

    fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> Result<T, CompilationError>) -> Result<T, CompilationError> {
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    // =========================================
    // Declarations
    // =========================================

    fn visit_method(&mut self, method: &'ast Method<'ast>) -> Result<MethodIr<'ast>, CompilationError> {
        self.with_scope(Scope::Method, |pass| {
            let mut state = MethodState::default();
            let body = pass.visit_body(method.body, &mut state)?;

            let signature = signature_string(method.params, method.return_type.as_ref());
            let name_index = pass.interner.intern_string(method.name.name, method.name.span)?;
            let signature_index = pass.interner.intern_string(&signature, method.span)?;

            let mut flags = MethodFlags::empty();
            flags.set(MethodFlags::VOID, method.return_type.is_none());
            flags.set(MethodFlags::NO_PARAMS, method.params.is_empty());
            flags.set(MethodFlags::NO_THROW, state.exceptions.is_empty());
            flags.set(MethodFlags::DEBUG_SYMBOL, state.pragmas.debug_enabled);

            u32::try_from(state.exceptions.len()).map_err(|_| CompilationError::TooLarge {
                what: "exception table",
                span: method.span,
            })?;

            trace!(
                method = method.name.name,
                bytes = state.offset,
                instructions = state.instruction_count,
                exceptions = state.exceptions.len(),
                "lowered method"
            );

            Ok(MethodIr {
                name: method.name.name,
                span: method.span,
                body,
                labels: state.labels,
                byte_count: state.offset,
                instruction_count: state.instruction_count,
                pragmas: state.pragmas,
                exceptions: state.exceptions,
                name_index,
                signature_index,
                flags,
            })
        })
    }

    fn visit_object(&mut self, object: &'ast Object<'ast>) -> Result<ObjectIr<'ast>, CompilationError> {
        self.with_scope(Scope::Object, |pass| {
            for pragma in object.pragmas {
                pass.visit_pragma(pragma, None)?;
            }

            let name_index = pass.interner.intern_string(object.name.name, object.name.span)?;
            let field_block = if object.fields.is_empty() {
                None
            } else {
                let fields = type_globs(object.fields);
                Some(pass.interner.intern_string(&fields, object.span)?)
            };

            Ok(ObjectIr {
                name: object.name.name,
                span: object.span,
                name_index,
                field_block,
            })
        })
    }

    /// Dispatch a pragma on the active scope.
    ///
    /// `method` is the state of the enclosing method, if any.
    fn visit_pragma(&mut self, pragma: &Pragma<'ast>, method: Option<&mut MethodState<'ast>>) -> Result<(), CompilationError> {
        let scope = self
            .scopes
            .last()
            .copied()
            .ok_or_else(|| CompilationError::internal("pragma visited outside any scope"))?;

        match (scope, method) {
            (Scope::Method, Some(state)) => {
                let spec = pragma::lookup(METHOD_PRAGMAS, pragma.key.name).ok_or_else(|| CompilationError::UnknownPragma {
                    name: pragma.key.name.to_string(),
                    span: pragma.key.span,
                })?;
                let value = spec.evaluate(pragma, &mut self.interner)?;
                spec.apply(value, &mut state.pragmas)
            }
            (Scope::Method, None) => Err(CompilationError::internal("method pragma without method state")),
            (Scope::Module | Scope::Object, _) => Err(CompilationError::UnsupportedPragmaScope {
                name: pragma.key.name.to_string(),
                scope: scope.name(),
                span: pragma.span,
            }),
        }
    }

    // =========================================
    // Method bodies
    // =========================================

    fn visit_body(&mut self, stmts: &'ast [Stmt<'ast>], state: &mut MethodState<'ast>) -> Result<Vec<Node<'ast>>, CompilationError> {
        let mut nodes = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Stmt::Pragma(pragma) => self.visit_pragma(pragma, Some(&mut *state))?,
                Stmt::Label(label) => {
                    if state.labels.contains_key(label.name) {
                        return Err(CompilationError::DuplicateLabel {
                            name: label.name.to_string(),
                            span: label.span,
                        });
                    }
                    state.labels.insert(label.name, state.offset);
                }
                Stmt::Try(try_stmt) => nodes.push(self.visit_try(*try_stmt, state)?),
                Stmt::Instruction(instr) => nodes.push(self.visit_instruction(instr, state)?),
            }
        }
        Ok(nodes)
    }

    /// Lower a try block and its handlers into one group.
    ///
    /// Each handler adds an entry covering the try body's range and pointing
    /// at the handler's first instruction.
    fn visit_try(&mut self, try_stmt: &'ast TryStmt<'ast>, state: &mut MethodState<'ast>) -> Result<Node<'ast>, CompilationError> {
        let start = state.offset;
        let mut children = self.visit_body(try_stmt.body, state)?;
        let end = state.offset;

        state.ranges.push((start, end));
        for handler in try_stmt.handlers {
            children.extend(self.visit_except(handler, state)?);
        }
        state.ranges.pop();

        Ok(Node::Group(children))
    }

    fn visit_except(&mut self, handler: &'ast ExceptClause<'ast>, state: &mut MethodState<'ast>) -> Result<Vec<Node<'ast>>, CompilationError> {
        let type_index = self.interner.intern_string(handler.exception.name, handler.exception.span)?;
        let &(start, end) = state
            .ranges
            .last()
            .ok_or_else(|| CompilationError::internal("except handler outside a try range"))?;

        state.exceptions.push(ExceptionEntry {
            type_index,
            start,
            end,
            target: state.offset,
        });

        self.visit_body(handler.body, state)
    }

    fn visit_instruction(&mut self, instr: &InstructionStmt<'ast>, state: &mut MethodState<'ast>) -> Result<Node<'ast>, CompilationError> {
        let operand = encode_operand(instr, &mut self.interner)?;
        let offset = state.offset;
        let node = match operand {
            Operand::Immediate(imm) => Node::Instr(Instruction {
                op: instr.opcode,
                imm,
                offset,
                span: instr.span,
            }),
            Operand::Jump(label) => Node::UnresolvedJump {
                op: instr.opcode,
                label,
                offset,
                span: instr.span,
            },
        };

        let too_large = || CompilationError::TooLarge {
            what: "method byte count",
            span: instr.span,
        };
        let size = u32::try_from(instr.opcode.encoded_size()).map_err(|_| too_large())?;
        state.offset = offset.checked_add(size).ok_or_else(too_large)?;
        state.instruction_count = state.instruction_count.checked_add(1).ok_or_else(too_large)?;

        Ok(node)
    }
}

/// `a/b/c` from type globs.
fn type_globs(types: &[TypeRef<'_>]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
}

/// Parameter globs, then `:` and the return glob for non-void methods.
fn signature_string(params: &[TypeRef<'_>], return_type: Option<&TypeRef<'_>>) -> String {
    let mut signature = type_globs(params);
    if let Some(return_type) = return_type {
        signature.push(':');
        signature.push_str(&return_type.to_string());
    }
    signature
}

fn count(len: usize, what: &'static str) -> Result<u32, CompilationError> {
    u32::try_from(len).map_err(|_| CompilationError::TooLarge {
        what,
        span: Span::default(),
    })
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use chasm_core::OpCode;
    use chasm_parser::Parser;

    use super::*;
    use crate::ir::Immediate;

    fn run<'ast>(source: &str, arena: &'ast Bump) -> Result<ModuleIr<'ast>, CompilationError> {
        let module = Parser::parse(source, arena).unwrap();
        MainPass::new().run(&module)
    }

    fn run_err(source: &str) -> CompilationError {
        let arena = Bump::new();
        run(source, &arena).unwrap_err()
    }

    fn instr(node: &Node<'_>) -> Instruction {
        match node {
            Node::Instr(instr) => *instr,
            other => panic!("expected instruction, found {other:?}"),
        }
    }

    #[test]
    fn offsets_and_counts() {
        let arena = Bump::new();
        let module = run("method foo<>void { psh_b 5; psh_b 3; add_q; ret; }", &arena).unwrap();
        let method = &module.methods[0];
        assert_eq!(method.byte_count, 6);
        assert_eq!(method.instruction_count, 4);
        let offsets: Vec<u32> = method.body.iter().map(|n| instr(n).offset).collect();
        assert_eq!(offsets, vec![0, 2, 4, 5]);
        assert_eq!(instr(&method.body[0]).imm, Immediate::I8(5));
        assert_eq!(method.pragmas, PragmaSettings::default());
        assert!(method.exceptions.is_empty());
    }

    #[test]
    fn method_metadata() {
        let arena = Bump::new();
        let module = run("method sum<i64, **node>i64 { $limstack = 3; $limlocal = 2; ret; }", &arena).unwrap();
        let method = &module.methods[0];
        assert_eq!(module.strings, vec!["sum".to_string(), "i64/**node:i64".to_string()]);
        assert_eq!(method.name_index, 0);
        assert_eq!(method.signature_index, 1);
        assert_eq!(method.pragmas.stack_limit, 3);
        assert_eq!(method.pragmas.local_limit, 2);
        assert_eq!(method.flags, MethodFlags::NO_THROW);
    }

    #[test]
    fn void_method_flags_and_signature() {
        let arena = Bump::new();
        let module = run("method main<>void { $debugsym = \"main.csm\"; ret; }", &arena).unwrap();
        let method = &module.methods[0];
        // debug symbol first, then name, then the empty signature
        assert_eq!(
            module.strings,
            vec!["main.csm".to_string(), "main".to_string(), String::new()]
        );
        assert_eq!(method.pragmas.debug_symbol, 0);
        assert_eq!(
            method.flags,
            MethodFlags::VOID | MethodFlags::NO_PARAMS | MethodFlags::NO_THROW | MethodFlags::DEBUG_SYMBOL
        );
    }

    #[test]
    fn body_constants_are_interned_before_names() {
        let arena = Bump::new();
        let module = run("method f<>void { call \"g\"; psh_q 1099511627776; psh_f 0.25; ret; }", &arena).unwrap();
        assert_eq!(module.strings, vec!["g".to_string(), "f".to_string(), String::new()]);
        assert_eq!(module.int64s, vec![1 << 40]);
        assert_eq!(module.float64s, vec![0.25]);
        assert_eq!(module.string_count, 3);
        assert_eq!(module.int64_count, 1);
        assert_eq!(module.float64_count, 1);
    }

    #[test]
    fn labels_bind_current_offset() {
        let arena = Bump::new();
        let module = run("method f<>void { nop; @top: ldl 1; jmp top; @end: ret; }", &arena).unwrap();
        let method = &module.methods[0];
        assert_eq!(method.labels.get("top"), Some(&1));
        assert_eq!(method.labels.get("end"), Some(&8));
        assert!(matches!(
            method.body[2],
            Node::UnresolvedJump { op: OpCode::Jmp, offset: 3, .. }
        ));
    }

    #[test]
    fn duplicate_label() {
        let err = run_err("method f<>void { @L: nop; @L: ret; }");
        assert!(matches!(err, CompilationError::DuplicateLabel { ref name, .. } if name == "L"));
    }

    #[test]
    fn labels_are_scoped_per_method() {
        let arena = Bump::new();
        let module = run("method a<>void { @L: ret; } method b<>void { @L: nop; ret; }", &arena).unwrap();
        assert_eq!(module.methods[0].labels.get("L"), Some(&0));
        assert_eq!(module.methods[1].labels.get("L"), Some(&0));
    }

    #[test]
    fn try_except_lowering() {
        let arena = Bump::new();
        let module = run(
            "method f<>void { try { psh_b 1; pop; } except E1 { pop; } except E2 { psh_b 2; pop; } ret; }",
            &arena,
        )
        .unwrap();
        let method = &module.methods[0];
        let Node::Group(children) = &method.body[0] else {
            panic!("expected group");
        };
        let ops: Vec<OpCode> = children.iter().map(|n| instr(n).op).collect();
        assert_eq!(
            ops,
            vec![OpCode::PshB, OpCode::Pop, OpCode::Pop, OpCode::PshB, OpCode::Pop]
        );
        assert_eq!(
            method.exceptions,
            vec![
                ExceptionEntry { type_index: 0, start: 0, end: 3, target: 3 },
                ExceptionEntry { type_index: 1, start: 0, end: 3, target: 4 },
            ]
        );
        assert!(!method.flags.contains(MethodFlags::NO_THROW));
    }

    #[test]
    fn nested_try_ranges_do_not_leak() {
        let arena = Bump::new();
        let module = run(
            "method f<>void { try { nop; try { nop; } except Inner { pop; } nop; } except Outer { pop; } ret; }",
            &arena,
        )
        .unwrap();
        let method = &module.methods[0];
        // outer body: nop(0) [inner: nop(1) handler pop(2)] nop(3); outer handler pop(4)
        assert_eq!(
            method.exceptions,
            vec![
                ExceptionEntry { type_index: 0, start: 1, end: 2, target: 2 },
                ExceptionEntry { type_index: 1, start: 0, end: 4, target: 4 },
            ]
        );
        assert_eq!(method.byte_count, 6);
    }

    #[test]
    fn objects_field_blocks() {
        let arena = Bump::new();
        let module = run("object point { i32, i32 } object empty {}", &arena).unwrap();
        let point = &module.objects[0];
        let empty = &module.objects[1];
        assert_eq!(point.name_index, 0);
        assert_eq!(point.field_block, Some(1));
        assert_ne!(point.field_block_index(), 0);
        assert_eq!(empty.field_block, None);
        assert_eq!(empty.field_block_index(), 0);
        assert_eq!(
            module.strings,
            vec!["point".to_string(), "i32/i32".to_string(), "empty".to_string()]
        );
    }

    #[test]
    fn unknown_method_pragma() {
        let err = run_err("method f<>void { $inline; ret; }");
        assert!(matches!(err, CompilationError::UnknownPragma { ref name, .. } if name == "inline"));
    }

    #[test]
    fn module_pragma_is_unsupported() {
        let err = run_err("$version = 1;");
        assert!(matches!(err, CompilationError::UnsupportedPragmaScope { scope: "module", .. }));
    }

    #[test]
    fn object_pragma_is_unsupported() {
        let err = run_err("object o { $packed; u8 }");
        assert!(matches!(err, CompilationError::UnsupportedPragmaScope { scope: "object", .. }));
    }

    #[test]
    fn limstack_out_of_range() {
        let err = run_err("method f<>void { $limstack = 256; ret; }");
        assert!(matches!(err, CompilationError::ValueOutOfRange { .. }));
    }

    #[test]
    fn counts_match_lists() {
        let arena = Bump::new();
        let module = run("method a<>void { ret; } method b<>void { ret; } object c { u8 }", &arena).unwrap();
        assert_eq!(module.method_count, 2);
        assert_eq!(module.object_count, 1);
    }
}
