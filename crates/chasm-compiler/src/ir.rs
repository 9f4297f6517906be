//! Resolved module representation shared by the passes and the emitter.
//!
//! The main pass turns the AST into a [`ModuleIr`]. Method bodies are
//! [`Node`] lists that may still contain [`Node::Group`] (removed by
//! flattening) and [`Node::UnresolvedJump`] (removed by backpatching). The
//! emitter only accepts [`Node::Instr`].

use std::fmt;

use bitflags::bitflags;
use chasm_core::{Family, OpCode, Span};
use chasm_parser::ast::Ident;
use rustc_hash::FxHashMap;

/// An encoded immediate operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Immediate {
    /// The family this immediate encodes.
    pub fn family(&self) -> Family {
        match self {
            Immediate::None => Family::None,
            Immediate::U8(_) => Family::U8,
            Immediate::U16(_) => Family::U16,
            Immediate::U32(_) => Family::U32,
            Immediate::U64(_) => Family::U64,
            Immediate::I8(_) => Family::I8,
            Immediate::I16(_) => Family::I16,
            Immediate::I32(_) => Family::I32,
            Immediate::I64(_) => Family::I64,
            Immediate::F32(_) => Family::F32,
            Immediate::F64(_) => Family::F64,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.family().immediate_size()
    }

    /// Append the little-endian encoding.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Immediate::None => {}
            Immediate::U8(v) => out.push(v),
            Immediate::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Immediate::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::None => Ok(()),
            Immediate::U8(v) => write!(f, "{v}"),
            Immediate::U16(v) => write!(f, "{v}"),
            Immediate::U32(v) => write!(f, "{v}"),
            Immediate::U64(v) => write!(f, "{v}"),
            Immediate::I8(v) => write!(f, "{v}"),
            Immediate::I16(v) => write!(f, "{v}"),
            Immediate::I32(v) => write!(f, "{v}"),
            Immediate::I64(v) => write!(f, "{v}"),
            Immediate::F32(v) => write!(f, "{v:?}"),
            Immediate::F64(v) => write!(f, "{v:?}"),
        }
    }
}

/// A fully classified instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: OpCode,
    pub imm: Immediate,
    /// Byte offset of the opcode within its method, fixed at creation.
    pub offset: u32,
    pub span: Span,
}

impl Instruction {
    /// Encoded size: opcode byte plus immediate.
    pub fn size(&self) -> usize {
        1 + self.imm.size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.imm {
            Immediate::None => write!(f, "{}", self.op),
            imm => write!(f, "{} {}", self.op, imm),
        }
    }
}

/// A node in a method body after the main pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'ast> {
    Instr(Instruction),
    /// A jump whose label offset is not yet substituted.
    UnresolvedJump {
        op: OpCode,
        label: Ident<'ast>,
        offset: u32,
        span: Span,
    },
    /// Lowered try/except contents, spliced away by flattening.
    Group(Vec<Node<'ast>>),
}

/// One exception-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// String-table index of the exception type name.
    pub type_index: u32,
    /// Start offset of the guarded range.
    pub start: u32,
    /// End offset of the guarded range (exclusive).
    pub end: u32,
    /// Offset of the handler's first instruction.
    pub target: u32,
}

bitflags! {
    /// Method status flags derived after the body is lowered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        const VOID = 1 << 0;
        const NO_PARAMS = 1 << 1;
        const NO_THROW = 1 << 2;
        const DEBUG_SYMBOL = 1 << 3;
    }
}

/// Values set by method pragmas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PragmaSettings {
    pub stack_limit: u8,
    pub local_limit: u8,
    /// String-table index of the debug symbol.
    pub debug_symbol: u32,
    pub debug_enabled: bool,
}

/// A method after the main pass.
#[derive(Debug, Clone)]
pub struct MethodIr<'ast> {
    pub name: &'ast str,
    pub span: Span,
    pub body: Vec<Node<'ast>>,
    /// Label name to byte offset, scoped to this method.
    pub labels: FxHashMap<&'ast str, u32>,
    /// Total instruction bytes.
    pub byte_count: u32,
    pub instruction_count: u32,
    pub pragmas: PragmaSettings,
    pub exceptions: Vec<ExceptionEntry>,
    pub name_index: u32,
    pub signature_index: u32,
    pub flags: MethodFlags,
}

impl MethodIr<'_> {
    /// Instructions of a flat, resolved body.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.body.iter().filter_map(|node| match node {
            Node::Instr(instr) => Some(instr),
            _ => None,
        })
    }
}

/// An object after the main pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectIr<'ast> {
    pub name: &'ast str,
    pub span: Span,
    pub name_index: u32,
    /// String-table index of the field signature; `None` when there are no fields.
    pub field_block: Option<u32>,
}

impl ObjectIr<'_> {
    /// The field-block index as written to the binary format.
    pub fn field_block_index(&self) -> u32 {
        self.field_block.unwrap_or(0)
    }
}

/// A whole module after the main pass.
#[derive(Debug, Clone)]
pub struct ModuleIr<'ast> {
    pub methods: Vec<MethodIr<'ast>>,
    pub objects: Vec<ObjectIr<'ast>>,
    pub strings: Vec<String>,
    pub int64s: Vec<i64>,
    pub float64s: Vec<f64>,
    pub method_count: u32,
    pub object_count: u32,
    pub string_count: u32,
    pub int64_count: u32,
    pub float64_count: u32,
}

impl ModuleIr<'_> {
    /// Render a human-readable listing of every method and object.
    pub fn listing(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModuleIr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = |idx: u32| self.strings.get(idx as usize).map_or("?", String::as_str);

        for method in &self.methods {
            writeln!(
                f,
                "method {} [{}] stack={} local={} bytes={} flags={:?}",
                method.name,
                string(method.signature_index),
                method.pragmas.stack_limit,
                method.pragmas.local_limit,
                method.byte_count,
                method.flags,
            )?;
            for node in &method.body {
                match node {
                    Node::Instr(instr) => writeln!(f, "  {:>6}: {}", instr.offset, instr)?,
                    Node::UnresolvedJump { op, label, offset, .. } => writeln!(f, "  {offset:>6}: {op} @{label}")?,
                    Node::Group(children) => writeln!(f, "  <group of {}>", children.len())?,
                }
            }
            for entry in &method.exceptions {
                writeln!(
                    f,
                    "  except {} [{}, {}) -> {}",
                    string(entry.type_index),
                    entry.start,
                    entry.end,
                    entry.target
                )?;
            }
        }

        for object in &self.objects {
            let fields = object.field_block.map_or("", string);
            writeln!(f, "object {} [{}]", object.name, fields)?;
        }

        Ok(())
    }
}
