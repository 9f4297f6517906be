//! Bytecode operation codes.
//!
//! Defines the instruction set of the stack machine. Each opcode is a single
//! byte followed by the immediate bytes of its [`Family`], little-endian.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Width;

/// Bytecode operation codes.
///
/// Discriminants are the encoded opcode bytes and must stay in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Loads and stores
    // =========================================================================
    Nop = 0,
    /// Load local. Operand: u8 slot.
    Ldl,
    /// Store local. Operand: u8 slot.
    Stl,
    /// Load global. Operand: u16 slot.
    Ldg,
    /// Store global. Operand: u16 slot.
    Stg,
    /// Load field. Operand: u16 field index.
    Lfd,
    /// Store field. Operand: u16 field index.
    Sfd,
    /// Load string constant. Operand: u32 string table index.
    Ldsc,

    // =========================================================================
    // Stack
    // =========================================================================
    Pop,
    Swp,
    Dup,
    /// Push byte. Operand: i8.
    PshB,
    /// Push short. Operand: i16.
    PshS,
    /// Push dword. Operand: i32.
    PshD,
    /// Push qword. Operand: u32 int64 table index.
    PshQ,
    /// Push float. Operand: u32 float64 table index.
    PshF,
    /// Push array. Operand: u32 string table index of the element type.
    PshA,
    PshNil,

    // =========================================================================
    // Arrays
    // =========================================================================
    ParB,
    ParS,
    ParD,
    ParQ,
    ParF,
    /// Push array of objects. Operand: u32 string table index.
    ParA,
    Lai,
    Sai,
    Alen,

    // =========================================================================
    // Bitwise
    // =========================================================================
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    AddQ,
    SubQ,
    MulQ,
    DivQ,
    ModQ,
    NegQ,
    AddF,
    SubF,
    MulF,
    DivF,
    ModF,
    NegF,
    CstQf,
    CstFq,
    CmpQ,
    CmpF,
    Refcmp,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Jumps take a u32 absolute byte offset within the method.
    JmpEqz,
    JmpNez,
    JmpLtz,
    JmpLez,
    JmpGtz,
    JmpGez,
    Jmp,
    Typeof,
    /// Call method. Operand: u32 string table index of the method name.
    Call,
    Ret,
    Leave,
    Break,
    Throw,
}

/// Immediate-width family of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    None,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Family {
    /// The fixed width of the immediate, or `None` for no immediate.
    pub fn width(self) -> Option<Width> {
        Some(match self {
            Family::None => return None,
            Family::U8 => Width::U8,
            Family::U16 => Width::U16,
            Family::U32 => Width::U32,
            Family::U64 => Width::U64,
            Family::I8 => Width::I8,
            Family::I16 => Width::I16,
            Family::I32 => Width::I32,
            Family::I64 => Width::I64,
            Family::F32 => Width::F32,
            Family::F64 => Width::F64,
        })
    }

    /// Number of immediate bytes following the opcode byte.
    pub fn immediate_size(self) -> usize {
        self.width().map_or(0, Width::size)
    }
}

/// Which interning table an interned-argument opcode indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternKind {
    String,
    Int64,
    Float64,
}

impl OpCode {
    /// Every opcode, in byte order.
    pub const ALL: [OpCode; 63] = [
        OpCode::Nop,
        OpCode::Ldl,
        OpCode::Stl,
        OpCode::Ldg,
        OpCode::Stg,
        OpCode::Lfd,
        OpCode::Sfd,
        OpCode::Ldsc,
        OpCode::Pop,
        OpCode::Swp,
        OpCode::Dup,
        OpCode::PshB,
        OpCode::PshS,
        OpCode::PshD,
        OpCode::PshQ,
        OpCode::PshF,
        OpCode::PshA,
        OpCode::PshNil,
        OpCode::ParB,
        OpCode::ParS,
        OpCode::ParD,
        OpCode::ParQ,
        OpCode::ParF,
        OpCode::ParA,
        OpCode::Lai,
        OpCode::Sai,
        OpCode::Alen,
        OpCode::And,
        OpCode::Or,
        OpCode::Xor,
        OpCode::Not,
        OpCode::Shl,
        OpCode::Shr,
        OpCode::AddQ,
        OpCode::SubQ,
        OpCode::MulQ,
        OpCode::DivQ,
        OpCode::ModQ,
        OpCode::NegQ,
        OpCode::AddF,
        OpCode::SubF,
        OpCode::MulF,
        OpCode::DivF,
        OpCode::ModF,
        OpCode::NegF,
        OpCode::CstQf,
        OpCode::CstFq,
        OpCode::CmpQ,
        OpCode::CmpF,
        OpCode::Refcmp,
        OpCode::JmpEqz,
        OpCode::JmpNez,
        OpCode::JmpLtz,
        OpCode::JmpLez,
        OpCode::JmpGtz,
        OpCode::JmpGez,
        OpCode::Jmp,
        OpCode::Typeof,
        OpCode::Call,
        OpCode::Ret,
        OpCode::Leave,
        OpCode::Break,
        OpCode::Throw,
    ];

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Ldl => "ldl",
            OpCode::Stl => "stl",
            OpCode::Ldg => "ldg",
            OpCode::Stg => "stg",
            OpCode::Lfd => "lfd",
            OpCode::Sfd => "sfd",
            OpCode::Ldsc => "ldsc",
            OpCode::Pop => "pop",
            OpCode::Swp => "swp",
            OpCode::Dup => "dup",
            OpCode::PshB => "psh_b",
            OpCode::PshS => "psh_s",
            OpCode::PshD => "psh_d",
            OpCode::PshQ => "psh_q",
            OpCode::PshF => "psh_f",
            OpCode::PshA => "psh_a",
            OpCode::PshNil => "psh_nil",
            OpCode::ParB => "par_b",
            OpCode::ParS => "par_s",
            OpCode::ParD => "par_d",
            OpCode::ParQ => "par_q",
            OpCode::ParF => "par_f",
            OpCode::ParA => "par_a",
            OpCode::Lai => "lai",
            OpCode::Sai => "sai",
            OpCode::Alen => "alen",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Xor => "xor",
            OpCode::Not => "not",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::AddQ => "add_q",
            OpCode::SubQ => "sub_q",
            OpCode::MulQ => "mul_q",
            OpCode::DivQ => "div_q",
            OpCode::ModQ => "mod_q",
            OpCode::NegQ => "neg_q",
            OpCode::AddF => "add_f",
            OpCode::SubF => "sub_f",
            OpCode::MulF => "mul_f",
            OpCode::DivF => "div_f",
            OpCode::ModF => "mod_f",
            OpCode::NegF => "neg_f",
            OpCode::CstQf => "cst_qf",
            OpCode::CstFq => "cst_fq",
            OpCode::CmpQ => "cmp_q",
            OpCode::CmpF => "cmp_f",
            OpCode::Refcmp => "refcmp",
            OpCode::JmpEqz => "jmp_eqz",
            OpCode::JmpNez => "jmp_nez",
            OpCode::JmpLtz => "jmp_ltz",
            OpCode::JmpLez => "jmp_lez",
            OpCode::JmpGtz => "jmp_gtz",
            OpCode::JmpGez => "jmp_gez",
            OpCode::Jmp => "jmp",
            OpCode::Typeof => "typeof",
            OpCode::Call => "call",
            OpCode::Ret => "ret",
            OpCode::Leave => "leave",
            OpCode::Break => "break",
            OpCode::Throw => "throw",
        }
    }

    /// Look up an opcode by its assembler mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        OpCode::ALL.into_iter().find(|op| op.mnemonic() == mnemonic)
    }

    /// Immediate-width family.
    pub fn family(self) -> Family {
        match self {
            OpCode::Ldl | OpCode::Stl => Family::U8,
            OpCode::Ldg | OpCode::Stg | OpCode::Lfd | OpCode::Sfd => Family::U16,
            OpCode::PshA
            | OpCode::ParA
            | OpCode::Call
            | OpCode::Ldsc
            | OpCode::PshQ
            | OpCode::PshF => Family::U32,
            _ if self.is_jump() => Family::U32,
            OpCode::PshB => Family::I8,
            OpCode::PshS => Family::I16,
            OpCode::PshD => Family::I32,
            _ => Family::None,
        }
    }

    /// Whether the operand is a label resolved by backpatching.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::JmpEqz
                | OpCode::JmpNez
                | OpCode::JmpLtz
                | OpCode::JmpLez
                | OpCode::JmpGtz
                | OpCode::JmpGez
                | OpCode::Jmp
        )
    }

    /// The interning table this opcode's operand is stored in, if any.
    pub fn interned_arg(self) -> Option<InternKind> {
        match self {
            OpCode::PshQ => Some(InternKind::Int64),
            OpCode::PshF => Some(InternKind::Float64),
            OpCode::PshA | OpCode::ParA | OpCode::Call | OpCode::Ldsc => Some(InternKind::String),
            _ => None,
        }
    }

    /// Total encoded size: one opcode byte plus the immediate.
    pub fn encoded_size(self) -> usize {
        1 + self.family().immediate_size()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
