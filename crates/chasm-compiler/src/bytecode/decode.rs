//! Instruction stream decoding.
//!
//! Walks a method's raw instruction bytes using the opcode family table.
//! Only the instruction stream is decoded; whole-module disassembly is not
//! provided.

use chasm_core::{DecodeError, Family, OpCode};

use crate::ir::Immediate;

/// One instruction read back from a byte stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedInstruction {
    pub offset: usize,
    pub op: OpCode,
    pub imm: Immediate,
}

/// Decode every instruction in `bytes`.
pub fn decode_instructions(bytes: &[u8]) -> Result<Vec<DecodedInstruction>, DecodeError> {
    let mut out = Vec::new();
    let mut offset = 0;

    while let Some(&byte) = bytes.get(offset) {
        let op = OpCode::try_from(byte).map_err(|_| DecodeError::UnknownOpcode { byte, offset })?;
        let start = offset + 1;
        let end = start + op.family().immediate_size();
        let raw = bytes.get(start..end).ok_or(DecodeError::Truncated {
            opcode: op.mnemonic(),
            offset,
        })?;
        out.push(DecodedInstruction {
            offset,
            op,
            imm: read_immediate(op.family(), raw),
        });
        offset = end;
    }

    Ok(out)
}

/// Extract just the opcode sequence.
pub fn opcodes(bytes: &[u8]) -> Result<Vec<OpCode>, DecodeError> {
    Ok(decode_instructions(bytes)?.into_iter().map(|d| d.op).collect())
}

// `raw` is exactly `family.immediate_size()` bytes long.
fn read_immediate(family: Family, raw: &[u8]) -> Immediate {
    fn array<const N: usize>(raw: &[u8]) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&raw[..N]);
        buf
    }

    match family {
        Family::None => Immediate::None,
        Family::U8 => Immediate::U8(raw[0]),
        Family::U16 => Immediate::U16(u16::from_le_bytes(array(raw))),
        Family::U32 => Immediate::U32(u32::from_le_bytes(array(raw))),
        Family::U64 => Immediate::U64(u64::from_le_bytes(array(raw))),
        Family::I8 => Immediate::I8(i8::from_le_bytes(array(raw))),
        Family::I16 => Immediate::I16(i16::from_le_bytes(array(raw))),
        Family::I32 => Immediate::I32(i32::from_le_bytes(array(raw))),
        Family::I64 => Immediate::I64(i64::from_le_bytes(array(raw))),
        Family::F32 => Immediate::F32(f32::from_le_bytes(array(raw))),
        Family::F64 => Immediate::F64(f64::from_le_bytes(array(raw))),
    }
}
