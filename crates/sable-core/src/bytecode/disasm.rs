//! Textual disassembly and structured decoding of a chunk.
//!
//! Listing format, one line per instruction:
//!
//! ```text
//! == test chunk ==
//! 0000  123 OP_CONSTANT         0 '1.2'
//! 0002    | OP_RETURN
//! ```
//!
//! The second column is the source line, or `|` when it repeats the line of
//! the previous byte.

use core::fmt::Write;

use crate::{
    bytecode::{
        chunk::{Chunk, ChunkError},
        opcode::{InvalidOpcode, OpCode},
    },
    value::Value,
};

/// Disassemble every instruction of `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");

    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Append the listing line of the instruction at `offset` to `out` and
/// return the offset of the next instruction.
///
/// Malformed input never panics: unknown bytes are listed and skipped, a
/// missing operand ends the listing.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let Some(unit) = chunk.unit_at(offset) else { return chunk.len() };

    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line_at(offset - 1) == Some(unit.line) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:>4} ", unit.line);
    }

    match OpCode::try_from(unit.byte) {
        Ok(OpCode::Constant) => constant_instruction(OpCode::Constant, chunk, offset, out),
        Ok(op @ OpCode::Return) => simple_instruction(op, offset, out),
        Err(InvalidOpcode(byte)) => {
            let _ = writeln!(out, "Unknown opcode {byte}");
            offset + 1
        }
    }
}

fn simple_instruction(op: OpCode, offset: usize, out: &mut String) -> usize {
    let _ = writeln!(out, "{}", op.name());
    offset + 1
}

fn constant_instruction(op: OpCode, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let Some(index) = chunk.byte_at(offset + 1) else {
        let _ = writeln!(out, "{:<16} <truncated>", op.name());
        return chunk.len();
    };
    match chunk.constant(usize::from(index)) {
        Some(value) => {
            let _ = writeln!(out, "{:<16} {index:>4} '{value}'", op.name());
        }
        None => {
            let _ = writeln!(out, "{:<16} {index:>4} <out of range>", op.name());
        }
    }
    offset + 2
}

/* ─────────────────────────── Vue structurée ─────────────────────────── */

/// Decoded instruction, as consumed by tooling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Instruction {
    /// Offset of the opcode byte.
    pub offset: usize,
    /// Source line of the opcode byte.
    pub line: u32,
    /// Operation.
    pub opcode: OpCode,
    /// Operand byte, for instructions that carry one.
    pub operand: Option<u8>,
    /// Constant addressed by the operand, when it is in range.
    pub constant: Option<Value>,
}

impl Instruction {
    /// Bytes taken by the instruction in the code stream.
    pub const fn width(&self) -> usize { 1 + self.opcode.operand_width() }
}

/// Iterator over the instructions of a chunk; stops after the first error.
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
}

/// Walk the instructions of `chunk` in order.
pub fn instructions(chunk: &Chunk) -> Instructions<'_> { Instructions { chunk, offset: 0 } }

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let unit = self.chunk.unit_at(offset)?;

        let decoded = decode_at(self.chunk, offset, unit.byte, unit.line);
        self.offset = match &decoded {
            Ok(instr) => offset + instr.width(),
            Err(_) => self.chunk.len(),
        };
        Some(decoded)
    }
}

fn decode_at(chunk: &Chunk, offset: usize, byte: u8, line: u32) -> Result<Instruction, ChunkError> {
    let opcode = OpCode::try_from(byte).map_err(|InvalidOpcode(byte)| ChunkError::UnknownOpcode { offset, byte })?;
    let operand = match opcode.operand_width() {
        0 => None,
        _ => Some(chunk.byte_at(offset + 1).ok_or(ChunkError::TruncatedOperand { offset, opcode })?),
    };
    let constant = match (opcode, operand) {
        (OpCode::Constant, Some(index)) => chunk.constant(usize::from(index)),
        _ => None,
    };
    Ok(Instruction { offset, line, opcode, operand, constant })
}

/// Decode the whole chunk, failing on the first malformed instruction.
pub fn decode(chunk: &Chunk) -> Result<Vec<Instruction>, ChunkError> { instructions(chunk).collect() }

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new();
        let constant = chunk.add_constant(1.2);
        chunk.write_op(OpCode::Constant, 123);
        chunk.write_byte(constant as u8, 123);
        chunk.write_op(OpCode::Return, 123);
        chunk
    }

    #[test]
    fn listing_of_sample_chunk() {
        let expected = "\
== test chunk ==
0000  123 OP_CONSTANT         0 '1.2'
0002    | OP_RETURN
";
        assert_eq!(disassemble_chunk(&sample(), "test chunk"), expected);
    }

    #[test]
    fn line_column_changes_with_source_line() {
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(2.5);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(a as u8, 1);
        chunk.write_op(OpCode::Return, 2);

        let expected = "\
== lines ==
0000    1 OP_CONSTANT         0 '2.5'
0002    2 OP_RETURN
";
        assert_eq!(disassemble_chunk(&chunk, "lines"), expected);
    }

    #[test]
    fn malformed_bytes_are_listed_not_fatal() {
        let mut chunk = Chunk::new();
        chunk.write_byte(0xFF, 1);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(9, 1);
        chunk.write_op(OpCode::Constant, 2);

        let expected = "\
== bad ==
0000    1 Unknown opcode 255
0001    | OP_CONSTANT         9 <out of range>
0003    2 OP_CONSTANT      <truncated>
";
        assert_eq!(disassemble_chunk(&chunk, "bad"), expected);
    }

    #[test]
    fn instruction_offsets_advance_by_width() {
        let chunk = sample();
        let mut out = String::new();
        assert_eq!(disassemble_instruction(&chunk, 0, &mut out), 2);
        assert_eq!(disassemble_instruction(&chunk, 2, &mut out), 3);
        assert_eq!(disassemble_instruction(&chunk, 3, &mut out), 3);
    }

    #[test]
    fn decode_sample() {
        let decoded = decode(&sample()).expect("well-formed chunk");
        assert_eq!(
            decoded,
            vec![
                Instruction {
                    offset: 0,
                    line: 123,
                    opcode: OpCode::Constant,
                    operand: Some(0),
                    constant: Some(Value::new(1.2)),
                },
                Instruction { offset: 2, line: 123, opcode: OpCode::Return, operand: None, constant: None },
            ]
        );
    }

    #[test]
    fn decode_reports_first_error() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1);
        chunk.write_byte(7, 1);
        chunk.write_byte(8, 1);
        assert_eq!(decode(&chunk), Err(ChunkError::UnknownOpcode { offset: 1, byte: 7 }));

        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 3);
        assert_eq!(
            decode(&chunk),
            Err(ChunkError::TruncatedOperand { offset: 0, opcode: OpCode::Constant })
        );
        assert_eq!(instructions(&chunk).count(), 1);
    }

    #[test]
    fn empty_chunk_has_header_only() {
        assert_eq!(disassemble_chunk(&Chunk::new(), "empty"), "== empty ==\n");
        assert_eq!(decode(&Chunk::new()), Ok(Vec::new()));
    }
}
