//! Instruction chunk: byte stream, per-byte source lines and a constant pool.

use core::ops::Range;

use thiserror::Error;

use crate::{
    array::DynArray,
    bytecode::opcode::OpCode,
    value::{Value, ValuePool},
};

/// One byte of the code stream with the source line it came from.
///
/// Bytes and lines live in a single array of records, so the two
/// projections always have the same length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CodeUnit {
    /// Opcode or operand byte.
    pub byte: u8,
    /// Source line of the instruction this byte belongs to.
    pub line: u32,
}

/// Errors reported when walking a chunk's instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// Byte at an instruction boundary that is not an opcode.
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode {
        /// Offset of the byte.
        offset: usize,
        /// Raw byte.
        byte: u8,
    },
    /// Instruction whose operand bytes run past the end of the chunk.
    #[error("{opcode} at offset {offset} is missing its operand")]
    TruncatedOperand {
        /// Offset of the opcode.
        offset: usize,
        /// The truncated instruction.
        opcode: OpCode,
    },
    /// Constant operand that does not address a pool slot.
    #[error("constant index {index} at offset {offset} is out of range (pool has {count})")]
    ConstantOutOfRange {
        /// Offset of the opcode.
        offset: usize,
        /// Index found in the operand.
        index: usize,
        /// Pool size.
        count: usize,
    },
}

/// Unit of compiled bytecode.
#[derive(Debug, Default, PartialEq)]
pub struct Chunk {
    code: DynArray<CodeUnit>,
    constants: ValuePool,
}

impl Chunk {
    /// Empty chunk; nothing is allocated until the first write.
    pub fn new() -> Self { Self { code: DynArray::new(), constants: ValuePool::new() } }

    /// Append one byte and the line it belongs to.
    pub fn write_byte(&mut self, byte: u8, line: u32) { self.code.push(CodeUnit { byte, line }); }

    /// Append an opcode byte.
    pub fn write_op(&mut self, op: OpCode, line: u32) { self.write_byte(op.into(), line); }

    /// Store `value` in the constant pool and return its index.
    ///
    /// Emitting the index as an operand is the caller's job; identical values
    /// added twice get two slots.
    pub fn add_constant(&mut self, value: impl Into<Value>) -> usize {
        self.constants.write_value(value.into());
        self.constants.len() - 1
    }

    /// Release code and pool storage; the chunk is left as if freshly created.
    pub fn free(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "sable::chunk",
            bytes = self.code.len(),
            constants = self.constants.len(),
            "free chunk"
        );
        self.code.free();
        self.constants.free();
    }

    /// Number of bytes in the code stream.
    pub fn len(&self) -> usize { self.code.len() }

    /// Whether no byte was written.
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Allocated code slots.
    pub fn capacity(&self) -> usize { self.code.capacity() }

    /// Byte at `offset`.
    pub fn byte_at(&self, offset: usize) -> Option<u8> { self.code.get(offset).map(|u| u.byte) }

    /// Source line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> { self.code.get(offset).map(|u| u.line) }

    /// Byte/line record at `offset`.
    pub fn unit_at(&self, offset: usize) -> Option<CodeUnit> { self.code.get(offset) }

    /// The code stream as records.
    pub fn units(&self) -> &[CodeUnit] { self.code.as_slice() }

    /// Byte projection of the code stream.
    pub fn code(&self) -> impl ExactSizeIterator<Item = u8> + '_ { self.code.iter().map(|u| u.byte) }

    /// Line projection of the code stream.
    pub fn lines(&self) -> impl ExactSizeIterator<Item = u32> + '_ { self.code.iter().map(|u| u.line) }

    /// The owned constant pool.
    pub fn constants(&self) -> &ValuePool { &self.constants }

    /// Constant at `index`.
    pub fn constant(&self, index: usize) -> Option<Value> { self.constants.get(index) }

    /// Iterate over contiguous runs of the same line.
    pub fn line_runs(&self) -> LineRuns<'_> { LineRuns { units: self.units(), index: 0 } }
}

/// Iterator yielding contiguous line ranges `(start..end, line)`.
pub struct LineRuns<'a> {
    units: &'a [CodeUnit],
    index: usize,
}

impl Iterator for LineRuns<'_> {
    type Item = (Range<usize>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index;
        let line = self.units.get(start)?.line;
        let run = self.units[start..].iter().take_while(|u| u.line == line).count();
        self.index = start + run;
        Some((start..self.index, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{reset_stats, stats};
    use pretty_assertions::assert_eq;

    #[test]
    fn constant_then_return_scenario() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(42.0);
        assert_eq!(idx, 0);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(idx as u8, 1);
        chunk.write_op(OpCode::Return, 2);

        assert_eq!(chunk.code().collect::<Vec<_>>(), vec![OpCode::Constant as u8, 0, OpCode::Return as u8]);
        assert_eq!(chunk.lines().collect::<Vec<_>>(), vec![1, 1, 2]);
        assert_eq!(chunk.constants().as_slice(), &[Value::new(42.0)]);
    }

    #[test]
    fn add_constant_returns_sequential_indices() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(1.0), 0);
        assert_eq!(chunk.add_constant(1.0), 1);
        assert_eq!(chunk.add_constant(Value::new(-2.0)), 2);
        assert_eq!(chunk.constant(2), Some(Value::new(-2.0)));
        assert_eq!(chunk.constant(3), None);
    }

    #[test]
    fn nine_bytes_grow_twice() {
        reset_stats();
        let mut chunk = Chunk::new();
        for i in 0..9 {
            chunk.write_byte(i, 1);
        }
        assert_eq!(chunk.capacity(), 16);
        let s = stats();
        assert_eq!(s.allocations, 1);
        assert_eq!(s.grows, 1);
        assert_eq!(s.growth_events(), 2);
    }

    #[test]
    fn free_leaves_a_fresh_chunk() {
        reset_stats();
        let mut chunk = Chunk::new();
        chunk.add_constant(3.0);
        chunk.write_op(OpCode::Constant, 7);
        chunk.write_byte(0, 7);
        chunk.free();

        assert_eq!(chunk, Chunk::new());
        assert_eq!((chunk.len(), chunk.capacity()), (0, 0));
        assert_eq!((chunk.constants().len(), chunk.constants().capacity()), (0, 0));
        assert_eq!(stats().bytes_allocated, 0);

        chunk.free();
        assert_eq!(stats().frees, 2);
    }

    #[test]
    fn reads_past_the_end_are_none() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 4);
        assert_eq!(chunk.byte_at(0), Some(1));
        assert_eq!(chunk.line_at(0), Some(4));
        assert_eq!(chunk.byte_at(1), None);
        assert_eq!(chunk.line_at(1), None);
        assert_eq!(chunk.unit_at(1), None);
    }

    #[test]
    fn line_runs_group_contiguous_lines() {
        let mut chunk = Chunk::new();
        for line in [1, 1, 1, 2, 3, 3, 1] {
            chunk.write_byte(0, line);
        }
        let runs: Vec<_> = chunk.line_runs().collect();
        assert_eq!(runs, vec![(0..3, 1), (3..4, 2), (4..6, 3), (6..7, 1)]);
        assert_eq!(Chunk::new().line_runs().count(), 0);
    }
}
