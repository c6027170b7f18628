//! Helper validations reused by tooling.

use crate::{
    bytecode::{
        chunk::{Chunk, ChunkError},
        disasm::instructions,
        opcode::OpCode,
    },
    CoreResult,
};

/// Structural validation of a chunk.
///
/// Producers are trusted on the append path; this walk is the opt-in check
/// for tooling. It reports the first unknown opcode, truncated operand or
/// constant index outside the pool.
pub fn validate_chunk(chunk: &Chunk) -> CoreResult<()> {
    let count = chunk.constants().len();
    for instr in instructions(chunk) {
        let instr = instr?;
        if let (OpCode::Constant, Some(index)) = (instr.opcode, instr.operand) {
            let index = usize::from(index);
            if index >= count {
                return Err(ChunkError::ConstantOutOfRange { offset: instr.offset, index, count });
            }
        }
    }
    Ok(())
}
