//! Bytecode primitives (opcodes, chunk, disassembler, validation).

/// One-byte operation codes.
pub mod opcode;
/// Chunk representation: code records, line runs, constant pool.
pub mod chunk;
/// Listing and structured decoding.
pub mod disasm;
/// Opt-in structural validation.
pub mod helpers;

pub use chunk::{Chunk, ChunkError, CodeUnit, LineRuns};
pub use disasm::{decode, disassemble_chunk, disassemble_instruction, instructions, Instruction};
pub use helpers::validate_chunk;
pub use opcode::{InvalidOpcode, OpCode};
