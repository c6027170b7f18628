//! One-byte operation codes.

use core::fmt;

use thiserror::Error;

/// Operations recognised in a chunk's byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum OpCode {
    /// Load a constant; one operand byte holds the pool index.
    Constant = 0,
    /// Return from the current chunk.
    Return = 1,
}

/// Byte that does not name any [`OpCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct InvalidOpcode(pub u8);

impl OpCode {
    /// Every opcode, in encoding order.
    pub const ALL: [Self; 2] = [Self::Constant, Self::Return];

    /// Mnemonic used by the disassembler.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Return => "OP_RETURN",
        }
    }

    /// Operand bytes following the opcode byte.
    pub const fn operand_width(self) -> usize {
        match self {
            Self::Constant => 1,
            Self::Return => 0,
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as u8 }
}

impl TryFrom<u8> for OpCode {
    type Error = InvalidOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Constant),
            1 => Ok(Self::Return),
            other => Err(InvalidOpcode(other)),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}
