use std::fmt;

use super::instruction::RawInstruction;
use super::op::Op;

/// Reason a word sequence could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidOpcode { offset: usize, word: u32 },
    Truncated { offset: usize, op: Op },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::InvalidOpcode { offset, .. }
            | DecodeError::Truncated { offset, .. } => offset,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidOpcode { offset, word } => {
                write!(f, "invalid opcode {word} at {offset}")
            }
            DecodeError::Truncated { offset, op } => {
                write!(f, "truncated {} at {offset}", op.name())
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode the instruction starting at `offset`.
///
/// Operand count comes from [`Op::operands`] alone; there is no length
/// field in the stream.
pub fn decode_at(
    words: &[u32],
    offset: usize,
) -> Result<RawInstruction<'_>, DecodeError> {
    let word = *words
        .get(offset)
        .ok_or(DecodeError::InvalidOpcode { offset, word: 0 })?;
    let op = Op::try_from(word)
        .map_err(|word| DecodeError::InvalidOpcode { offset, word })?;
    let start = offset + 1;
    let operands = words
        .get(start..start + op.operands().len())
        .ok_or(DecodeError::Truncated { offset, op })?;
    Ok(RawInstruction {
        offset,
        op,
        operands,
    })
}

/// Walks a word sequence instruction by instruction.
///
/// Stops after the first decode error.
pub struct BytecodeDecoder<'a> {
    words: &'a [u32],
    pos: usize,
    failed: bool,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            pos: 0,
            failed: false,
        }
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.words.len()
    }
}

impl<'a> Iterator for BytecodeDecoder<'a> {
    type Item = Result<RawInstruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_at_end() {
            return None;
        }
        match decode_at(self.words, self.pos) {
            Ok(raw) => {
                self.pos = raw.next_offset();
                Some(Ok(raw))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
