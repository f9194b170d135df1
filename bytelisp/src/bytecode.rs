//! Flat word-encoded instruction streams.
//!
//! - [`Op`] and its operand table.
//! - [`BytecodeBuilder`] to emit code with forward jump [`Label`]s.
//! - [`BytecodeDecoder`] to walk it again.

mod builder;
mod decoder;
mod instruction;
mod op;

pub use builder::{BytecodeBuilder, Label};
pub use decoder::{BytecodeDecoder, DecodeError, decode_at};
pub use instruction::{Instruction, RawInstruction};
pub use op::{Op, Operand};

/// A compiled block. Heap references inside it are traced by the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    words: Box<[u32]>,
}

impl Code {
    pub(crate) fn from_words(words: Vec<u32>) -> Self {
        Self {
            words: words.into_boxed_slice(),
        }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Length in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn decoder(&self) -> BytecodeDecoder<'_> {
        BytecodeDecoder::new(&self.words)
    }

    pub fn decode_at(
        &self,
        offset: usize,
    ) -> Result<RawInstruction<'_>, DecodeError> {
        decode_at(&self.words, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn decode_all(code: &Code) -> Vec<Instruction> {
        code.decoder()
            .map(|raw| raw.expect("well-formed code").decode())
            .collect()
    }

    #[test]
    fn operand_table_widths() {
        assert_eq!(Op::PushConstant.width(), 2);
        assert_eq!(Op::PushLambda.width(), 4);
        assert_eq!(Op::Call.operands(), &[Operand::Integer]);
        assert_eq!(Op::End.width(), 1);
    }

    #[test]
    fn every_opcode_round_trips_through_u32() {
        for word in 0..Op::COUNT as u32 {
            let op = Op::try_from(word).expect("valid opcode");
            assert_eq!(op as u32, word);
        }
        assert_eq!(Op::try_from(Op::COUNT as u32), Err(Op::COUNT as u32));
    }

    #[test]
    fn forward_jump() {
        let mut b = BytecodeBuilder::new();
        let label = b.jump();
        b.pop();
        b.pop();
        b.bind(label);
        b.end();
        let code = b.into_code();
        assert_eq!(
            decode_all(&code),
            vec![
                Instruction::Jump { offset: 2 },
                Instruction::Pop,
                Instruction::Pop,
                Instruction::End,
            ]
        );
    }

    #[test]
    fn branch_to_immediately_following_instruction() {
        let mut b = BytecodeBuilder::new();
        let label = b.branch();
        b.bind(label);
        b.end();
        let code = b.into_code();
        assert_eq!(
            decode_all(&code),
            vec![Instruction::Branch { offset: 0 }, Instruction::End]
        );
    }

    #[test]
    fn raw_values_skip_integer_operands() {
        let mut b = BytecodeBuilder::new();
        b.push_constant(Value::from_raw(7));
        b.call(3);
        b.push_lambda(
            Value::from_raw(1),
            Value::from_raw(2),
            Value::from_raw(3),
        );
        b.end();
        let code = b.into_code();
        let values: Vec<u32> = code
            .decoder()
            .flat_map(|raw| raw.expect("well-formed code").values())
            .map(Value::raw)
            .collect();
        assert_eq!(values, vec![7, 1, 2, 3]);
    }

    #[test]
    fn decoder_reports_bad_words() {
        let truncated = Code::from_words(vec![Op::PushLambda as u32, 1, 2]);
        let first = truncated.decoder().next().expect("one item");
        assert_eq!(
            first.map(|raw| raw.op),
            Err(DecodeError::Truncated {
                offset: 0,
                op: Op::PushLambda
            })
        );

        let invalid = Code::from_words(vec![Op::Pop as u32, 999]);
        let items: Vec<_> = invalid.decoder().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1].map(|raw| raw.op),
            Err(DecodeError::InvalidOpcode {
                offset: 1,
                word: 999
            })
        );
    }

    #[test]
    fn display_instructions() {
        assert_eq!(Instruction::Jump { offset: 4 }.to_string(), "Jump +4");
        assert_eq!(Instruction::Branch { offset: -2 }.to_string(), "Branch -2");
        assert_eq!(Instruction::Call { argc: 2 }.to_string(), "Call 2");
        assert_eq!(
            Instruction::PushConstant {
                value: Value::from_raw(5)
            }
            .to_string(),
            "PushConstant #5"
        );
        assert_eq!(Instruction::End.to_string(), "End");
    }
}
