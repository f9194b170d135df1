use std::fmt;

use super::op::{Op, Operand};
use crate::Value;

/// One undecoded instruction: opcode plus its operand words.
#[derive(Debug, Clone, Copy)]
pub struct RawInstruction<'a> {
    /// Word offset of the opcode.
    pub offset: usize,
    pub op: Op,
    pub operands: &'a [u32],
}

impl<'a> RawInstruction<'a> {
    /// Offset of the next instruction.
    #[inline]
    pub fn next_offset(&self) -> usize {
        self.offset + 1 + self.operands.len()
    }

    /// Heap references embedded in this instruction.
    pub fn values(self) -> impl Iterator<Item = Value> + 'a {
        self.op
            .operands()
            .iter()
            .zip(self.operands)
            .filter(|(kind, _)| **kind == Operand::Value)
            .map(|(_, word)| Value::from_raw(*word))
    }

    /// Typed view of the instruction.
    pub fn decode(&self) -> Instruction {
        let value = |i: usize| Value::from_raw(self.operands[i]);
        let int = |i: usize| self.operands[i];
        match self.op {
            Op::PushConstant => Instruction::PushConstant { value: value(0) },
            Op::PushGlobal => Instruction::PushGlobal { cell: value(0) },
            Op::Lookup => Instruction::Lookup { symbol: value(0) },
            Op::Define => Instruction::Define { symbol: value(0) },
            Op::Call => Instruction::Call { argc: int(0) },
            Op::PushLambda => Instruction::PushLambda {
                params: value(0),
                body: value(1),
                code: value(2),
            },
            Op::Branch => Instruction::Branch {
                offset: int(0) as i32,
            },
            Op::Jump => Instruction::Jump {
                offset: int(0) as i32,
            },
            Op::Pop => Instruction::Pop,
            Op::Return => Instruction::Return,
            Op::End => Instruction::End,
        }
    }
}

/// A decoded bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushConstant { value: Value },
    PushGlobal { cell: Value },
    Lookup { symbol: Value },
    Define { symbol: Value },
    Call { argc: u32 },
    PushLambda { params: Value, body: Value, code: Value },
    Branch { offset: i32 },
    Jump { offset: i32 },
    Pop,
    Return,
    End,
}

impl Instruction {
    pub fn op(&self) -> Op {
        match self {
            Instruction::PushConstant { .. } => Op::PushConstant,
            Instruction::PushGlobal { .. } => Op::PushGlobal,
            Instruction::Lookup { .. } => Op::Lookup,
            Instruction::Define { .. } => Op::Define,
            Instruction::Call { .. } => Op::Call,
            Instruction::PushLambda { .. } => Op::PushLambda,
            Instruction::Branch { .. } => Op::Branch,
            Instruction::Jump { .. } => Op::Jump,
            Instruction::Pop => Op::Pop,
            Instruction::Return => Op::Return,
            Instruction::End => Op::End,
        }
    }
}

/// Heap operands are printed as handles; use the disassembler for values.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.op().name();
        match *self {
            Instruction::PushConstant { value } => {
                write!(f, "{name} #{}", value.raw())
            }
            Instruction::PushGlobal { cell } => {
                write!(f, "{name} #{}", cell.raw())
            }
            Instruction::Lookup { symbol } | Instruction::Define { symbol } => {
                write!(f, "{name} #{}", symbol.raw())
            }
            Instruction::Call { argc } => write!(f, "{name} {argc}"),
            Instruction::PushLambda { params, body, code } => write!(
                f,
                "{name} #{} #{} #{}",
                params.raw(),
                body.raw(),
                code.raw()
            ),
            Instruction::Branch { offset } | Instruction::Jump { offset } => {
                write!(f, "{name} {offset:+}")
            }
            Instruction::Pop | Instruction::Return | Instruction::End => {
                f.write_str(name)
            }
        }
    }
}
