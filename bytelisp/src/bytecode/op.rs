/// Kind of a single operand word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A heap reference. Traced by the collector.
    Value,
    /// A plain integer: argument count or relative jump offset.
    Integer,
}

/// Bytecode opcodes.
///
/// Every opcode occupies one word followed by the operand words listed by
/// [`Op::operands`]. Jump offsets are relative to the word after the
/// operand and counted in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Op {
    /// Push a literal.
    /// Operands: `value`
    PushConstant = 0,

    /// Push the current value of a resolved global binding cell.
    /// Operands: `cell`
    PushGlobal,

    /// Resolve a name against the frame's parameters, then the globals.
    /// Operands: `symbol`
    Lookup,

    /// Pop a value, bind it globally, push it back.
    /// Operands: `symbol`
    Define,

    /// Call the value on top with the `argc` values beneath it.
    /// Operands: `argc:int`
    Call,

    /// Build a closure.
    /// Operands: `params`, `body`, `code`
    PushLambda,

    /// Pop; jump if the popped value is true.
    /// Operands: `offset:int`
    Branch,

    /// Unconditional jump.
    /// Operands: `offset:int`
    Jump,

    /// Discard the top of the stack.
    Pop,

    /// Leave the current frame.
    Return,

    /// Terminates a top-level block.
    End,
}

use Operand::{Integer, Value};

impl Op {
    pub const COUNT: usize = Op::End as usize + 1;

    /// Operand layout of this opcode.
    ///
    /// This is the only place operand shapes are defined; the builder, the
    /// decoder and the collector's bytecode tracer all read it.
    pub const fn operands(self) -> &'static [Operand] {
        match self {
            Op::PushConstant | Op::PushGlobal | Op::Lookup | Op::Define => {
                &[Value]
            }
            Op::PushLambda => &[Value, Value, Value],
            Op::Call | Op::Branch | Op::Jump => &[Integer],
            Op::Pop | Op::Return | Op::End => &[],
        }
    }

    /// Total width in words, opcode included.
    #[inline]
    pub const fn width(self) -> usize {
        1 + self.operands().len()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Op::PushConstant => "PushConstant",
            Op::PushGlobal => "PushGlobal",
            Op::Lookup => "Lookup",
            Op::Define => "Define",
            Op::Call => "Call",
            Op::PushLambda => "PushLambda",
            Op::Branch => "Branch",
            Op::Jump => "Jump",
            Op::Pop => "Pop",
            Op::Return => "Return",
            Op::End => "End",
        }
    }
}

impl TryFrom<u32> for Op {
    type Error = u32;

    fn try_from(word: u32) -> Result<Self, Self::Error> {
        const OPS: [Op; Op::COUNT] = [
            Op::PushConstant,
            Op::PushGlobal,
            Op::Lookup,
            Op::Define,
            Op::Call,
            Op::PushLambda,
            Op::Branch,
            Op::Jump,
            Op::Pop,
            Op::Return,
            Op::End,
        ];
        OPS.get(word as usize).copied().ok_or(word)
    }
}
