use super::op::Op;
use super::Code;
use crate::Value;

/// A forward jump whose offset has not yet been resolved.
///
/// Created by [`BytecodeBuilder::jump`] and [`BytecodeBuilder::branch`].
/// Resolve it with [`BytecodeBuilder::bind`].
#[derive(Debug)]
#[must_use]
pub struct Label {
    /// Position of the offset word.
    offset_pos: usize,
    /// Position right after the jump instruction (base for relative offset).
    base: usize,
}

/// Builds a bytecode word sequence.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    words: Vec<u32>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_code(self) -> Code {
        Code::from_words(self.words)
    }

    /// Emit `op` followed by its operand words.
    fn emit(&mut self, op: Op, operands: &[u32]) {
        debug_assert_eq!(
            op.operands().len(),
            operands.len(),
            "operand count mismatch for {}",
            op.name()
        );
        self.words.push(op as u32);
        self.words.extend_from_slice(operands);
    }

    /// `PushConstant <value>`
    pub fn push_constant(&mut self, value: Value) {
        self.emit(Op::PushConstant, &[value.raw()]);
    }

    /// `PushGlobal <cell>`
    pub fn push_global(&mut self, cell: Value) {
        self.emit(Op::PushGlobal, &[cell.raw()]);
    }

    /// `Lookup <symbol>`
    pub fn lookup(&mut self, symbol: Value) {
        self.emit(Op::Lookup, &[symbol.raw()]);
    }

    /// `Define <symbol>`
    pub fn define(&mut self, symbol: Value) {
        self.emit(Op::Define, &[symbol.raw()]);
    }

    /// `Call <argc>`
    pub fn call(&mut self, argc: u32) {
        self.emit(Op::Call, &[argc]);
    }

    /// `PushLambda <params> <body> <code>`
    pub fn push_lambda(&mut self, params: Value, body: Value, code: Value) {
        self.emit(Op::PushLambda, &[params.raw(), body.raw(), code.raw()]);
    }

    pub fn pop(&mut self) {
        self.emit(Op::Pop, &[]);
    }

    pub fn return_(&mut self) {
        self.emit(Op::Return, &[]);
    }

    pub fn end(&mut self) {
        self.emit(Op::End, &[]);
    }

    /// Emit an unconditional forward jump. Returns a [`Label`].
    pub fn jump(&mut self) -> Label {
        self.emit_jump_placeholder(Op::Jump)
    }

    /// Emit a conditional forward jump (truthy). Returns a [`Label`].
    pub fn branch(&mut self) -> Label {
        self.emit_jump_placeholder(Op::Branch)
    }

    /// Bind a forward jump label to the current position.
    pub fn bind(&mut self, label: Label) {
        let target = self.words.len();
        let offset = (target as isize - label.base as isize) as i32;
        self.words[label.offset_pos] = offset as u32;
    }

    fn emit_jump_placeholder(&mut self, op: Op) -> Label {
        self.emit(op, &[0]);
        let base = self.words.len();
        Label {
            offset_pos: base - 1,
            base,
        }
    }
}
