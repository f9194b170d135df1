use crate::{Heap, RuntimeError, StackKind, Value};

/// Maximum number of arguments a frame holds.
pub const MAX_ARGS: usize = 64;

/// Default frame stack depth.
pub const MAX_FRAMES: usize = 1024;

/// One active closure call, or the top-level block being run.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: Box<str>,
    pub code: Value,
    /// Word offset of the next instruction.
    pub pc: usize,
    pub args: Vec<Value>,
    /// Parameter names, matched positionally against `args`.
    pub params: Value,
}

impl Frame {
    pub fn new(
        name: impl Into<Box<str>>,
        code: Value,
        args: Vec<Value>,
        params: Value,
    ) -> Self {
        debug_assert!(args.len() <= MAX_ARGS);
        Self {
            name: name.into(),
            code,
            pc: 0,
            args,
            params,
        }
    }

    /// Argument bound to the parameter called `name`.
    pub fn arg(&self, heap: &Heap, name: &str) -> Option<Value> {
        heap.list_iter(self.params)
            .position(|param| heap.symbol_name(param) == Some(name))
            .and_then(|i| self.args.get(i).copied())
    }
}

#[derive(Debug)]
pub struct ActivationStack {
    frames: Vec<Frame>,
    limit: usize,
}

impl ActivationStack {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.limit {
            return Err(RuntimeError::StackOverflow(StackKind::Frames));
        }
        log::debug!("enter {} (depth {})", frame.name, self.frames.len() + 1);
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        log::debug!("leave {} (depth {})", frame.name, self.frames.len());
        Some(frame)
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from the outermost to the innermost.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for ActivationStack {
    fn default() -> Self {
        Self::new(MAX_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapCreateInfo;

    #[test]
    fn frame_limit_is_fatal() {
        let heap = Heap::new(HeapCreateInfo::default());
        let nil = heap.nil();
        let mut frames = ActivationStack::new(2);
        frames.push(Frame::new("a", nil, vec![], nil)).expect("first");
        frames.push(Frame::new("b", nil, vec![], nil)).expect("second");
        assert_eq!(
            frames.push(Frame::new("c", nil, vec![], nil)).err(),
            Some(RuntimeError::StackOverflow(StackKind::Frames))
        );
        assert_eq!(frames.depth(), 2);
        assert_eq!(frames.current().map(|f| &*f.name), Some("b"));
    }

    #[test]
    fn arguments_resolve_by_position() {
        let mut heap = Heap::new(HeapCreateInfo::default());
        let x = heap.make_symbol("x");
        let y = heap.make_symbol("y");
        let params = heap.make_list(&[x, y]);
        let one = heap.make_number(1.0);
        let two = heap.make_number(2.0);
        let nil = heap.nil();
        let frame = Frame::new("f", nil, vec![one, two], params);
        assert_eq!(frame.arg(&heap, "x"), Some(one));
        assert_eq!(frame.arg(&heap, "y"), Some(two));
        assert_eq!(frame.arg(&heap, "z"), None);
    }
}
