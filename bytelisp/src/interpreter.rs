//! Frame-based bytecode interpreter.
//!
//! One [`Runtime`] owns the heap, the global environment, the shared value
//! stack and the frame stack. Programs are queues of top-level forms; each
//! form is compiled right before it runs, so it sees every global defined
//! by the forms before it.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use crate::{
    ActivationStack, Closure, CompileError, Compiler, Environment,
    ExecutionState, ExecutionStateInfo, Frame, GarbageCollectionStats, Heap,
    HeapCreateInfo, Instruction, Native, NativeFn, ObjectType, ParseError,
    RootProvider, Value, activation::MAX_FRAMES, parse, primitives,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Values,
    Frames,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: ObjectType,
    },
    NotCallable {
        got: ObjectType,
    },
    UnboundSymbol {
        name: String,
    },
    StackOverflow(StackKind),
    StackUnderflow,
    MalformedBytecode {
        offset: usize,
        message: String,
    },
    Parse(ParseError),
    Compile(CompileError),
    Io {
        path: String,
        message: String,
    },
}

impl RuntimeError {
    /// Fatal errors abort the running program; everything else is
    /// reported and execution continues with nil.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::StackOverflow(_)
                | RuntimeError::StackUnderflow
                | RuntimeError::MalformedBytecode { .. }
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::ArityMismatch {
                name,
                expected,
                got,
            } => write!(f, "{name}: expected {expected} arguments, got {got}"),
            RuntimeError::TypeMismatch {
                name,
                expected,
                got,
            } => write!(f, "{name}: expected {expected}, got {got}"),
            RuntimeError::NotCallable { got } => {
                write!(f, "{got} is not callable")
            }
            RuntimeError::UnboundSymbol { name } => {
                write!(f, "unbound symbol {name}")
            }
            RuntimeError::StackOverflow(StackKind::Values) => {
                f.write_str("value stack overflow")
            }
            RuntimeError::StackOverflow(StackKind::Frames) => {
                f.write_str("frame stack overflow")
            }
            RuntimeError::StackUnderflow => f.write_str("value stack underflow"),
            RuntimeError::MalformedBytecode { offset, message } => {
                write!(f, "malformed bytecode at {offset}: {message}")
            }
            RuntimeError::Parse(e) => write!(f, "parse error: {e}"),
            RuntimeError::Compile(e) => write!(f, "compile error: {e}"),
            RuntimeError::Io { path, message } => {
                write!(f, "cannot read {path}: {message}")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Run,
    /// Suspended between two instructions.
    Break,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Finished,
}

#[derive(Debug, Clone)]
pub struct RuntimeCreateInfo {
    pub heap: HeapCreateInfo,
    pub state: ExecutionStateInfo,
    pub frame_limit: usize,
    /// Install the builtin library.
    pub builtins: bool,
}

impl Default for RuntimeCreateInfo {
    fn default() -> Self {
        Self {
            heap: HeapCreateInfo::default(),
            state: ExecutionStateInfo::default(),
            frame_limit: MAX_FRAMES,
            builtins: true,
        }
    }
}

pub struct Runtime {
    pub heap: Heap,
    pub env: Environment,
    pub state: ExecutionState,
    pub frames: ActivationStack,
    /// Parsed top-level forms that have not started yet.
    pending: VecDeque<Value>,
    mode: RuntimeMode,
    true_value: Value,
    /// Stack depth when the current program started.
    program_base: usize,
    /// The last finished top-level form left its value on top.
    has_result: bool,
    diagnostics: Vec<RuntimeError>,
}

struct RuntimeRoots<'a> {
    state: &'a ExecutionState,
    frames: &'a ActivationStack,
    env: &'a Environment,
    pending: &'a VecDeque<Value>,
    true_value: Value,
}

impl RootProvider for RuntimeRoots<'_> {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(Value)) {
        for &value in self.state.stack() {
            visitor(value);
        }
        for frame in self.frames.iter() {
            visitor(frame.code);
            visitor(frame.params);
            for &arg in &frame.args {
                visitor(arg);
            }
        }
        visitor(self.env.root());
        for &form in self.pending {
            visitor(form);
        }
        visitor(self.true_value);
    }
}

impl Runtime {
    pub fn new(info: RuntimeCreateInfo) -> Self {
        let mut heap = Heap::new(info.heap);
        let env = Environment::new(&mut heap);
        let true_value = heap.make_symbol("true");
        let mut runtime = Self {
            heap,
            env,
            state: ExecutionState::new(&info.state),
            frames: ActivationStack::new(info.frame_limit),
            pending: VecDeque::new(),
            mode: RuntimeMode::Finished,
            true_value,
            program_base: 0,
            has_result: false,
            diagnostics: Vec::new(),
        };
        runtime.define_global("nil", runtime.nil());
        runtime.define_global("true", true_value);
        if info.builtins {
            primitives::install(&mut runtime);
        }
        runtime
    }

    #[inline]
    pub fn nil(&self) -> Value {
        self.heap.nil()
    }

    #[inline]
    pub fn true_value(&self) -> Value {
        self.true_value
    }

    /// Everything except nil is true.
    #[inline]
    pub fn is_true(&self, value: Value) -> bool {
        !self.heap.is_nil(value)
    }

    pub fn boolean(&self, b: bool) -> Value {
        if b { self.true_value } else { self.nil() }
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn define_global(&mut self, name: &str, value: Value) -> Value {
        let symbol = self.heap.make_symbol(name);
        self.env.define(&mut self.heap, symbol, value)
    }

    pub fn define_native(&mut self, name: &'static str, func: NativeFn) {
        let native = self.heap.make_native(name, func);
        self.define_global(name, native);
    }

    /// Record a non-fatal error.
    pub fn report(&mut self, error: RuntimeError) {
        log::warn!("{error}");
        self.diagnostics.push(error);
    }

    pub fn diagnostics(&self) -> &[RuntimeError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Ask the run loop to stop at the next instruction boundary.
    pub fn request_break(&mut self) {
        self.mode = RuntimeMode::Break;
    }

    pub fn compile_form(&mut self, form: Value) -> Result<Value, CompileError> {
        Compiler::compile(&mut self.heap, &self.env, form)
    }

    /// Parse `source` and queue its forms as a new program without running it.
    ///
    /// A suspended program is discarded first.
    pub fn queue(&mut self, source: &str) {
        if !self.frames.is_empty() || !self.pending.is_empty() {
            log::warn!("discarding suspended program");
            self.frames.clear();
            self.pending.clear();
            self.state.truncate(self.program_base);
        }
        let parsed = parse(&mut self.heap, source);
        if let Some(e) = parsed.error {
            self.report(RuntimeError::Parse(e));
        }
        self.pending.extend(parsed.forms);
        self.program_base = self.state.depth();
        self.has_result = false;
        self.mode = RuntimeMode::Run;
    }

    /// Evaluate every form in `source`.
    ///
    /// Returns the value of the last form, left on top of the stack, or
    /// `None` if the program was suspended or produced nothing.
    pub fn eval(
        &mut self,
        source: &str,
    ) -> Result<Option<Value>, RuntimeError> {
        self.queue(source);
        self.run()
    }

    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Option<Value>, RuntimeError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| RuntimeError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.eval(&source)
    }

    /// Run until the program finishes or a break is requested.
    ///
    /// Calling it again on a suspended program resumes it.
    pub fn run(&mut self) -> Result<Option<Value>, RuntimeError> {
        self.mode = RuntimeMode::Run;
        loop {
            if self.mode == RuntimeMode::Break {
                log::debug!("suspended");
                return Ok(None);
            }
            if self.step()? == StepResult::Finished {
                return Ok(self.result());
            }
        }
    }

    /// Value of the last finished top-level form, if it is still on top.
    pub fn result(&self) -> Option<Value> {
        if self.has_result {
            self.state.peek()
        } else {
            None
        }
    }

    /// Execute exactly one instruction, starting the next queued form if no
    /// frame is active.
    pub fn step(&mut self) -> Result<StepResult, RuntimeError> {
        if self.frames.is_empty() {
            match self.start_next_form() {
                Ok(true) => {}
                Ok(false) => {
                    self.mode = RuntimeMode::Finished;
                    return Ok(StepResult::Finished);
                }
                Err(e) => return Err(self.abort(e)),
            }
        }
        if let Err(e) = self.execute() {
            return Err(self.abort(e));
        }
        if self.frames.is_empty() {
            self.has_result = true;
            if self.pending.is_empty() {
                self.mode = RuntimeMode::Finished;
                return Ok(StepResult::Finished);
            }
        }
        Ok(StepResult::Continue)
    }

    /// Compile the next queued form and enter it. Forms that fail to
    /// compile are reported and skipped.
    fn start_next_form(&mut self) -> Result<bool, RuntimeError> {
        // the previous form's value is dropped
        self.state.truncate(self.program_base);
        self.has_result = false;
        while let Some(form) = self.pending.pop_front() {
            match self.compile_form(form) {
                Ok(code) => {
                    let frame = Frame::new("top-level", code, vec![], self.nil());
                    self.frames.push(frame)?;
                    return Ok(true);
                }
                Err(e) => self.report(RuntimeError::Compile(e)),
            }
        }
        Ok(false)
    }

    /// Drop the running program after a fatal error.
    fn abort(&mut self, error: RuntimeError) -> RuntimeError {
        log::error!("aborting program: {error}");
        self.frames.clear();
        self.pending.clear();
        self.state.truncate(self.program_base);
        self.has_result = false;
        self.mode = RuntimeMode::Finished;
        error
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        let Some(frame) = self.frames.current() else {
            return Ok(());
        };
        let pc = frame.pc;
        let code = self.heap.code(frame.code).ok_or_else(|| {
            RuntimeError::MalformedBytecode {
                offset: pc,
                message: "frame code is not a bytecode block".to_string(),
            }
        })?;
        let raw = code.decode_at(pc).map_err(|e| {
            RuntimeError::MalformedBytecode {
                offset: e.offset(),
                message: e.to_string(),
            }
        })?;
        let instruction = raw.decode();
        let next = raw.next_offset();
        log::trace!("{}@{pc}: {instruction}", frame.name);

        if let Some(frame) = self.frames.current_mut() {
            frame.pc = next;
        }

        match instruction {
            Instruction::PushConstant { value } => self.state.push(value),
            Instruction::PushGlobal { cell } => {
                let value = self.heap.tail(cell).unwrap_or(self.heap.nil());
                self.state.push(value)
            }
            Instruction::Lookup { symbol } => {
                let value = self.lookup(symbol);
                self.state.push(value)
            }
            Instruction::Define { symbol } => {
                let value = self.state.pop()?;
                self.define(symbol, value);
                self.state.push(value)
            }
            Instruction::Call { argc } => self.call(argc as usize),
            Instruction::PushLambda { params, body, code } => {
                let closure = self.heap.make_closure(params, body, code);
                self.state.push(closure)
            }
            Instruction::Branch { offset } => {
                let test = self.state.pop()?;
                if self.is_true(test) {
                    self.jump(offset)?;
                }
                Ok(())
            }
            Instruction::Jump { offset } => self.jump(offset),
            Instruction::Pop => self.state.pop().map(drop),
            Instruction::Return | Instruction::End => {
                self.frames.pop();
                Ok(())
            }
        }
    }

    fn jump(&mut self, offset: i32) -> Result<(), RuntimeError> {
        let Some(frame) = self.frames.current_mut() else {
            return Ok(());
        };
        let pc = frame.pc;
        frame.pc = pc.checked_add_signed(offset as isize).ok_or_else(|| {
            RuntimeError::MalformedBytecode {
                offset: pc,
                message: format!("jump {offset:+} out of range"),
            }
        })?;
        Ok(())
    }

    /// Frame parameters first, then globals. Unbound names yield nil.
    fn lookup(&mut self, symbol: Value) -> Value {
        let name = self.heap.symbol_name(symbol).unwrap_or_default();
        let found = self
            .frames
            .current()
            .and_then(|frame| frame.arg(&self.heap, name))
            .or_else(|| self.env.lookup(&self.heap, name));
        if let Some(value) = found {
            return value;
        }
        let name = name.to_string();
        self.report(RuntimeError::UnboundSymbol { name });
        self.nil()
    }

    fn define(&mut self, symbol: Value, value: Value) {
        self.env.define(&mut self.heap, symbol, value);
        let name = self.heap.symbol_name(symbol).map(Box::<str>::from);
        if let Some(closure) = self.heap.closure_mut(value) {
            if closure.name.is_none() {
                closure.name = name;
            }
        }
    }

    /// `[.. args callable]` → `[.. result]`, or a new frame for closures.
    fn call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let depth = self.state.depth();
        let base = depth
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        let callable = self.state.peek().ok_or(RuntimeError::StackUnderflow)?;

        if let Some(native) = self.heap.native(callable) {
            return self.call_native(native, base, depth - 1);
        }
        if let Some(closure) = self.heap.closure(callable) {
            let closure = closure.clone();
            return self.call_closure(closure, argc, base);
        }

        let got = self.heap.object_type(callable);
        self.report(RuntimeError::NotCallable { got });
        self.state.truncate(base);
        self.state.push(self.heap.nil())
    }

    /// Arguments stay on the stack while the native runs.
    fn call_native(
        &mut self,
        native: Native,
        base: usize,
        end: usize,
    ) -> Result<(), RuntimeError> {
        let args = self.state.stack()[base..end].to_vec();
        let result = (native.func)(self, &args);
        self.state.truncate(base);
        self.state.push(result)
    }

    fn call_closure(
        &mut self,
        closure: Closure,
        argc: usize,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let name = closure.name.unwrap_or_else(|| Box::from("λ"));
        let expected = self.heap.list_len(closure.params);
        if expected != argc {
            self.report(RuntimeError::ArityMismatch {
                name: name.into(),
                expected,
                got: argc,
            });
            self.state.truncate(base);
            return self.state.push(self.heap.nil());
        }
        // callable
        self.state.pop()?;
        let args = self.state.stack_pop_slice(argc)?;
        self.frames
            .push(Frame::new(name, closure.code, args, closure.params))
    }

    /// Mark-sweep over every root the runtime holds.
    ///
    /// Only call this between instructions.
    pub fn collect(&mut self) -> GarbageCollectionStats {
        let mut roots = RuntimeRoots {
            state: &self.state,
            frames: &self.frames,
            env: &self.env,
            pending: &self.pending,
            true_value: self.true_value,
        };
        self.heap.collect(&mut roots)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeCreateInfo::default())
    }
}
