mod activation;
mod bytecode;
mod compiler;
mod environment;
mod format;
mod heap;
mod interpreter;
mod object;
mod parser;
pub mod primitives;
mod stack;
mod visitor;

pub use activation::{ActivationStack, Frame, MAX_ARGS, MAX_FRAMES};
pub use bytecode::*;
pub use compiler::{CompileError, Compiler};
pub use environment::Environment;
pub use format::{DisplayValue, Disassembly, format_number};
pub use heap::{
    GarbageCollectionStats, Heap, HeapCreateInfo, ListIter, RootProvider,
};
pub use interpreter::*;
pub use object::*;
pub use parser::{MAX_NESTING, ParseError, Parsed, Parser, parse};
pub use stack::{ExecutionState, ExecutionStateInfo};
pub use visitor::{Visitable, Visitor};
