//! Builtin host procedures.
//!
//! Every primitive has the [`NativeFn`] signature. Bad arguments are
//! reported through [`Runtime::report`] and answered with nil.

use crate::{NativeFn, Runtime, RuntimeError, Value};

pub mod io;
pub mod list;
pub mod number;
pub mod predicate;
pub mod system;

#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    pub func: NativeFn,
    /// One line shown by `help`.
    pub doc: &'static str,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, func: NativeFn, doc: &'static str) -> Self {
        Self { name, func, doc }
    }
}

pub const PRIMITIVES: &[PrimitiveDesc] = &[
    PrimitiveDesc::new("+", number::add, "(+ n...) sum"),
    PrimitiveDesc::new("-", number::sub, "(- n m...) difference, (- n) negation"),
    PrimitiveDesc::new("*", number::mul, "(* n...) product"),
    PrimitiveDesc::new("/", number::div, "(/ n m...) quotient, (/ n) reciprocal"),
    PrimitiveDesc::new("mod", number::modulo, "(mod n m) remainder"),
    PrimitiveDesc::new("floor", number::floor, "(floor n)"),
    PrimitiveDesc::new("sin", number::sin, "(sin n)"),
    PrimitiveDesc::new("cos", number::cos, "(cos n)"),
    PrimitiveDesc::new(
        "rand",
        number::rand,
        "(rand) in [0, 1), (rand n) integer below n, (rand lo hi)",
    ),
    PrimitiveDesc::new("<", number::lt, "(< n...) strictly increasing"),
    PrimitiveDesc::new(">", number::gt, "(> n...) strictly decreasing"),
    PrimitiveDesc::new("=", predicate::equal, "(= a b...) equal by value"),
    PrimitiveDesc::new("not", predicate::not, "(not x)"),
    PrimitiveDesc::new("and", predicate::and, "(and x...) true if all are"),
    PrimitiveDesc::new("or", predicate::or, "(or x...) first true argument"),
    PrimitiveDesc::new("atom?", predicate::is_atom, "(atom? x) not a non-empty list"),
    PrimitiveDesc::new("symbol?", predicate::is_symbol, "(symbol? x)"),
    PrimitiveDesc::new("list?", predicate::is_list, "(list? x)"),
    PrimitiveDesc::new("string?", predicate::is_string, "(string? x)"),
    PrimitiveDesc::new("number?", predicate::is_number, "(number? x)"),
    PrimitiveDesc::new("callable?", predicate::is_callable, "(callable? x)"),
    PrimitiveDesc::new("bytecode?", predicate::is_bytecode, "(bytecode? x)"),
    PrimitiveDesc::new("nil?", list::is_nil, "(nil? x)"),
    PrimitiveDesc::new("cons", list::cons, "(cons x list)"),
    PrimitiveDesc::new("first", list::first, "(first list)"),
    PrimitiveDesc::new("rest", list::rest, "(rest list)"),
    PrimitiveDesc::new("list", list::list, "(list x...)"),
    PrimitiveDesc::new("print", io::print, "(print x...) without newline"),
    PrimitiveDesc::new("println", io::println, "(println x...)"),
    PrimitiveDesc::new("str", io::str, "(str x...) concatenated text"),
    PrimitiveDesc::new("time", io::time, "(time) seconds since the epoch"),
    PrimitiveDesc::new("bytecode", system::bytecode, "(bytecode fn) compiled block"),
    PrimitiveDesc::new("disassemble", system::disassemble, "(disassemble fn)"),
    PrimitiveDesc::new("break", system::suspend, "(break) pause the program"),
    PrimitiveDesc::new("help", system::help, "(help) this list"),
];

/// Bind every primitive as a global.
pub fn install(runtime: &mut Runtime) {
    for desc in PRIMITIVES {
        runtime.define_native(desc.name, desc.func);
    }
}

pub(crate) fn expect_args(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    expected: usize,
) -> bool {
    if args.len() == expected {
        return true;
    }
    runtime.report(RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected,
        got: args.len(),
    });
    false
}

pub(crate) fn expect_at_least(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    min: usize,
) -> bool {
    if args.len() >= min {
        return true;
    }
    runtime.report(RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected: min,
        got: args.len(),
    });
    false
}

pub(crate) fn type_mismatch(
    runtime: &mut Runtime,
    name: &str,
    expected: &'static str,
    value: Value,
) {
    let got = runtime.heap.object_type(value);
    runtime.report(RuntimeError::TypeMismatch {
        name: name.to_string(),
        expected,
        got,
    });
}

/// All arguments as numbers, or `None` after reporting the first
/// offending one.
pub(crate) fn numbers(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
) -> Option<Vec<f64>> {
    let mut out = Vec::with_capacity(args.len());
    for &arg in args {
        match runtime.heap.number(arg) {
            Some(n) => out.push(n),
            None => {
                type_mismatch(runtime, name, "number", arg);
                return None;
            }
        }
    }
    Some(out)
}
