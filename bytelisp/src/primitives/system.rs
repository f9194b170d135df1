use super::{PRIMITIVES, expect_args, type_mismatch};
use crate::{ObjectType, Runtime, Value};

/// Code block of a closure, or the argument itself if it already is one.
fn code_of(runtime: &mut Runtime, name: &str, args: &[Value]) -> Option<Value> {
    if !expect_args(runtime, name, args, 1) {
        return None;
    }
    let value = args[0];
    match runtime.heap.object_type(value) {
        ObjectType::Closure => runtime.heap.closure(value).map(|c| c.code),
        ObjectType::Code => Some(value),
        _ => {
            type_mismatch(runtime, name, "closure", value);
            None
        }
    }
}

pub fn bytecode(runtime: &mut Runtime, args: &[Value]) -> Value {
    code_of(runtime, "bytecode", args).unwrap_or(runtime.nil())
}

pub fn disassemble(runtime: &mut Runtime, args: &[Value]) -> Value {
    if let Some(code) = code_of(runtime, "disassemble", args)
        && let Some(listing) = runtime.heap.disassemble(code)
    {
        print!("{listing}");
    }
    runtime.nil()
}

/// `(break)`: stop after this call; `Runtime::run` resumes.
pub fn suspend(runtime: &mut Runtime, args: &[Value]) -> Value {
    if expect_args(runtime, "break", args, 0) {
        runtime.request_break();
    }
    runtime.nil()
}

pub fn help(runtime: &mut Runtime, _args: &[Value]) -> Value {
    for desc in PRIMITIVES {
        println!("{:12} {}", desc.name, desc.doc);
    }
    runtime.nil()
}

#[cfg(test)]
mod tests {
    use crate::{ObjectType, Runtime, RuntimeError, RuntimeMode};

    #[test]
    fn bytecode_of_closure() {
        let mut rt = Runtime::default();
        let value = rt
            .eval("(bytecode (fn (x) x))")
            .expect("eval")
            .expect("value");
        assert_eq!(rt.heap.object_type(value), ObjectType::Code);
        assert!(rt.heap.disassemble(value).is_some());

        let again = rt
            .eval("(bytecode (bytecode (fn (x) x)))")
            .expect("eval")
            .expect("value");
        assert_eq!(rt.heap.object_type(again), ObjectType::Code);
    }

    #[test]
    fn bytecode_of_non_closure() {
        let mut rt = Runtime::default();
        let value = rt.eval("(bytecode 1)").expect("eval").expect("value");
        assert!(rt.heap.is_nil(value));
        assert!(matches!(
            rt.diagnostics(),
            [RuntimeError::TypeMismatch {
                got: ObjectType::Number,
                ..
            }]
        ));
    }

    #[test]
    fn break_suspends() {
        let mut rt = Runtime::default();
        assert_eq!(rt.eval("(break) 1").expect("eval"), None);
        assert_eq!(rt.mode(), RuntimeMode::Break);
        let value = rt.run().expect("resume").expect("value");
        assert_eq!(rt.heap.number(value), Some(1.0));
    }
}
