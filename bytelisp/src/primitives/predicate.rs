use super::{expect_args, expect_at_least};
use crate::{ObjectType, Runtime, Value};

fn type_predicate(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    test: fn(&Runtime, Value) -> bool,
) -> Value {
    if !expect_args(runtime, name, args, 1) {
        return runtime.nil();
    }
    let holds = test(runtime, args[0]);
    runtime.boolean(holds)
}

fn has_type(runtime: &Runtime, value: Value, ty: ObjectType) -> bool {
    runtime.heap.object_type(value) == ty
}

pub fn is_atom(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "atom?", args, |rt, v| {
        !has_type(rt, v, ObjectType::Pair) || rt.heap.is_nil(v)
    })
}

pub fn is_symbol(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "symbol?", args, |rt, v| {
        has_type(rt, v, ObjectType::Symbol)
    })
}

pub fn is_list(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "list?", args, |rt, v| {
        has_type(rt, v, ObjectType::Pair)
    })
}

pub fn is_string(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "string?", args, |rt, v| {
        has_type(rt, v, ObjectType::Text)
    })
}

pub fn is_number(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "number?", args, |rt, v| {
        has_type(rt, v, ObjectType::Number)
    })
}

pub fn is_callable(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "callable?", args, |rt, v| {
        matches!(
            rt.heap.object_type(v),
            ObjectType::Native | ObjectType::Closure
        )
    })
}

pub fn is_bytecode(runtime: &mut Runtime, args: &[Value]) -> Value {
    type_predicate(runtime, "bytecode?", args, |rt, v| {
        has_type(rt, v, ObjectType::Code)
    })
}

/// `(= a b ...)`: every neighbour equal by value.
pub fn equal(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_at_least(runtime, "=", args, 1) {
        return runtime.nil();
    }
    let holds = args
        .windows(2)
        .all(|w| runtime.heap.values_equal(w[0], w[1]));
    runtime.boolean(holds)
}

pub fn not(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_args(runtime, "not", args, 1) {
        return runtime.nil();
    }
    let falsy = !runtime.is_true(args[0]);
    runtime.boolean(falsy)
}

pub fn and(runtime: &mut Runtime, args: &[Value]) -> Value {
    let holds = args.iter().all(|&arg| runtime.is_true(arg));
    runtime.boolean(holds)
}

pub fn or(runtime: &mut Runtime, args: &[Value]) -> Value {
    args.iter()
        .copied()
        .find(|&arg| runtime.is_true(arg))
        .unwrap_or(runtime.nil())
}

#[cfg(test)]
mod tests {
    use crate::Runtime;

    fn truth(runtime: &mut Runtime, source: &str) -> bool {
        let value = runtime.eval(source).expect("eval").expect("value");
        runtime.is_true(value)
    }

    #[test]
    fn type_predicates() {
        let mut rt = Runtime::default();
        assert!(truth(&mut rt, "(symbol? 'a)"));
        assert!(!truth(&mut rt, "(symbol? 1)"));
        assert!(truth(&mut rt, "(number? 1)"));
        assert!(truth(&mut rt, "(string? \"s\")"));
        assert!(truth(&mut rt, "(list? '(1))"));
        assert!(truth(&mut rt, "(list? ())"));
        assert!(truth(&mut rt, "(atom? ())"));
        assert!(!truth(&mut rt, "(atom? '(1))"));
        assert!(truth(&mut rt, "(callable? +)"));
        assert!(truth(&mut rt, "(callable? (fn (x) x))"));
        assert!(!truth(&mut rt, "(callable? 'x)"));
        assert!(truth(&mut rt, "(bytecode? (bytecode (fn () 1)))"));
    }

    #[test]
    fn equality_is_by_value() {
        let mut rt = Runtime::default();
        assert!(truth(&mut rt, "(= 'a 'a)"));
        assert!(truth(&mut rt, "(= 1 1 1)"));
        assert!(truth(&mut rt, "(= \"x\" \"x\")"));
        assert!(truth(&mut rt, "(= '(1 (2)) (list 1 (list 2)))"));
        assert!(!truth(&mut rt, "(= 1 2)"));
        assert!(!truth(&mut rt, "(= 1 \"1\")"));
    }

    #[test]
    fn logic() {
        let mut rt = Runtime::default();
        assert!(truth(&mut rt, "(not ())"));
        assert!(!truth(&mut rt, "(not 0)"));
        assert!(truth(&mut rt, "(and 1 2)"));
        assert!(!truth(&mut rt, "(and 1 ())"));
        assert!(truth(&mut rt, "(or () 2)"));
        assert!(!truth(&mut rt, "(or () ())"));

        let value = rt.eval("(or () 7)").expect("eval").expect("value");
        assert_eq!(rt.heap.number(value), Some(7.0));
    }
}
