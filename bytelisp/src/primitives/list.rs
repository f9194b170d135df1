use super::{expect_args, type_mismatch};
use crate::{ObjectType, Runtime, Value};

/// `(cons x list)`. The tail must be a list.
pub fn cons(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_args(runtime, "cons", args, 2) {
        return runtime.nil();
    }
    let (head, tail) = (args[0], args[1]);
    if runtime.heap.object_type(tail) != ObjectType::Pair {
        type_mismatch(runtime, "cons", "list", tail);
        return runtime.nil();
    }
    runtime.heap.make_pair(Some(head), Some(tail))
}

fn list_arg(runtime: &mut Runtime, name: &str, args: &[Value]) -> Option<Value> {
    if !expect_args(runtime, name, args, 1) {
        return None;
    }
    let list = args[0];
    if runtime.heap.object_type(list) != ObjectType::Pair {
        type_mismatch(runtime, name, "list", list);
        return None;
    }
    Some(list)
}

pub fn first(runtime: &mut Runtime, args: &[Value]) -> Value {
    list_arg(runtime, "first", args)
        .and_then(|list| runtime.heap.head(list))
        .unwrap_or(runtime.nil())
}

pub fn rest(runtime: &mut Runtime, args: &[Value]) -> Value {
    list_arg(runtime, "rest", args)
        .and_then(|list| runtime.heap.tail(list))
        .unwrap_or(runtime.nil())
}

pub fn list(runtime: &mut Runtime, args: &[Value]) -> Value {
    runtime.heap.make_list(args)
}

pub fn is_nil(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_args(runtime, "nil?", args, 1) {
        return runtime.nil();
    }
    let nil = runtime.heap.is_nil(args[0]);
    runtime.boolean(nil)
}

#[cfg(test)]
mod tests {
    use crate::{Runtime, RuntimeError};

    fn eval_repr(runtime: &mut Runtime, source: &str) -> String {
        let value = runtime.eval(source).expect("eval").expect("value");
        runtime.heap.repr(value).to_string()
    }

    #[test]
    fn construct_and_take_apart() {
        let mut runtime = Runtime::default();
        assert_eq!(eval_repr(&mut runtime, "(list 1 2 3)"), "(1 2 3)");
        assert_eq!(eval_repr(&mut runtime, "(cons 1 (list 2))"), "(1 2)");
        assert_eq!(eval_repr(&mut runtime, "(cons 1 ())"), "(1)");
        assert_eq!(eval_repr(&mut runtime, "(first '(a b))"), "a");
        assert_eq!(eval_repr(&mut runtime, "(rest '(a b))"), "(b)");
        assert_eq!(eval_repr(&mut runtime, "(rest '(a))"), "nil");
        assert_eq!(eval_repr(&mut runtime, "(first ())"), "nil");
        assert_eq!(eval_repr(&mut runtime, "(list)"), "nil");
        assert!(runtime.diagnostics().is_empty());
    }

    #[test]
    fn nil_predicate() {
        let mut runtime = Runtime::default();
        assert_eq!(eval_repr(&mut runtime, "(nil? ())"), "true");
        assert_eq!(eval_repr(&mut runtime, "(nil? '(1))"), "nil");
    }

    #[test]
    fn cons_onto_non_list() {
        let mut runtime = Runtime::default();
        assert_eq!(eval_repr(&mut runtime, "(cons 1 2)"), "nil");
        assert!(matches!(
            runtime.diagnostics(),
            [RuntimeError::TypeMismatch { expected: "list", .. }]
        ));
    }
}
