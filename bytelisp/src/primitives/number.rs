use rand::Rng;

use super::{expect_args, expect_at_least, numbers, type_mismatch};
use crate::{Runtime, RuntimeError, Value};

fn fold(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    unary: fn(f64) -> f64,
    binary: fn(f64, f64) -> f64,
) -> Value {
    if !expect_at_least(runtime, name, args, 1) {
        return runtime.nil();
    }
    let Some(ns) = numbers(runtime, name, args) else {
        return runtime.nil();
    };
    let result = match ns.split_first() {
        Some((&first, [])) => unary(first),
        Some((&first, rest)) => rest.iter().fold(first, |acc, &n| binary(acc, n)),
        None => return runtime.nil(),
    };
    runtime.heap.make_number(result)
}

pub fn add(runtime: &mut Runtime, args: &[Value]) -> Value {
    let Some(ns) = numbers(runtime, "+", args) else {
        return runtime.nil();
    };
    runtime.heap.make_number(ns.iter().sum())
}

pub fn sub(runtime: &mut Runtime, args: &[Value]) -> Value {
    fold(runtime, "-", args, |n| -n, |a, b| a - b)
}

pub fn mul(runtime: &mut Runtime, args: &[Value]) -> Value {
    let Some(ns) = numbers(runtime, "*", args) else {
        return runtime.nil();
    };
    runtime.heap.make_number(ns.iter().product())
}

pub fn div(runtime: &mut Runtime, args: &[Value]) -> Value {
    fold(runtime, "/", args, |n| 1.0 / n, |a, b| a / b)
}

pub fn modulo(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_args(runtime, "mod", args, 2) {
        return runtime.nil();
    }
    match numbers(runtime, "mod", args).as_deref() {
        Some(&[a, b]) => runtime.heap.make_number(a % b),
        _ => runtime.nil(),
    }
}

fn unary(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    op: fn(f64) -> f64,
) -> Value {
    if !expect_args(runtime, name, args, 1) {
        return runtime.nil();
    }
    match numbers(runtime, name, args).as_deref() {
        Some(&[n]) => runtime.heap.make_number(op(n)),
        _ => runtime.nil(),
    }
}

pub fn floor(runtime: &mut Runtime, args: &[Value]) -> Value {
    unary(runtime, "floor", args, f64::floor)
}

pub fn sin(runtime: &mut Runtime, args: &[Value]) -> Value {
    unary(runtime, "sin", args, f64::sin)
}

pub fn cos(runtime: &mut Runtime, args: &[Value]) -> Value {
    unary(runtime, "cos", args, f64::cos)
}

/// `(rand)` is a float in `[0, 1)`. `(rand n)` and `(rand lo hi)` are
/// integers in `[0, n)` and `[lo, hi)`; bounds are floored.
pub fn rand(runtime: &mut Runtime, args: &[Value]) -> Value {
    if args.len() > 2 {
        runtime.report(RuntimeError::ArityMismatch {
            name: "rand".to_string(),
            expected: 2,
            got: args.len(),
        });
        return runtime.nil();
    }
    let Some(bounds) = numbers(runtime, "rand", args) else {
        return runtime.nil();
    };
    let (lo, hi) = match bounds[..] {
        [] => return runtime.heap.make_number(rand::random::<f64>()),
        [hi] => (0.0, hi.floor()),
        [lo, hi] => (lo.floor(), hi.floor()),
        _ => return runtime.nil(),
    };
    let range = lo as i64..hi as i64;
    if range.is_empty() {
        let bound = args[args.len() - 1];
        type_mismatch(runtime, "rand", "non-empty range", bound);
        return runtime.nil();
    }
    let n = rand::rng().random_range(range);
    runtime.heap.make_number(n as f64)
}

fn compare(
    runtime: &mut Runtime,
    name: &str,
    args: &[Value],
    ordered: fn(f64, f64) -> bool,
) -> Value {
    if !expect_at_least(runtime, name, args, 1) {
        return runtime.nil();
    }
    let Some(ns) = numbers(runtime, name, args) else {
        return runtime.nil();
    };
    let holds = ns.windows(2).all(|w| ordered(w[0], w[1]));
    runtime.boolean(holds)
}

pub fn lt(runtime: &mut Runtime, args: &[Value]) -> Value {
    compare(runtime, "<", args, |a, b| a < b)
}

pub fn gt(runtime: &mut Runtime, args: &[Value]) -> Value {
    compare(runtime, ">", args, |a, b| a > b)
}

#[cfg(test)]
mod tests {
    use crate::{Runtime, RuntimeError};

    fn eval_number(source: &str) -> Option<f64> {
        let mut runtime = Runtime::default();
        let value = runtime.eval(source).expect("eval")?;
        runtime.heap.number(value)
    }

    fn eval_truth(source: &str) -> bool {
        let mut runtime = Runtime::default();
        let value = runtime.eval(source).expect("eval").expect("value");
        runtime.is_true(value)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval_number("(+ 1 2 3)"), Some(6.0));
        assert_eq!(eval_number("(+)"), Some(0.0));
        assert_eq!(eval_number("(- 10 3 2)"), Some(5.0));
        assert_eq!(eval_number("(- 4)"), Some(-4.0));
        assert_eq!(eval_number("(* 2 3 4)"), Some(24.0));
        assert_eq!(eval_number("(/ 12 4)"), Some(3.0));
        assert_eq!(eval_number("(/ 4)"), Some(0.25));
        assert_eq!(eval_number("(mod 7 3)"), Some(1.0));
        assert_eq!(eval_number("(floor 2.7)"), Some(2.0));
        assert_eq!(eval_number("(cos 0)"), Some(1.0));
        assert_eq!(eval_number("(sin 0)"), Some(0.0));
    }

    #[test]
    fn comparisons() {
        assert!(eval_truth("(< 1 2 3)"));
        assert!(!eval_truth("(< 1 3 2)"));
        assert!(eval_truth("(> 3 2)"));
        assert!(!eval_truth("(> 2 2)"));
    }

    #[test]
    fn rand_stays_in_range() {
        let mut runtime = Runtime::default();
        for _ in 0..100 {
            let value = runtime.eval("(rand)").expect("eval").expect("value");
            let n = runtime.heap.number(value).expect("number");
            assert!((0.0..1.0).contains(&n), "{n}");

            let value = runtime.eval("(rand 3)").expect("eval").expect("value");
            let n = runtime.heap.number(value).expect("number");
            assert!([0.0, 1.0, 2.0].contains(&n), "{n}");

            let value =
                runtime.eval("(rand 5 7.9)").expect("eval").expect("value");
            let n = runtime.heap.number(value).expect("number");
            assert!(n == 5.0 || n == 6.0, "{n}");
        }
        assert!(runtime.diagnostics().is_empty());
    }

    #[test]
    fn rand_checks_its_arguments() {
        let mut runtime = Runtime::default();
        for source in ["(rand 1 2 3)", "(rand 'x)", "(rand 0)", "(rand 4 4)"] {
            let value = runtime.eval(source).expect("eval").expect("value");
            assert!(runtime.heap.is_nil(value), "{source}");
        }
        let diagnostics = runtime.take_diagnostics();
        assert!(matches!(
            diagnostics[..],
            [
                RuntimeError::ArityMismatch { expected: 2, got: 3, .. },
                RuntimeError::TypeMismatch { expected: "number", .. },
                RuntimeError::TypeMismatch { expected: "non-empty range", .. },
                RuntimeError::TypeMismatch { expected: "non-empty range", .. },
            ]
        ));
    }

    #[test]
    fn bad_arguments_report_and_yield_nil() {
        let mut runtime = Runtime::default();
        let value = runtime.eval("(- )").expect("eval").expect("value");
        assert!(runtime.heap.is_nil(value));
        let value = runtime.eval("(mod 1)").expect("eval").expect("value");
        assert!(runtime.heap.is_nil(value));
        let value = runtime.eval("(floor 'x)").expect("eval").expect("value");
        assert!(runtime.heap.is_nil(value));

        let diagnostics = runtime.take_diagnostics();
        assert!(matches!(
            diagnostics[..],
            [
                RuntimeError::ArityMismatch { .. },
                RuntimeError::ArityMismatch { .. },
                RuntimeError::TypeMismatch { .. },
            ]
        ));
    }
}
