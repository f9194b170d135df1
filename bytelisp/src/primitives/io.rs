use std::fmt::Write as _;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use super::expect_args;
use crate::{Runtime, Value};

/// Printed forms of `args` back to back, texts raw.
fn joined(runtime: &Runtime, args: &[Value]) -> String {
    let mut out = String::new();
    for &arg in args {
        let _ = write!(out, "{}", runtime.heap.display(arg));
    }
    out
}

pub fn print(runtime: &mut Runtime, args: &[Value]) -> Value {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(joined(runtime, args).as_bytes());
    let _ = stdout.flush();
    runtime.nil()
}

pub fn println(runtime: &mut Runtime, args: &[Value]) -> Value {
    println!("{}", joined(runtime, args));
    runtime.nil()
}

/// `(str x ...)`: concatenation of the printed arguments.
pub fn str(runtime: &mut Runtime, args: &[Value]) -> Value {
    let text = joined(runtime, args);
    runtime.heap.make_text(&text)
}

pub fn time(runtime: &mut Runtime, args: &[Value]) -> Value {
    if !expect_args(runtime, "time", args, 0) {
        return runtime.nil();
    }
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    runtime.heap.make_number(seconds)
}
