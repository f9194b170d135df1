use std::fmt::{self, Write};

use crate::{Code, Heap, Object, Op, Operand, Runtime, Value};

const DEFAULT_MAX_DEPTH: usize = 32;
const MAX_LIST_LEN: usize = 1024;

/// Printed form of a value.
///
/// Nesting deeper than `DEFAULT_MAX_DEPTH` and lists longer than
/// `MAX_LIST_LEN` are elided, so cyclic data prints in bounded time.
pub struct DisplayValue<'a> {
    heap: &'a Heap,
    value: Value,
    /// Print texts with their quotes.
    quoted: bool,
}

impl Heap {
    /// Texts printed raw, as `print` shows them.
    pub fn display(&self, value: Value) -> DisplayValue<'_> {
        DisplayValue {
            heap: self,
            value,
            quoted: false,
        }
    }

    /// Texts printed quoted, as the REPL shows results.
    pub fn repr(&self, value: Value) -> DisplayValue<'_> {
        DisplayValue {
            heap: self,
            value,
            quoted: true,
        }
    }

    pub fn disassemble(&self, code: Value) -> Option<Disassembly<'_>> {
        let code = self.code(code)?;
        Some(Disassembly { heap: self, code })
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl DisplayValue<'_> {
    fn write(
        &self,
        f: &mut fmt::Formatter<'_>,
        value: Value,
        depth: usize,
    ) -> fmt::Result {
        if depth > DEFAULT_MAX_DEPTH {
            return f.write_str("...");
        }
        match self.heap.get(value) {
            Object::Pair { .. } if self.heap.is_nil(value) => f.write_str("nil"),
            Object::Pair { .. } => self.write_list(f, value, depth),
            Object::Symbol(name) => f.write_str(name),
            Object::Number(n) => f.write_str(&format_number(*n)),
            Object::Text(text) if self.quoted => write!(f, "\"{text}\""),
            Object::Text(text) => f.write_str(text),
            Object::Native(native) => write!(f, "<native {}>", native.name),
            Object::Closure(closure) => {
                f.write_str("(fn ")?;
                self.write(f, closure.params, depth + 1)?;
                f.write_char(' ')?;
                self.write(f, closure.body, depth + 1)?;
                f.write_char(')')
            }
            Object::Code(code) => write!(f, "<bytecode {} words>", code.len()),
        }
    }

    fn write_list(
        &self,
        f: &mut fmt::Formatter<'_>,
        list: Value,
        depth: usize,
    ) -> fmt::Result {
        f.write_char('(')?;
        let mut cursor = list;
        let mut count = 0;
        loop {
            let (head, tail) = match self.heap.get(cursor) {
                Object::Pair { head, tail } => (*head, *tail),
                _ => break,
            };
            let Some(head) = head else { break };
            if count > 0 {
                f.write_char(' ')?;
            }
            self.write(f, head, depth + 1)?;
            count += 1;
            match tail {
                None => break,
                Some(tail) if matches!(self.heap.get(tail), Object::Pair { .. }) => {
                    if self.heap.is_nil(tail) {
                        break;
                    }
                    if count >= MAX_LIST_LEN {
                        f.write_str(" ...")?;
                        break;
                    }
                    cursor = tail;
                }
                Some(tail) => {
                    f.write_str(" . ")?;
                    self.write(f, tail, depth + 1)?;
                    break;
                }
            }
        }
        f.write_char(')')
    }
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.value, 0)
    }
}

/// One instruction per line: `offset: Op operands`.
pub struct Disassembly<'a> {
    heap: &'a Heap,
    code: &'a Code,
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for raw in self.code.decoder() {
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => return writeln!(f, "{:4}: <{e}>", e.offset()),
            };
            write!(f, "{:4}: {}", raw.offset, raw.op.name())?;
            for (kind, &word) in raw.op.operands().iter().zip(raw.operands) {
                match kind {
                    Operand::Value => {
                        let mut value = Value::from_raw(word);
                        // show the bound name, not the whole cell
                        if raw.op == Op::PushGlobal {
                            value = self.heap.head(value).unwrap_or(value);
                        }
                        write!(f, " {}", self.heap.repr(value))?;
                    }
                    Operand::Integer if matches!(raw.op, Op::Jump | Op::Branch) => {
                        let offset = word as i32;
                        let target =
                            raw.next_offset() as i64 + i64::from(offset);
                        write!(f, " {offset:+} (-> {target})")?;
                    }
                    Operand::Integer => write!(f, " {word}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Runtime {
    /// Value stack, top first.
    pub fn stack_to_string(&self) -> String {
        let mut out = String::new();
        for (i, &value) in self.state.stack().iter().rev().enumerate() {
            let _ = writeln!(out, "{i:4}: {}", self.heap.repr(value));
        }
        out
    }

    pub fn print_stack(&self) {
        print!("{}", self.stack_to_string());
    }

    /// Active frames, innermost first.
    pub fn frames_to_string(&self) -> String {
        let mut out = String::new();
        for (i, frame) in self.frames.iter().rev().enumerate() {
            let _ = write!(out, "#{i} {} @{}", frame.name, frame.pc);
            for (param, &arg) in self
                .heap
                .list_iter(frame.params)
                .zip(frame.args.iter())
            {
                let _ = write!(
                    out,
                    " {}={}",
                    self.heap.display(param),
                    self.heap.repr(arg)
                );
            }
            out.push('\n');
        }
        out
    }

    /// Global bindings in definition order.
    pub fn env_to_string(&self) -> String {
        let mut out = String::new();
        for (symbol, value) in self.env.bindings(&self.heap) {
            let _ = writeln!(
                out,
                "{} = {}",
                self.heap.display(symbol),
                self.heap.repr(value)
            );
        }
        out
    }
}
