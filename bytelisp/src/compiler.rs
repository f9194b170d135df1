//! Lowers s-expression forms into bytecode blocks.
//!
//! A bare symbol compiles to one of two references:
//! - `Lookup` when it names a parameter of the enclosing `fn`, or names
//!   nothing known yet. Resolved by name when executed.
//! - `PushGlobal` carrying the binding cell of an already defined global.
//!   The cell is updated in place on redefinition, so later `def`s stay
//!   visible.

use crate::{
    BytecodeBuilder, Environment, Heap, MAX_NESTING, ObjectType, Value,
    activation::MAX_ARGS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    /// Printed form the error was raised for.
    pub form: String,
}

impl CompileError {
    fn new(message: impl Into<String>, heap: &Heap, form: Value) -> Self {
        Self {
            message: message.into(),
            form: heap.repr(form).to_string(),
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in {}", self.message, self.form)
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Quote,
    Def,
    Fn,
    If,
    Do,
}

impl SpecialForm {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "quote" => Some(SpecialForm::Quote),
            "def" => Some(SpecialForm::Def),
            "fn" => Some(SpecialForm::Fn),
            "if" => Some(SpecialForm::If),
            "do" => Some(SpecialForm::Do),
            _ => None,
        }
    }
}

pub struct Compiler<'a> {
    heap: &'a mut Heap,
    env: &'a Environment,
    /// Parameter list of the `fn` being compiled.
    params: Option<Value>,
    builder: BytecodeBuilder,
    /// Nesting level of the expression being compiled.
    depth: usize,
}

impl<'a> Compiler<'a> {
    /// Compile one top-level form into a code block ending in `End`.
    pub fn compile(
        heap: &'a mut Heap,
        env: &'a Environment,
        form: Value,
    ) -> Result<Value, CompileError> {
        let mut compiler = Compiler {
            heap,
            env,
            params: None,
            builder: BytecodeBuilder::new(),
            depth: 0,
        };
        compiler.compile_expr(form)?;
        compiler.builder.end();
        let code = compiler.finish();
        log::debug!("compiled {}", compiler.heap.repr(form));
        Ok(code)
    }

    fn finish(&mut self) -> Value {
        let builder = std::mem::take(&mut self.builder);
        self.heap.make_code(builder.into_code())
    }

    /// Compile a lambda body into its own block.
    fn compile_lambda(
        &mut self,
        params: Value,
        body: Value,
    ) -> Result<Value, CompileError> {
        let mut inner = Compiler {
            heap: &mut *self.heap,
            env: self.env,
            params: Some(params),
            builder: BytecodeBuilder::new(),
            depth: self.depth,
        };
        inner.compile_expr(body)?;
        inner.builder.return_();
        inner.builder.end();
        let code = inner.finish();
        log::debug!("compiled lambda body {}", self.heap.repr(body));
        Ok(code)
    }

    fn compile_expr(&mut self, form: Value) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("form nested too deeply", form));
        }
        self.depth += 1;
        let result = self.compile_form(form);
        self.depth -= 1;
        result
    }

    fn compile_form(&mut self, form: Value) -> Result<(), CompileError> {
        match self.heap.object_type(form) {
            ObjectType::Symbol => {
                self.compile_symbol(form);
                Ok(())
            }
            ObjectType::Pair => match self.heap.head(form) {
                Some(head) => self.compile_list(form, head),
                None if self.heap.is_nil(form) => {
                    self.builder.push_constant(self.heap.nil());
                    Ok(())
                }
                None => Err(self.error("pair without head", form)),
            },
            _ => {
                self.builder.push_constant(form);
                Ok(())
            }
        }
    }

    fn is_param(&self, name: &str) -> bool {
        self.params.is_some_and(|params| {
            self.heap
                .list_iter(params)
                .any(|param| self.heap.symbol_name(param) == Some(name))
        })
    }

    fn compile_symbol(&mut self, symbol: Value) {
        let name = self.heap.symbol_name(symbol).unwrap_or_default();
        let cell = if self.is_param(name) {
            None
        } else {
            self.env.find_cell(&*self.heap, name)
        };
        match cell {
            Some(cell) => self.builder.push_global(cell),
            None => self.builder.lookup(symbol),
        }
    }

    fn compile_list(
        &mut self,
        form: Value,
        head: Value,
    ) -> Result<(), CompileError> {
        let args: Vec<Value> = match self.heap.tail(form) {
            Some(tail) => self.heap.list_iter(tail).collect(),
            None => Vec::new(),
        };
        let special = self
            .heap
            .symbol_name(head)
            .and_then(SpecialForm::from_name);
        match special {
            Some(SpecialForm::Quote) => self.compile_quote(form, &args),
            Some(SpecialForm::Def) => self.compile_def(form, &args),
            Some(SpecialForm::Fn) => self.compile_fn(form, &args),
            Some(SpecialForm::If) => self.compile_if(form, &args),
            Some(SpecialForm::Do) => self.compile_do(&args),
            None => self.compile_call(form, head, &args),
        }
    }

    fn error(&self, message: &str, form: Value) -> CompileError {
        CompileError::new(message, &*self.heap, form)
    }

    fn compile_quote(
        &mut self,
        form: Value,
        args: &[Value],
    ) -> Result<(), CompileError> {
        let [quoted] = args else {
            return Err(self.error("quote takes exactly one argument", form));
        };
        self.builder.push_constant(*quoted);
        Ok(())
    }

    fn compile_def(
        &mut self,
        form: Value,
        args: &[Value],
    ) -> Result<(), CompileError> {
        let [name, expr] = args else {
            return Err(self.error("def takes a name and a value", form));
        };
        if self.heap.object_type(*name) != ObjectType::Symbol {
            return Err(self.error("def name must be a symbol", form));
        }
        self.compile_expr(*expr)?;
        self.builder.define(*name);
        Ok(())
    }

    fn compile_fn(
        &mut self,
        form: Value,
        args: &[Value],
    ) -> Result<(), CompileError> {
        let [params, body] = args else {
            return Err(
                self.error("fn takes a parameter list and a body", form)
            );
        };
        if self.heap.object_type(*params) != ObjectType::Pair {
            return Err(self.error("fn parameters must be a list", form));
        }
        let mut count = 0;
        for param in self.heap.list_iter(*params) {
            if self.heap.object_type(param) != ObjectType::Symbol {
                return Err(self.error("fn parameter must be a symbol", form));
            }
            count += 1;
        }
        if count > MAX_ARGS {
            return Err(self.error("too many parameters", form));
        }
        let code = self.compile_lambda(*params, *body)?;
        self.builder.push_lambda(*params, *body, code);
        Ok(())
    }

    /// `test; Branch then; else; Jump end; then: ...; end:`
    fn compile_if(
        &mut self,
        form: Value,
        args: &[Value],
    ) -> Result<(), CompileError> {
        let (test, then, otherwise) = match *args {
            [test, then] => (test, then, None),
            [test, then, otherwise] => (test, then, Some(otherwise)),
            _ => {
                return Err(
                    self.error("if takes a test and one or two branches", form)
                );
            }
        };
        self.compile_expr(test)?;
        let to_then = self.builder.branch();
        match otherwise {
            Some(otherwise) => self.compile_expr(otherwise)?,
            None => self.builder.push_constant(self.heap.nil()),
        }
        let to_end = self.builder.jump();
        self.builder.bind(to_then);
        self.compile_expr(then)?;
        self.builder.bind(to_end);
        Ok(())
    }

    fn compile_do(&mut self, body: &[Value]) -> Result<(), CompileError> {
        let Some((last, init)) = body.split_last() else {
            self.builder.push_constant(self.heap.nil());
            return Ok(());
        };
        for &expr in init {
            self.compile_expr(expr)?;
            self.builder.pop();
        }
        self.compile_expr(*last)
    }

    /// Arguments left to right, then the callable, then `Call`.
    fn compile_call(
        &mut self,
        form: Value,
        callee: Value,
        args: &[Value],
    ) -> Result<(), CompileError> {
        if args.len() > MAX_ARGS {
            return Err(self.error("too many arguments", form));
        }
        for &arg in args {
            self.compile_expr(arg)?;
        }
        self.compile_expr(callee)?;
        self.builder.call(args.len() as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeapCreateInfo, Instruction, parse};

    struct TestEnv {
        heap: Heap,
        env: Environment,
    }

    fn create_test_env() -> TestEnv {
        let mut heap = Heap::new(HeapCreateInfo::default());
        let env = Environment::new(&mut heap);
        TestEnv { heap, env }
    }

    impl TestEnv {
        fn read(&mut self, source: &str) -> Value {
            let parsed = parse(&mut self.heap, source);
            assert!(parsed.error.is_none(), "parse error in {source}");
            parsed.forms[0]
        }

        fn compile(&mut self, source: &str) -> Result<Value, CompileError> {
            let form = self.read(source);
            Compiler::compile(&mut self.heap, &self.env, form)
        }

        fn instructions(&self, code: Value) -> Vec<Instruction> {
            self.heap
                .code(code)
                .expect("code block")
                .decoder()
                .map(|raw| raw.expect("well-formed").decode())
                .collect()
        }

        fn compile_ok(&mut self, source: &str) -> Vec<Instruction> {
            let code = self.compile(source).expect("compile error");
            self.instructions(code)
        }

        fn define(&mut self, name: &str, number: f64) -> Value {
            let symbol = self.heap.make_symbol(name);
            let value = self.heap.make_number(number);
            self.env.define(&mut self.heap, symbol, value)
        }
    }

    #[test]
    fn compile_literal() {
        let mut t = create_test_env();
        let code = t.compile_ok("42");
        let [Instruction::PushConstant { value }, Instruction::End] = code[..]
        else {
            panic!("unexpected code {code:?}");
        };
        assert_eq!(t.heap.number(value), Some(42.0));
    }

    #[test]
    fn compile_empty_list_pushes_nil() {
        let mut t = create_test_env();
        let nil = t.heap.nil();
        assert_eq!(
            t.compile_ok("()"),
            vec![Instruction::PushConstant { value: nil }, Instruction::End]
        );
    }

    #[test]
    fn compile_symbol_strategies() {
        let mut t = create_test_env();
        let cell = t.define("known", 1.0);
        assert_eq!(
            t.compile_ok("known"),
            vec![Instruction::PushGlobal { cell }, Instruction::End]
        );
        let code = t.compile_ok("unknown");
        assert!(matches!(code[0], Instruction::Lookup { .. }));
    }

    #[test]
    fn compile_params_shadow_globals() {
        let mut t = create_test_env();
        let cell = t.define("x", 1.0);
        let code = t.compile_ok("(fn (y) (+ x y))");
        let [Instruction::PushLambda { code: body, .. }, Instruction::End] =
            code[..]
        else {
            panic!("unexpected code {code:?}");
        };
        let body = t.instructions(body);
        assert!(matches!(body[0], Instruction::PushGlobal { cell: c } if c == cell));
        assert!(matches!(body[1], Instruction::Lookup { .. }));
        assert!(matches!(body[2], Instruction::Lookup { .. }));
        assert_eq!(
            &body[3..],
            &[
                Instruction::Call { argc: 2 },
                Instruction::Return,
                Instruction::End
            ]
        );

        let code = t.compile_ok("(fn (x) x)");
        let Instruction::PushLambda { code: body, .. } = code[0] else {
            panic!("expected lambda");
        };
        assert!(matches!(t.instructions(body)[0], Instruction::Lookup { .. }));
    }

    #[test]
    fn compile_call_order() {
        let mut t = create_test_env();
        let code = t.compile_ok("(f 1 2)");
        assert_eq!(code.len(), 5);
        let Instruction::PushConstant { value: first } = code[0] else {
            panic!("expected first argument");
        };
        let Instruction::PushConstant { value: second } = code[1] else {
            panic!("expected second argument");
        };
        assert_eq!(t.heap.number(first), Some(1.0));
        assert_eq!(t.heap.number(second), Some(2.0));
        assert!(matches!(code[2], Instruction::Lookup { .. }));
        assert_eq!(code[3], Instruction::Call { argc: 2 });
    }

    #[test]
    fn compile_if_layout() {
        let mut t = create_test_env();
        let code = t.compile_ok("(if 1 1337 404)");
        // test(2) Branch(2) else(2) Jump(2) then(2) End
        assert!(matches!(code[0], Instruction::PushConstant { .. }));
        assert_eq!(code[1], Instruction::Branch { offset: 4 });
        assert!(matches!(code[2], Instruction::PushConstant { .. }));
        assert_eq!(code[3], Instruction::Jump { offset: 2 });
        let Instruction::PushConstant { value } = code[4] else {
            panic!("expected then branch");
        };
        assert_eq!(t.heap.number(value), Some(1337.0));
        assert_eq!(code[5], Instruction::End);
    }

    #[test]
    fn compile_if_without_else() {
        let mut t = create_test_env();
        let nil = t.heap.nil();
        let code = t.compile_ok("(if 1 2)");
        assert_eq!(code[2], Instruction::PushConstant { value: nil });
    }

    #[test]
    fn compile_do_pops_intermediate_values() {
        let mut t = create_test_env();
        let code = t.compile_ok("(do 1 2 3)");
        let ops: Vec<_> = code.iter().map(Instruction::op).collect();
        use crate::Op::*;
        assert_eq!(
            ops,
            vec![PushConstant, Pop, PushConstant, Pop, PushConstant, End]
        );
    }

    #[test]
    fn compile_def_and_quote() {
        let mut t = create_test_env();
        let code = t.compile_ok("(def x 'y)");
        let Instruction::PushConstant { value } = code[0] else {
            panic!("expected quoted constant");
        };
        assert_eq!(t.heap.symbol_name(value), Some("y"));
        let Instruction::Define { symbol } = code[1] else {
            panic!("expected define");
        };
        assert_eq!(t.heap.symbol_name(symbol), Some("x"));
    }

    #[test]
    fn compile_errors() {
        let mut t = create_test_env();
        for source in [
            "(def x)",
            "(def 1 2)",
            "(quote)",
            "(quote a b)",
            "(fn (x))",
            "(fn x x)",
            "(fn (1) 1)",
            "(if)",
        ] {
            assert!(t.compile(source).is_err(), "{source} should not compile");
        }

        let too_many = format!("(f {})", "1 ".repeat(MAX_ARGS + 1));
        let error = t.compile(&too_many).expect_err("too many arguments");
        assert_eq!(error.message, "too many arguments");
    }

    #[test]
    fn nesting_limit() {
        let mut t = create_test_env();
        let one = t.heap.make_number(1.0);
        let plus = t.heap.make_symbol("+");
        let mut form = one;
        for _ in 0..50_000 {
            form = t.heap.make_list(&[plus, one, form]);
        }
        let error = Compiler::compile(&mut t.heap, &t.env, form)
            .expect_err("too deep");
        assert_eq!(error.message, "form nested too deeply");

        let mut form = one;
        for _ in 0..MAX_NESTING - 1 {
            form = t.heap.make_list(&[plus, one, form]);
        }
        assert!(Compiler::compile(&mut t.heap, &t.env, form).is_ok());
    }

    #[test]
    fn error_names_the_form() {
        let mut t = create_test_env();
        let error = t.compile("(def x)").expect_err("malformed def");
        assert_eq!(error.to_string(), "def takes a name and a value in (def x)");
    }
}
