use std::fmt;

use crate::{Code, Runtime};

/// Handle to a heap cell.
///
/// Handles are plain arena indices: copying one never copies the object, and
/// two handles are the same object exactly when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);

impl Value {
    #[inline]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index, as embedded into bytecode operands.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectType {
    Pair,
    Symbol,
    Number,
    Text,
    Native,
    Closure,
    Code,
}

impl ObjectType {
    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Pair => "pair",
            ObjectType::Symbol => "symbol",
            ObjectType::Number => "number",
            ObjectType::Text => "text",
            ObjectType::Native => "native",
            ObjectType::Closure => "closure",
            ObjectType::Code => "bytecode",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature every host procedure satisfies.
///
/// Natives validate their own arguments; on failure they report a
/// diagnostic through the runtime and return nil.
pub type NativeFn = fn(&mut Runtime, &[Value]) -> Value;

#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Closure {
    pub params: Value,
    /// Source form of the body, kept for printing.
    pub body: Value,
    pub code: Value,
    pub name: Option<Box<str>>,
}

#[derive(Debug)]
pub enum Object {
    /// Cons cell. Nil is the pair with both fields absent.
    Pair {
        head: Option<Value>,
        tail: Option<Value>,
    },
    Symbol(Box<str>),
    Number(f64),
    Text(Box<str>),
    Native(Native),
    Closure(Closure),
    Code(Code),
}

fn unset_native(runtime: &mut Runtime, _args: &[Value]) -> Value {
    runtime.nil()
}

impl Object {
    /// Default payload for a freshly allocated object of the given type.
    pub fn empty(ty: ObjectType, nil: Value) -> Self {
        match ty {
            ObjectType::Pair => Object::Pair {
                head: None,
                tail: None,
            },
            ObjectType::Symbol => Object::Symbol(Box::from("")),
            ObjectType::Number => Object::Number(0.0),
            ObjectType::Text => Object::Text(Box::from("")),
            ObjectType::Native => Object::Native(Native {
                name: "",
                func: unset_native,
            }),
            ObjectType::Closure => Object::Closure(Closure {
                params: nil,
                body: nil,
                code: nil,
                name: None,
            }),
            ObjectType::Code => Object::Code(Code::default()),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Pair { .. } => ObjectType::Pair,
            Object::Symbol(_) => ObjectType::Symbol,
            Object::Number(_) => ObjectType::Number,
            Object::Text(_) => ObjectType::Text,
            Object::Native(_) => ObjectType::Native,
            Object::Closure(_) => ObjectType::Closure,
            Object::Code(_) => ObjectType::Code,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Object::Pair {
                head: None,
                tail: None
            }
        )
    }
}
