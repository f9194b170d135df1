use crate::{Closure, Code, Object, Value};

pub trait Visitor {
    fn visit(&mut self, value: Value);
}

impl<F: FnMut(Value)> Visitor for F {
    #[inline]
    fn visit(&mut self, value: Value) {
        self(value)
    }
}

/// Something that holds references to heap values.
pub trait Visitable {
    /// Report every outgoing reference to `visitor`.
    fn visit_edges(&self, visitor: &mut dyn Visitor);
}

impl Visitable for Object {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        match self {
            Object::Pair { head, tail } => {
                // absent fields are no edge
                if let Some(head) = head {
                    visitor.visit(*head);
                }
                if let Some(tail) = tail {
                    visitor.visit(*tail);
                }
            }
            Object::Closure(closure) => closure.visit_edges(visitor),
            Object::Code(code) => code.visit_edges(visitor),
            Object::Symbol(_)
            | Object::Number(_)
            | Object::Text(_)
            | Object::Native(_) => {}
        }
    }
}

impl Visitable for Closure {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self.params);
        visitor.visit(self.body);
        visitor.visit(self.code);
    }
}

impl Visitable for Code {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        for raw in self.decoder() {
            match raw {
                Ok(raw) => raw.values().for_each(|value| visitor.visit(value)),
                Err(e) => {
                    debug_assert!(false, "tracing malformed bytecode: {e}");
                    log::error!("tracing malformed bytecode: {e}");
                    break;
                }
            }
        }
    }
}
