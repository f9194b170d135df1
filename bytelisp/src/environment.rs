use crate::{Heap, Value};

/// The global namespace.
///
/// Stored on the heap as a list of binding cells `(symbol . value)` in
/// definition order. The list always ends in an empty terminator cell so
/// that appending only ever writes to a cell owned by this list, never to
/// the shared nil.
#[derive(Debug)]
pub struct Environment {
    bindings: Value,
    terminator: Value,
}

impl Environment {
    pub fn new(heap: &mut Heap) -> Self {
        let terminator = heap.make_pair(None, None);
        Self {
            bindings: terminator,
            terminator,
        }
    }

    /// Head of the binding list. A collector root.
    pub fn root(&self) -> Value {
        self.bindings
    }

    /// Binding cell for `name`.
    pub fn find_cell(&self, heap: &Heap, name: &str) -> Option<Value> {
        heap.list_iter(self.bindings).find(|&cell| {
            heap.head(cell)
                .and_then(|symbol| heap.symbol_name(symbol))
                .is_some_and(|symbol| symbol == name)
        })
    }

    pub fn lookup(&self, heap: &Heap, name: &str) -> Option<Value> {
        self.find_cell(heap, name).and_then(|cell| heap.tail(cell))
    }

    /// Create or update the binding of `symbol`. Returns its cell.
    pub fn define(
        &mut self,
        heap: &mut Heap,
        symbol: Value,
        value: Value,
    ) -> Value {
        let name = heap.symbol_name(symbol).unwrap_or_default();
        if let Some(cell) = self.find_cell(heap, name) {
            heap.set_tail(cell, Some(value));
            return cell;
        }

        let cell = heap.make_pair(Some(symbol), Some(value));
        let terminator = heap.make_pair(None, None);
        heap.set_head(self.terminator, Some(cell));
        heap.set_tail(self.terminator, Some(terminator));
        self.terminator = terminator;
        cell
    }

    /// `(symbol, value)` pairs in definition order.
    pub fn bindings<'a>(
        &self,
        heap: &'a Heap,
    ) -> impl Iterator<Item = (Value, Value)> + use<'a> {
        let nil = heap.nil();
        heap.list_iter(self.bindings).map(move |cell| {
            (
                heap.head(cell).unwrap_or(nil),
                heap.tail(cell).unwrap_or(nil),
            )
        })
    }

    pub fn len(&self, heap: &Heap) -> usize {
        heap.list_len(self.bindings)
    }

    pub fn is_empty(&self, heap: &Heap) -> bool {
        self.len(heap) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapCreateInfo;

    fn create_test_env() -> (Heap, Environment) {
        let mut heap = Heap::new(HeapCreateInfo::default());
        let env = Environment::new(&mut heap);
        (heap, env)
    }

    #[test]
    fn define_then_lookup() {
        let (mut heap, mut env) = create_test_env();
        let x = heap.make_symbol("x");
        let ten = heap.make_number(10.0);
        env.define(&mut heap, x, ten);
        assert_eq!(env.lookup(&heap, "x"), Some(ten));
        assert_eq!(env.lookup(&heap, "y"), None);
    }

    #[test]
    fn redefinition_updates_the_cell_in_place() {
        let (mut heap, mut env) = create_test_env();
        let a1 = heap.make_symbol("a");
        let one = heap.make_number(1.0);
        let first = env.define(&mut heap, a1, one);

        // a distinct symbol object with the same name
        let a2 = heap.make_symbol("a");
        let two = heap.make_number(2.0);
        let second = env.define(&mut heap, a2, two);

        assert_eq!(first, second);
        assert_eq!(env.len(&heap), 1);
        assert_eq!(env.lookup(&heap, "a"), Some(two));
    }

    #[test]
    fn bindings_keep_definition_order() {
        let (mut heap, mut env) = create_test_env();
        for name in ["c", "a", "b"] {
            let symbol = heap.make_symbol(name);
            let nil = heap.nil();
            env.define(&mut heap, symbol, nil);
        }
        let names: Vec<&str> = env
            .bindings(&heap)
            .filter_map(|(symbol, _)| heap.symbol_name(symbol))
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn shared_nil_is_never_written() {
        let (mut heap, mut env) = create_test_env();
        let symbol = heap.make_symbol("x");
        let nil = heap.nil();
        env.define(&mut heap, symbol, nil);
        assert!(heap.is_nil(nil));
    }
}
