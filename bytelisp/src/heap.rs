//! Arena heap with an intrusive all-objects list and a mark-sweep collector.
//!
//! - Objects live in slots of a single arena; freed slots are recycled
//!   through a free list.
//! - Every live object is linked, newest first, through its header's `next`
//!   field. Sweep walks that list, not the reference graph.
//! - Roots come from a [`RootProvider`]. The nil singleton is always a root.

use std::collections::HashSet;

use crate::{
    Closure, Code, Native, NativeFn, Object, ObjectType, Value,
    visitor::Visitable,
};

/// Supplies the live roots for one collection.
pub trait RootProvider {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(Value));
}

#[derive(Debug, Clone, Copy)]
pub struct HeapCreateInfo {
    /// Number of slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for HeapCreateInfo {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}

/// Result of one [`Heap::collect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GarbageCollectionStats {
    pub freed: usize,
    pub alive: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Header {
    /// Only ever set while a collection is running.
    marked: bool,
    next: Option<Value>,
}

#[derive(Debug)]
struct HeapCell {
    header: Header,
    object: Object,
}

#[derive(Debug)]
pub struct Heap {
    cells: Vec<Option<HeapCell>>,
    free: Vec<u32>,
    first: Option<Value>,
    count: usize,
    nil: Value,
}

impl Heap {
    pub fn new(info: HeapCreateInfo) -> Self {
        let mut heap = Self {
            cells: Vec::with_capacity(info.initial_capacity),
            free: Vec::new(),
            first: None,
            count: 0,
            nil: Value::from_raw(0),
        };
        heap.nil = heap.insert(Object::Pair {
            head: None,
            tail: None,
        });
        heap
    }

    /// The nil singleton.
    #[inline]
    pub fn nil(&self) -> Value {
        self.nil
    }

    /// Number of live objects, nil included.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn insert(&mut self, object: Object) -> Value {
        let cell = HeapCell {
            header: Header {
                marked: false,
                next: self.first,
            },
            object,
        };
        let value = match self.free.pop() {
            Some(slot) => {
                self.cells[slot as usize] = Some(cell);
                Value::from_raw(slot)
            }
            None => {
                let slot = u32::try_from(self.cells.len())
                    .expect("heap exhausted its handle space");
                self.cells.push(Some(cell));
                Value::from_raw(slot)
            }
        };
        self.first = Some(value);
        self.count += 1;
        value
    }

    /// Allocate an object of type `ty` with its default payload.
    pub fn allocate(&mut self, ty: ObjectType) -> Value {
        self.insert(Object::empty(ty, self.nil))
    }

    pub fn make_pair(
        &mut self,
        head: Option<Value>,
        tail: Option<Value>,
    ) -> Value {
        let value = self.allocate(ObjectType::Pair);
        *self.get_mut(value) = Object::Pair { head, tail };
        value
    }

    pub fn make_symbol(&mut self, name: &str) -> Value {
        let value = self.allocate(ObjectType::Symbol);
        *self.get_mut(value) = Object::Symbol(Box::from(name));
        value
    }

    pub fn make_number(&mut self, number: f64) -> Value {
        let value = self.allocate(ObjectType::Number);
        *self.get_mut(value) = Object::Number(number);
        value
    }

    pub fn make_text(&mut self, text: &str) -> Value {
        let value = self.allocate(ObjectType::Text);
        *self.get_mut(value) = Object::Text(Box::from(text));
        value
    }

    pub fn make_native(&mut self, name: &'static str, func: NativeFn) -> Value {
        let value = self.allocate(ObjectType::Native);
        *self.get_mut(value) = Object::Native(Native { name, func });
        value
    }

    pub fn make_closure(
        &mut self,
        params: Value,
        body: Value,
        code: Value,
    ) -> Value {
        let value = self.allocate(ObjectType::Closure);
        *self.get_mut(value) = Object::Closure(Closure {
            params,
            body,
            code,
            name: None,
        });
        value
    }

    pub fn make_code(&mut self, code: Code) -> Value {
        let value = self.allocate(ObjectType::Code);
        *self.get_mut(value) = Object::Code(code);
        value
    }

    /// Proper list of `items` terminated by nil.
    pub fn make_list(&mut self, items: &[Value]) -> Value {
        items.iter().rev().fold(self.nil, |tail, &head| {
            self.make_pair(Some(head), Some(tail))
        })
    }

    fn cell(&self, value: Value) -> &HeapCell {
        self.cells
            .get(value.index())
            .and_then(Option::as_ref)
            .expect("use of a freed value")
    }

    fn cell_mut(&mut self, value: Value) -> &mut HeapCell {
        self.cells
            .get_mut(value.index())
            .and_then(Option::as_mut)
            .expect("use of a freed value")
    }

    /// Whether `value` refers to a live object.
    pub fn contains(&self, value: Value) -> bool {
        matches!(self.cells.get(value.index()), Some(Some(_)))
    }

    pub fn get(&self, value: Value) -> &Object {
        &self.cell(value).object
    }

    pub fn get_mut(&mut self, value: Value) -> &mut Object {
        &mut self.cell_mut(value).object
    }

    pub fn object_type(&self, value: Value) -> ObjectType {
        self.get(value).object_type()
    }

    /// Pair with both references absent.
    pub fn is_nil(&self, value: Value) -> bool {
        self.get(value).is_nil()
    }

    pub fn head(&self, value: Value) -> Option<Value> {
        match self.get(value) {
            Object::Pair { head, .. } => *head,
            _ => None,
        }
    }

    pub fn tail(&self, value: Value) -> Option<Value> {
        match self.get(value) {
            Object::Pair { tail, .. } => *tail,
            _ => None,
        }
    }

    pub fn set_head(&mut self, pair: Value, value: Option<Value>) {
        debug_assert_ne!(pair, self.nil, "nil is immutable");
        if let Object::Pair { head, .. } = self.get_mut(pair) {
            *head = value;
        }
    }

    pub fn set_tail(&mut self, pair: Value, value: Option<Value>) {
        debug_assert_ne!(pair, self.nil, "nil is immutable");
        if let Object::Pair { tail, .. } = self.get_mut(pair) {
            *tail = value;
        }
    }

    pub fn number(&self, value: Value) -> Option<f64> {
        match self.get(value) {
            Object::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn symbol_name(&self, value: Value) -> Option<&str> {
        match self.get(value) {
            Object::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn text(&self, value: Value) -> Option<&str> {
        match self.get(value) {
            Object::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn native(&self, value: Value) -> Option<Native> {
        match self.get(value) {
            Object::Native(native) => Some(*native),
            _ => None,
        }
    }

    pub fn closure(&self, value: Value) -> Option<&Closure> {
        match self.get(value) {
            Object::Closure(closure) => Some(closure),
            _ => None,
        }
    }

    pub fn closure_mut(&mut self, value: Value) -> Option<&mut Closure> {
        match self.get_mut(value) {
            Object::Closure(closure) => Some(closure),
            _ => None,
        }
    }

    pub fn code(&self, value: Value) -> Option<&Code> {
        match self.get(value) {
            Object::Code(code) => Some(code),
            _ => None,
        }
    }

    /// Iterate the elements of a list.
    ///
    /// Stops at the first cell without a head, so both nil and the
    /// empty terminator cells end iteration. An improper tail is skipped.
    pub fn list_iter(&self, list: Value) -> ListIter<'_> {
        ListIter {
            heap: self,
            cursor: Some(list),
        }
    }

    pub fn list_len(&self, list: Value) -> usize {
        self.list_iter(list).count()
    }

    /// By-value equality: numbers, symbols and texts by content, pairs
    /// structurally, everything else by identity.
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        let mut assumed = HashSet::new();
        let mut worklist = vec![(a, b)];
        while let Some((a, b)) = worklist.pop() {
            if a == b || !assumed.insert((a, b)) {
                continue;
            }
            let equal = match (self.get(a), self.get(b)) {
                (Object::Number(x), Object::Number(y)) => x == y,
                (Object::Symbol(x), Object::Symbol(y)) => x == y,
                (Object::Text(x), Object::Text(y)) => x == y,
                (
                    Object::Pair { head: h1, tail: t1 },
                    Object::Pair { head: h2, tail: t2 },
                ) => {
                    let mut same_shape = true;
                    for (x, y) in [(h1, h2), (t1, t2)] {
                        match (x, y) {
                            (Some(x), Some(y)) => worklist.push((*x, *y)),
                            (None, None) => {}
                            _ => same_shape = false,
                        }
                    }
                    same_shape
                }
                _ => false,
            };
            if !equal {
                return false;
            }
        }
        true
    }

    /// Whether `value` carries a mark. Always false outside [`Heap::collect`].
    pub fn is_marked(&self, value: Value) -> bool {
        self.cell(value).header.marked
    }

    /// Mark everything reachable from `root`.
    ///
    /// Already marked objects are skipped, which is what makes marking
    /// terminate on cycles.
    fn mark(&mut self, root: Value) {
        let mut worklist = vec![root];
        while let Some(value) = worklist.pop() {
            let HeapCell { header, object } = self.cell_mut(value);
            if header.marked {
                continue;
            }
            header.marked = true;
            object.visit_edges(&mut |edge: Value| worklist.push(edge));
        }
    }

    /// Stop-the-world collection.
    pub fn collect(
        &mut self,
        roots: &mut dyn RootProvider,
    ) -> GarbageCollectionStats {
        let mut pending = vec![self.nil];
        roots.visit_roots(&mut |value| pending.push(value));
        for root in pending {
            self.mark(root);
        }
        let stats = self.sweep();
        log::info!("gc: freed {}, alive {}", stats.freed, stats.alive);
        stats
    }

    /// Free every unmarked object and clear the marks of the survivors.
    fn sweep(&mut self) -> GarbageCollectionStats {
        let mut stats = GarbageCollectionStats::default();
        let mut prev: Option<Value> = None;
        let mut cursor = self.first;
        while let Some(value) = cursor {
            let header = &mut self.cell_mut(value).header;
            let next = header.next;
            if header.marked {
                header.marked = false;
                prev = Some(value);
                stats.alive += 1;
            } else {
                match prev {
                    Some(prev) => self.cell_mut(prev).header.next = next,
                    None => self.first = next,
                }
                self.release(value);
                stats.freed += 1;
            }
            cursor = next;
        }
        stats
    }

    /// Drop the object (and the buffers it owns) and recycle its slot.
    fn release(&mut self, value: Value) {
        self.cells[value.index()] = None;
        self.free.push(value.raw());
        self.count -= 1;
    }
}

pub struct ListIter<'a> {
    heap: &'a Heap,
    cursor: Option<Value>,
}

impl Iterator for ListIter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let cell = self.cursor?;
        match self.heap.get(cell) {
            Object::Pair {
                head: Some(head),
                tail,
            } => {
                self.cursor = *tail;
                Some(*head)
            }
            _ => {
                self.cursor = None;
                None
            }
        }
    }
}
