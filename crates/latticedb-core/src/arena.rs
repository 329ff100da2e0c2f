//! Recyclable scratch storage for wire nodes and render buffers.
//!
//! Every serialization call gets one [`Arena`]; all nodes built during the
//! call are dropped together by [`Arena::reset`] (or when a pooled arena is
//! returned). Ids must never outlive the arena that issued them; copy the
//! data out if it has to be retained.

use parking_lot::Mutex;

use crate::wire::{Primitive, TypeId, TypeNode, ValueId, ValueKind, ValueNode};

/// Region allocator for [`TypeNode`]/[`ValueNode`] trees.
///
/// One arena per serialization call. Allocation takes `&mut`, so a call's
/// nodes are never built from two threads.
#[derive(Debug, Default)]
pub struct Arena {
    types: Vec<TypeNode>,
    values: Vec<ValueNode>,
    primitives: [Option<TypeId>; Primitive::COUNT],
    void_value: Option<ValueId>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a recycled arena from the process-wide pool, or builds a fresh
    /// one when the pool is empty. The arena returns to the pool on drop.
    pub fn pooled() -> PooledArena {
        let arena = ARENA_POOL.lock().pop().unwrap_or_default();
        PooledArena(Some(arena))
    }

    pub fn alloc_type(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(node);
        id
    }

    /// Primitive type descriptors are flyweights: the first request for a
    /// given tag allocates, later requests reuse the same node.
    pub fn primitive(&mut self, p: Primitive) -> TypeId {
        if let Some(id) = self.primitives[p.index()] {
            return id;
        }
        let id = self.alloc_type(TypeNode::Primitive(p));
        self.primitives[p.index()] = Some(id);
        id
    }

    pub fn alloc_value(&mut self, node: ValueNode) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(node);
        id
    }

    /// The shared Void value: a single `NullFlag` node per arena.
    pub fn void_value(&mut self) -> ValueId {
        if let Some(id) = self.void_value {
            return id;
        }
        let id = self.alloc_value(ValueNode::leaf(ValueKind::NullFlag));
        self.void_value = Some(id);
        id
    }

    pub fn type_node(&self, id: TypeId) -> &TypeNode {
        &self.types[id.0 as usize]
    }

    pub fn value_node(&self, id: ValueId) -> &ValueNode {
        &self.values[id.0 as usize]
    }

    pub fn len_types(&self) -> usize {
        self.types.len()
    }

    pub fn len_values(&self) -> usize {
        self.values.len()
    }

    /// Drops every node handed out so far, keeping the capacity. All ids
    /// issued before the reset are invalidated.
    pub fn reset(&mut self) {
        self.types.clear();
        self.values.clear();
        self.primitives = [None; Primitive::COUNT];
        self.void_value = None;
    }
}

static ARENA_POOL: Mutex<Vec<Arena>> = Mutex::new(Vec::new());

/// Guard around a pooled [`Arena`]; resets and returns it on drop.
pub struct PooledArena(Option<Arena>);

impl std::ops::Deref for PooledArena {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.0.as_ref().expect("arena taken")
    }
}

impl std::ops::DerefMut for PooledArena {
    fn deref_mut(&mut self) -> &mut Arena {
        self.0.as_mut().expect("arena taken")
    }
}

impl Drop for PooledArena {
    fn drop(&mut self) {
        if let Some(mut arena) = self.0.take() {
            arena.reset();
            ARENA_POOL.lock().push(arena);
        }
    }
}

/// Process-wide pool of render buffers for string building.
///
/// Buffers come back cleared, so a pooled buffer is indistinguishable from
/// a fresh one.
pub struct BufferPool {
    free: Mutex<Vec<String>>,
}

impl BufferPool {
    pub const fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self) -> String {
        self.free.lock().pop().unwrap_or_default()
    }

    pub fn put(&self, mut buf: String) {
        buf.clear();
        self.free.lock().push(buf);
    }
}

/// The pool used by value rendering.
pub static BUFFERS: BufferPool = BufferPool::new();
