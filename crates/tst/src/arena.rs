//! Node storage for the ternary search tree.
//!
//! Nodes live in a single dense, grow-only buffer addressed by 32-bit
//! indices. Index 0 is the nil sentinel: all-zero, never handed out, never
//! mutated. Child links of 0 mean "no child", so the whole tree is one
//! relocatable blob at half the size of a pointer-based layout.

/// The nil sentinel index ("no child").
pub const NIL: u32 = 0;

/// A fixed-width tree node.
///
/// `low`/`high` lead to keys whose current byte orders before/after
/// `splitchar`; `equal` advances to the next byte. `flag` is 1 iff a key
/// terminates at this node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Node {
    pub splitchar: u8,
    pub flag: u8,
    pub low: u32,
    pub equal: u32,
    pub high: u32,
}

/// Grow-only node arena.
///
/// `reserve_one` bump-allocates off the end. Growth doubles the capacity by
/// allocating a fresh buffer and bulk-copying the live prefix; the buffer
/// never shrinks. Callers hold indices, not references, so nothing survives
/// a growth that could dangle.
pub struct Arena {
    buf: Vec<Node>,
}

impl Arena {
    /// Initial node capacity.
    pub const INITIAL_CAPACITY: usize = 256;

    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(Self::INITIAL_CAPACITY);
        buf.push(Node::default()); // sentinel at index 0
        Self { buf }
    }

    /// Number of live node slots, sentinel included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= 1
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn node(&self, idx: u32) -> &Node {
        &self.buf[idx as usize]
    }

    pub fn node_mut(&mut self, idx: u32) -> &mut Node {
        debug_assert!(idx != NIL, "the sentinel is immutable");
        &mut self.buf[idx as usize]
    }

    /// Hands out the next free index, growing first if the buffer is full.
    /// The returned slot is zeroed.
    pub fn reserve_one(&mut self) -> u32 {
        self.grow_if_needed();
        debug_assert!(self.buf.len() < u32::MAX as usize, "node index space exhausted");
        let idx = self.buf.len() as u32;
        self.buf.push(Node::default());
        idx
    }

    /// Doubles the capacity once the buffer is full: a fresh allocation and
    /// one bulk copy of the live prefix.
    pub fn grow_if_needed(&mut self) {
        if self.buf.len() == self.buf.capacity() {
            let mut next = Vec::with_capacity(self.buf.capacity() * 2);
            next.extend_from_slice(&self.buf);
            self.buf = next;
        }
    }

    /// Drops every node but the sentinel. Capacity is retained.
    pub fn clear(&mut self) {
        self.buf.truncate(1);
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
