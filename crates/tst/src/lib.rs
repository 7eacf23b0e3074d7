//! # TST — array-backed ternary search tree
//!
//! An ordered set of byte strings stored in a ternary search tree whose
//! nodes live in one contiguous arena addressed by 32-bit indices (see
//! [`Arena`]). Only key existence is recorded: this is a set, not a map.
//!
//! Distinct keys share the nodes of their longest common prefix; removing a
//! key flips its terminal flag and leaves the structure in place, so the
//! node count only ever shrinks through [`Tst::clear`].
//!
//! ## Example
//!
//! ```rust
//! use tst::Tst;
//!
//! let mut t = Tst::new();
//! assert!(t.insert(b"bananas"));
//! assert!(!t.insert(b"bananas"));
//! assert!(t.contains(b"bananas"));
//!
//! let mut found = Vec::new();
//! t.search(b"ban*", |key| found.push(key.to_vec()));
//! assert_eq!(found, vec![b"bananas".to_vec()]);
//! ```

mod arena;
mod walk;

pub use arena::{Arena, Node, NIL};
pub use walk::WILDCARD;

/// Maximum key length in bytes. Longer keys are rejected by every operation.
pub const MAX_KEY_LEN: usize = 512;

/// Index of the root node; the first slot handed out after `new`/`clear`.
pub(crate) const ROOT: u32 = 1;

/// An ordered set of byte strings over an arena-backed ternary search tree.
pub struct Tst {
    pub(crate) arena: Arena,
    key_count: usize,
}

impl Tst {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            key_count: 0,
        }
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Number of node slots in use, sentinel included. An empty tree
    /// reports 1.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// True iff `key` is live in the set. Empty and oversize keys are
    /// never present.
    pub fn contains(&self, key: &[u8]) -> bool {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return false;
        }
        let mut n = ROOT;
        let mut i = 0usize;
        while n != NIL && (n as usize) < self.arena.len() {
            let node = self.arena.node(n);
            let c = key[i];
            if c < node.splitchar {
                n = node.low;
            } else if c > node.splitchar {
                n = node.high;
            } else if i + 1 == key.len() {
                return node.flag == 1;
            } else {
                i += 1;
                n = node.equal;
            }
        }
        false
    }

    /// Adds `key` to the set. Returns true iff the set changed.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        self.update(key, false)
    }

    /// Removes `key` from the set by clearing its terminal flag; the nodes
    /// stay in place. Returns true iff the set changed.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.update(key, true)
    }

    /// Shared walk behind `insert` and `remove`, parameterised by the
    /// `clear` flag.
    fn update(&mut self, key: &[u8], clear: bool) -> bool {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return false;
        }

        let mut n = if self.arena.len() > 1 { ROOT } else { NIL };
        let mut prev = NIL;
        let mut diff: i32 = 0;
        let mut i = 0usize;

        while n != NIL {
            let node = self.arena.node(n);
            diff = key[i] as i32 - node.splitchar as i32;
            if diff == 0 {
                if i + 1 == key.len() {
                    let node = self.arena.node_mut(n);
                    if clear {
                        if node.flag == 1 {
                            node.flag = 0;
                            self.key_count -= 1;
                            return true;
                        }
                    } else if node.flag == 0 {
                        node.flag = 1;
                        self.key_count += 1;
                        return true;
                    }
                    return false;
                }
                i += 1;
                prev = n;
                n = node.equal;
            } else if diff < 0 {
                prev = n;
                n = node.low;
            } else {
                prev = n;
                n = node.high;
            }
        }

        // Ran off the tree before consuming the key.
        if clear {
            return false;
        }

        // Splice a fresh branch: link the parent to the next free index,
        // then lay out one node per remaining byte along equal edges.
        let first = self.arena.len() as u32;
        if prev != NIL {
            let parent = self.arena.node_mut(prev);
            if diff < 0 {
                parent.low = first;
            } else if diff > 0 {
                parent.high = first;
            } else {
                parent.equal = first;
            }
        }
        for &b in &key[i..] {
            let idx = self.arena.reserve_one();
            let node = self.arena.node_mut(idx);
            node.splitchar = b;
            node.equal = idx + 1;
        }
        let last = self.arena.len() as u32 - 1;
        let tail = self.arena.node_mut(last);
        tail.flag = 1;
        tail.equal = NIL;
        self.key_count += 1;
        true
    }

    /// Empties the set. Node storage is truncated to the sentinel; capacity
    /// is retained.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.key_count = 0;
    }

    /// Advisory balance estimate in `[0, 1]`; 1 is perfectly balanced.
    ///
    /// Averages two symmetry terms over all live nodes: the low/high child
    /// counts and the low/high child index sums. An empty tree scores 1.
    pub fn balance(&self) -> f64 {
        let mut low_cnt = 0u64;
        let mut high_cnt = 0u64;
        let mut low_sum = 0u64;
        let mut high_sum = 0u64;
        for idx in 1..self.arena.len() {
            let node = self.arena.node(idx as u32);
            if node.low != NIL {
                low_cnt += 1;
                low_sum += node.low as u64;
            }
            if node.high != NIL {
                high_cnt += 1;
                high_sum += node.high as u64;
            }
        }
        let term = |a: u64, b: u64| {
            if a + b == 0 {
                1.0
            } else {
                1.0 - a.abs_diff(b) as f64 / (a + b) as f64
            }
        };
        (term(low_cnt, high_cnt) + term(low_sum, high_sum)) / 2.0
    }
}

impl Default for Tst {
    fn default() -> Self {
        Self::new()
    }
}
