/// Traversals: ordered enumeration, wildcard search, and the diagnostic
/// dump listing.
///
/// All walks reconstruct keys into one stack-local scratch buffer of
/// `MAX_KEY_LEN` bytes per invocation and hand the sink a transient view;
/// a sink that keeps bytes must copy them.
use crate::{Tst, MAX_KEY_LEN, NIL, ROOT};

/// Pattern byte matching any run of zero or more key bytes.
pub const WILDCARD: u8 = b'*';

impl Tst {
    /// Emits every live key through `sink`, in strictly ascending
    /// byte-lexicographic order, or strictly descending when `descending`
    /// is set.
    pub fn keys<F: FnMut(&[u8])>(&self, descending: bool, mut sink: F) {
        if self.arena.is_empty() {
            return;
        }
        let mut buf = [0u8; MAX_KEY_LEN];
        self.in_order(ROOT, &mut buf, 0, descending, &mut sink);
    }

    /// In-order walk. A key terminating at a node is a prefix of every key
    /// in that node's equal subtree, so ascending order emits before the
    /// equal visit and descending order after it.
    fn in_order<F: FnMut(&[u8])>(
        &self,
        n: u32,
        buf: &mut [u8; MAX_KEY_LEN],
        depth: usize,
        descending: bool,
        sink: &mut F,
    ) {
        if n == NIL {
            return;
        }
        let node = self.arena.node(n);
        let (first, last) = if descending {
            (node.high, node.low)
        } else {
            (node.low, node.high)
        };
        self.in_order(first, buf, depth, descending, sink);
        buf[depth] = node.splitchar;
        if descending {
            self.in_order(node.equal, buf, depth + 1, descending, sink);
            if node.flag == 1 {
                sink(&buf[..=depth]);
            }
        } else {
            if node.flag == 1 {
                sink(&buf[..=depth]);
            }
            self.in_order(node.equal, buf, depth + 1, descending, sink);
        }
        self.in_order(last, buf, depth, descending, sink);
    }

    /// Emits every key matching `pattern` through `sink`, ascending.
    ///
    /// The byte `*` (0x2A) matches any run of zero or more bytes at its
    /// position. A pattern with several wildcards may emit the same key
    /// once per matching alignment; callers that need a set must
    /// deduplicate. An empty pattern emits nothing.
    pub fn search<F: FnMut(&[u8])>(&self, pattern: &[u8], mut sink: F) {
        if pattern.is_empty() || self.arena.is_empty() {
            return;
        }
        let mut buf = [0u8; MAX_KEY_LEN];
        self.wildcard(ROOT, pattern, 0, &mut buf, 0, &mut sink);
    }

    fn wildcard<F: FnMut(&[u8])>(
        &self,
        n: u32,
        pattern: &[u8],
        i: usize,
        buf: &mut [u8; MAX_KEY_LEN],
        depth: usize,
        sink: &mut F,
    ) {
        if n == NIL {
            return;
        }
        let node = self.arena.node(n);
        let c = pattern[i];
        let wild = c == WILDCARD;
        let diff = c as i32 - node.splitchar as i32;

        if diff < 0 || wild {
            self.wildcard(node.low, pattern, i, buf, depth, sink);
        }
        if diff == 0 || wild {
            buf[depth] = node.splitchar;
            if i + 1 < pattern.len() {
                self.wildcard(node.equal, pattern, i + 1, buf, depth + 1, sink);
            } else if node.flag == 1 {
                sink(&buf[..=depth]);
            }
            if wild {
                // The wildcard stays alive across this byte.
                self.wildcard(node.equal, pattern, i, buf, depth + 1, sink);
            }
        }
        if diff > 0 || wild {
            self.wildcard(node.high, pattern, i, buf, depth, sink);
        }
    }

    /// Emits a diagnostic listing: a summary line, then one line per node
    /// slot in arena order.
    pub fn dump<F: FnMut(&str)>(&self, mut sink: F) {
        sink(&format!(
            "keys={} nodes={} balance={:.3}",
            self.key_count(),
            self.node_count(),
            self.balance()
        ));
        for idx in 1..self.arena.len() {
            let node = self.arena.node(idx as u32);
            let ch = if node.splitchar.is_ascii_graphic() {
                format!("'{}'", node.splitchar as char)
            } else {
                format!("0x{:02x}", node.splitchar)
            };
            sink(&format!(
                "[{:>6}] splitchar={} flag={} low={} equal={} high={}",
                idx, ch, node.flag, node.low, node.equal, node.high
            ));
        }
    }
}
