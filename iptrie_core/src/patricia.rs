//! Path-compressed binary (Patricia) trie over left-aligned `u128` keys.
//!
//! Nodes live in an arena and refer to their children by `u32` index. Slot
//! [`ROOT`] always holds the zero-length prefix, so the trie is never empty
//! structurally and a default route is simply the root's value. Only branch
//! points and value-carrying nodes are materialised; every node records its
//! own depth (`prefix_len`) and the canonical path bits that lead to it.

use crate::constants::{NIL, ROOT};
use crate::errors::Error;
use crate::helpers::{canonical, common_prefix_len, get_bit};
use log::debug;

// Per-step tracing in the hot paths, only with the `trace` feature.
macro_rules! hot_trace {
    ($($t:tt)*) => {
        if cfg!(feature = "trace") {
            log::trace!($($t)*);
        }
    };
}

#[derive(Debug, Clone)]
pub(crate) struct Node<V> {
    pub(crate) key: u128,         // canonical path bits
    pub(crate) prefix_len: u8,    // depth from the root
    pub(crate) children: [u32; 2], // bit 0 / bit 1, NIL when absent
    pub(crate) value: Option<V>,
}

impl<V> Node<V> {
    fn new(key: u128, prefix_len: u8, value: Option<V>) -> Self {
        Self {
            key,
            prefix_len,
            children: [NIL, NIL],
            value,
        }
    }
}

/// Single-family longest-prefix-match trie.
#[derive(Debug, Clone)]
pub struct PatriciaTrie<V> {
    nodes: Vec<Node<V>>,
    free: Vec<u32>,
    width: u8,
    len: usize,
}

impl<V> PatriciaTrie<V> {
    /// Empty trie for keys of `width` bits (32 or 128).
    pub fn new(width: u8) -> Self {
        Self::with_capacity(width, 1)
    }

    /// Empty trie with room for `capacity` nodes before the arena grows.
    pub fn with_capacity(width: u8, capacity: usize) -> Self {
        debug_assert!(width <= 128);
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::new(0, 0, None));
        Self {
            nodes,
            free: Vec::new(),
            width,
            len: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of stored prefixes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live nodes, root and branch-only nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    #[inline]
    fn node(&self, idx: u32) -> &Node<V> {
        &self.nodes[idx as usize]
    }

    #[inline]
    fn node_mut(&mut self, idx: u32) -> &mut Node<V> {
        &mut self.nodes[idx as usize]
    }

    fn alloc_node(&mut self, key: u128, prefix_len: u8, value: Option<V>) -> u32 {
        let node = Node::new(key, prefix_len, value);
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = node;
            return idx;
        }
        let idx = self.nodes.len();
        debug_assert!(idx < NIL as usize, "node arena exhausted");
        self.nodes.push(node);
        idx as u32
    }

    fn free_node(&mut self, idx: u32) {
        debug_assert_ne!(idx, ROOT);
        let node = self.node_mut(idx);
        node.children = [NIL, NIL];
        node.value = None;
        self.free.push(idx);
    }

    /// Store `value` under the first `prefix_len` bits of `key`.
    ///
    /// Bits past `prefix_len` are ignored. Returns the value previously stored
    /// under the same prefix, which is replaced. Lengths past the trie width
    /// are rejected with [`Error::InvalidPrefixLength`].
    pub fn insert(&mut self, key: u128, prefix_len: u8, value: V) -> Result<Option<V>, Error> {
        if prefix_len > self.width {
            return Err(Error::InvalidPrefixLength {
                prefix_len: i64::from(prefix_len),
                max: self.width,
            });
        }
        Ok(self.insert_unchecked(key, prefix_len, value))
    }

    /// [`insert`](Self::insert) for a length already validated against the width.
    pub(crate) fn insert_unchecked(&mut self, key: u128, prefix_len: u8, value: V) -> Option<V> {
        debug_assert!(prefix_len <= self.width);
        let key = canonical(key, prefix_len);
        let mut cur = ROOT;

        loop {
            // invariant: `cur` lies on the path of `key` and is no deeper than `prefix_len`
            let node = self.node(cur);
            if node.prefix_len == prefix_len {
                hot_trace!("[INSERT] exact node {} for {:x}/{}", cur, key, prefix_len);
                let old = self.node_mut(cur).value.replace(value);
                if old.is_none() {
                    self.len += 1;
                }
                return old;
            }

            let bit = get_bit(key, node.prefix_len);
            let child = node.children[bit];

            // empty branch: hang a leaf
            if child == NIL {
                let leaf = self.alloc_node(key, prefix_len, Some(value));
                self.node_mut(cur).children[bit] = leaf;
                self.len += 1;
                hot_trace!("[INSERT] leaf {} under {}", leaf, cur);
                return None;
            }

            let down = self.node(child);
            let (down_key, down_len) = (down.key, down.prefix_len);
            let cpl = common_prefix_len(key, down_key, prefix_len.min(down_len));

            // the child is an ancestor of the new prefix: descend
            if cpl == down_len {
                cur = child;
                continue;
            }

            // the new prefix is an ancestor of the child: insert above it
            if cpl == prefix_len {
                let above = self.alloc_node(key, prefix_len, Some(value));
                self.node_mut(above).children[get_bit(down_key, prefix_len)] = child;
                self.node_mut(cur).children[bit] = above;
                self.len += 1;
                hot_trace!("[INSERT] {} inserted above {}", above, child);
                return None;
            }

            // paths diverge at `cpl`: a value-less branch node joins both
            let branch = self.alloc_node(canonical(key, cpl), cpl, None);
            let leaf = self.alloc_node(key, prefix_len, Some(value));
            {
                let b = self.node_mut(branch);
                b.children[get_bit(down_key, cpl)] = child;
                b.children[get_bit(key, cpl)] = leaf;
            }
            self.node_mut(cur).children[bit] = branch;
            self.len += 1;
            hot_trace!("[INSERT] split at {} ({} / {})", cpl, child, leaf);
            return None;
        }
    }

    /// Longest stored prefix covering `key`: `(canonical key, length, value)`.
    pub fn longest_match(&self, key: u128) -> Option<(u128, u8, &V)> {
        let mut best = None;
        let mut cur = ROOT;

        loop {
            let node = self.node(cur);
            if let Some(v) = &node.value {
                best = Some((node.key, node.prefix_len, v));
            }
            if node.prefix_len >= self.width {
                break;
            }
            let child = node.children[get_bit(key, node.prefix_len)];
            if child == NIL {
                break;
            }
            let down = self.node(child);
            // a compressed edge may skip bits the key does not share
            if canonical(key, down.prefix_len) != down.key {
                break;
            }
            cur = child;
        }
        hot_trace!("[LOOKUP] {:x} -> {:?}", key, best.map(|(_, l, _)| l));
        best
    }

    /// Arena slot holding exactly `key/prefix_len`, stored value or not.
    fn locate(&self, key: u128, prefix_len: u8, path: &mut Vec<u32>) -> Option<u32> {
        // nothing is ever stored deeper than the width
        if prefix_len > self.width {
            return None;
        }
        let key = canonical(key, prefix_len);
        let mut cur = ROOT;
        loop {
            let node = self.node(cur);
            if node.prefix_len == prefix_len {
                return (node.key == key).then_some(cur);
            }
            let child = node.children[get_bit(key, node.prefix_len)];
            if child == NIL {
                return None;
            }
            let down = self.node(child);
            if down.prefix_len > prefix_len || canonical(key, down.prefix_len) != down.key {
                return None;
            }
            path.push(cur);
            cur = child;
        }
    }

    /// Exact-prefix lookup (no longest-match fallback). `None` for lengths past
    /// the width.
    pub fn get(&self, key: u128, prefix_len: u8) -> Option<&V> {
        let idx = self.locate(key, prefix_len, &mut Vec::new())?;
        self.node(idx).value.as_ref()
    }

    pub fn get_mut(&mut self, key: u128, prefix_len: u8) -> Option<&mut V> {
        let idx = self.locate(key, prefix_len, &mut Vec::new())?;
        self.node_mut(idx).value.as_mut()
    }

    /// Remove exactly `key/prefix_len` and return its value.
    ///
    /// Nodes left without a value and with fewer than two children are
    /// unlinked, so the trie stays path-compressed.
    pub fn remove(&mut self, key: u128, prefix_len: u8) -> Option<V> {
        let mut path = Vec::with_capacity(self.width as usize);
        let idx = self.locate(key, prefix_len, &mut path)?;
        let value = self.node_mut(idx).value.take()?;
        self.len -= 1;
        self.compact(idx, &path);
        Some(value)
    }

    fn compact(&mut self, mut idx: u32, path: &[u32]) {
        let mut ancestors = path.iter().rev().copied();
        while idx != ROOT {
            let node = self.node(idx);
            if node.value.is_some() {
                break;
            }
            let replacement = match node.children {
                [NIL, NIL] => NIL,
                [only, NIL] | [NIL, only] => only,
                _ => break,
            };
            let node_key = node.key;
            let Some(parent) = ancestors.next() else {
                break;
            };
            let slot = get_bit(node_key, self.node(parent).prefix_len);
            self.node_mut(parent).children[slot] = replacement;
            self.free_node(idx);
            debug!("[REMOVE] unlinked node {} (replacement {})", idx, replacement);

            // a spliced chain leaves the parent's fan-out unchanged
            if replacement != NIL {
                break;
            }
            idx = parent;
        }
    }

    /// Drop every prefix, keeping the arena allocation.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT as usize] = Node::new(0, 0, None);
        self.free.clear();
        self.len = 0;
    }

    /// Stored prefixes in key order, shorter prefixes before longer ones.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            nodes: &self.nodes,
            stack: vec![ROOT],
        }
    }
}

/// Pre-order walk over stored prefixes, bit 0 before bit 1.
pub struct Iter<'a, V> {
    nodes: &'a [Node<V>],
    stack: Vec<u32>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u128, u8, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.stack.pop() {
            let node = &self.nodes[idx as usize];
            for child in [node.children[1], node.children[0]] {
                if child != NIL {
                    self.stack.push(child);
                }
            }
            if let Some(v) = &node.value {
                return Some((node.key, node.prefix_len, v));
            }
        }
        None
    }
}
