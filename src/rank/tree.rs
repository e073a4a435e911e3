//! Order-Statistics Treap
//!
//! Balanced search tree over unique keys where every node also stores its
//! subtree size. That gives logarithmic insert/remove plus logarithmic
//! "how many keys sort before X" queries, which is what rank lookups need.
//!
//! Nodes live in an arena (`Vec`) and link by index. Heap priorities come
//! from a seeded RNG so tree shape is independent of key order.

use std::cmp::Ordering;

use crate::core::rng::SeededRng;

/// Null link.
const NIL: usize = usize::MAX;

/// Seed for node priorities.
const PRIORITY_SEED: u64 = 0x5EED_0F_4A4E_4B;

#[derive(Clone, Debug)]
struct Node<K> {
    key: K,
    priority: u64,
    size: usize,
    left: usize,
    right: usize,
}

/// Ordered set with rank queries.
#[derive(Clone, Debug)]
pub struct OrderStatTree<K> {
    nodes: Vec<Node<K>>,
    /// Arena slots released by `remove`
    free: Vec<usize>,
    root: usize,
    rng: SeededRng,
}

impl<K: Ord> Default for OrderStatTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> OrderStatTree<K> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NIL,
            rng: SeededRng::new(PRIORITY_SEED),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.size(self.root)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// Check if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        let mut t = self.root;
        while t != NIL {
            let node = &self.nodes[t];
            match key.cmp(&node.key) {
                Ordering::Less => t = node.left,
                Ordering::Greater => t = node.right,
                Ordering::Equal => return true,
            }
        }
        false
    }

    /// Insert `key`. Returns false if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.contains(&key) {
            return false;
        }
        let (left, right) = self.split(self.root, &key);
        let node = self.alloc(key);
        let merged = self.merge(left, node);
        self.root = self.merge(merged, right);
        true
    }

    /// Remove `key`. Returns false if it was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let (root, removed) = self.remove_at(self.root, key);
        self.root = root;
        removed
    }

    /// Count keys for which `in_prefix` holds.
    ///
    /// `in_prefix` must be monotone over the key order: true for some
    /// leading run of keys and false for all keys after it.
    pub fn count_prefix<F>(&self, in_prefix: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut count = 0;
        let mut t = self.root;
        while t != NIL {
            let node = &self.nodes[t];
            if in_prefix(&node.key) {
                count += self.size(node.left) + 1;
                t = node.right;
            } else {
                t = node.left;
            }
        }
        count
    }

    /// Number of keys strictly less than `key`.
    pub fn count_less(&self, key: &K) -> usize {
        self.count_prefix(|k| k < key)
    }

    /// The first `limit` keys in ascending order.
    pub fn first_n(&self, limit: usize) -> Vec<&K> {
        let mut out = Vec::with_capacity(limit.min(self.len()));
        let mut stack = Vec::new();
        let mut t = self.root;

        while out.len() < limit && (t != NIL || !stack.is_empty()) {
            while t != NIL {
                stack.push(t);
                t = self.nodes[t].left;
            }
            if let Some(top) = stack.pop() {
                out.push(&self.nodes[top].key);
                t = self.nodes[top].right;
            }
        }

        out
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline]
    fn size(&self, t: usize) -> usize {
        if t == NIL {
            0
        } else {
            self.nodes[t].size
        }
    }

    #[inline]
    fn update(&mut self, t: usize) {
        let size = 1 + self.size(self.nodes[t].left) + self.size(self.nodes[t].right);
        self.nodes[t].size = size;
    }

    fn alloc(&mut self, key: K) -> usize {
        let node = Node {
            key,
            priority: self.rng.next_u64(),
            size: 1,
            left: NIL,
            right: NIL,
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Split into (keys < `key`, keys >= `key`).
    fn split(&mut self, t: usize, key: &K) -> (usize, usize) {
        if t == NIL {
            return (NIL, NIL);
        }
        if self.nodes[t].key < *key {
            let (left, right) = self.split(self.nodes[t].right, key);
            self.nodes[t].right = left;
            self.update(t);
            (t, right)
        } else {
            let (left, right) = self.split(self.nodes[t].left, key);
            self.nodes[t].left = right;
            self.update(t);
            (left, t)
        }
    }

    /// Merge two trees where every key in `a` sorts before every key in `b`.
    fn merge(&mut self, a: usize, b: usize) -> usize {
        if a == NIL {
            return b;
        }
        if b == NIL {
            return a;
        }
        if self.nodes[a].priority > self.nodes[b].priority {
            let right = self.merge(self.nodes[a].right, b);
            self.nodes[a].right = right;
            self.update(a);
            a
        } else {
            let left = self.merge(a, self.nodes[b].left);
            self.nodes[b].left = left;
            self.update(b);
            b
        }
    }

    fn remove_at(&mut self, t: usize, key: &K) -> (usize, bool) {
        if t == NIL {
            return (NIL, false);
        }
        match key.cmp(&self.nodes[t].key) {
            Ordering::Less => {
                let (left, removed) = self.remove_at(self.nodes[t].left, key);
                self.nodes[t].left = left;
                if removed {
                    self.update(t);
                }
                (t, removed)
            }
            Ordering::Greater => {
                let (right, removed) = self.remove_at(self.nodes[t].right, key);
                self.nodes[t].right = right;
                if removed {
                    self.update(t);
                }
                (t, removed)
            }
            Ordering::Equal => {
                let merged = self.merge(self.nodes[t].left, self.nodes[t].right);
                self.free.push(t);
                (merged, true)
            }
        }
    }
}
