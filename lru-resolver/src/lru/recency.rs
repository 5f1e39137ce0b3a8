//! Provides the recency list which orders all cached entries from most to least recently used.
//!
//! Instead of embedding raw pointers into the cached values, all nodes are kept in an arena and
//! addressed by their **slot**. An index entry only stores the slot of its node, so that an entry
//! and its node share one lifetime without requiring a second allocation per entry.
//!
//! The list is bounded by two sentinels (slot 0 is the head, slot 1 is the tail) which are never
//! removed. A node is considered to be "in the list" exactly if both of its links are present.
//!
//! Note that the list itself performs no locking at all. The [LRUCache](crate::lru::LRUCache)
//! keeps it within a single mutex and only mutates it while holding this lock.
use anyhow::Context;

/// Addresses a node within the arena of a [RecencyList].
pub type Slot = usize;

const HEAD: Slot = 0;
const TAIL: Slot = 1;

struct Node {
    key: String,
    prev: Option<Slot>,
    next: Option<Slot>,
}

impl Node {
    fn unlinked(key: String) -> Self {
        Node {
            key,
            prev: None,
            next: None,
        }
    }
}

/// Orders slots from the most recently used one (right after the head sentinel) to the least
/// recently used one (right before the tail sentinel).
pub struct RecencyList {
    nodes: Vec<Node>,
    free: Vec<Slot>,
}

impl RecencyList {
    /// Creates an empty list and reserves room for **capacity** nodes (plus the sentinels).
    ///
    /// One extra node is reserved, as a full cache allocates the node of a new entry before
    /// it evicts (and releases) the node of its victim.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity + 3);
        nodes.push(Node {
            key: String::new(),
            prev: None,
            next: Some(TAIL),
        });
        nodes.push(Node {
            key: String::new(),
            prev: Some(HEAD),
            next: None,
        });

        RecencyList {
            nodes,
            free: Vec::new(),
        }
    }

    /// Reserves an unlinked node for the given key.
    ///
    /// Slots which have previously been released are re-used before the arena grows.
    pub fn allocate(&mut self, key: &str) -> Slot {
        match self.free.pop() {
            Some(slot) => {
                let node = &mut self.nodes[slot];
                node.key.push_str(key);
                slot
            }
            None => {
                self.nodes.push(Node::unlinked(key.to_owned()));
                self.nodes.len() - 1
            }
        }
    }

    /// Hands an unlinked slot back to the arena so that it can be re-used by another entry.
    pub fn release(&mut self, slot: Slot) {
        debug_assert!(slot > TAIL, "A sentinel must never be released!");
        debug_assert!(!self.in_list(slot), "A linked node must not be released!");

        self.nodes[slot].key.clear();
        self.free.push(slot);
    }

    /// Determines if the given slot is currently linked into the list.
    pub fn in_list(&self, slot: Slot) -> bool {
        let node = &self.nodes[slot];
        debug_assert_eq!(node.prev.is_some(), node.next.is_some());

        node.prev.is_some()
    }

    /// Links the given (unlinked) slot right after the head sentinel.
    pub fn push_front(&mut self, slot: Slot) {
        debug_assert!(!self.in_list(slot), "A node must not be linked twice!");

        let first = self.nodes[HEAD].next.unwrap_or(TAIL);
        self.nodes[slot].prev = Some(HEAD);
        self.nodes[slot].next = Some(first);
        self.nodes[first].prev = Some(slot);
        self.nodes[HEAD].next = Some(slot);
    }

    /// Removes the given slot from the list and clears its links.
    ///
    /// The caller has to ensure that the slot is [in the list](RecencyList::in_list).
    pub fn unlink(&mut self, slot: Slot) {
        debug_assert!(self.in_list(slot), "Only a linked node can be unlinked!");

        let node = &mut self.nodes[slot];
        let (prev, next) = match (node.prev.take(), node.next.take()) {
            (Some(prev), Some(next)) => (prev, next),
            _ => return,
        };

        self.nodes[prev].next = Some(next);
        self.nodes[next].prev = Some(prev);
    }

    /// Moves the given slot to the front if it is currently linked.
    ///
    /// Returns **false** if the node is in transition (not yet linked by its insert or already
    /// unlinked by an eviction) and has therefore been left alone.
    pub fn promote(&mut self, slot: Slot) -> bool {
        if !self.in_list(slot) {
            return false;
        }

        if self.nodes[HEAD].next != Some(slot) {
            self.unlink(slot);
            self.push_front(slot);
        }

        true
    }

    /// Returns the least recently used slot or **None** if the list is empty.
    pub fn victim(&self) -> Option<Slot> {
        self.nodes[TAIL].prev.filter(|slot| *slot != HEAD)
    }

    /// Moves the key out of the given node.
    ///
    /// This is used by the eviction, which needs an owned key to erase the entry from the
    /// index once the list lock has been released.
    pub fn take_key(&mut self, slot: Slot) -> String {
        std::mem::take(&mut self.nodes[slot].key)
    }

    /// Returns the number of nodes in the arena (excluding the sentinels), linked or not.
    pub fn allocated(&self) -> usize {
        self.nodes.len() - 2
    }

    /// Lists all keys from the most recently used to the least recently used one.
    pub fn keys(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = self.nodes[HEAD].next;
        while let Some(slot) = current.filter(|slot| *slot != TAIL) {
            result.push(self.nodes[slot].key.clone());
            current = self.nodes[slot].next;
        }

        result
    }

    /// Verifies the structure of the list and returns the number of linked nodes.
    ///
    /// The list has to be terminated by the sentinels in both directions, each forward link
    /// has to be mirrored by the matching backward link and no node may be visited twice.
    pub fn check_links(&self) -> anyhow::Result<usize> {
        let max_steps = self.nodes.len();

        let mut forward = 0;
        let mut current = HEAD;
        while current != TAIL {
            let next = self.nodes[current]
                .next
                .with_context(|| format!("Slot {} is linked but has no successor!", current))?;
            anyhow::ensure!(
                self.nodes[next].prev == Some(current),
                "Slot {} points to {} but is not pointed back to.",
                current,
                next
            );
            anyhow::ensure!(
                forward < max_steps,
                "The recency list contains a cycle (walking from head to tail)."
            );
            forward += 1;
            current = next;
        }

        let mut backward = 0;
        let mut current = TAIL;
        while current != HEAD {
            current = self.nodes[current]
                .prev
                .with_context(|| format!("Slot {} is linked but has no predecessor!", current))?;
            anyhow::ensure!(
                backward < max_steps,
                "The recency list contains a cycle (walking from tail to head)."
            );
            backward += 1;
        }

        anyhow::ensure!(
            forward == backward,
            "Walking the recency list forward yields {} hops but {} backwards.",
            forward,
            backward
        );

        Ok(forward - 1)
    }
}
