//! Ordered container with stable links
//!
//! [`Chain`] is a doubly linked list stored in a slab of nodes. Appending
//! returns a [`Link`] that stays valid until that entry is removed, no matter
//! what happens to its neighbours. The vector store uses it to keep client
//! registrations in order: notification delivery walks the chain front to
//! back, and a client can unregister itself in O(1) via its link.
//!
//! Freed slots are recycled through a free list, so a chain that churns
//! through registrations does not grow without bound.

/// Stable handle to one entry of a [`Chain`].
///
/// A `Link` is only meaningful for the chain that issued it, and only until
/// its entry is removed. Accessors yield `None` for a removed entry; once the
/// slot is recycled by a later append, the old link must not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link(usize);

struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list over a slab, preserving insertion order.
pub struct Chain<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value at the tail, returning its stable link.
    pub fn append(&mut self, value: T) -> Link {
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Node {
                    value: Some(value),
                    prev: self.tail,
                    next: None,
                };
                index
            }
            None => {
                self.nodes.push(Node {
                    value: Some(value),
                    prev: self.tail,
                    next: None,
                });
                self.nodes.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        Link(index)
    }

    /// Remove the entry behind `link`, returning its value.
    ///
    /// Returns `None` if the entry was already removed.
    pub fn remove(&mut self, link: Link) -> Option<T> {
        let node = self.nodes.get_mut(link.0)?;
        let value = node.value.take()?;
        let (prev, next) = (node.prev, node.next);
        node.prev = None;
        node.next = None;

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        self.free.push(link.0);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, link: Link) -> Option<&T> {
        self.nodes.get(link.0)?.value.as_ref()
    }

    pub fn get_mut(&mut self, link: Link) -> Option<&mut T> {
        self.nodes.get_mut(link.0)?.value.as_mut()
    }

    /// Iterate values in insertion order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            chain: self,
            cursor: self.head,
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    chain: &'a Chain<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = &self.chain.nodes[index];
        self.cursor = node.next;
        node.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut chain = Chain::new();
        chain.append(1);
        chain.append(2);
        chain.append(3);

        let values: Vec<i32> = chain.iter().copied().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_remove_middle() {
        let mut chain = Chain::new();
        let _a = chain.append("a");
        let b = chain.append("b");
        let _c = chain.append("c");

        assert_eq!(chain.remove(b), Some("b"));
        let values: Vec<&str> = chain.iter().copied().collect();
        assert_eq!(values, vec!["a", "c"]);

        // Double removal is a no-op
        assert_eq!(chain.remove(b), None);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut chain = Chain::new();
        let a = chain.append(10);
        let _b = chain.append(20);
        let c = chain.append(30);

        assert_eq!(chain.remove(a), Some(10));
        assert_eq!(chain.remove(c), Some(30));
        let values: Vec<i32> = chain.iter().copied().collect();
        assert_eq!(values, vec![20]);
    }

    #[test]
    fn test_slot_recycling() {
        let mut chain = Chain::new();
        let a = chain.append(1);
        chain.remove(a);
        let b = chain.append(2);

        // The freed slot is reused for the new entry
        assert_eq!(chain.get(b), Some(&2));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_empty_chain() {
        let chain: Chain<i32> = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.iter().count(), 0);
    }
}
