//! LRU replacement policy for the buffer pool.
//!
//! The replacer tracks the set of frames that are currently eligible for
//! eviction, in access order. It is a membership structure, not a cache:
//! the pool inserts a frame exactly when its pin count drops to zero and
//! erases it when the frame is pinned again, so the least recently
//! inserted element is the correct eviction target.
//!
//! The structure is a doubly-linked list plus a map from value to node,
//! giving O(1) insert, erase, and victim selection.

use std::collections::HashMap;
use std::hash::Hash;
use std::ptr::NonNull;

use parking_lot::Mutex;

/// A node in the replacer's linked list.
struct Node<T> {
    value: T,
    prev: Option<NonNull<Node<T>>>,
    next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            prev: None,
            next: None,
        }
    }
}

/// The list and map behind the replacer, protected by one lock.
struct LruList<T> {
    /// Map from value to node pointer.
    map: HashMap<T, NonNull<Node<T>>>,
    /// Head of the list (most recently inserted).
    head: Option<NonNull<Node<T>>>,
    /// Tail of the list (least recently inserted - the next victim).
    tail: Option<NonNull<Node<T>>>,
}

// Safety: LruList owns its nodes; the raw pointers never escape it.
unsafe impl<T: Send> Send for LruList<T> {}

impl<T> LruList<T> {
    fn len(&self) -> usize {
        self.map.len()
    }
}

impl<T: Hash + Eq + Clone> LruList<T> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    fn insert(&mut self, value: T) {
        if let Some(&node_ptr) = self.map.get(&value) {
            // Already present: treat as a fresh access
            self.move_to_front(node_ptr);
            return;
        }

        let node = Box::new(Node::new(value.clone()));
        let node_ptr = NonNull::from(Box::leak(node));
        self.push_front(node_ptr);
        self.map.insert(value, node_ptr);
    }

    fn victim(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.unlink(tail);
        // Safety: tail came from the map and is now unlinked, so we own it
        let node = unsafe { Box::from_raw(tail.as_ptr()) };
        self.map.remove(&node.value);
        Some(node.value)
    }

    fn erase(&mut self, value: &T) -> bool {
        if let Some(node_ptr) = self.map.remove(value) {
            self.unlink(node_ptr);
            // Safety: we just removed it from the map, so we own it
            unsafe { drop(Box::from_raw(node_ptr.as_ptr())) };
            true
        } else {
            false
        }
    }

    /// Moves a node to the front of the list.
    fn move_to_front(&mut self, node_ptr: NonNull<Node<T>>) {
        if Some(node_ptr) == self.head {
            return;
        }
        self.unlink(node_ptr);
        self.push_front(node_ptr);
    }

    /// Pushes a node to the front of the list.
    fn push_front(&mut self, node_ptr: NonNull<Node<T>>) {
        unsafe {
            (*node_ptr.as_ptr()).prev = None;
            (*node_ptr.as_ptr()).next = self.head;

            if let Some(head) = self.head {
                (*head.as_ptr()).prev = Some(node_ptr);
            }

            self.head = Some(node_ptr);

            if self.tail.is_none() {
                self.tail = Some(node_ptr);
            }
        }
    }

    /// Unlinks a node from the list.
    fn unlink(&mut self, node_ptr: NonNull<Node<T>>) {
        unsafe {
            let prev = (*node_ptr.as_ptr()).prev;
            let next = (*node_ptr.as_ptr()).next;

            if let Some(prev) = prev {
                (*prev.as_ptr()).next = next;
            } else {
                self.head = next;
            }

            if let Some(next) = next {
                (*next.as_ptr()).prev = prev;
            } else {
                self.tail = prev;
            }
        }
    }
}

impl<T> Drop for LruList<T> {
    fn drop(&mut self) {
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                current = (*node_ptr.as_ptr()).next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }
    }
}

/// A thread-safe LRU replacer with O(1) operations.
///
/// # Example
///
/// ```
/// use burrow_storage::buffer::LruReplacer;
///
/// let replacer = LruReplacer::new();
/// replacer.insert(1u32);
/// replacer.insert(2u32);
/// replacer.insert(1u32); // touch: 1 becomes most recent
///
/// assert_eq!(replacer.victim(), Some(2));
/// assert_eq!(replacer.victim(), Some(1));
/// assert_eq!(replacer.victim(), None);
/// ```
pub struct LruReplacer<T> {
    inner: Mutex<LruList<T>>,
}

impl<T: Hash + Eq + Clone> LruReplacer<T> {
    /// Creates an empty replacer.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruList::new()),
        }
    }

    /// Inserts a value, or refreshes its position if already present.
    ///
    /// The value becomes the most recently touched element. Idempotent
    /// with respect to membership.
    pub fn insert(&self, value: T) {
        self.inner.lock().insert(value);
    }

    /// Removes and returns the least recently inserted value.
    ///
    /// Returns `None` when the replacer is empty.
    pub fn victim(&self) -> Option<T> {
        self.inner.lock().victim()
    }

    /// Removes a value if present; returns whether it was present.
    ///
    /// Safe to call for values that were never inserted.
    pub fn erase(&self, value: &T) -> bool {
        self.inner.lock().erase(value)
    }

    /// Returns the current element count.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no frame is eligible for eviction.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Hash + Eq + Clone> Default for LruReplacer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for LruReplacer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruReplacer")
            .field("len", &self.inner.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_victim_order() {
        let replacer = LruReplacer::new();
        replacer.insert(1u32);
        replacer.insert(2u32);
        replacer.insert(3u32);

        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(3));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_reinsert_refreshes() {
        let replacer = LruReplacer::new();
        replacer.insert(1u32);
        replacer.insert(2u32);
        replacer.insert(1u32);

        assert_eq!(replacer.len(), 2);
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), Some(1));
    }

    #[test]
    fn test_erase() {
        let replacer = LruReplacer::new();
        replacer.insert(1u32);
        replacer.insert(2u32);

        assert!(replacer.erase(&1));
        assert_eq!(replacer.len(), 1);

        // Idempotent: erasing again (or erasing an unknown value) is a no-op
        assert!(!replacer.erase(&1));
        assert!(!replacer.erase(&99));

        assert_eq!(replacer.victim(), Some(2));
    }

    #[test]
    fn test_erase_head_and_tail() {
        let replacer = LruReplacer::new();
        replacer.insert(1u32);
        replacer.insert(2u32);
        replacer.insert(3u32);

        assert!(replacer.erase(&3)); // head
        assert!(replacer.erase(&1)); // tail
        assert_eq!(replacer.victim(), Some(2));
        assert!(replacer.is_empty());
    }

    #[test]
    fn test_empty() {
        let replacer: LruReplacer<u32> = LruReplacer::new();
        assert!(replacer.is_empty());
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_no_duplicates() {
        let replacer = LruReplacer::new();
        for _ in 0..5 {
            replacer.insert(7u32);
        }
        assert_eq!(replacer.len(), 1);
        assert_eq!(replacer.victim(), Some(7));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_concurrent_inserts() {
        use std::sync::Arc;

        let replacer = Arc::new(LruReplacer::new());
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let replacer = Arc::clone(&replacer);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u32 {
                    replacer.insert(t * 100 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(replacer.len(), 400);

        let mut victims = 0;
        while replacer.victim().is_some() {
            victims += 1;
        }
        assert_eq!(victims, 400);
    }
}
