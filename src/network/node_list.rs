//! Ordered, lockable list with a shared round-robin cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NodeListError {
    #[error("list is locked")]
    ListLocked,

    #[error("index {index} out of bounds for list of length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Round-robin list. Once locked the items are immutable; the cursor keeps
/// advancing through `&self`, so concurrent callers share one rotation.
#[derive(Debug, Default)]
pub struct NodeList<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
    locked: bool,
}

impl<T> NodeList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: AtomicUsize::new(0),
            locked: false,
        }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
            locked: false,
        }
    }

    pub fn push(&mut self, items: impl IntoIterator<Item = T>) -> Result<&mut Self, NodeListError> {
        self.ensure_unlocked()?;
        self.items.extend(items);
        Ok(self)
    }

    /// Replace every item and reset the cursor.
    pub fn set_list(&mut self, items: Vec<T>) -> Result<&mut Self, NodeListError> {
        self.ensure_unlocked()?;
        self.items = items;
        self.cursor.store(0, Ordering::Relaxed);
        Ok(self)
    }

    /// Replace the item at `index`, or append when `index == len()`.
    pub fn set(&mut self, index: usize, item: T) -> Result<&mut Self, NodeListError> {
        self.ensure_unlocked()?;
        let len = self.items.len();
        match index {
            i if i < len => self.items[i] = item,
            i if i == len => self.items.push(item),
            _ => return Err(NodeListError::OutOfBounds { index, len }),
        }
        Ok(self)
    }

    pub fn set_locked(&mut self) -> &mut Self {
        self.locked = true;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Return the current position and move the cursor forward, wrapping.
    pub fn advance(&self) -> usize {
        let len = self.items.len();
        if len == 0 {
            return 0;
        }
        // fetch_add may overshoot len under contention; the modulo folds it back
        self.cursor.fetch_add(1, Ordering::Relaxed) % len
    }

    /// Item under the cursor.
    pub fn current(&self) -> Option<&T> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        self.items.get(self.cursor.load(Ordering::Relaxed) % len)
    }

    /// Advance and return the item that was under the cursor.
    pub fn next(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(self.advance())
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn ensure_unlocked(&self) -> Result<(), NodeListError> {
        if self.locked {
            Err(NodeListError::ListLocked)
        } else {
            Ok(())
        }
    }
}

impl<T: Clone> Clone for NodeList<T> {
    /// Same items, fresh cursor, unlocked.
    fn clone(&self) -> Self {
        Self::from_items(self.items.clone())
    }
}

impl<T> FromIterator<T> for NodeList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let list = NodeList::from_items(vec!["a", "b", "c"]);
        let picks: Vec<&str> = (0..7).filter_map(|_| list.next().copied()).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_round_robin_fairness() {
        let list = NodeList::from_items(vec![0usize, 1, 2, 3]);
        let mut counts = [0usize; 4];
        for _ in 0..400 {
            counts[list.advance()] += 1;
        }
        assert_eq!(counts, [100; 4]);
    }

    #[test]
    fn test_concurrent_advance_is_fair() {
        let list = std::sync::Arc::new(NodeList::from_items(vec![0usize, 1, 2]));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let list = list.clone();
                std::thread::spawn(move || (0..300).map(|_| list.advance()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts = [0usize; 3];
        for handle in handles {
            for index in handle.join().unwrap() {
                counts[index] += 1;
            }
        }
        assert_eq!(counts, [300; 3]);
    }

    #[test]
    fn test_locked_list_rejects_mutation() {
        let mut list = NodeList::from_items(vec![1, 2]);
        list.set_locked();
        assert!(list.is_locked());
        assert_eq!(list.push([3]).err(), Some(NodeListError::ListLocked));
        assert_eq!(list.set_list(vec![]).err(), Some(NodeListError::ListLocked));
        assert_eq!(list.set(0, 9).err(), Some(NodeListError::ListLocked));
        assert_eq!(list.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_set_appends_at_len() {
        let mut list = NodeList::new();
        list.set(0, "x").unwrap();
        list.set(1, "y").unwrap();
        list.set(0, "z").unwrap();
        assert_eq!(list.as_slice(), &["z", "y"]);
        assert_eq!(
            list.set(5, "w").err(),
            Some(NodeListError::OutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_clone_resets_cursor_and_lock() {
        let mut list = NodeList::from_items(vec![1, 2, 3]);
        list.advance();
        list.set_locked();

        let copy = list.clone();
        assert!(!copy.is_locked());
        assert_eq!(copy.current(), Some(&1));
        assert_eq!(list.current(), Some(&2));
    }

    #[test]
    fn test_empty_list() {
        let list: NodeList<u8> = NodeList::new();
        assert_eq!(list.advance(), 0);
        assert!(list.current().is_none());
        assert!(list.next().is_none());
    }
}
