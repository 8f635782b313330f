use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Index;

/// Unordered buffer with O(1) append, membership and swap-removal.
///
/// Keeps a value → slot index alongside the dense storage so entities can
/// be removed by value without a scan.
#[derive(Clone, Debug)]
pub(crate) struct SwapBuffer<T> {
    items: Vec<T>,
    slots: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash> SwapBuffer<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Appends `item`. Returns `false` if it was already present.
    pub(crate) fn push(&mut self, item: T) -> bool {
        if self.slots.contains_key(&item) {
            return false;
        }
        self.slots.insert(item, self.items.len());
        self.items.push(item);
        true
    }

    /// Removes `item` wherever it is. Returns `false` if it was absent.
    pub(crate) fn remove(&mut self, item: &T) -> bool {
        let Some(&index) = self.slots.get(item) else {
            return false;
        };
        self.swap_remove_at(index);
        true
    }

    /// Removes the item at `index`, moving the last item into its slot.
    pub(crate) fn swap_remove_at(&mut self, index: usize) -> T {
        let removed = self.items.swap_remove(index);
        self.slots.remove(&removed);
        if let Some(&moved) = self.items.get(index) {
            self.slots.insert(moved, index);
        }
        removed
    }

    #[inline]
    pub(crate) fn contains(&self, item: &T) -> bool {
        self.slots.contains_key(item)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Empties the buffer, returning its former contents.
    pub(crate) fn take(&mut self) -> Vec<T> {
        self.slots.clear();
        std::mem::take(&mut self.items)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }
}

impl<T> Index<usize> for SwapBuffer<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}
