//! Array-backed binary min-heap of scored proximity items.
//!
//! Items are keyed by [`ScoredItem::score`], a travel budget rather than a
//! distance (see [`ProximityTracker`](crate::ProximityTracker)). Entries are
//! relocated by index swaps only, so callers must never hold slot indices
//! across a mutating call.

use crate::anchor::AnchorId;

/// One tracked object inside a [`DistanceHeap`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredItem<T> {
    /// Caller-owned handle. The heap never manages its lifetime.
    pub item: T,
    /// Position source of the item.
    pub anchor: AnchorId,
    /// Radius added to the tracker's global activation radius.
    pub radius: f32,
    /// Heap key. Lower scores are re-examined sooner.
    pub score: f32,
    /// Last known activation state.
    pub active: bool,
}

impl<T> ScoredItem<T> {
    pub fn new(item: T, anchor: AnchorId, radius: f32, score: f32) -> Self {
        Self {
            item,
            anchor,
            radius,
            score,
            active: false,
        }
    }
}

#[inline]
const fn parent(index: usize) -> usize {
    (index - 1) / 2
}

#[inline]
const fn left(index: usize) -> usize {
    2 * index + 1
}

#[inline]
const fn right(index: usize) -> usize {
    2 * index + 2
}

/// Binary min-heap over [`ScoredItem`] keyed by score.
///
/// # Invariant
///
/// For every index `i` with children, `score[i] <= score[2i+1]` and
/// `score[i] <= score[2i+2]`.
#[derive(Clone, Debug)]
pub struct DistanceHeap<T> {
    items: Vec<ScoredItem<T>>,
}

impl<T> DistanceHeap<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry and sifts it up. O(log n).
    pub fn insert(&mut self, entry: ScoredItem<T>) {
        self.items.push(entry);
        self.sift_up(self.items.len() - 1);
    }

    /// Removes the entry at `index` by swapping in the last entry. O(log n).
    ///
    /// The moved-in entry is compared against its new parent: if it is
    /// smaller it sifts up, otherwise it sifts down. Sifting down alone would
    /// leave a small entry stranded below a larger parent.
    pub fn delete_at(&mut self, index: usize) -> ScoredItem<T> {
        debug_assert!(
            index < self.items.len(),
            "delete_at index {} out of range for heap of {}",
            index,
            self.items.len()
        );

        let removed = self.items.swap_remove(index);
        if index < self.items.len() {
            if index > 0 && self.items[index].score < self.items[parent(index)].score {
                self.sift_up(index);
            } else {
                self.sift_down(index);
            }
        }
        removed
    }

    /// Moves the entry at `index` toward the root while it is smaller than its parent.
    pub fn sift_up(&mut self, mut index: usize) {
        debug_assert!(index < self.items.len());

        while index != 0 {
            let up = parent(index);
            if self.items[index].score < self.items[up].score {
                self.items.swap(index, up);
                index = up;
            } else {
                break;
            }
        }
    }

    /// Moves the entry at `index` toward the leaves while a child is smaller.
    pub fn sift_down(&mut self, mut index: usize) {
        debug_assert!(index < self.items.len() || self.items.is_empty());

        let len = self.items.len();
        loop {
            let l = left(index);
            if l >= len {
                break;
            }
            let r = right(index);
            let smaller = if r < len && self.items[r].score < self.items[l].score {
                r
            } else {
                l
            };

            if self.items[smaller].score < self.items[index].score {
                self.items.swap(index, smaller);
                index = smaller;
            } else {
                break;
            }
        }
    }

    /// Adds `delta` to every score. A uniform shift keeps the heap order.
    pub fn shift_scores(&mut self, delta: f32) {
        for entry in &mut self.items {
            entry.score += delta;
        }
    }

    #[inline]
    pub fn root(&self) -> Option<&ScoredItem<T>> {
        self.items.first()
    }

    /// Mutable access to the root. Call [`sift_down(0)`](Self::sift_down)
    /// after changing its score.
    #[inline]
    pub fn root_mut(&mut self) -> Option<&mut ScoredItem<T>> {
        self.items.first_mut()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ScoredItem<T>> {
        self.items.get(index)
    }

    /// Index of the first entry matching `predicate`. Linear scan.
    pub fn position(&self, predicate: impl FnMut(&ScoredItem<T>) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ScoredItem<T>> {
        self.items.iter()
    }

    /// Mutable iteration. Changing scores through this may break the heap order.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, ScoredItem<T>> {
        self.items.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Checks the heap invariant over every parent/child pair.
    pub fn is_valid_heap(&self) -> bool {
        (1..self.items.len()).all(|i| self.items[parent(i)].score <= self.items[i].score)
    }
}

impl<T> Default for DistanceHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, score: f32) -> ScoredItem<u32> {
        ScoredItem::new(id, AnchorId::default(), 0.0, score)
    }

    fn heap_of(scores: &[f32]) -> DistanceHeap<u32> {
        let mut heap = DistanceHeap::new();
        for (i, &score) in scores.iter().enumerate() {
            heap.insert(entry(i as u32, score));
        }
        heap
    }

    #[test]
    fn insert_keeps_minimum_at_root() {
        let heap = heap_of(&[5.0, 3.0, 8.0, 1.0, 9.0, 2.0]);
        assert!(heap.is_valid_heap());
        assert_eq!(heap.root().map(|e| e.item), Some(3));
        assert_eq!(heap.len(), 6);
    }

    #[test]
    fn delete_at_root_promotes_next_smallest() {
        let mut heap = heap_of(&[5.0, 3.0, 8.0, 1.0, 9.0, 2.0]);
        let removed = heap.delete_at(0);
        assert_eq!(removed.item, 3);
        assert!(heap.is_valid_heap());
        assert_eq!(heap.root().map(|e| e.score), Some(2.0));
    }

    #[test]
    fn delete_at_sifts_up_when_moved_entry_beats_parent() {
        // Layout after inserts: [0, 10, 1, 11, 12, 2, 3]
        //            0
        //        10      1
        //      11  12  2   3
        // Deleting index 4 (12) moves 3 into slot 4 under parent 10;
        // it must sift up, not down.
        let mut heap = DistanceHeap::new();
        for (id, score) in [(0, 0.0), (1, 10.0), (2, 1.0), (3, 11.0), (4, 12.0), (5, 2.0), (6, 3.0)] {
            heap.insert(entry(id, score));
        }
        assert_eq!(heap.get(4).map(|e| e.score), Some(12.0));

        heap.delete_at(4);
        assert!(heap.is_valid_heap());
        assert_eq!(heap.get(1).map(|e| e.score), Some(3.0));
    }

    #[test]
    fn delete_last_index_just_shrinks() {
        let mut heap = heap_of(&[1.0, 2.0, 3.0]);
        let removed = heap.delete_at(2);
        assert_eq!(removed.score, 3.0);
        assert_eq!(heap.len(), 2);
        assert!(heap.is_valid_heap());
    }

    #[test]
    fn insert_then_delete_returns_to_empty() {
        let mut heap = DistanceHeap::new();
        heap.insert(entry(7, 4.0));
        let removed = heap.delete_at(0);
        assert_eq!(removed.item, 7);
        assert!(heap.is_empty());
        assert!(heap.root().is_none());
    }

    #[test]
    fn shift_scores_preserves_order() {
        let mut heap = heap_of(&[40.0, 130.0, 250.0, 129.0]);
        heap.shift_scores(-128.0);
        assert!(heap.is_valid_heap());
        assert_eq!(heap.root().map(|e| e.score), Some(-88.0));
    }

    #[test]
    fn position_finds_by_item() {
        let heap = heap_of(&[4.0, 2.0, 6.0]);
        let index = heap.position(|e| e.item == 2);
        assert_eq!(index.and_then(|i| heap.get(i)).map(|e| e.score), Some(6.0));
        assert_eq!(heap.position(|e| e.item == 99), None);
    }
}
