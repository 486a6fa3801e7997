//! Least-loaded node selection.
//!
//! `LoadHeap` is an array-backed binary min-heap of `(node_id, load)` entries
//! with a capacity fixed at creation. Every node is expected to appear exactly
//! once, so the heap never grows. It is a derived index: the owner keeps each
//! entry's `load` in sync with the node's `current_load`.
//!
//! ## Tie-breaking
//! - sift-up only moves an entry while its load is strictly less than its parent's
//! - sift-down checks the left child first, the right child replaces it only when
//!   strictly smaller, so the left child wins ties
//!
//! As a consequence, when every node is inserted at the same load, `extract_min`
//! returns the first inserted node. Callers should not otherwise rely on any order
//! among equal loads.

use serde::{Deserialize, Serialize};

use crate::errors::{BalancerError, Result};
use crate::node::NodeId;

/// One `(node_id, load)` pair tracked by the heap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadEntry {
    pub node_id: NodeId,
    pub load: f64,
}

#[derive(Debug, Clone)]
pub struct LoadHeap {
    entries: Vec<LoadEntry>,
    capacity: usize,
}

impl LoadHeap {
    /// Creates an empty heap able to hold exactly `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BalancerError::InvalidCapacity(
                "load heap capacity must be greater than zero".to_string(),
            ));
        }

        Ok(LoadHeap {
            entries: Vec::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends an entry and restores the heap property upwards. O(log n).
    pub fn insert(&mut self, node_id: NodeId, load: f64) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(BalancerError::CapacityExceeded(self.capacity));
        }

        self.entries.push(LoadEntry { node_id, load });
        self.sift_up(self.entries.len() - 1);
        Ok(())
    }

    /// Removes and returns the entry with the minimum load. O(log n).
    pub fn extract_min(&mut self) -> Result<LoadEntry> {
        if self.entries.is_empty() {
            return Err(BalancerError::Empty);
        }

        // swap_remove moves the last entry into the root slot
        let min = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Ok(min)
    }

    /// Overwrites the load of `node_id` and re-establishes the heap property
    /// from its position. Locating the entry is a linear scan.
    pub fn update_load(&mut self, node_id: NodeId, new_load: f64) -> Result<()> {
        let index = self
            .position(node_id)
            .ok_or(BalancerError::NodeNotFound(node_id))?;

        self.entries[index].load = new_load;

        if index > 0 && new_load < self.entries[parent(index)].load {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
        Ok(())
    }

    /// Returns the minimum entry without removing it.
    pub fn peek_min(&self) -> Option<&LoadEntry> {
        self.entries.first()
    }

    /// Returns the load currently indexed for `node_id`.
    pub fn load_of(&self, node_id: NodeId) -> Option<f64> {
        self.position(node_id).map(|i| self.entries[i].load)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries in heap (array) order.
    pub fn entries(&self) -> &[LoadEntry] {
        &self.entries
    }

    /// Checks `load[i] >= load[parent(i)]` for every non-root entry.
    pub fn satisfies_heap_property(&self) -> bool {
        (1..self.entries.len()).all(|i| self.entries[i].load >= self.entries[parent(i)].load)
    }

    fn position(&self, node_id: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.node_id == node_id)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent_idx = parent(index);
            if self.entries[index].load < self.entries[parent_idx].load {
                self.entries.swap(index, parent_idx);
                index = parent_idx;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let size = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;

            if left < size && self.entries[left].load < self.entries[smallest].load {
                smallest = left;
            }
            if right < size && self.entries[right].load < self.entries[smallest].load {
                smallest = right;
            }

            if smallest == index {
                break;
            }
            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}

fn parent(index: usize) -> usize {
    (index - 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_with(loads: &[f64]) -> LoadHeap {
        let mut heap = LoadHeap::new(loads.len()).unwrap();
        for (id, load) in loads.iter().enumerate() {
            heap.insert(id as NodeId, *load).unwrap();
        }
        heap
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            LoadHeap::new(0),
            Err(BalancerError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_insert_beyond_capacity() {
        let mut heap = LoadHeap::new(2).unwrap();
        heap.insert(0, 1.0).unwrap();
        heap.insert(1, 2.0).unwrap();
        assert_eq!(heap.insert(2, 0.5), Err(BalancerError::CapacityExceeded(2)));
        // the failed insert leaves the heap untouched
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.peek_min().unwrap().node_id, 0);
    }

    #[test]
    fn test_extract_min_on_empty() {
        let mut heap = LoadHeap::new(1).unwrap();
        assert_eq!(heap.extract_min(), Err(BalancerError::Empty));
    }

    #[test]
    fn test_extract_in_ascending_order() {
        let mut heap = heap_with(&[40.0, 10.0, 30.0, 20.0, 5.0]);
        assert!(heap.satisfies_heap_property());

        let order: Vec<NodeId> = (0..5).map(|_| heap.extract_min().unwrap().node_id).collect();
        assert_eq!(order, vec![4, 1, 3, 2, 0]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_equal_loads_return_first_inserted() {
        let mut heap = heap_with(&[0.0, 0.0, 0.0]);
        assert_eq!(heap.extract_min().unwrap().node_id, 0);
        // last entry moved to the root and stays there on ties
        assert_eq!(heap.entries()[0].node_id, 2);
        assert_eq!(heap.entries()[1].node_id, 1);
    }

    #[test]
    fn test_sift_down_left_wins_ties() {
        // root 9 with two equal children: the left one is promoted
        let mut heap = LoadHeap::new(3).unwrap();
        heap.insert(0, 1.0).unwrap();
        heap.insert(1, 2.0).unwrap();
        heap.insert(2, 2.0).unwrap();
        heap.update_load(0, 9.0).unwrap();

        assert_eq!(heap.entries()[0].node_id, 1);
        assert_eq!(heap.entries()[1].node_id, 0);
        assert_eq!(heap.entries()[2].node_id, 2);
    }

    #[test]
    fn test_update_load_moves_up_and_down() {
        let mut heap = heap_with(&[10.0, 20.0, 30.0, 40.0]);

        heap.update_load(3, 1.0).unwrap();
        assert_eq!(heap.peek_min().unwrap().node_id, 3);
        assert!(heap.satisfies_heap_property());

        heap.update_load(3, 100.0).unwrap();
        assert_eq!(heap.peek_min().unwrap().node_id, 0);
        assert!(heap.satisfies_heap_property());
        assert_eq!(heap.load_of(3), Some(100.0));
    }

    #[test]
    fn test_update_unknown_node() {
        let mut heap = heap_with(&[1.0, 2.0]);
        assert_eq!(
            heap.update_load(7, 3.0),
            Err(BalancerError::NodeNotFound(7))
        );
    }

    #[test]
    fn test_size_introspection() {
        let mut heap = LoadHeap::new(3).unwrap();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert_eq!(heap.capacity(), 3);

        heap.insert(0, 1.0).unwrap();
        assert!(!heap.is_empty());
        assert_eq!(heap.len(), 1);
    }
}
