//! Recently used grid cells
//!
//! Maps a grid cell to the catalog entry that was selected for it, so that
//! points falling in the same cell skip the linear scan. The catalog only
//! records cells where no other entry could win, and a hit is recomputed
//! and verified before use; a miss always falls back to full selection.

use crate::core::{GeoPoint, GridCell};
use std::collections::VecDeque;

/// Fixed-capacity cell cache, most recently used first
#[derive(Debug, Clone)]
pub struct GridCellCache {
    capacity: usize,
    slots: VecDeque<(GridCell, usize)>,
}

impl GridCellCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entry index for the most recent cell containing `p`
    ///
    /// A hit moves its slot to the front.
    pub fn lookup(&mut self, p: &GeoPoint) -> Option<usize> {
        let position = self.slots.iter().position(|(cell, _)| cell.contains(p))?;
        let slot = self.slots.remove(position)?;
        self.slots.push_front(slot);
        Some(slot.1)
    }

    /// Record `cell` for `entry`, evicting the least recently used slot
    pub fn record(&mut self, cell: GridCell, entry: usize) {
        if self.capacity == 0 {
            return;
        }
        self.slots.retain(|(c, _)| *c != cell);
        self.slots.push_front((cell, entry));
        self.slots.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: f64) -> GridCell {
        GridCell {
            south_west: (x, 0.0),
            north_east: (x + 1.0, 1.0),
        }
    }

    #[test]
    fn test_lookup_and_eviction() {
        let mut cache = GridCellCache::new(2);
        cache.record(cell(0.0), 7);
        cache.record(cell(1.0), 8);
        assert_eq!(cache.lookup(&GeoPoint::from_lng_lat(0.5, 0.5)), Some(7));

        // cell(1.0) is now least recently used
        cache.record(cell(2.0), 9);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup(&GeoPoint::from_lng_lat(1.5, 0.5)), None);
        assert_eq!(cache.lookup(&GeoPoint::from_lng_lat(2.5, 0.5)), Some(9));
        assert_eq!(cache.lookup(&GeoPoint::from_lng_lat(0.5, 0.5)), Some(7));
    }

    #[test]
    fn test_record_replaces_same_cell() {
        let mut cache = GridCellCache::new(4);
        cache.record(cell(0.0), 1);
        cache.record(cell(0.0), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&GeoPoint::from_lng_lat(0.5, 0.5)), Some(2));
    }

    #[test]
    fn test_zero_capacity_and_clear() {
        let mut disabled = GridCellCache::new(0);
        disabled.record(cell(0.0), 1);
        assert!(disabled.is_empty());

        let mut cache = GridCellCache::new(3);
        cache.record(cell(0.0), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }
}
