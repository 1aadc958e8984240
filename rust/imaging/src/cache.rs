// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Insertion-ordered cache for per-floor base rasters.

use std::collections::VecDeque;

use floorset_core::Floor;

/// Base rasters kept per renderer.
pub const MAX_STORED_FLOORS: usize = 2;

/// Identifies a floor in one mutation state.
///
/// Float fields are compared bitwise, so `-0.0` and `0.0` are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterKey {
    pub floor_id: u32,
    angle: u64,
    scale_x: u64,
    scale_y: u64,
}

impl RasterKey {
    pub fn of(floor: &Floor) -> Self {
        Self {
            floor_id: floor.id(),
            angle: floor.mutator_angle().to_bits(),
            scale_x: floor.mutator_scale_x().to_bits(),
            scale_y: floor.mutator_scale_y().to_bits(),
        }
    }
}

/// Bounded cache evicting the oldest insertion, regardless of use.
#[derive(Debug)]
pub struct FifoCache<K, V> {
    capacity: usize,
    entries: VecDeque<(K, V)>,
}

impl<K: PartialEq, V> FifoCache<K, V> {
    /// Capacity is at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Stores `value`, returning the evicted entry if the cache was full.
    ///
    /// Re-inserting an existing key replaces it in place.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(i) = self.position(&key) {
            self.entries[i].1 = value;
            return None;
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back((key, value));
        evicted
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

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
