//! The vector value type
//!
//! This module defines [`Vector`], a resizable array of `f64` with the
//! storage semantics the rest of the crate builds on:
//!
//! - Capacity grows by doubling from a base size and never shrinks while the
//!   vector is alive; logical length moves freely within it.
//! - Slots exposed by growth are zero-filled, including slots that held data
//!   before an earlier shrink.
//! - `min`/`max` are cached and recomputed lazily over finite elements.
//! - A transient selected sub-range (`first..=last`) feeds range-aware
//!   operations (duplicate, the special statistic indices) and is reset to
//!   the full vector by every mutation.
//!
//! `Vector` is pure data. Registration, naming, and client notification live
//! in [`registry`](crate::store::registry) and [`client`](crate::store::client).

use crate::store::errors::StoreError;

/// Base allocation size; capacity doubles from here as the vector grows.
pub const BASE_CAPACITY: usize = 64;

/// A resizable array of doubles with range/offset semantics.
#[derive(Debug, Clone)]
pub struct Vector {
    /// Backing storage; `buf.len()` is the capacity. Elements past `length`
    /// are scratch and must be re-zeroed before they become visible.
    buf: Vec<f64>,

    /// Logical element count
    length: usize,

    /// Shift applied to externally supplied indices
    offset: i64,

    /// Selected sub-range, inclusive on both ends. Meaningful only while
    /// `length > 0`; reset to the full vector before each command.
    first: usize,
    last: usize,

    /// Cached extrema, valid only when `range_dirty` is false
    min: f64,
    max: f64,
    range_dirty: bool,

    /// Bumped on every mutation
    dirty: u64,
}

impl Vector {
    /// Create an empty vector (length 0, no storage yet).
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            length: 0,
            offset: 0,
            first: 0,
            last: 0,
            min: 0.0,
            max: 0.0,
            range_dirty: true,
            dirty: 0,
        }
    }

    /// Create a zero-filled vector of the given length.
    pub fn with_length(length: usize) -> Result<Self, StoreError> {
        let mut vector = Self::new();
        vector.change_length(length)?;
        Ok(vector)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Allocated slot count. Grows by doubling, never shrinks.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The live elements.
    pub fn values(&self) -> &[f64] {
        &self.buf[..self.length]
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        if index < self.length {
            Some(self.buf[index])
        } else {
            None
        }
    }

    /// Index origin shift applied to external numbering.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    /// Mutation counter; every write bumps it.
    pub fn dirty_count(&self) -> u64 {
        self.dirty
    }

    /// Grow or shrink the logical length.
    ///
    /// Growth within the current capacity only zero-fills the newly exposed
    /// slots. Growth past it doubles the capacity from [`BASE_CAPACITY`]
    /// until the request fits, then copies the live data over. Allocation
    /// failure leaves the vector exactly as it was.
    pub fn change_length(&mut self, new_length: usize) -> Result<(), StoreError> {
        if new_length > self.buf.len() {
            let mut capacity = self.buf.len().max(BASE_CAPACITY);
            while capacity < new_length {
                capacity *= 2;
            }

            let mut next: Vec<f64> = Vec::new();
            next.try_reserve_exact(capacity)
                .map_err(|_| StoreError::Allocation {
                    requested: capacity,
                })?;
            next.extend_from_slice(&self.buf[..self.length]);
            next.resize(capacity, 0.0);
            self.buf = next;
        } else if new_length > self.length {
            // Slots past `length` may hold stale data from before a shrink
            for slot in &mut self.buf[self.length..new_length] {
                *slot = 0.0;
            }
        }

        self.length = new_length;
        self.touch();
        Ok(())
    }

    /// Replace the backing storage wholesale, taking ownership of `values`.
    pub fn reset(&mut self, values: Vec<f64>) {
        self.length = values.len();
        self.buf = values;
        self.touch();
    }

    /// Replace the backing storage with a defensive copy of `values`.
    ///
    /// Use this when the caller keeps ownership of (and may later mutate)
    /// the source buffer.
    pub fn reset_from_slice(&mut self, values: &[f64]) {
        self.reset(values.to_vec());
    }

    /// Write one element. `index == len()` appends (the `++end` target);
    /// anything past that is out of bounds.
    pub fn set(&mut self, index: usize, value: f64) -> Result<(), StoreError> {
        if index == self.length {
            self.change_length(index + 1)?;
        } else if index > self.length {
            return Err(StoreError::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }
        self.buf[index] = value;
        self.touch();
        Ok(())
    }

    /// Append every item of `list`, parsing each as a number.
    ///
    /// The vector grows speculatively; if any item fails to parse it is
    /// rolled back to its pre-append length.
    pub fn append_list(&mut self, list: &[&str]) -> Result<(), StoreError> {
        let old_length = self.length;
        self.change_length(old_length + list.len())?;

        for (i, item) in list.iter().enumerate() {
            match item.trim().parse::<f64>() {
                Ok(value) => self.buf[old_length + i] = value,
                Err(_) => {
                    self.length = old_length;
                    self.touch();
                    return Err(StoreError::BadElement {
                        item: (*item).to_string(),
                    });
                }
            }
        }

        self.touch();
        Ok(())
    }

    /// Resize to `data.len()` and overwrite with `data`.
    pub(crate) fn copy_from(&mut self, data: &[f64]) -> Result<(), StoreError> {
        self.change_length(data.len())?;
        self.buf[..data.len()].copy_from_slice(data);
        self.touch();
        Ok(())
    }

    /// Smallest finite element, recomputed if the cache is stale.
    pub fn min(&mut self) -> f64 {
        self.update_range();
        self.min
    }

    /// Largest finite element, recomputed if the cache is stale.
    pub fn max(&mut self) -> f64 {
        self.update_range();
        self.max
    }

    fn update_range(&mut self) {
        if !self.range_dirty {
            return;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in self.values() {
            if !value.is_finite() {
                continue;
            }
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
        if min > max {
            // Empty or all non-finite
            min = 0.0;
            max = 0.0;
        }
        self.min = min;
        self.max = max;
        self.range_dirty = false;
    }

    /// Start of the selected sub-range.
    pub fn first(&self) -> usize {
        self.first
    }

    /// End (inclusive) of the selected sub-range.
    pub fn last(&self) -> usize {
        self.last
    }

    /// The elements of the selected sub-range.
    pub fn selected(&self) -> &[f64] {
        if self.length == 0 {
            &[]
        } else {
            &self.buf[self.first..=self.last]
        }
    }

    pub(crate) fn select(&mut self, first: usize, last: usize) {
        debug_assert!(first <= last || self.length == 0);
        self.first = first;
        self.last = last;
    }

    /// Select the whole vector. Every command does this before parsing its
    /// index arguments, so a stale selection never leaks between commands.
    pub(crate) fn reset_selection(&mut self) {
        self.first = 0;
        self.last = self.length.saturating_sub(1);
    }

    /// Record a mutation: bump the dirty counter, invalidate the extrema
    /// cache, and drop any sub-range selection.
    fn touch(&mut self) {
        self.dirty = self.dirty.wrapping_add(1);
        self.range_dirty = true;
        self.reset_selection();
    }
}

impl Default for Vector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_zero_fills() {
        let mut v = Vector::new();
        v.change_length(4).unwrap();
        assert_eq!(v.values(), &[0.0, 0.0, 0.0, 0.0]);

        v.set(2, 7.5).unwrap();
        v.change_length(6).unwrap();
        assert_eq!(v.values(), &[0.0, 0.0, 7.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_shrink_then_grow_rezeroes() {
        let mut v = Vector::new();
        v.reset(vec![1.0, 2.0, 3.0]);
        v.change_length(1).unwrap();
        v.change_length(3).unwrap();
        assert_eq!(v.values(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_capacity_doubles_and_never_shrinks() {
        let mut v = Vector::new();
        v.change_length(1).unwrap();
        assert_eq!(v.capacity(), BASE_CAPACITY);

        v.change_length(BASE_CAPACITY + 1).unwrap();
        assert_eq!(v.capacity(), BASE_CAPACITY * 2);

        v.change_length(2).unwrap();
        assert_eq!(v.capacity(), BASE_CAPACITY * 2);
    }

    #[test]
    fn test_append_list_rolls_back() {
        let mut v = Vector::new();
        v.reset(vec![1.0, 2.0]);
        let err = v.append_list(&["3", "oops", "5"]).unwrap_err();
        assert!(matches!(err, StoreError::BadElement { .. }));
        assert_eq!(v.values(), &[1.0, 2.0]);

        v.append_list(&["3", "4"]).unwrap();
        assert_eq!(v.values(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_min_max_skip_non_finite() {
        let mut v = Vector::new();
        v.reset(vec![3.0, f64::NAN, -1.0, f64::INFINITY]);
        assert_eq!(v.min(), -1.0);
        assert_eq!(v.max(), 3.0);
    }

    #[test]
    fn test_set_append_slot() {
        let mut v = Vector::new();
        v.reset(vec![1.0]);
        v.set(1, 2.0).unwrap();
        assert_eq!(v.values(), &[1.0, 2.0]);
        assert!(v.set(5, 9.0).is_err());
    }

    #[test]
    fn test_dirty_counter_advances() {
        let mut v = Vector::new();
        let d0 = v.dirty_count();
        v.change_length(3).unwrap();
        v.set(0, 1.0).unwrap();
        assert!(v.dirty_count() > d0);
    }
}
