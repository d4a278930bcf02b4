/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-capacity binary min-heap keyed by wrapping deadline.
//!
//! Backed by a [`heapless::Vec`], so the storage is sized at compile time and
//! never reallocates.  Ordering uses [`later_than`] exclusively, which means
//! the heap is only well-ordered while every pending deadline lies within
//! 2³¹ µs of every other one (see [`crate::time`]).
//!
//! Entries with equal deadlines come out in an unspecified order.  The heap is
//! not stable and callers must not rely on insertion order for ties.

use heapless::Vec;
use thiserror::Error;

use crate::time::{later_than, Time};

/// Returned by [`DeadlineHeap::insert`] when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline heap is full ({capacity} entries)")]
pub struct HeapFull {
    pub capacity: usize,
}

/// One pending deadline and its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapEntry<T> {
    pub deadline: Time,
    pub item: T,
}

/// Array-backed min-heap with room for `N` entries.
#[derive(Debug)]
pub struct DeadlineHeap<T, const N: usize> {
    entries: Vec<HeapEntry<T>, N>,
}

impl<T, const N: usize> Default for DeadlineHeap<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> DeadlineHeap<T, N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Inserts `item` due at `deadline` and returns the new entry count.
    ///
    /// O(log n).  Fails without modifying the heap when it is full.
    pub fn insert(&mut self, deadline: Time, item: T) -> Result<usize, HeapFull> {
        self.entries
            .push(HeapEntry { deadline, item })
            .map_err(|_| HeapFull { capacity: N })?;
        self.sift_up(self.entries.len() - 1);
        Ok(self.entries.len())
    }

    /// The entry with the nearest deadline, without removing it.
    pub fn peek_min(&self) -> Option<(Time, &T)> {
        self.entries.first().map(|e| (e.deadline, &e.item))
    }

    /// Removes and returns the entry with the nearest deadline.  O(log n).
    pub fn pop_min(&mut self) -> Option<HeapEntry<T>> {
        if self.entries.is_empty() {
            return None;
        }
        let root = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(root)
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !later_than(self.entries[parent].deadline, self.entries[idx].deadline) {
                break;
            }
            self.entries.swap(parent, idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut nearest = left;
            if right < len
                && later_than(self.entries[left].deadline, self.entries[right].deadline)
            {
                nearest = right;
            }
            if !later_than(self.entries[idx].deadline, self.entries[nearest].deadline) {
                break;
            }
            self.entries.swap(idx, nearest);
            idx = nearest;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain<T, const N: usize>(heap: &mut DeadlineHeap<T, N>) -> std::vec::Vec<u32> {
        std::iter::from_fn(|| heap.pop_min().map(|e| e.deadline.as_us())).collect()
    }

    #[test]
    fn empty_heap_peeks_none() {
        let heap: DeadlineHeap<u8, 4> = DeadlineHeap::new();
        assert!(heap.peek_min().is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let mut heap: DeadlineHeap<u8, 4> = DeadlineHeap::new();
        assert!(heap.pop_min().is_none());
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut heap: DeadlineHeap<&str, 8> = DeadlineHeap::new();
        heap.insert(Time::from_us(300), "c").unwrap();
        heap.insert(Time::from_us(100), "a").unwrap();
        heap.insert(Time::from_us(200), "b").unwrap();

        assert_eq!(heap.peek_min(), Some((Time::from_us(100), &"a")));
        let order: std::vec::Vec<_> =
            std::iter::from_fn(|| heap.pop_min().map(|e| e.item)).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_reports_running_count() {
        let mut heap: DeadlineHeap<(), 4> = DeadlineHeap::new();
        assert_eq!(heap.insert(Time::from_us(1), ()), Ok(1));
        assert_eq!(heap.insert(Time::from_us(2), ()), Ok(2));
    }

    #[test]
    fn insert_at_capacity_fails_and_keeps_contents() {
        let mut heap: DeadlineHeap<u8, 2> = DeadlineHeap::new();
        heap.insert(Time::from_us(5), 1).unwrap();
        heap.insert(Time::from_us(6), 2).unwrap();

        let err = heap.insert(Time::from_us(1), 3).unwrap_err();
        assert_eq!(err, HeapFull { capacity: 2 });
        assert_eq!(heap.len(), heap.capacity());
        assert_eq!(heap.peek_min().map(|(t, _)| t), Some(Time::from_us(5)));
    }

    #[test]
    fn orders_deadlines_straddling_rollover() {
        let mut heap: DeadlineHeap<(), 8> = DeadlineHeap::new();
        let base = Time::from_us(u32::MAX - 1_000);
        for offset in [1_500u32, 10, 900, 2_000, 1_001] {
            heap.insert(base.wrapping_add_us(offset), ()).unwrap();
        }
        let expected: std::vec::Vec<u32> = [10u32, 900, 1_001, 1_500, 2_000]
            .iter()
            .map(|o| base.wrapping_add_us(*o).as_us())
            .collect();
        assert_eq!(drain(&mut heap), expected);
    }

    #[test]
    fn equal_deadlines_all_come_out() {
        let mut heap: DeadlineHeap<u8, 4> = DeadlineHeap::new();
        for i in 0..4 {
            heap.insert(Time::from_us(42), i).unwrap();
        }
        let mut items: std::vec::Vec<u8> =
            std::iter::from_fn(|| heap.pop_min().map(|e| e.item)).collect();
        items.sort_unstable();
        assert_eq!(items, vec![0, 1, 2, 3]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
            rng_seed: proptest::test_runner::RngSeed::Fixed(0x4EA9),
            .. ProptestConfig::default()
        })]

        #[test]
        fn pop_sequence_matches_sorted_reference(
            base in any::<u32>(),
            offsets in proptest::collection::vec(0u32..(1 << 30), 0..64),
        ) {
            let base = Time::from_us(base);
            let mut heap: DeadlineHeap<u32, 64> = DeadlineHeap::new();
            for &off in &offsets {
                heap.insert(base.wrapping_add_us(off), off).unwrap();
            }

            let mut reference = offsets.clone();
            reference.sort_unstable();

            let popped: std::vec::Vec<u32> = std::iter::from_fn(|| {
                heap.pop_min().map(|e| e.deadline.signed_since(base) as u32)
            })
            .collect();
            prop_assert_eq!(popped, reference);
        }

        #[test]
        fn interleaved_insert_pop_keeps_min_at_root(
            ops in proptest::collection::vec((any::<bool>(), 0u32..(1 << 30)), 1..128),
        ) {
            let mut heap: DeadlineHeap<(), 128> = DeadlineHeap::new();
            let mut reference: std::vec::Vec<u32> = std::vec::Vec::new();
            for (is_insert, value) in ops {
                if is_insert || reference.is_empty() {
                    heap.insert(Time::from_us(value), ()).unwrap();
                    reference.push(value);
                } else {
                    reference.sort_unstable();
                    let expected = reference.remove(0);
                    let got = heap.pop_min().map(|e| e.deadline.as_us());
                    prop_assert_eq!(got, Some(expected));
                }
            }
        }
    }
}
