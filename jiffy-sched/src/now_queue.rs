/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Small FIFO for work that should run at the next dispatch opportunity.
//!
//! Entries here skip the heap entirely and are dispatched ahead of any heap
//! entry.  When the queue is full, [`ImmediateQueue::push`] hands the item
//! back so the scheduler can demote it into the deadline heap instead.

use heapless::Deque;

/// FIFO with room for `K` entries.
#[derive(Debug)]
pub struct ImmediateQueue<T, const K: usize> {
    entries: Deque<T, K>,
}

impl<T, const K: usize> Default for ImmediateQueue<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const K: usize> ImmediateQueue<T, K> {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        K
    }

    /// Appends `item` and returns the new length, or gives `item` back if
    /// the queue is full.
    pub fn push(&mut self, item: T) -> Result<usize, T> {
        self.entries.push_back(item)?;
        Ok(self.entries.len())
    }

    /// Removes the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_front()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
