/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Occupancy and scheduling-range statistics.
//!
//! Useful for sizing the heap and immediate-queue capacities on a real board:
//! run the application for a while, call
//! [`Scheduler::log_stats`](super::Scheduler::log_stats), and size the
//! queues from the reported peaks.

use tracing::info;

/// Snapshot of scheduler statistics since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Largest number of entries the deadline heap has held.
    pub peak_heap: usize,
    /// Largest number of entries the immediate queue has held.
    pub peak_now: usize,
    /// Shortest offset passed to `schedule_after`.
    pub min_offset_us: Option<u32>,
    /// Longest offset passed to `schedule_after`.
    pub max_offset_us: Option<u32>,
}

impl SchedulerStats {
    pub(crate) fn record_heap_len(&mut self, len: usize) {
        self.peak_heap = self.peak_heap.max(len);
    }

    pub(crate) fn record_now_len(&mut self, len: usize) {
        self.peak_now = self.peak_now.max(len);
    }

    pub(crate) fn record_offset(&mut self, offset_us: u32) {
        self.min_offset_us = Some(self.min_offset_us.map_or(offset_us, |m| m.min(offset_us)));
        self.max_offset_us = Some(self.max_offset_us.map_or(offset_us, |m| m.max(offset_us)));
    }

    pub(crate) fn log(&self) {
        info!(
            peak_heap = self.peak_heap,
            peak_now = self.peak_now,
            min_offset_us = ?self.min_offset_us,
            max_offset_us = ?self.max_offset_us,
            "scheduler stats"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_only_grow() {
        let mut s = SchedulerStats::default();
        s.record_heap_len(3);
        s.record_heap_len(1);
        s.record_now_len(2);
        s.record_now_len(4);
        assert_eq!(s.peak_heap, 3);
        assert_eq!(s.peak_now, 4);
    }

    #[test]
    fn offset_range_tracks_extremes() {
        let mut s = SchedulerStats::default();
        assert_eq!(s.min_offset_us, None);
        for off in [500, 20, 9_000, 100] {
            s.record_offset(off);
        }
        assert_eq!(s.min_offset_us, Some(20));
        assert_eq!(s.max_offset_us, Some(9_000));
    }
}
