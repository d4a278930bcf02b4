/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Generation-checked storage for pending activations.
//!
//! The heap and the immediate queue never hold activations directly; they
//! hold a [`Handle`] into a [`SlotArena`].  Cancelling marks the slot dead
//! but keeps it reserved until the queue entry that refers to it is popped,
//! so the arena occupancy always equals the number of queued entries.  Every
//! release bumps the slot generation, which turns any handle still held by a
//! caller into a harmless stale handle.

use heapless::Vec;

/// Opaque reference to one scheduled activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Free,
    Live(T),
    Cancelled,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// Fixed pool of `N` activation slots.
#[derive(Debug)]
pub struct SlotArena<T, const N: usize> {
    slots: Vec<Slot<T>, N>,
    free: Vec<usize, N>,
    occupied: usize,
}

impl<T, const N: usize> Default for SlotArena<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> SlotArena<T, N> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            occupied: 0,
        }
    }

    /// Number of reserved slots (live or cancelled-but-still-queued).
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupied == N
    }

    /// Stores `item`, or gives it back when all `N` slots are reserved.
    pub fn insert(&mut self, item: T) -> Result<Handle, T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                let fresh = Slot {
                    generation: 0,
                    state: SlotState::Free,
                };
                if self.slots.push(fresh).is_err() {
                    return Err(item);
                }
                index
            }
        };

        let slot = &mut self.slots[index];
        slot.state = SlotState::Live(item);
        self.occupied += 1;
        Ok(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// `true` while `handle` refers to an activation that has neither fired
    /// nor been cancelled.
    pub fn is_live(&self, handle: Handle) -> bool {
        matches!(
            self.slot(handle),
            Some(Slot {
                state: SlotState::Live(_),
                ..
            })
        )
    }

    /// Marks the activation dead.  Returns `false` for stale handles and for
    /// activations that were already cancelled.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) if matches!(slot.state, SlotState::Live(_)) => {
                slot.state = SlotState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Releases the slot behind `handle` and returns its activation, or
    /// `None` if it was cancelled.  Called once per popped queue entry.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        let state = std::mem::replace(&mut slot.state, SlotState::Free);
        if matches!(state, SlotState::Free) {
            return None;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.occupied -= 1;
        // Cannot overflow: at most N indices are ever handed out.
        let _ = self.free.push(handle.index);
        match state {
            SlotState::Live(item) => Some(item),
            SlotState::Cancelled | SlotState::Free => None,
        }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index)
            .filter(|s| s.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index)
            .filter(|s| s.generation == handle.generation)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_release_returns_item() {
        let mut arena: SlotArena<&str, 4> = SlotArena::new();
        let h = arena.insert("blink").unwrap();
        assert!(arena.is_live(h));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.release(h), Some("blink"));
        assert!(!arena.is_live(h));
        assert!(arena.is_empty());
    }

    #[test]
    fn cancelled_slot_stays_reserved_until_released() {
        let mut arena: SlotArena<u8, 4> = SlotArena::new();
        let h = arena.insert(7).unwrap();
        assert!(arena.cancel(h));
        assert!(!arena.is_live(h));
        assert_eq!(arena.len(), 1);

        assert_eq!(arena.release(h), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn cancel_twice_reports_false() {
        let mut arena: SlotArena<u8, 4> = SlotArena::new();
        let h = arena.insert(1).unwrap();
        assert!(arena.cancel(h));
        assert!(!arena.cancel(h));
    }

    #[test]
    fn stale_handle_cannot_touch_reused_slot() {
        let mut arena: SlotArena<u8, 1> = SlotArena::new();
        let old = arena.insert(1).unwrap();
        arena.release(old);

        let new = arena.insert(2).unwrap();
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());

        assert!(!arena.cancel(old));
        assert!(arena.is_live(new));
        assert_eq!(arena.release(old), None);
        assert_eq!(arena.release(new), Some(2));
    }

    #[test]
    fn full_arena_gives_item_back() {
        let mut arena: SlotArena<u8, 2> = SlotArena::new();
        arena.insert(1).unwrap();
        arena.insert(2).unwrap();
        assert!(arena.is_full());
        assert_eq!(arena.insert(3), Err(3));
    }

    #[test]
    fn released_slots_are_reused() {
        let mut arena: SlotArena<u8, 2> = SlotArena::new();
        for round in 0..10u8 {
            let a = arena.insert(round).unwrap();
            let b = arena.insert(round + 100).unwrap();
            assert_eq!(arena.release(a), Some(round));
            assert_eq!(arena.release(b), Some(round + 100));
        }
        assert!(arena.is_empty());
    }
}
