// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage carried by swapchain buffers between uses.

use hashbrown::HashMap;
use understory_matrix_clip::IntRect;

/// Tracks, per swapchain buffer, what changed since the buffer was last
/// presented.
///
/// A surface cycling through several buffers hands back a buffer whose
/// content is a few frames old. Everything damaged by the frames presented in
/// between must be repainted on top of the current frame's damage; that is
/// what [`existing_damage`](Self::existing_damage) returns.
#[derive(Clone, Debug, Default)]
pub struct DamageHistory {
    buffers: HashMap<u64, IntRect>,
}

impl DamageHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Damage `buffer` has accumulated since it was last presented.
    ///
    /// `None` for a buffer that was never presented: its content is unknown
    /// and the frame must be repainted in full.
    #[must_use]
    pub fn existing_damage(&self, buffer: u64) -> Option<IntRect> {
        self.buffers.get(&buffer).copied()
    }

    /// Records that `buffer` was presented with `frame_damage` repainted.
    ///
    /// Every other known buffer is now missing `frame_damage`; `buffer`
    /// itself is up to date.
    pub fn record_presented(&mut self, buffer: u64, frame_damage: IntRect) {
        for (&id, damage) in &mut self.buffers {
            if id != buffer {
                *damage = damage.union(frame_damage);
            }
        }
        self.buffers.insert(buffer, IntRect::ZERO);
    }

    /// Stops tracking `buffer`, for example after the swapchain was rebuilt.
    pub fn forget(&mut self, buffer: u64) {
        self.buffers.remove(&buffer);
    }

    /// Stops tracking all buffers.
    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Number of tracked buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no buffer is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_buffers_have_no_existing_damage() {
        let history = DamageHistory::new();
        assert_eq!(history.existing_damage(7), None);
    }

    #[test]
    fn damage_accumulates_on_idle_buffers() {
        let mut history = DamageHistory::new();
        history.record_presented(0, IntRect::new(0, 0, 100, 100));
        history.record_presented(1, IntRect::new(0, 0, 100, 100));
        history.record_presented(0, IntRect::new(10, 10, 20, 20));
        history.record_presented(1, IntRect::new(50, 50, 60, 70));

        // Buffer 0 missed the frame presented into buffer 1.
        assert_eq!(history.existing_damage(0), Some(IntRect::new(50, 50, 60, 70)));
        assert_eq!(history.existing_damage(1), Some(IntRect::ZERO));

        history.record_presented(2, IntRect::new(0, 0, 5, 5));
        assert_eq!(history.existing_damage(0), Some(IntRect::new(0, 0, 60, 70)));
        assert_eq!(history.existing_damage(1), Some(IntRect::new(0, 0, 5, 5)));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn forgotten_buffers_start_over() {
        let mut history = DamageHistory::new();
        history.record_presented(0, IntRect::new(0, 0, 10, 10));
        history.forget(0);
        assert_eq!(history.existing_damage(0), None);
        history.record_presented(1, IntRect::new(0, 0, 10, 10));
        history.clear();
        assert!(history.is_empty());
    }
}
