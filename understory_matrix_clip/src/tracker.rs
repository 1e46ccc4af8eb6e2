// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Save/restore stack over [`MatrixClipState`].

use alloc::vec::Vec;

use kurbo::Rect;

use crate::{Matrix, MatrixClipState};

/// A [`MatrixClipState`] with a save/restore stack.
///
/// `save` snapshots the current transform and cull rect; `restore` returns to
/// the most recent snapshot. Restoring never grows the cull rect beyond what
/// it was when the matching `save` was issued.
///
/// The save count starts at `1`, matching canvas conventions.
///
/// # Panics
///
/// [`restore`](Self::restore) without a matching [`save`](Self::save) and
/// [`restore_to_count`](Self::restore_to_count) with a count of zero are
/// programming errors and panic.
#[derive(Clone, Debug)]
pub struct MatrixClipTracker {
    current: MatrixClipState,
    saved: Vec<MatrixClipState>,
}

impl MatrixClipTracker {
    /// Creates a tracker with an identity transform and the given device cull rect.
    #[must_use]
    pub fn new(cull_rect: Rect) -> Self {
        Self::with_state(MatrixClipState::new(cull_rect))
    }

    /// Creates a tracker starting from an existing state.
    #[must_use]
    pub fn with_state(state: MatrixClipState) -> Self {
        Self {
            current: state,
            saved: Vec::new(),
        }
    }

    /// The current state.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &MatrixClipState {
        &self.current
    }

    /// Mutable access to the current state.
    #[inline]
    pub fn current_mut(&mut self) -> &mut MatrixClipState {
        &mut self.current
    }

    /// The current local-to-device transform.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> &Matrix {
        self.current.matrix()
    }

    /// Number of saves outstanding, plus one.
    #[inline]
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saved.len() + 1
    }

    /// Pushes a snapshot of the current state and returns the save count
    /// prior to the push.
    pub fn save(&mut self) -> usize {
        let count = self.save_count();
        self.saved.push(self.current.clone());
        count
    }

    /// Pops back to the most recent snapshot.
    pub fn restore(&mut self) {
        let Some(state) = self.saved.pop() else {
            panic!("MatrixClipTracker::restore called without a matching save");
        };
        self.current = state;
    }

    /// Restores until [`save_count`](Self::save_count) equals `count`.
    ///
    /// Does nothing if the save count is already at or below `count`.
    pub fn restore_to_count(&mut self, count: usize) {
        assert!(count >= 1, "save count never drops below 1");
        while self.save_count() > count {
            self.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClipOp;

    #[test]
    fn restore_returns_saved_state() {
        let mut t = MatrixClipTracker::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let before = t.current().clone();
        assert_eq!(t.save(), 1);
        t.current_mut().translate(5.0, 5.0);
        t.current_mut()
            .clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0), ClipOp::Intersect, true);
        assert_eq!(t.save_count(), 2);
        t.restore();
        assert_eq!(t.current(), &before);
    }

    #[test]
    fn restore_to_count_unwinds_nested_saves() {
        let mut t = MatrixClipTracker::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let base = t.save_count();
        for i in 0..5 {
            t.save();
            t.current_mut().translate(f64::from(i), 0.0);
        }
        t.restore_to_count(base);
        assert_eq!(t.save_count(), 1);
        assert_eq!(t.matrix(), &Matrix::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "without a matching save")]
    fn unbalanced_restore_panics() {
        let mut t = MatrixClipTracker::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        t.restore();
    }
}
