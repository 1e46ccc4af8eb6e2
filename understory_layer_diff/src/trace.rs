// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explainability hooks for a diff pass.
//!
//! A [`DiffContext`](crate::DiffContext) does not keep provenance for the
//! damage it accumulates. When a frame repaints more than expected it is
//! useful to ask "which subtree made this dirty, and where did it paint?".
//!
//! Attach a [`DiffTrace`] with
//! [`DiffContext::set_trace`](crate::DiffContext::set_trace) to observe the
//! pass as it happens. [`DiffRecorder`] simply stores every event.

use alloc::vec::Vec;

use kurbo::Rect;

/// One observation made during a diff pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DiffEvent {
    /// A subtree was marked dirty. `previous_bounds` is the previous-frame
    /// footprint folded into damage, or [`Rect::ZERO`] if there was none.
    SubtreeDirty {
        /// Subtree nesting depth.
        depth: usize,
        /// Previous-frame bounds added to damage.
        previous_bounds: Rect,
    },
    /// Device-space paint bounds were recorded for the current subtree.
    LayerBounds {
        /// Subtree nesting depth.
        depth: usize,
        /// Bounds after transform and filter adjustment.
        device_rect: Rect,
        /// Whether the bounds were also added to damage.
        dirty: bool,
    },
    /// A subtree reused its previous-frame paint region.
    ExistingRegion {
        /// Subtree nesting depth.
        depth: usize,
        /// Number of rects carried over.
        rects: usize,
    },
    /// A framebuffer readback was recorded.
    Readback {
        /// Subtree nesting depth.
        depth: usize,
        /// Device-space area read back.
        device_rect: Rect,
    },
    /// Damage was added directly.
    Damage {
        /// Device-space damage.
        rect: Rect,
    },
}

/// A callback sink for diff pass tracing.
///
/// All methods have empty default bodies so sinks can observe only what they
/// care about.
pub trait DiffTrace {
    /// Called when a subtree is marked dirty.
    fn subtree_dirty(&mut self, depth: usize, previous_bounds: Rect) {
        let _ = (depth, previous_bounds);
    }

    /// Called for every rect appended to the current pass's paint list.
    fn layer_bounds(&mut self, depth: usize, device_rect: Rect, dirty: bool) {
        let _ = (depth, device_rect, dirty);
    }

    /// Called when a retained subtree carries its previous rects forward.
    fn existing_region(&mut self, depth: usize, rects: usize) {
        let _ = (depth, rects);
    }

    /// Called when a readback is recorded.
    fn readback(&mut self, depth: usize, device_rect: Rect) {
        let _ = (depth, device_rect);
    }

    /// Called when damage is added without an associated paint rect.
    fn damage(&mut self, rect: Rect) {
        let _ = rect;
    }
}

/// Records every [`DiffEvent`] in order.
#[derive(Clone, Debug, Default)]
pub struct DiffRecorder {
    events: Vec<DiffEvent>,
}

impl DiffRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[DiffEvent] {
        &self.events
    }

    /// Clears all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Depths of all subtrees that were marked dirty.
    pub fn dirty_depths(&self) -> impl Iterator<Item = usize> + '_ {
        self.events.iter().filter_map(|event| match event {
            DiffEvent::SubtreeDirty { depth, .. } => Some(*depth),
            _ => None,
        })
    }
}

impl DiffTrace for DiffRecorder {
    fn subtree_dirty(&mut self, depth: usize, previous_bounds: Rect) {
        self.events.push(DiffEvent::SubtreeDirty {
            depth,
            previous_bounds,
        });
    }

    fn layer_bounds(&mut self, depth: usize, device_rect: Rect, dirty: bool) {
        self.events.push(DiffEvent::LayerBounds {
            depth,
            device_rect,
            dirty,
        });
    }

    fn existing_region(&mut self, depth: usize, rects: usize) {
        self.events.push(DiffEvent::ExistingRegion { depth, rects });
    }

    fn readback(&mut self, depth: usize, device_rect: Rect) {
        self.events.push(DiffEvent::Readback { depth, device_rect });
    }

    fn damage(&mut self, rect: Rect) {
        self.events.push(DiffEvent::Damage { rect });
    }
}
