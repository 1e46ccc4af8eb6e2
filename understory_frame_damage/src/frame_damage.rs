// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame damage computation against a retained previous frame.

use alloc::sync::Arc;

use understory_layer_diff::{Damage, DiffContext, DiffStatistics, DiffTrace, PaintRegionMap};
use understory_layer_tree::LayerTree;
use understory_matrix_clip::IntRect;

/// What one successfully rasterized frame leaves behind for the next.
///
/// The next frame diffs its tree against `layer_tree`, looking up where each
/// retained layer painted in `paint_regions`.
#[derive(Clone, Debug)]
pub struct RetainedFrame {
    /// The tree that was painted.
    pub layer_tree: Arc<LayerTree>,
    /// Where each layer of `layer_tree` painted.
    pub paint_regions: Arc<PaintRegionMap>,
}

impl RetainedFrame {
    /// Bundles a painted tree with the regions its diff pass recorded.
    #[must_use]
    pub fn new(layer_tree: Arc<LayerTree>, paint_regions: PaintRegionMap) -> Self {
        Self {
            layer_tree,
            paint_regions: Arc::new(paint_regions),
        }
    }
}

/// Computes how much of a frame must be repainted.
///
/// One `FrameDamage` is set up per frame: give it the previous frame with
/// [`set_previous_frame`](Self::set_previous_frame), any damage the target
/// buffer already carries with
/// [`add_additional_damage`](Self::add_additional_damage) and the surface's
/// pixel alignment, then call [`compute_clip_rect`](Self::compute_clip_rect).
///
/// Without a previous frame, or when the frame size changed, the whole frame
/// is damaged.
#[derive(Debug)]
pub struct FrameDamage {
    previous: Option<RetainedFrame>,
    additional_damage: IntRect,
    horizontal_clip_alignment: u32,
    vertical_clip_alignment: u32,
    damage: Option<Damage>,
    statistics: DiffStatistics,
    retained: Option<RetainedFrame>,
}

impl Default for FrameDamage {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDamage {
    /// Creates a tracker with no previous frame and no alignment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: None,
            additional_damage: IntRect::ZERO,
            horizontal_clip_alignment: 1,
            vertical_clip_alignment: 1,
            damage: None,
            statistics: DiffStatistics::default(),
            retained: None,
        }
    }

    /// Sets the frame to diff against. `None` forces a full repaint.
    pub fn set_previous_frame(&mut self, previous: Option<RetainedFrame>) {
        self.previous = previous;
    }

    /// Adds damage the target buffer already has, for example from frames
    /// presented into other buffers since this one was last used.
    pub fn add_additional_damage(&mut self, damage: IntRect) {
        self.additional_damage = self.additional_damage.union(damage);
    }

    /// Sets the pixel grid damage is expanded onto. `1` means no alignment.
    pub fn set_clip_alignment(&mut self, horizontal: u32, vertical: u32) {
        self.horizontal_clip_alignment = horizontal;
        self.vertical_clip_alignment = vertical;
    }

    /// Diffs `layer_tree` against the previous frame and returns the buffer
    /// damage as the clip rect for painting.
    ///
    /// Returns `None` if the tree has no root, in which case there is nothing
    /// to clip to.
    pub fn compute_clip_rect(
        &mut self,
        layer_tree: &Arc<LayerTree>,
        has_raster_cache: bool,
        impeller_enabled: bool,
    ) -> Option<IntRect> {
        self.compute(layer_tree, has_raster_cache, impeller_enabled, None)
    }

    /// Like [`compute_clip_rect`](Self::compute_clip_rect), reporting diff
    /// events to `trace`.
    pub fn compute_clip_rect_traced(
        &mut self,
        layer_tree: &Arc<LayerTree>,
        has_raster_cache: bool,
        impeller_enabled: bool,
        trace: &mut dyn DiffTrace,
    ) -> Option<IntRect> {
        self.compute(layer_tree, has_raster_cache, impeller_enabled, Some(trace))
    }

    fn compute(
        &mut self,
        layer_tree: &Arc<LayerTree>,
        has_raster_cache: bool,
        impeller_enabled: bool,
        trace: Option<&mut dyn DiffTrace>,
    ) -> Option<IntRect> {
        if layer_tree.root().is_none() {
            self.damage = None;
            self.statistics = DiffStatistics::default();
            self.retained = Some(RetainedFrame::new(
                layer_tree.clone(),
                PaintRegionMap::new(),
            ));
            return None;
        }

        let frame_size = layer_tree.frame_size();
        let previous = self
            .previous
            .as_ref()
            .filter(|previous| previous.layer_tree.frame_size() == frame_size);
        let empty = PaintRegionMap::new();
        let last_regions = previous.map_or(&empty, |previous| &*previous.paint_regions);

        let mut ctx = DiffContext::new(frame_size, last_regions, has_raster_cache, impeller_enabled);
        if let Some(trace) = trace {
            ctx.set_trace(trace);
        }
        ctx.with_subtree(|ctx| match previous {
            Some(previous) => layer_tree.diff(ctx, Some(&*previous.layer_tree)),
            None => {
                // Nothing valid to compare against: repaint everything.
                ctx.mark_subtree_dirty_rect(layer_tree.frame_rect());
                layer_tree.diff(ctx, None);
            }
        });

        let damage = ctx.compute_damage(
            self.additional_damage,
            self.horizontal_clip_alignment,
            self.vertical_clip_alignment,
        );
        self.statistics = *ctx.statistics();
        self.damage = Some(damage);
        self.retained = Some(RetainedFrame::new(
            layer_tree.clone(),
            ctx.into_paint_regions(),
        ));
        Some(damage.buffer_damage)
    }

    /// Damage of the frame about to be presented, if computed.
    #[must_use]
    pub fn frame_damage(&self) -> Option<IntRect> {
        self.damage.map(|damage| damage.frame_damage)
    }

    /// Damage of the target buffer, if computed.
    #[must_use]
    pub fn buffer_damage(&self) -> Option<IntRect> {
        self.damage.map(|damage| damage.buffer_damage)
    }

    /// Forgets the computed damage so the frame is treated as fully damaged.
    ///
    /// Paint regions recorded by the pass are kept; they describe where the
    /// layers paint, which does not depend on how much is repainted.
    pub fn reset(&mut self) {
        self.damage = None;
    }

    /// Picture comparison counters from the last pass.
    #[must_use]
    pub fn statistics(&self) -> &DiffStatistics {
        &self.statistics
    }

    /// Takes the tree and paint regions of the last pass, to be used as the
    /// next frame's previous frame.
    pub fn take_retained_frame(&mut self) -> Option<RetainedFrame> {
        self.retained.take()
    }
}
