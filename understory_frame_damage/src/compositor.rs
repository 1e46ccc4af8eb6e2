// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame raster driver.

use alloc::sync::Arc;
use core::fmt::Debug;

use peniko::Color;
use understory_layer_tree::{Canvas, ClipShape, LayerTree, SaveLayer};
use understory_matrix_clip::rect::GIANT_RECT;
use understory_matrix_clip::{ClipOp, IntRect};

use crate::{
    CompositorConfig, FrameDamage, FrameTimer, FramebufferInfo, RetainedFrame,
    partial_repaint_admitted,
};

/// What an external view embedder wants done with a frame after preroll.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PostPrerollResult {
    /// Go on and paint.
    #[default]
    Success,
    /// Drop this frame and submit it again, for example after the embedder
    /// moved rendering to another thread.
    ResubmitFrame,
    /// Drop this frame and retry on the next one.
    SkipAndRetryFrame,
}

/// Platform views composited alongside the layer tree.
pub trait ExternalViewEmbedder: Debug {
    /// Called after preroll, before anything is painted.
    fn post_preroll_action(&mut self) -> PostPrerollResult;

    /// Whether frames must be repainted in full while this embedder is
    /// active. Embedders that composite platform views themselves usually
    /// cannot honor a partial clip.
    fn forces_full_repaint(&self) -> bool {
        true
    }
}

/// How rasterizing a frame ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RasterStatus {
    /// The frame was painted.
    Success,
    /// Nothing was painted; the same frame must be submitted again.
    ResubmitFrame,
    /// Nothing was painted; a later frame will be tried.
    SkipAndRetryFrame,
}

/// Damage handed to the surface along with a painted frame.
///
/// `None` means the whole frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Area of the presented frame that changed.
    pub frame_damage: Option<IntRect>,
    /// Area of the buffer that was repainted.
    pub buffer_damage: Option<IntRect>,
}

/// Long-lived compositor state shared by consecutive frames.
#[derive(Debug)]
pub struct CompositorContext {
    config: CompositorConfig,
    frame_count: u64,
    raster_timer: FrameTimer,
    last_frame: Option<RetainedFrame>,
}

impl CompositorContext {
    /// Creates a compositor with `config`.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            raster_timer: FrameTimer::new(),
            last_frame: None,
        }
    }

    /// The compositor's settings.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Number of frames acquired so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Raster times of recent frames.
    #[must_use]
    pub fn raster_timer(&self) -> &FrameTimer {
        &self.raster_timer
    }

    /// The last successfully painted frame, used as the next frame's baseline.
    #[must_use]
    pub fn last_frame(&self) -> Option<&RetainedFrame> {
        self.last_frame.as_ref()
    }

    /// Drops the retained frame so the next frame repaints in full.
    pub fn clear_last_frame(&mut self) {
        self.last_frame = None;
    }

    /// Begins a frame at host time `now`.
    pub fn acquire_frame(&mut self, now: u64) -> ScopedFrame<'_> {
        self.frame_count += 1;
        self.raster_timer.start(now);
        ScopedFrame {
            context: self,
            submit_info: SubmitInfo::default(),
        }
    }
}

/// One frame in flight. End it with [`finish`](Self::finish).
#[derive(Debug)]
pub struct ScopedFrame<'a> {
    context: &'a mut CompositorContext,
    submit_info: SubmitInfo,
}

impl ScopedFrame<'_> {
    /// Rasterizes `layer_tree` into `canvas`.
    ///
    /// Computes damage against the last painted frame when both the
    /// compositor and `framebuffer` allow it, prerolls, consults `embedder`
    /// and paints. Only a successful frame becomes the next frame's
    /// baseline.
    pub fn raster(
        &mut self,
        layer_tree: &Arc<LayerTree>,
        framebuffer: &FramebufferInfo,
        canvas: &mut dyn Canvas,
        mut embedder: Option<&mut dyn ExternalViewEmbedder>,
    ) -> RasterStatus {
        let config = self.context.config;
        self.submit_info = SubmitInfo::default();

        let mut frame_damage = (config.damage_tracking && framebuffer.supports_partial_repaint)
            .then(FrameDamage::new);
        let mut clip_rect = None;
        if let Some(damage) = &mut frame_damage {
            let full_repaint = embedder
                .as_deref()
                .is_some_and(|embedder| embedder.forces_full_repaint());
            if !full_repaint
                && let Some(existing) = framebuffer.existing_damage
            {
                damage.set_previous_frame(self.context.last_frame.clone());
                damage.add_additional_damage(existing);
            }
            damage.set_clip_alignment(
                framebuffer.horizontal_clip_alignment,
                framebuffer.vertical_clip_alignment,
            );
            clip_rect = damage.compute_clip_rect(
                layer_tree,
                config.enable_raster_cache,
                config.impeller_enabled,
            );
            if config.impeller_enabled
                && !partial_repaint_admitted(
                    clip_rect,
                    layer_tree.frame_size(),
                    config.partial_repaint_threshold,
                )
            {
                clip_rect = None;
                damage.reset();
            }
        }

        let clip = clip_rect.map(IntRect::to_rect);
        let preroll = layer_tree.preroll(clip.unwrap_or(GIANT_RECT));
        let needs_save_layer = preroll.surface_needs_readback && !config.surface_supports_readback;

        if let Some(embedder) = embedder.as_deref_mut() {
            match embedder.post_preroll_action() {
                PostPrerollResult::Success => {}
                PostPrerollResult::ResubmitFrame => return RasterStatus::ResubmitFrame,
                PostPrerollResult::SkipAndRetryFrame => return RasterStatus::SkipAndRetryFrame,
            }
        }

        let frame_rect = layer_tree.frame_rect();
        let mut saves = 0;
        if let Some(clip) = clip {
            canvas.save();
            canvas.clip(&ClipShape::Rect(clip), ClipOp::Intersect, false);
            saves += 1;
        }
        if needs_save_layer {
            canvas.save_layer(SaveLayer::new().with_bounds(frame_rect));
            saves += 1;
        }
        canvas.clear(Color::TRANSPARENT);
        layer_tree.paint_with_integral_transform(
            canvas,
            clip.unwrap_or(frame_rect),
            config.enable_raster_cache && !config.impeller_enabled,
        );
        for _ in 0..saves {
            canvas.restore();
        }

        if let Some(mut damage) = frame_damage {
            self.submit_info = SubmitInfo {
                frame_damage: damage.frame_damage(),
                buffer_damage: damage.buffer_damage(),
            };
            self.context.last_frame = damage.take_retained_frame();
        } else {
            self.context.last_frame = None;
        }
        RasterStatus::Success
    }

    /// Damage to submit with the frame painted by [`raster`](Self::raster).
    #[must_use]
    pub fn submit_info(&self) -> SubmitInfo {
        self.submit_info
    }

    /// Ends the frame at host time `now`, returning how long it took.
    pub fn finish(self, now: u64) -> Option<u64> {
        self.context.raster_timer.stop(now)
    }
}
