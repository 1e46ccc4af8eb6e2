// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor and per-frame surface settings.

use understory_matrix_clip::IntRect;

use crate::DEFAULT_PARTIAL_REPAINT_THRESHOLD;

/// Compositor-wide settings, fixed for the lifetime of a [`CompositorContext`](crate::CompositorContext).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Diff frames against the previous one to find damage. When off, every
    /// frame is repainted in full.
    pub damage_tracking: bool,
    /// The backend pays a fixed cost for partial repaint, so the damage must
    /// pass [`partial_repaint_threshold`](Self::partial_repaint_threshold)
    /// before a clip is used.
    pub impeller_enabled: bool,
    /// Layers may be served from a raster cache, which snaps them to whole
    /// pixels.
    pub enable_raster_cache: bool,
    /// The surface can be read back while painting. When it cannot, frames
    /// that read back are painted into an intermediate layer.
    pub surface_supports_readback: bool,
    /// See [`partial_repaint_admitted`](crate::partial_repaint_admitted).
    pub partial_repaint_threshold: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            damage_tracking: true,
            impeller_enabled: false,
            enable_raster_cache: true,
            surface_supports_readback: true,
            partial_repaint_threshold: DEFAULT_PARTIAL_REPAINT_THRESHOLD,
        }
    }
}

impl CompositorConfig {
    /// Enables or disables damage tracking.
    #[must_use]
    pub fn with_damage_tracking(mut self, enabled: bool) -> Self {
        self.damage_tracking = enabled;
        self
    }

    /// Selects the backend with partial repaint admission control.
    #[must_use]
    pub fn with_impeller(mut self, enabled: bool) -> Self {
        self.impeller_enabled = enabled;
        self
    }

    /// Enables or disables the raster cache.
    #[must_use]
    pub fn with_raster_cache(mut self, enabled: bool) -> Self {
        self.enable_raster_cache = enabled;
        self
    }

    /// Declares whether the surface supports readback.
    #[must_use]
    pub fn with_surface_readback(mut self, supported: bool) -> Self {
        self.surface_supports_readback = supported;
        self
    }

    /// Overrides the partial repaint threshold.
    #[must_use]
    pub fn with_partial_repaint_threshold(mut self, threshold: f64) -> Self {
        self.partial_repaint_threshold = threshold;
        self
    }
}

/// What the surface reports about the buffer a frame is painted into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FramebufferInfo {
    /// The buffer keeps its previous content, so repainting part of it is
    /// meaningful.
    pub supports_partial_repaint: bool,
    /// Damage the buffer accumulated since it was last painted, or `None` if
    /// its content is unknown.
    pub existing_damage: Option<IntRect>,
    /// Horizontal pixel grid for damage; `1` for none.
    pub horizontal_clip_alignment: u32,
    /// Vertical pixel grid for damage; `1` for none.
    pub vertical_clip_alignment: u32,
}

impl Default for FramebufferInfo {
    fn default() -> Self {
        Self {
            supports_partial_repaint: false,
            existing_damage: None,
            horizontal_clip_alignment: 1,
            vertical_clip_alignment: 1,
        }
    }
}

impl FramebufferInfo {
    /// A buffer that supports partial repaint and is missing `existing_damage`.
    #[must_use]
    pub fn partial(existing_damage: IntRect) -> Self {
        Self {
            supports_partial_repaint: true,
            existing_damage: Some(existing_damage),
            ..Self::default()
        }
    }

    /// Sets whether the buffer supports partial repaint.
    #[must_use]
    pub fn with_partial_repaint(mut self, supported: bool) -> Self {
        self.supports_partial_repaint = supported;
        self
    }

    /// Sets the damage the buffer already carries.
    #[must_use]
    pub fn with_existing_damage(mut self, damage: Option<IntRect>) -> Self {
        self.existing_damage = damage;
        self
    }

    /// Sets the pixel grid damage is expanded onto.
    #[must_use]
    pub fn with_clip_alignment(mut self, horizontal: u32, vertical: u32) -> Self {
        self.horizontal_clip_alignment = horizontal;
        self.vertical_clip_alignment = vertical;
        self
    }
}
