// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Point, Rect, Size};
use understory_layer_diff::{DiffContext, LayerId};

use crate::{Layer, LayerIdentity, PaintContext, PrerollContext, mark_dirty_if};

/// Shows an externally produced texture, such as a video frame or camera feed.
///
/// Texture content changes without the layer tree changing, so the layer is
/// dirty every frame and its region is never reused.
#[derive(Debug)]
pub struct TextureLayer {
    identity: LayerIdentity,
    offset: Point,
    size: Size,
    texture_id: u64,
    freeze: bool,
}

impl TextureLayer {
    /// Creates a texture layer.
    #[must_use]
    pub fn new(offset: Point, size: Size, texture_id: u64, freeze: bool) -> Self {
        Self {
            identity: LayerIdentity::new(),
            offset,
            size,
            texture_id,
            freeze,
        }
    }

    /// Marks this layer as the replacement of `old` in the tree.
    #[must_use]
    pub fn replacing(mut self, old: &dyn Layer) -> Self {
        self.identity = LayerIdentity::replacing(old);
        self
    }

    /// The external texture shown.
    #[must_use]
    pub fn texture_id(&self) -> u64 {
        self.texture_id
    }
}

impl Layer for TextureLayer {
    fn unique_id(&self) -> LayerId {
        self.identity.unique
    }

    fn original_layer_id(&self) -> LayerId {
        self.identity.original
    }

    fn paint_bounds(&self) -> Rect {
        Rect::from_origin_size(self.offset, self.size)
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            mark_dirty_if(ctx, old, true);
            ctx.mark_subtree_has_texture_layer();
            ctx.add_layer_bounds(self.paint_bounds());
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.mark_has_texture_layer();
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let bounds = self.paint_bounds();
        ctx.canvas()
            .draw_texture(self.texture_id, bounds, self.freeze);
    }
}
