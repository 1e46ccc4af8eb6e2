// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image filters and the layers that apply them.

use kurbo::{Point, Rect, Vec2};
use understory_layer_diff::{DiffContext, LayerId};
use understory_matrix_clip::Matrix;
use understory_matrix_clip::rect::{GIANT_RECT, round_out};

use crate::{
    ContainerLayer, Layer, PaintContext, PrerollContext, SaveLayer, mark_dirty_if,
    old_as,
};

/// Blur extent in standard deviations.
const BLUR_SIGMA_SCALE: f64 = 3.0;

/// A filter applied to rendered content.
///
/// Parameters are in local units and are scaled by the transform in effect
/// where the filter is applied.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur.
    Blur {
        /// Standard deviation along X.
        sigma_x: f64,
        /// Standard deviation along Y.
        sigma_y: f64,
    },
    /// Morphological dilation (each pixel takes the maximum of its neighborhood).
    Dilate {
        /// Neighborhood radius along X.
        radius_x: f64,
        /// Neighborhood radius along Y.
        radius_y: f64,
    },
    /// Morphological erosion (each pixel takes the minimum of its neighborhood).
    Erode {
        /// Neighborhood radius along X.
        radius_x: f64,
        /// Neighborhood radius along Y.
        radius_y: f64,
    },
    /// Translates the content.
    Offset {
        /// Offset along X.
        dx: f64,
        /// Offset along Y.
        dy: f64,
    },
}

impl ImageFilter {
    /// A uniform blur.
    #[must_use]
    pub const fn blur(sigma: f64) -> Self {
        Self::Blur {
            sigma_x: sigma,
            sigma_y: sigma,
        }
    }

    /// Device-space extent of a local `(x, y)` radius under `ctm`.
    fn device_extent(ctm: &Matrix, x: f64, y: f64) -> Vec2 {
        let [a, b, c, d, _, _] = ctm.to_affine().as_coeffs();
        Vec2::new(a.abs() * x + c.abs() * y, b.abs() * x + d.abs() * y)
    }

    fn device_offset(ctm: &Matrix, dx: f64, dy: f64) -> Vec2 {
        let [a, b, c, d, _, _] = ctm.to_affine().as_coeffs();
        Vec2::new(a * dx + c * dy, b * dx + d * dy)
    }

    /// Device bounds of the output when the input covers `input`.
    ///
    /// Under perspective the answer is unbounded.
    #[must_use]
    pub fn map_device_bounds(&self, input: Rect, ctm: &Matrix) -> Rect {
        if ctm.has_perspective() {
            return GIANT_RECT;
        }
        match *self {
            Self::Blur { sigma_x, sigma_y } => {
                let e = Self::device_extent(
                    ctm,
                    sigma_x * BLUR_SIGMA_SCALE,
                    sigma_y * BLUR_SIGMA_SCALE,
                );
                round_out(input.inflate(e.x, e.y))
            }
            Self::Dilate { radius_x, radius_y } => {
                let e = Self::device_extent(ctm, radius_x, radius_y);
                round_out(input.inflate(e.x, e.y))
            }
            Self::Erode { radius_x, radius_y } => {
                let e = Self::device_extent(ctm, radius_x, radius_y);
                let shrunk = input.inflate(-e.x, -e.y);
                if shrunk.width() <= 0.0 || shrunk.height() <= 0.0 {
                    Rect::ZERO
                } else {
                    round_out(shrunk)
                }
            }
            Self::Offset { dx, dy } => round_out(input + Self::device_offset(ctm, dx, dy)),
        }
    }

    /// Device bounds of the input needed to produce `output`.
    ///
    /// Under perspective the answer is unbounded.
    #[must_use]
    pub fn input_device_bounds(&self, output: Rect, ctm: &Matrix) -> Rect {
        if ctm.has_perspective() {
            return GIANT_RECT;
        }
        match *self {
            Self::Blur { sigma_x, sigma_y } => {
                let e = Self::device_extent(
                    ctm,
                    sigma_x * BLUR_SIGMA_SCALE,
                    sigma_y * BLUR_SIGMA_SCALE,
                );
                round_out(output.inflate(e.x, e.y))
            }
            Self::Dilate { radius_x, radius_y } | Self::Erode { radius_x, radius_y } => {
                let e = Self::device_extent(ctm, radius_x, radius_y);
                round_out(output.inflate(e.x, e.y))
            }
            Self::Offset { dx, dy } => round_out(output - Self::device_offset(ctm, dx, dy)),
        }
    }
}

/// Applies an [`ImageFilter`] to its children when compositing them.
#[derive(Debug)]
pub struct ImageFilterLayer {
    container: ContainerLayer,
    filter: ImageFilter,
    offset: Point,
    paint_bounds: Rect,
}

impl ImageFilterLayer {
    /// Creates a filter layer over `container`'s children.
    #[must_use]
    pub fn new(filter: ImageFilter, offset: Point, container: ContainerLayer) -> Self {
        let child_bounds = container.paint_bounds() + offset.to_vec2();
        let paint_bounds = filter.map_device_bounds(child_bounds, &Matrix::IDENTITY);
        Self {
            container,
            filter,
            offset,
            paint_bounds,
        }
    }

    /// The applied filter.
    #[must_use]
    pub fn filter(&self) -> ImageFilter {
        self.filter
    }
}

impl Layer for ImageFilterLayer {
    fn unique_id(&self) -> LayerId {
        self.container.unique_id()
    }

    fn original_layer_id(&self) -> LayerId {
        self.container.original_layer_id()
    }

    fn paint_bounds(&self) -> Rect {
        self.paint_bounds
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let prev = old_as::<Self>(old);
            let changed = prev.is_none_or(|prev| {
                prev.filter != self.filter || prev.offset != self.offset
            });
            mark_dirty_if(ctx, old, changed);
            ctx.push_transform(&Matrix::translate(self.offset.x, self.offset.y));
            if ctx.has_raster_cache() {
                ctx.will_paint_with_integral_transform();
            }
            let filter = self.filter;
            let ctm = *ctx.transform();
            ctx.push_filter_bounds_adjustment(move |rect| filter.map_device_bounds(rect, &ctm));
            self.container
                .diff_children(ctx, prev.map(|prev| &prev.container));
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.container.preserve_paint_region(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.with_save(|ctx| {
            ctx.transform(&Matrix::translate(self.offset.x, self.offset.y));
            self.container.preroll_children(ctx);
        });
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.save();
        ctx.transform(&Matrix::translate(self.offset.x, self.offset.y));
        ctx.make_transform_integral();
        ctx.save_layer(SaveLayer::new().with_filter(self.filter));
        self.container.paint_children(ctx);
        ctx.restore();
        ctx.restore();
    }
}

/// Filters whatever was painted below it before painting its children.
///
/// The layer reads the framebuffer back, so it paints (and damages) its
/// whole cull rect, and a change anywhere under it invalidates it.
#[derive(Debug)]
pub struct BackdropFilterLayer {
    container: ContainerLayer,
    filter: ImageFilter,
}

impl BackdropFilterLayer {
    /// Creates a backdrop filter layer over `container`'s children.
    #[must_use]
    pub fn new(filter: ImageFilter, container: ContainerLayer) -> Self {
        Self { container, filter }
    }

    /// The backdrop filter.
    #[must_use]
    pub fn filter(&self) -> ImageFilter {
        self.filter
    }
}

impl Layer for BackdropFilterLayer {
    fn unique_id(&self) -> LayerId {
        self.container.unique_id()
    }

    fn original_layer_id(&self) -> LayerId {
        self.container.original_layer_id()
    }

    fn paint_bounds(&self) -> Rect {
        GIANT_RECT
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let prev = old_as::<Self>(old);
            let changed = prev.is_none_or(|prev| prev.filter != self.filter);
            mark_dirty_if(ctx, old, changed);

            let local_bounds = ctx.cull_rect();
            ctx.add_layer_bounds(local_bounds);
            let target = round_out(ctx.map_rect(local_bounds));
            let input = self.filter.input_device_bounds(target, ctx.transform());
            ctx.add_readback_region(input);

            self.container
                .diff_children(ctx, prev.map(|prev| &prev.container));
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.container.preserve_paint_region(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        ctx.mark_surface_needs_readback();
        self.container.preroll_children(ctx);
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        ctx.save_layer(SaveLayer::new().with_backdrop(self.filter));
        self.container.paint_children(ctx);
        ctx.restore();
    }
}
