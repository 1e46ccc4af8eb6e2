// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform plus device-space cull rectangle.

use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape};

use crate::Matrix;
use crate::rect::{GIANT_RECT, contains_rect, intersect_or_empty, is_empty, round, round_out};

/// How a clip combines with the current clip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipOp {
    /// Keep only the area inside both the current clip and the new shape.
    #[default]
    Intersect,
    /// Remove the new shape from the current clip.
    ///
    /// A difference cannot be soundly represented by a single rectangle, so it
    /// never shrinks the cull rect.
    Difference,
}

/// The accumulated transform and device-space cull rectangle.
///
/// The cull rect starts as the rectangle the state was created with and only
/// ever shrinks through [`ClipOp::Intersect`] clips. It is a conservative
/// superset of the area that can still be drawn: clips are folded in through
/// their device-space bounding boxes.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixClipState {
    matrix: Matrix,
    cull_rect: Rect,
}

impl MatrixClipState {
    /// Creates a state with an identity transform and the given device cull rect.
    #[must_use]
    pub fn new(cull_rect: Rect) -> Self {
        Self::with_matrix(cull_rect, Matrix::IDENTITY)
    }

    /// Creates a state with an initial transform.
    #[must_use]
    pub fn with_matrix(cull_rect: Rect, matrix: Matrix) -> Self {
        let cull_rect = if is_empty(cull_rect) {
            Rect::ZERO
        } else {
            cull_rect
        };
        Self { matrix, cull_rect }
    }

    /// The current local-to-device transform.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// The cull rect in device space.
    #[inline]
    #[must_use]
    pub fn device_cull_rect(&self) -> Rect {
        self.cull_rect
    }

    /// Returns `true` once clipping has eliminated all drawable area.
    #[inline]
    #[must_use]
    pub fn is_cull_rect_empty(&self) -> bool {
        is_empty(self.cull_rect)
    }

    /// The cull rect mapped back into the current local coordinate space.
    ///
    /// Under perspective, or when the transform cannot be inverted, this
    /// returns [`GIANT_RECT`]: culling against it never drops content.
    #[must_use]
    pub fn local_cull_rect(&self) -> Rect {
        if self.is_cull_rect_empty() {
            return Rect::ZERO;
        }
        if self.matrix.has_perspective() {
            return GIANT_RECT;
        }
        let affine = self.matrix.to_affine();
        let det = affine.determinant();
        if det == 0.0 || !det.is_finite() {
            return GIANT_RECT;
        }
        affine.inverse().transform_rect_bbox(self.cull_rect)
    }

    /// Concatenates `matrix` so that it applies before the current transform.
    pub fn transform(&mut self, matrix: &Matrix) {
        self.matrix = self.matrix * *matrix;
    }

    /// Concatenates a 2D affine transform.
    pub fn transform_affine(&mut self, affine: Affine) {
        self.transform(&Matrix::from_affine(affine));
    }

    /// Replaces the current transform.
    pub fn set_transform(&mut self, matrix: Matrix) {
        self.matrix = matrix;
    }

    /// Concatenates a translation.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(&Matrix::translate(dx, dy));
    }

    /// Concatenates a scale.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.transform(&Matrix::scale(sx, sy));
    }

    /// Concatenates a skew.
    pub fn skew(&mut self, kx: f64, ky: f64) {
        self.transform(&Matrix::skew(kx, ky));
    }

    /// Concatenates a rotation (radians).
    pub fn rotate(&mut self, radians: f64) {
        self.transform(&Matrix::rotate(radians));
    }

    /// Maps a local rectangle to its device-space bounding box.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        self.matrix.map_rect(rect)
    }

    /// Returns `true` if content with these local bounds cannot be visible.
    #[must_use]
    pub fn content_culled(&self, local_bounds: Rect) -> bool {
        !crate::rect::intersects(self.map_rect(local_bounds), self.cull_rect)
    }

    /// Clips to a local rectangle.
    pub fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.adjust_cull_rect(rect, op, is_aa);
    }

    /// Clips to the oval inscribed in `bounds`.
    pub fn clip_oval(&mut self, bounds: Rect, op: ClipOp, is_aa: bool) {
        self.adjust_cull_rect(bounds, op, is_aa);
    }

    /// Clips to a rounded rectangle.
    pub fn clip_rrect(&mut self, rrect: &RoundedRect, op: ClipOp, is_aa: bool) {
        self.adjust_cull_rect(rrect.rect(), op, is_aa);
    }

    /// Clips to a path.
    pub fn clip_path(&mut self, path: &BezPath, op: ClipOp, is_aa: bool) {
        self.adjust_cull_rect(path.bounding_box(), op, is_aa);
    }

    fn adjust_cull_rect(&mut self, local_bounds: Rect, op: ClipOp, is_aa: bool) {
        match op {
            ClipOp::Difference => {}
            ClipOp::Intersect => {
                if self.is_cull_rect_empty() {
                    return;
                }
                if is_empty(local_bounds) {
                    self.cull_rect = Rect::ZERO;
                    return;
                }
                let mapped = self.matrix.map_rect(local_bounds);
                let snapped = if is_aa { round_out(mapped) } else { round(mapped) };
                self.cull_rect = intersect_or_empty(self.cull_rect, snapped);
            }
        }
    }

    /// The cull rect in local space, if the transform maps it there exactly.
    fn axis_aligned_local_cull(&self) -> Option<Rect> {
        if !self.matrix.preserves_axis_alignment() {
            return None;
        }
        let affine = self.matrix.to_affine();
        Some(affine.inverse().transform_rect_bbox(self.cull_rect))
    }

    /// Returns `true` if the local rectangle covers the whole cull rect.
    ///
    /// Rotated, skewed or projected rectangles are never reported as covering,
    /// even when they geometrically do.
    #[must_use]
    pub fn rect_covers_cull(&self, rect: Rect) -> bool {
        if self.is_cull_rect_empty() {
            return true;
        }
        if !self.matrix.preserves_axis_alignment() {
            return false;
        }
        contains_rect(self.map_rect(rect), self.cull_rect)
    }

    /// Returns `true` if the oval inscribed in `bounds` covers the whole cull rect.
    #[must_use]
    pub fn oval_covers_cull(&self, bounds: Rect) -> bool {
        if self.is_cull_rect_empty() {
            return true;
        }
        let Some(local) = self.axis_aligned_local_cull() else {
            return false;
        };
        if is_empty(bounds) {
            return false;
        }
        let center = bounds.center();
        let (rx, ry) = (bounds.width() / 2.0, bounds.height() / 2.0);
        corners(local).into_iter().all(|p| {
            let dx = (p.x - center.x) / rx;
            let dy = (p.y - center.y) / ry;
            dx * dx + dy * dy <= 1.0
        })
    }

    /// Returns `true` if the rounded rectangle covers the whole cull rect.
    #[must_use]
    pub fn rrect_covers_cull(&self, rrect: &RoundedRect) -> bool {
        if self.is_cull_rect_empty() {
            return true;
        }
        let Some(local) = self.axis_aligned_local_cull() else {
            return false;
        };
        let bounds = rrect.rect();
        if !contains_rect(bounds, local) {
            return false;
        }
        let max_radius = (bounds.width() / 2.0).min(bounds.height() / 2.0);
        let radii = rrect.radii();
        let rounded_corners = [
            (radii.top_left, 1.0, 1.0, Point::new(bounds.x0, bounds.y0)),
            (radii.top_right, -1.0, 1.0, Point::new(bounds.x1, bounds.y0)),
            (radii.bottom_right, -1.0, -1.0, Point::new(bounds.x1, bounds.y1)),
            (radii.bottom_left, 1.0, -1.0, Point::new(bounds.x0, bounds.y1)),
        ];
        corners(local).into_iter().all(|p| {
            rounded_corners.iter().all(|&(radius, sx, sy, corner)| {
                let r = radius.min(max_radius);
                if r <= 0.0 {
                    return true;
                }
                let center = Point::new(corner.x + sx * r, corner.y + sy * r);
                // Only points in the corner's square can fall outside the arc.
                let in_corner_x = (p.x - center.x) * sx < 0.0;
                let in_corner_y = (p.y - center.y) * sy < 0.0;
                if !(in_corner_x && in_corner_y) {
                    return true;
                }
                (p - center).hypot2() <= r * r
            })
        })
    }
}

fn corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}
