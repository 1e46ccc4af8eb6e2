// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform with projective rect mapping.

use core::ops::Mul;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Rect, Vec2};

/// Homogeneous `w` at or below this value is considered behind the eye.
const MIN_HOMOGENEOUS: f64 = 1.0 / 16384.0;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* `[x, y, z, w]`. Points are treated as
/// column vectors, so `a * b` maps through `b` first and then `a`.
///
/// Only the 2D projection of the matrix matters for device mapping: local
/// points always have `z = 0`, so the third column never contributes to a
/// mapped point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Matrix {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Embeds a 2D affine transform.
    #[must_use]
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self::from_cols(
            [a, b, 0.0, 0.0],
            [c, d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [e, f, 0.0, 1.0],
        )
    }

    /// Creates a 2D translation.
    #[inline]
    #[must_use]
    pub const fn translate(dx: f64, dy: f64) -> Self {
        Self::from_cols(
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [dx, dy, 0.0, 1.0],
        )
    }

    /// Creates a 2D non-uniform scale.
    #[inline]
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::from_cols(
            [sx, 0.0, 0.0, 0.0],
            [0.0, sy, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        )
    }

    /// Creates a 2D skew: `x' = x + kx * y`, `y' = ky * x + y`.
    #[inline]
    #[must_use]
    pub const fn skew(kx: f64, ky: f64) -> Self {
        Self::from_cols(
            [1.0, ky, 0.0, 0.0],
            [kx, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        )
    }

    /// Creates a rotation around the Z axis (radians).
    #[must_use]
    pub fn rotate(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self::from_cols(
            [c, s, 0.0, 0.0],
            [-s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        )
    }

    /// Creates a projective matrix with `w = px * x + py * y + 1`.
    #[inline]
    #[must_use]
    pub const fn perspective(px: f64, py: f64) -> Self {
        Self::from_cols(
            [1.0, 0.0, 0.0, px],
            [0.0, 1.0, 0.0, py],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        )
    }

    /// Returns the 2D affine part of this matrix, ignoring perspective.
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        let c = &self.cols;
        Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1]])
    }

    /// Returns the 2D translation components.
    #[inline]
    #[must_use]
    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Whether mapping a point requires a projective divide.
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        let c = &self.cols;
        c[0][3] != 0.0 || c[1][3] != 0.0 || c[2][3] != 0.0 || c[3][3] != 1.0
    }

    /// Whether the matrix only scales and translates in 2D.
    #[must_use]
    pub fn is_scale_translate(&self) -> bool {
        !self.has_perspective() && self.cols[1][0] == 0.0 && self.cols[0][1] == 0.0
    }

    /// Whether axis-aligned rectangles map to axis-aligned rectangles.
    ///
    /// True for non-degenerate scale/translate and for multiples of 90°
    /// rotation; false for any skew, arbitrary rotation, or perspective.
    #[must_use]
    pub fn preserves_axis_alignment(&self) -> bool {
        if self.has_perspective() {
            return false;
        }
        let c = &self.cols;
        let (sx, ky, kx, sy) = (c[0][0], c[0][1], c[1][0], c[1][1]);
        (kx == 0.0 && ky == 0.0 && sx != 0.0 && sy != 0.0)
            || (sx == 0.0 && sy == 0.0 && kx != 0.0 && ky != 0.0)
    }

    /// Is every element of this matrix finite?
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Determinant of the full 4×4 matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let (inv, m) = self.adjugate();
        m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12]
    }

    /// Returns the inverse, or `None` if the matrix is singular or not finite.
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let (inv, m) = self.adjugate();
        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut cols = [[0.0_f64; 4]; 4];
        for (i, v) in inv.iter().enumerate() {
            cols[i / 4][i % 4] = v * inv_det;
        }
        let out = Self { cols };
        out.is_finite().then_some(out)
    }

    /// Flattened matrix and its (untransposed) adjugate.
    fn adjugate(&self) -> ([f64; 16], [f64; 16]) {
        let mut m = [0.0_f64; 16];
        for (i, v) in self.cols.iter().flatten().enumerate() {
            m[i] = *v;
        }
        let mut inv = [0.0_f64; 16];
        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];
        (inv, m)
    }

    /// Homogeneous `[x, y, w]` image of a local point (with `z = 0`).
    fn map_homogeneous(&self, x: f64, y: f64) -> [f64; 3] {
        let c = &self.cols;
        [
            c[0][0] * x + c[1][0] * y + c[3][0],
            c[0][1] * x + c[1][1] * y + c[3][1],
            c[0][3] * x + c[1][3] * y + c[3][3],
        ]
    }

    /// Maps a local point into device space.
    ///
    /// Returns `None` when the point lands behind the eye.
    #[must_use]
    pub fn map_point(&self, point: Point) -> Option<Point> {
        let [x, y, w] = self.map_homogeneous(point.x, point.y);
        if w <= MIN_HOMOGENEOUS {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    /// Maps a local rectangle to the bounding box of its device-space image.
    ///
    /// Under perspective the rectangle's quad is clipped against the
    /// `w > 0` half-space before the divide, so corners behind the eye never
    /// produce a flipped or truncated box. A quad entirely behind the eye maps
    /// to [`Rect::ZERO`].
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        if !self.has_perspective() {
            return self.to_affine().transform_rect_bbox(rect);
        }

        let quad = [
            self.map_homogeneous(rect.x0, rect.y0),
            self.map_homogeneous(rect.x1, rect.y0),
            self.map_homogeneous(rect.x1, rect.y1),
            self.map_homogeneous(rect.x0, rect.y1),
        ];

        // Clipping a quad against one plane yields at most 8 vertices.
        let mut clipped = [[0.0_f64; 3]; 8];
        let mut count = 0;
        for i in 0..4 {
            let a = quad[i];
            let b = quad[(i + 1) % 4];
            let a_in = a[2] > MIN_HOMOGENEOUS;
            let b_in = b[2] > MIN_HOMOGENEOUS;
            if a_in {
                clipped[count] = a;
                count += 1;
            }
            if a_in != b_in {
                let t = (MIN_HOMOGENEOUS - a[2]) / (b[2] - a[2]);
                clipped[count] = [
                    a[0] + (b[0] - a[0]) * t,
                    a[1] + (b[1] - a[1]) * t,
                    MIN_HOMOGENEOUS,
                ];
                count += 1;
            }
        }

        let mut points = clipped[..count].iter().map(|[x, y, w]| (x / w, y / w));
        let Some((x, y)) = points.next() else {
            return Rect::ZERO;
        };
        let mut out = Rect::new(x, y, x, y);
        for (x, y) in points {
            out = out.union_pt(Point::new(x, y));
        }
        out
    }

    /// Returns a copy with the 2D translation rounded to whole pixels.
    ///
    /// Returns `None` when the matrix is not a pure scale/translate (snapping
    /// would visibly distort rotated or skewed content) or when the
    /// translation is already integral.
    #[must_use]
    pub fn with_integral_translation(&self) -> Option<Self> {
        if !self.is_scale_translate() {
            return None;
        }
        let tx = self.cols[3][0];
        let ty = self.cols[3][1];
        let (rx, ry) = (tx.round(), ty.round());
        if rx == tx && ry == ty {
            return None;
        }
        let mut out = *self;
        out.cols[3][0] = rx;
        out.cols[3][1] = ry;
        Some(out)
    }
}

impl Default for Matrix {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Matrix {
    fn from(affine: Affine) -> Self {
        Self::from_affine(affine)
    }
}

impl Mul for Matrix {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Matrix, b: &Matrix) -> bool {
        a.cols
            .iter()
            .flatten()
            .zip(b.cols.iter().flatten())
            .all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn composition_maps_through_rhs_first() {
        let m = Matrix::translate(10.0, 0.0) * Matrix::scale(2.0, 2.0);
        assert_eq!(
            m.map_point(Point::new(1.0, 1.0)),
            Some(Point::new(12.0, 2.0))
        );
    }

    #[test]
    fn affine_round_trip() {
        let a = Affine::translate((3.0, 4.0)) * Affine::scale_non_uniform(2.0, 5.0);
        assert_eq!(Matrix::from_affine(a).to_affine(), a);
    }

    #[test]
    fn invert_translation_scale() {
        let m = Matrix::translate(3.0, -7.0) * Matrix::scale(2.0, 4.0);
        let inv = m.invert().unwrap();
        assert!(approx_eq(&(m * inv), &Matrix::IDENTITY));
        assert!((m.determinant() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn axis_alignment_classification() {
        assert!(Matrix::IDENTITY.preserves_axis_alignment());
        assert!(Matrix::scale(-2.0, 3.0).preserves_axis_alignment());
        assert!(Matrix::from_cols(
            [0.0, 1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        )
        .preserves_axis_alignment());
        assert!(!Matrix::rotate(0.3).preserves_axis_alignment());
        assert!(!Matrix::skew(0.5, 0.0).preserves_axis_alignment());
        assert!(!Matrix::perspective(0.001, 0.0).preserves_axis_alignment());
        assert!(!Matrix::scale(0.0, 1.0).preserves_axis_alignment());
    }

    #[test]
    fn map_rect_rotated_is_bounding_box() {
        let m = Matrix::rotate(core::f64::consts::FRAC_PI_4);
        let r = m.map_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let half_diag = 10.0 * core::f64::consts::FRAC_1_SQRT_2;
        assert!((r.x0 + half_diag).abs() < 1e-9);
        assert!((r.x1 - half_diag).abs() < 1e-9);
        assert!(r.y0.abs() < 1e-9);
        assert!((r.y1 - 2.0 * half_diag).abs() < 1e-9);
    }

    #[test]
    fn map_rect_with_perspective_divides() {
        // w = 1 + 0.01 * x, so x = 100 lands at w = 2.
        let m = Matrix::perspective(0.01, 0.0);
        let r = m.map_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!((r.x1 - 50.0).abs() < 1e-9);
        assert!((r.y1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn map_rect_clips_behind_eye() {
        // w crosses zero at x = 100; the rect straddles it.
        let m = Matrix::perspective(-0.01, 0.0);
        let r = m.map_rect(Rect::new(0.0, 0.0, 200.0, 10.0));
        assert!(r.x0 <= 0.0);
        assert!(r.x1.is_finite() && r.x1 > 1_000.0);
        assert!(m.map_point(Point::new(150.0, 0.0)).is_none());

        let behind = m.map_rect(Rect::new(150.0, 0.0, 200.0, 10.0));
        assert_eq!(behind, Rect::ZERO);
    }

    #[test]
    fn integral_translation_only_for_scale_translate() {
        let m = Matrix::translate(10.4, 3.6);
        let snapped = m.with_integral_translation().unwrap();
        assert_eq!(snapped.translation(), Vec2::new(10.0, 4.0));
        assert!(Matrix::translate(1.0, 2.0).with_integral_translation().is_none());
        assert!(
            (Matrix::translate(0.5, 0.5) * Matrix::rotate(0.2))
                .with_integral_translation()
                .is_none()
        );
    }
}
