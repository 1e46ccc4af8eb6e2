// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel geometry.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Rect, Size};

/// Saturating float-to-pixel conversion.
#[expect(
    clippy::cast_possible_truncation,
    reason = "float to int `as` casts saturate, which is the intent for pixel bounds"
)]
fn to_pixel(v: f64) -> i32 {
    v as i32
}

/// Width and height in whole device pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntSize {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl IntSize {
    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is not positive.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Converts to a Kurbo size.
    #[must_use]
    pub fn to_size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// An axis-aligned rectangle on the device pixel grid.
///
/// Like [`Rect`], the rectangle spans `[x0, x1) × [y0, y1)`. Any rectangle
/// without positive area is empty; operations that can produce an empty
/// result normalize it to [`IntRect::ZERO`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    /// Left edge.
    pub x0: i32,
    /// Top edge.
    pub y0: i32,
    /// Right edge (exclusive).
    pub x1: i32,
    /// Bottom edge (exclusive).
    pub y1: i32,
}

impl IntRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Creates the rectangle `(0, 0, width, height)`.
    #[inline]
    #[must_use]
    pub const fn from_size(size: IntSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Smallest pixel rectangle containing `rect`.
    #[must_use]
    pub fn round_out(rect: Rect) -> Self {
        if crate::rect::is_empty(rect) {
            return Self::ZERO;
        }
        Self::new(
            to_pixel(rect.x0.floor()),
            to_pixel(rect.y0.floor()),
            to_pixel(rect.x1.ceil()),
            to_pixel(rect.y1.ceil()),
        )
    }

    /// Converts to a floating rectangle.
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }

    /// Width in pixels (may be negative for malformed rectangles).
    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        self.x1 - self.x0
    }

    /// Height in pixels (may be negative for malformed rectangles).
    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        self.y1 - self.y0
    }

    /// Returns `true` if the rectangle has no positive area.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Intersection, or [`IntRect::ZERO`] when disjoint.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let r = Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.is_empty() { Self::ZERO } else { r }
    }

    /// Union that ignores empty operands.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            self
        } else if self.is_empty() {
            other
        } else {
            Self::new(
                self.x0.min(other.x0),
                self.y0.min(other.y0),
                self.x1.max(other.x1),
                self.y1.max(other.y1),
            )
        }
    }

    /// Returns `true` if `other` is non-empty and fully inside `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        !other.is_empty()
            && self.x0 <= other.x0
            && self.y0 <= other.y0
            && self.x1 >= other.x1
            && self.y1 >= other.y1
    }

    /// Expands the edges outward onto a `horizontal × vertical` pixel grid.
    ///
    /// Left and top round down to a multiple of the alignment, right and
    /// bottom round up. Right and bottom are then clamped to `bounds` so the
    /// result never leaves the frame. Alignments of `0` or `1` leave the
    /// corresponding axis untouched; empty rectangles are returned as is.
    #[must_use]
    pub fn align_to(self, horizontal: u32, vertical: u32, bounds: IntSize) -> Self {
        if self.is_empty() {
            return self;
        }
        let h = i32::try_from(horizontal.max(1)).unwrap_or(i32::MAX);
        let v = i32::try_from(vertical.max(1)).unwrap_or(i32::MAX);

        let x0 = self.x0 - self.x0.rem_euclid(h);
        let y0 = self.y0 - self.y0.rem_euclid(v);
        let x1 = match self.x1.rem_euclid(h) {
            0 => self.x1,
            rem => self.x1.saturating_add(h - rem),
        };
        let y1 = match self.y1.rem_euclid(v) {
            0 => self.y1,
            rem => self.y1.saturating_add(v - rem),
        };
        Self::new(x0, y0, x1.min(bounds.width), y1.min(bounds.height))
    }
}
