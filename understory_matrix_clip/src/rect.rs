// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers with "empty" semantics suited to damage accumulation.
//!
//! Kurbo's [`Rect::union`] treats every rectangle as a box, so joining an
//! accumulator that starts as [`Rect::ZERO`] would always drag in the origin.
//! The helpers here treat any rectangle without positive area as empty, and
//! empty operands never contribute.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Rect;

/// A rectangle large enough to stand in for "no culling".
///
/// Returned wherever the visible area cannot be soundly expressed in local
/// coordinates (perspective or singular transforms).
pub const GIANT_RECT: Rect = Rect::new(-1e9, -1e9, 1e9, 1e9);

/// Returns `true` if `rect` has no positive area (including NaN extents).
#[inline]
#[must_use]
pub fn is_empty(rect: Rect) -> bool {
    !(rect.x1 > rect.x0 && rect.y1 > rect.y0)
}

/// Union that ignores empty operands.
#[must_use]
pub fn join(acc: Rect, other: Rect) -> Rect {
    if is_empty(other) {
        acc
    } else if is_empty(acc) {
        other
    } else {
        acc.union(other)
    }
}

/// Returns `true` if both rectangles are non-empty and share interior area.
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    !is_empty(a) && !is_empty(b) && a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Intersection, normalized to [`Rect::ZERO`] when empty.
#[must_use]
pub fn intersect_or_empty(a: Rect, b: Rect) -> Rect {
    let r = a.intersect(b);
    if is_empty(r) { Rect::ZERO } else { r }
}

/// Returns `true` if `outer` fully contains the non-empty `inner`.
#[must_use]
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    !is_empty(inner)
        && outer.x0 <= inner.x0
        && outer.y0 <= inner.y0
        && outer.x1 >= inner.x1
        && outer.y1 >= inner.y1
}

/// Expands each edge outward to the nearest whole pixel.
#[must_use]
pub fn round_out(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.floor(),
        rect.y0.floor(),
        rect.x1.ceil(),
        rect.y1.ceil(),
    )
}

/// Rounds each edge to the nearest whole pixel.
#[must_use]
pub fn round(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.round(),
        rect.y0.round(),
        rect.x1.round(),
        rect.y1.round(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_skips_empty_operands() {
        let r = Rect::new(100.0, 100.0, 120.0, 130.0);
        assert_eq!(join(Rect::ZERO, r), r);
        assert_eq!(join(r, Rect::ZERO), r);
        assert_eq!(join(r, Rect::new(5.0, 5.0, 5.0, 50.0)), r);
        assert_eq!(
            join(r, Rect::new(0.0, 0.0, 10.0, 10.0)),
            Rect::new(0.0, 0.0, 120.0, 130.0)
        );
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!intersects(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(intersects(a, Rect::new(9.5, 9.5, 20.0, 20.0)));
        assert!(!intersects(a, Rect::ZERO));
    }

    #[test]
    fn rounding_helpers() {
        let r = Rect::new(0.4, 0.6, 10.4, 10.6);
        assert_eq!(round_out(r), Rect::new(0.0, 0.0, 11.0, 11.0));
        assert_eq!(round(r), Rect::new(0.0, 1.0, 10.0, 11.0));
    }

    #[test]
    fn disjoint_intersection_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(intersect_or_empty(a, b), Rect::ZERO);
        assert!(contains_rect(a, Rect::new(1.0, 1.0, 10.0, 10.0)));
        assert!(!contains_rect(a, Rect::ZERO));
    }
}
