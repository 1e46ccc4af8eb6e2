// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deciding whether a partial repaint is worth it.

use understory_matrix_clip::{IntRect, IntSize};

/// Largest fraction of a frame dimension a damage rect may span and still
/// be repainted partially.
///
/// Partial repaint costs an extra resolve on some backends, which only pays
/// off when a large part of the frame is skipped. The value is empirical;
/// see [`CompositorConfig::partial_repaint_threshold`](crate::CompositorConfig::partial_repaint_threshold).
pub const DEFAULT_PARTIAL_REPAINT_THRESHOLD: f64 = 0.7;

/// Whether `damage` is small enough to repaint instead of the whole frame,
/// using [`DEFAULT_PARTIAL_REPAINT_THRESHOLD`].
///
/// ```
/// use understory_frame_damage::should_perform_partial_repaint;
/// use understory_matrix_clip::{IntRect, IntSize};
///
/// let frame = IntSize::new(1000, 1000);
/// assert!(should_perform_partial_repaint(Some(IntRect::new(0, 0, 700, 1000)), frame));
/// assert!(!should_perform_partial_repaint(Some(IntRect::new(0, 0, 701, 701)), frame));
/// assert!(!should_perform_partial_repaint(None, frame));
/// ```
#[must_use]
pub fn should_perform_partial_repaint(damage: Option<IntRect>, frame_size: IntSize) -> bool {
    partial_repaint_admitted(damage, frame_size, DEFAULT_PARTIAL_REPAINT_THRESHOLD)
}

/// Whether `damage` is small enough to repaint instead of the whole frame.
///
/// Rejects missing damage and damage spanning the whole frame. Otherwise
/// admits when the damage spans at most `threshold` of the frame's width or
/// at most `threshold` of its height.
#[must_use]
pub fn partial_repaint_admitted(
    damage: Option<IntRect>,
    frame_size: IntSize,
    threshold: f64,
) -> bool {
    let Some(damage) = damage else {
        return false;
    };
    if damage.width() >= frame_size.width && damage.height() >= frame_size.height {
        return false;
    }
    let x_ratio = f64::from(damage.width()) / f64::from(frame_size.width);
    let y_ratio = f64::from(damage.height()) / f64::from(frame_size.height);
    x_ratio <= threshold || y_ratio <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: IntSize = IntSize::new(1000, 800);

    fn admitted(width: i32, height: i32) -> bool {
        should_perform_partial_repaint(Some(IntRect::new(0, 0, width, height)), FRAME)
    }

    #[test]
    fn boundary_is_inclusive() {
        assert!(admitted(700, 800), "70% of the width is admitted");
        assert!(admitted(1000, 560), "70% of the height is admitted");
        assert!(!admitted(701, 561), "just over 70% on both axes is rejected");
    }

    #[test]
    fn one_small_axis_is_enough() {
        assert!(admitted(1000, 10));
        assert!(admitted(10, 800));
    }

    #[test]
    fn full_frame_always_rejects() {
        let full = Some(IntRect::from_size(FRAME));
        assert!(!partial_repaint_admitted(full, FRAME, 1.0));
        assert!(!partial_repaint_admitted(
            Some(IntRect::new(-10, -10, 1010, 810)),
            FRAME,
            2.0
        ));
    }

    #[test]
    fn missing_damage_rejects() {
        assert!(!should_perform_partial_repaint(None, FRAME));
    }

    #[test]
    fn empty_damage_is_admitted() {
        assert!(should_perform_partial_repaint(Some(IntRect::ZERO), FRAME));
    }

    #[test]
    fn threshold_is_tunable() {
        let damage = Some(IntRect::new(0, 0, 900, 720));
        assert!(!should_perform_partial_repaint(damage, FRAME));
        assert!(partial_repaint_admitted(damage, FRAME, 0.9));
    }
}
