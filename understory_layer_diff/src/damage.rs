// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Final damage rectangles for a frame.

use kurbo::Rect;
use understory_matrix_clip::rect::{intersects, join};
use understory_matrix_clip::{IntRect, IntSize};

/// Pixel damage produced by a diff pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Damage {
    /// Area of the frame whose content changed since the previous frame.
    pub frame_damage: IntRect,
    /// Area of the target buffer that must be repainted. This is the frame
    /// damage plus whatever the buffer missed while other buffers were
    /// presented.
    pub buffer_damage: IntRect,
}

/// A framebuffer read recorded at a position in the pass's rect list.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Readback {
    /// Index of the placeholder rect in the pass's rect list.
    pub(crate) position: usize,
    /// Device-space area the readback samples.
    pub(crate) rect: Rect,
}

/// Combines accumulated diff damage with readbacks, rounds, clamps and aligns.
///
/// A readback that overlaps damage must be repainted too, because what it
/// read has changed. Frame and buffer damage are each tested against their
/// own pre-readback value.
pub(crate) fn resolve(
    damage: Rect,
    readbacks: &[Readback],
    accumulated_buffer_damage: IntRect,
    frame_size: IntSize,
    horizontal_alignment: u32,
    vertical_alignment: u32,
) -> Damage {
    let original_frame = damage;
    let original_buffer = join(accumulated_buffer_damage.to_rect(), damage);

    let mut frame = original_frame;
    let mut buffer = original_buffer;
    for readback in readbacks {
        if intersects(readback.rect, original_frame) {
            frame = join(frame, readback.rect);
        }
        if intersects(readback.rect, original_buffer) {
            buffer = join(buffer, readback.rect);
        }
    }

    let bounds = IntRect::from_size(frame_size);
    let mut result = Damage {
        frame_damage: IntRect::round_out(frame).intersect(bounds),
        buffer_damage: IntRect::round_out(buffer).intersect(bounds),
    };

    if horizontal_alignment > 1 || vertical_alignment > 1 {
        result.frame_damage =
            result
                .frame_damage
                .align_to(horizontal_alignment, vertical_alignment, frame_size);
        result.buffer_damage =
            result
                .buffer_damage
                .align_to(horizontal_alignment, vertical_alignment, frame_size);
    }
    result
}
