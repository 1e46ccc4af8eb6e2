// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint regions: where a subtree painted during one diff pass.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use hashbrown::HashMap;
use kurbo::Rect;
use understory_matrix_clip::rect::join;

/// Process-unique identity of a layer.
///
/// Identities are handed out by [`LayerId::next`] and never reused, so a
/// paint region recorded under an id can only ever be looked up by the layer
/// that recorded it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    /// Allocates a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for diagnostics.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

bitflags! {
    /// Properties of a subtree that make its recorded rects unsafe to reuse.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RegionFlags: u8 {
        /// The subtree reads back from the framebuffer (for example a backdrop filter).
        const HAS_READBACK = 1 << 0;
        /// The subtree contains a texture layer whose content changes out of band.
        const HAS_TEXTURE = 1 << 1;
    }
}

/// A `[start, end)` slice of the rect list being built by the current pass.
///
/// Returned by [`DiffContext::current_subtree_region`](crate::DiffContext::current_subtree_region)
/// and turned into a [`PaintRegion`] when the pass is frozen with
/// [`DiffContext::into_paint_regions`](crate::DiffContext::into_paint_regions).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtreeRegion {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) flags: RegionFlags,
}

impl SubtreeRegion {
    /// Index of the first rect.
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the index of the last rect.
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of rects in the span, including readback placeholders.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the span holds no rects.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Flags carried by the span.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> RegionFlags {
        self.flags
    }
}

/// An immutable view of the device-space rects a subtree painted in one frame.
///
/// All regions produced by one diff pass share a single backing list; each
/// region references its own `[start, end)` range. Cloning is cheap and the
/// backing list lives as long as any region references it.
///
/// The default region is *invalid*: it stands for "no record", as returned
/// when a layer did not exist in the previous frame.
#[derive(Clone, Debug, Default)]
pub struct PaintRegion {
    rects: Option<Arc<[Rect]>>,
    start: usize,
    end: usize,
    flags: RegionFlags,
}

impl PaintRegion {
    pub(crate) fn new(rects: Arc<[Rect]>, span: SubtreeRegion) -> Self {
        debug_assert!(
            span.start <= span.end && span.end <= rects.len(),
            "span must lie within the backing list"
        );
        Self {
            rects: Some(rects),
            start: span.start,
            end: span.end,
            flags: span.flags,
        }
    }

    /// Returns `true` if the region refers to a recorded subtree.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rects.is_some()
    }

    /// The rects of this region, in paint order.
    ///
    /// Readback placeholders appear as empty rects. Invalid regions yield an
    /// empty slice.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        self.rects
            .as_deref()
            .map_or(&[][..], |rects| &rects[self.start..self.end])
    }

    /// Iterates the rects of this region.
    pub fn iter(&self) -> impl Iterator<Item = Rect> + '_ {
        self.rects().iter().copied()
    }

    /// The flags recorded for this region.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> RegionFlags {
        self.flags
    }

    /// Whether the subtree performed a framebuffer readback.
    #[inline]
    #[must_use]
    pub fn has_readback(&self) -> bool {
        self.flags.contains(RegionFlags::HAS_READBACK)
    }

    /// Whether the subtree contains a texture layer.
    #[inline]
    #[must_use]
    pub fn has_texture(&self) -> bool {
        self.flags.contains(RegionFlags::HAS_TEXTURE)
    }

    /// Union of all non-empty rects, or [`Rect::ZERO`].
    #[must_use]
    pub fn compute_bounds(&self) -> Rect {
        self.iter().fold(Rect::ZERO, join)
    }

    /// Returns `true` if both regions are views into the same backing list.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        match (&self.rects, &other.rects) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Paint regions of one frame, keyed by layer identity.
#[derive(Clone, Debug, Default)]
pub struct PaintRegionMap {
    regions: HashMap<LayerId, PaintRegion>,
}

impl PaintRegionMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the region recorded for `id`, if any.
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&PaintRegion> {
        self.regions.get(&id)
    }

    /// Records the region for `id`, replacing any previous entry.
    pub fn insert(&mut self, id: LayerId, region: PaintRegion) -> Option<PaintRegion> {
        self.regions.insert(id, region)
    }

    /// Returns `true` if a region is recorded for `id`.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.regions.contains_key(&id)
    }

    /// Number of recorded layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if no regions are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterates recorded `(id, region)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &PaintRegion)> + '_ {
        self.regions.iter().map(|(id, region)| (*id, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn layer_ids_are_unique() {
        let a = LayerId::next();
        let b = LayerId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn invalid_region_is_empty() {
        let region = PaintRegion::default();
        assert!(!region.is_valid());
        assert!(region.rects().is_empty());
        assert_eq!(region.compute_bounds(), Rect::ZERO);
    }

    #[test]
    fn regions_share_backing_list() {
        let rects: Arc<[Rect]> = Arc::from(vec![
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::ZERO,
            Rect::new(20.0, 20.0, 30.0, 30.0),
        ]);
        let outer = PaintRegion::new(
            rects.clone(),
            SubtreeRegion {
                start: 0,
                end: 3,
                flags: RegionFlags::HAS_READBACK,
            },
        );
        let inner = PaintRegion::new(
            rects,
            SubtreeRegion {
                start: 2,
                end: 3,
                flags: RegionFlags::empty(),
            },
        );
        assert!(outer.shares_storage_with(&inner));
        assert!(outer.has_readback());
        assert!(!inner.has_readback());
        assert_eq!(outer.compute_bounds(), Rect::new(0.0, 0.0, 30.0, 30.0));
        assert_eq!(inner.rects(), &[Rect::new(20.0, 20.0, 30.0, 30.0)]);
    }
}
