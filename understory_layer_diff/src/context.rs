// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The diff context: lock-step walk state for comparing two layer trees.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;
use understory_matrix_clip::rect::{intersects, join};
use understory_matrix_clip::{ClipOp, IntRect, IntSize, Matrix, MatrixClipTracker};

use crate::damage::{self, Readback};
use crate::{
    Damage, DiffStatistics, DiffTrace, LayerId, PaintRegion, PaintRegionMap, RegionFlags,
    SubtreeRegion,
};

/// Expands a device-space content rect to the area a filter can touch.
pub type FilterBoundsAdjustment = Box<dyn Fn(Rect) -> Rect + Send + Sync>;

#[derive(Copy, Clone, Debug, Default)]
struct State {
    dirty: bool,
    rect_index: usize,
    integral_transform: bool,
    save_count: usize,
    has_filter_bounds_adjustment: bool,
    has_texture: bool,
}

#[derive(Clone, Debug)]
enum Recorded {
    Span(SubtreeRegion),
    Preserved(PaintRegion),
}

/// Walk state for diffing the current layer tree against the previous one.
///
/// Layers drive the context from their diff logic:
///
/// 1. [`begin_subtree`](Self::begin_subtree) (or [`with_subtree`](Self::with_subtree)),
/// 2. optionally push a transform, cull rect or filter adjustment,
/// 3. [`mark_subtree_dirty`](Self::mark_subtree_dirty) if their own content changed,
/// 4. [`add_layer_bounds`](Self::add_layer_bounds) for what they paint, or recurse,
/// 5. [`set_layer_paint_region`](Self::set_layer_paint_region) with
///    [`current_subtree_region`](Self::current_subtree_region),
/// 6. [`end_subtree`](Self::end_subtree).
///
/// After the walk, [`compute_damage`](Self::compute_damage) yields the pixel
/// damage and [`into_paint_regions`](Self::into_paint_regions) the regions to
/// compare against next frame.
///
/// Dirtiness is not inherited: each subtree starts clean and only becomes
/// dirty through an explicit `mark_subtree_dirty*` call.
///
/// # Panics
///
/// `end_subtree` without a matching `begin_subtree` panics. Marking a subtree
/// dirty twice, pushing a second filter adjustment at one level, and adding
/// an existing paint region to a dirty subtree are checked with debug
/// assertions.
pub struct DiffContext<'a> {
    frame_size: IntSize,
    clip_tracker: MatrixClipTracker,
    rects: Vec<Rect>,
    state: State,
    state_stack: Vec<State>,
    filter_bounds_adjustments: SmallVec<[FilterBoundsAdjustment; 4]>,
    damage: Rect,
    readbacks: Vec<Readback>,
    this_frame: HashMap<LayerId, Recorded>,
    last_frame: &'a PaintRegionMap,
    has_raster_cache: bool,
    impeller_enabled: bool,
    statistics: DiffStatistics,
    trace: Option<&'a mut dyn DiffTrace>,
}

impl fmt::Debug for DiffContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffContext")
            .field("frame_size", &self.frame_size)
            .field("depth", &self.state_stack.len())
            .field("rects", &self.rects.len())
            .field("damage", &self.damage)
            .field("readbacks", &self.readbacks.len())
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

impl<'a> DiffContext<'a> {
    /// Creates a context for a frame of `frame_size` pixels.
    ///
    /// `last_frame` holds the paint regions recorded by the previous frame's
    /// pass. The device cull rect starts as the whole frame.
    #[must_use]
    pub fn new(
        frame_size: IntSize,
        last_frame: &'a PaintRegionMap,
        has_raster_cache: bool,
        impeller_enabled: bool,
    ) -> Self {
        Self {
            frame_size,
            clip_tracker: MatrixClipTracker::new(IntRect::from_size(frame_size).to_rect()),
            rects: Vec::new(),
            state: State {
                save_count: 1,
                ..State::default()
            },
            state_stack: Vec::new(),
            filter_bounds_adjustments: SmallVec::new(),
            damage: Rect::ZERO,
            readbacks: Vec::new(),
            this_frame: HashMap::new(),
            last_frame,
            has_raster_cache,
            impeller_enabled,
            statistics: DiffStatistics::default(),
            trace: None,
        }
    }

    /// Attaches a trace sink for the rest of the pass.
    pub fn set_trace(&mut self, trace: &'a mut dyn DiffTrace) {
        self.trace = Some(trace);
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn frame_size(&self) -> IntSize {
        self.frame_size
    }

    /// Whether the renderer snaps cached layers to whole pixels.
    #[must_use]
    pub fn has_raster_cache(&self) -> bool {
        self.has_raster_cache
    }

    /// Whether the pass runs for the Impeller backend.
    #[must_use]
    pub fn impeller_enabled(&self) -> bool {
        self.impeller_enabled
    }

    /// Current subtree nesting depth; `0` outside any subtree.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state_stack.len()
    }

    /// Opens a subtree.
    ///
    /// Saves the transform and cull rect, remembers where this subtree's rects
    /// start, and resets the dirty, texture and filter flags for the new level.
    /// A pending integral-transform request from the parent is applied to the
    /// child's transform.
    pub fn begin_subtree(&mut self) {
        self.state_stack.push(self.state);
        let had_integral_transform = self.state.integral_transform;
        self.state = State {
            dirty: false,
            rect_index: self.rects.len(),
            integral_transform: false,
            save_count: self.clip_tracker.save(),
            has_filter_bounds_adjustment: false,
            has_texture: false,
        };
        if had_integral_transform {
            self.make_transform_integral();
        }
    }

    /// Closes the subtree opened by the matching [`begin_subtree`](Self::begin_subtree).
    pub fn end_subtree(&mut self) {
        let Some(parent) = self.state_stack.pop() else {
            panic!("DiffContext::end_subtree called without a matching begin_subtree");
        };
        if self.state.has_filter_bounds_adjustment {
            self.filter_bounds_adjustments.pop();
        }
        self.clip_tracker.restore_to_count(self.state.save_count);
        self.state = parent;
    }

    /// Runs `f` inside a balanced `begin_subtree`/`end_subtree` pair.
    pub fn with_subtree<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_subtree();
        let result = f(self);
        self.end_subtree();
        result
    }

    /// Composes `matrix` onto the current transform (`current = current * matrix`).
    pub fn push_transform(&mut self, matrix: &Matrix) {
        self.clip_tracker.current_mut().transform(matrix);
    }

    /// Replaces the current transform.
    pub fn set_transform(&mut self, matrix: Matrix) {
        self.clip_tracker.current_mut().set_transform(matrix);
    }

    /// The current local-to-device transform.
    #[must_use]
    pub fn transform(&self) -> &Matrix {
        self.clip_tracker.matrix()
    }

    /// Intersects the cull rect with local `clip`.
    ///
    /// An anti-aliased clip rounds its device rect out, so partially covered
    /// edge pixels stay inside the cull rect. Returns `false` if nothing
    /// remains visible.
    pub fn push_cull_rect(&mut self, clip: Rect, anti_alias: bool) -> bool {
        let state = self.clip_tracker.current_mut();
        state.clip_rect(clip, ClipOp::Intersect, anti_alias);
        !state.is_cull_rect_empty()
    }

    /// The cull rect in current local coordinates.
    #[must_use]
    pub fn cull_rect(&self) -> Rect {
        self.clip_tracker.current().local_cull_rect()
    }

    /// The cull rect in device coordinates.
    #[must_use]
    pub fn device_cull_rect(&self) -> Rect {
        self.clip_tracker.current().device_cull_rect()
    }

    /// Maps a local rect to device space with the current transform.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        self.clip_tracker.current().map_rect(rect)
    }

    /// Requests that this subtree's bounds be mapped with whole-pixel translation.
    ///
    /// Raster-cached content is drawn at integral device offsets; recording
    /// the snapped bounds keeps damage and painted pixels in agreement. Only
    /// takes effect with a raster cache on the non-Impeller path.
    pub fn will_paint_with_integral_transform(&mut self) {
        self.state.integral_transform = true;
    }

    fn integral_matrix(&self) -> Option<Matrix> {
        if self.has_raster_cache && !self.impeller_enabled {
            self.clip_tracker.matrix().with_integral_translation()
        } else {
            None
        }
    }

    fn make_transform_integral(&mut self) {
        if let Some(matrix) = self.integral_matrix() {
            self.clip_tracker.current_mut().set_transform(matrix);
        }
    }

    /// Registers a filter's bounds expansion for this subtree.
    ///
    /// Only one adjustment may be pushed per subtree level; it is popped by
    /// [`end_subtree`](Self::end_subtree).
    pub fn push_filter_bounds_adjustment(
        &mut self,
        adjustment: impl Fn(Rect) -> Rect + Send + Sync + 'static,
    ) {
        debug_assert!(
            !self.state.has_filter_bounds_adjustment,
            "only one filter bounds adjustment per subtree level"
        );
        self.filter_bounds_adjustments.push(Box::new(adjustment));
        self.state.has_filter_bounds_adjustment = true;
    }

    /// Applies all active filter adjustments, innermost first.
    #[must_use]
    pub fn apply_filter_bounds_adjustment(&self, rect: Rect) -> Rect {
        self.filter_bounds_adjustments
            .iter()
            .rev()
            .fold(rect, |rect, adjust| adjust(rect))
    }

    /// Marks the current subtree dirty, damaging where it painted last frame.
    ///
    /// Pass the previous frame's region for the subtree's layer, or an invalid
    /// region if the layer did not exist.
    pub fn mark_subtree_dirty(&mut self, previous_paint_region: &PaintRegion) {
        self.mark_subtree_dirty_rect(previous_paint_region.compute_bounds());
    }

    /// Marks the current subtree dirty, damaging an explicit device rect.
    pub fn mark_subtree_dirty_rect(&mut self, previous_device_bounds: Rect) {
        debug_assert!(!self.state.dirty, "subtree is already dirty");
        self.damage = join(self.damage, previous_device_bounds);
        self.state.dirty = true;
        let depth = self.depth();
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.subtree_dirty(depth, previous_device_bounds);
        }
    }

    /// Whether the current subtree has been marked dirty.
    #[must_use]
    pub fn is_subtree_dirty(&self) -> bool {
        self.state.dirty
    }

    /// Flags the current and all enclosing subtrees as containing a texture.
    pub fn mark_subtree_has_texture_layer(&mut self) {
        self.state.has_texture = true;
        for state in &mut self.state_stack {
            state.has_texture = true;
        }
    }

    /// Records local `rect` as painted by the current subtree.
    ///
    /// The rect is mapped to device space, snapped if the subtree paints with
    /// an integral transform, and passed through active filter adjustments.
    /// Rects outside the device cull rect are dropped. In a dirty subtree the
    /// rect is also added to damage.
    pub fn add_layer_bounds(&mut self, rect: Rect) {
        let state = self.clip_tracker.current();
        let matrix = self
            .state
            .integral_transform
            .then(|| self.integral_matrix())
            .flatten()
            .unwrap_or(*state.matrix());
        let device_rect = self.apply_filter_bounds_adjustment(matrix.map_rect(rect));
        if !intersects(device_rect, state.device_cull_rect()) {
            return;
        }
        self.rects.push(device_rect);
        let dirty = self.state.dirty;
        if dirty {
            self.damage = join(self.damage, device_rect);
        }
        let depth = self.depth();
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.layer_bounds(depth, device_rect, dirty);
        }
    }

    /// Carries a retained subtree's previous rects into this pass.
    ///
    /// The subtree must be clean: its content and everything above it match
    /// the previous frame, so it paints exactly where it did before.
    pub fn add_existing_paint_region(&mut self, region: &PaintRegion) {
        debug_assert!(
            !self.state.dirty,
            "existing paint regions may only be added to clean subtrees"
        );
        self.rects.extend(region.iter());
        let depth = self.depth();
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.existing_region(depth, region.rects().len());
        }
    }

    /// Records that the current subtree reads `device_rect` back from the framebuffer.
    ///
    /// An empty placeholder marks the position in the rect list so that
    /// enclosing subtrees can tell a readback happened inside them.
    pub fn add_readback_region(&mut self, device_rect: Rect) {
        self.readbacks.push(Readback {
            position: self.rects.len(),
            rect: device_rect,
        });
        self.rects.push(Rect::ZERO);
        let depth = self.depth();
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.readback(depth, device_rect);
        }
    }

    /// The span of rects recorded since the current subtree began.
    #[must_use]
    pub fn current_subtree_region(&self) -> SubtreeRegion {
        let mut flags = RegionFlags::empty();
        if self
            .readbacks
            .iter()
            .any(|readback| readback.position >= self.state.rect_index)
        {
            flags |= RegionFlags::HAS_READBACK;
        }
        if self.state.has_texture {
            flags |= RegionFlags::HAS_TEXTURE;
        }
        SubtreeRegion {
            start: self.state.rect_index,
            end: self.rects.len(),
            flags,
        }
    }

    /// Adds device-space damage directly.
    pub fn add_damage(&mut self, rect: Rect) {
        self.damage = join(self.damage, rect);
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.damage(rect);
        }
    }

    /// Adds every rect of `region` to damage.
    pub fn add_damage_region(&mut self, region: &PaintRegion) {
        for rect in region.iter() {
            self.add_damage(rect);
        }
    }

    /// Records this frame's paint region for `id`.
    pub fn set_layer_paint_region(&mut self, id: LayerId, region: SubtreeRegion) {
        assert!(
            region.start <= region.end && region.end <= self.rects.len(),
            "subtree region does not belong to this pass"
        );
        self.this_frame.insert(id, Recorded::Span(region));
    }

    /// Records the previous frame's region for `id` as this frame's, unchanged.
    ///
    /// Used for descendants of a retained subtree, which are not walked but
    /// must still be found by next frame's pass. Does nothing if `id` has no
    /// previous region.
    pub fn preserve_layer_paint_region(&mut self, id: LayerId) {
        if let Some(region) = self.last_frame.get(id) {
            self.this_frame
                .insert(id, Recorded::Preserved(region.clone()));
        }
    }

    /// The previous frame's region for `id`, or an invalid region.
    #[must_use]
    pub fn old_layer_paint_region(&self, id: LayerId) -> PaintRegion {
        self.last_frame.get(id).cloned().unwrap_or_default()
    }

    /// Picture comparison counters for this pass.
    #[must_use]
    pub fn statistics(&self) -> &DiffStatistics {
        &self.statistics
    }

    /// Mutable access to the picture comparison counters.
    pub fn statistics_mut(&mut self) -> &mut DiffStatistics {
        &mut self.statistics
    }

    /// Damage accumulated so far, in device space, before rounding.
    #[must_use]
    pub fn raw_damage(&self) -> Rect {
        self.damage
    }

    /// Resolves accumulated damage to pixels.
    ///
    /// `accumulated_buffer_damage` is damage the target buffer missed while
    /// other buffers were presented. With an alignment above `1` the result
    /// is expanded onto that pixel grid, clamped to the frame.
    #[must_use]
    pub fn compute_damage(
        &self,
        accumulated_buffer_damage: IntRect,
        horizontal_alignment: u32,
        vertical_alignment: u32,
    ) -> Damage {
        damage::resolve(
            self.damage,
            &self.readbacks,
            accumulated_buffer_damage,
            self.frame_size,
            horizontal_alignment,
            vertical_alignment,
        )
    }

    /// Freezes the pass, returning the regions to diff against next frame.
    ///
    /// Regions recorded in this pass share one backing list.
    #[must_use]
    pub fn into_paint_regions(self) -> PaintRegionMap {
        debug_assert!(
            self.state_stack.is_empty(),
            "diff pass finished with open subtrees"
        );
        let rects: Arc<[Rect]> = Arc::from(self.rects);
        let mut map = PaintRegionMap::new();
        for (id, recorded) in self.this_frame {
            let region = match recorded {
                Recorded::Span(span) => PaintRegion::new(rects.clone(), span),
                Recorded::Preserved(region) => region,
            };
            map.insert(id, region);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffRecorder;

    const FRAME: IntSize = IntSize::new(1000, 1000);

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    /// Records a single leaf `id` painting `bounds`, dirty if it has no previous region.
    fn leaf(ctx: &mut DiffContext<'_>, id: LayerId, bounds: Rect, changed: bool) {
        ctx.with_subtree(|ctx| {
            let old = ctx.old_layer_paint_region(id);
            if changed || !old.is_valid() {
                ctx.mark_subtree_dirty(&old);
            }
            ctx.add_layer_bounds(bounds);
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(id, region);
        });
    }

    #[test]
    fn subtree_round_trip_restores_transform_and_cull() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        let matrix = *ctx.transform();
        let cull = ctx.device_cull_rect();
        for depth in 0..8 {
            ctx.begin_subtree();
            ctx.push_transform(&Matrix::translate(3.0, f64::from(depth)));
            assert!(ctx.push_cull_rect(rect(0.0, 0.0, 500.0, 500.0), false));
        }
        assert_eq!(ctx.depth(), 8);
        for _ in 0..8 {
            ctx.end_subtree();
        }
        assert_eq!(ctx.transform(), &matrix);
        assert_eq!(ctx.device_cull_rect(), cull);
    }

    #[test]
    fn anti_aliased_cull_keeps_partial_edge_pixels() {
        let last = PaintRegionMap::new();
        let clip = rect(0.0, 0.0, 10.4, 100.0);
        let edge = rect(10.2, 0.0, 20.2, 10.0);

        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        assert!(ctx.push_cull_rect(clip, true));
        assert_eq!(ctx.device_cull_rect(), rect(0.0, 0.0, 11.0, 100.0));
        ctx.add_layer_bounds(edge);
        assert!(!ctx.current_subtree_region().is_empty());
        ctx.end_subtree();

        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        assert!(ctx.push_cull_rect(clip, false));
        assert_eq!(ctx.device_cull_rect(), rect(0.0, 0.0, 10.0, 100.0));
        ctx.add_layer_bounds(edge);
        assert!(ctx.current_subtree_region().is_empty());
        ctx.end_subtree();
    }

    #[test]
    fn dirtiness_is_not_inherited() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        ctx.mark_subtree_dirty_rect(Rect::ZERO);
        assert!(ctx.is_subtree_dirty());
        ctx.begin_subtree();
        assert!(!ctx.is_subtree_dirty());
        ctx.end_subtree();
        assert!(ctx.is_subtree_dirty());
        ctx.end_subtree();
    }

    #[test]
    fn clean_bounds_do_not_damage() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.with_subtree(|ctx| ctx.add_layer_bounds(rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(ctx.raw_damage(), Rect::ZERO);
        assert_eq!(
            ctx.compute_damage(IntRect::ZERO, 1, 1).frame_damage,
            IntRect::ZERO
        );
    }

    #[test]
    fn bounds_are_transformed_and_culled() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.with_subtree(|ctx| {
            ctx.mark_subtree_dirty_rect(Rect::ZERO);
            ctx.push_transform(&Matrix::translate(100.0, 50.0));
            ctx.add_layer_bounds(rect(0.0, 0.0, 10.0, 10.0));
            // Entirely off screen.
            ctx.add_layer_bounds(rect(5000.0, 0.0, 5010.0, 10.0));
            assert_eq!(ctx.current_subtree_region().len(), 1);
        });
        assert_eq!(ctx.raw_damage(), rect(100.0, 50.0, 110.0, 60.0));
    }

    #[test]
    fn moved_layer_damages_old_and_new_bounds() {
        let id = LayerId::next();
        let empty = PaintRegionMap::new();
        let mut first = DiffContext::new(FRAME, &empty, false, false);
        leaf(&mut first, id, rect(0.0, 0.0, 100.0, 100.0), true);
        let regions = first.into_paint_regions();

        let mut second = DiffContext::new(FRAME, &regions, false, false);
        leaf(&mut second, id, rect(0.0, 0.0, 200.0, 150.0), true);
        let damage = second.compute_damage(IntRect::ZERO, 1, 1);
        assert_eq!(damage.frame_damage, IntRect::new(0, 0, 200, 150));
    }

    #[test]
    fn unchanged_layer_produces_no_damage() {
        let id = LayerId::next();
        let empty = PaintRegionMap::new();
        let mut first = DiffContext::new(FRAME, &empty, false, false);
        leaf(&mut first, id, rect(10.0, 10.0, 20.0, 20.0), false);
        let regions = first.into_paint_regions();

        let mut second = DiffContext::new(FRAME, &regions, false, false);
        leaf(&mut second, id, rect(10.0, 10.0, 20.0, 20.0), false);
        assert_eq!(
            second.compute_damage(IntRect::ZERO, 1, 1).frame_damage,
            IntRect::ZERO
        );
    }

    #[test]
    fn filter_adjustments_apply_innermost_first() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        ctx.push_filter_bounds_adjustment(|r: Rect| Rect::new(r.x0 * 2.0, r.y0, r.x1 * 2.0, r.y1));
        ctx.begin_subtree();
        ctx.push_filter_bounds_adjustment(|r: Rect| r + kurbo::Vec2::new(10.0, 0.0));
        // Inner: +10 -> (10..20); outer: *2 -> (20..40).
        assert_eq!(
            ctx.apply_filter_bounds_adjustment(rect(0.0, 0.0, 10.0, 10.0)),
            rect(20.0, 0.0, 40.0, 10.0)
        );
        ctx.end_subtree();
        assert_eq!(
            ctx.apply_filter_bounds_adjustment(rect(0.0, 0.0, 10.0, 10.0)),
            rect(0.0, 0.0, 20.0, 10.0)
        );
        ctx.end_subtree();
        assert_eq!(
            ctx.apply_filter_bounds_adjustment(rect(0.0, 0.0, 10.0, 10.0)),
            rect(0.0, 0.0, 10.0, 10.0)
        );
    }

    #[test]
    fn readback_flags_enclosing_subtrees_only() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        ctx.with_subtree(|ctx| ctx.add_layer_bounds(rect(0.0, 0.0, 10.0, 10.0)));
        ctx.begin_subtree();
        ctx.add_readback_region(rect(0.0, 0.0, 50.0, 50.0));
        assert!(
            ctx.current_subtree_region()
                .flags()
                .contains(RegionFlags::HAS_READBACK)
        );
        ctx.end_subtree();
        ctx.begin_subtree();
        assert!(
            !ctx.current_subtree_region()
                .flags()
                .contains(RegionFlags::HAS_READBACK)
        );
        ctx.end_subtree();
        let outer = ctx.current_subtree_region();
        assert!(outer.flags().contains(RegionFlags::HAS_READBACK));
        assert_eq!(outer.len(), 2);
        ctx.end_subtree();
    }

    #[test]
    fn readback_overlapping_damage_is_repainted() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.with_subtree(|ctx| ctx.add_readback_region(rect(0.0, 0.0, 300.0, 300.0)));
        ctx.with_subtree(|ctx| {
            ctx.mark_subtree_dirty_rect(Rect::ZERO);
            ctx.add_layer_bounds(rect(250.0, 250.0, 260.0, 260.0));
        });
        let damage = ctx.compute_damage(IntRect::ZERO, 1, 1);
        assert_eq!(damage.frame_damage, IntRect::new(0, 0, 300, 300));
    }

    #[test]
    fn texture_flag_reaches_every_ancestor() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        ctx.begin_subtree();
        ctx.begin_subtree();
        ctx.mark_subtree_has_texture_layer();
        ctx.end_subtree();
        assert!(ctx.current_subtree_region().flags().contains(RegionFlags::HAS_TEXTURE));
        ctx.end_subtree();
        assert!(ctx.current_subtree_region().flags().contains(RegionFlags::HAS_TEXTURE));
        ctx.end_subtree();
    }

    #[test]
    fn integral_transform_snaps_with_raster_cache() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, true, false);
        ctx.with_subtree(|ctx| {
            ctx.push_transform(&Matrix::translate(10.4, 20.6));
            ctx.will_paint_with_integral_transform();
            ctx.add_layer_bounds(rect(0.0, 0.0, 10.0, 10.0));
            let region = ctx.current_subtree_region();
            let id = LayerId::next();
            ctx.set_layer_paint_region(id, region);
        });
        let regions = ctx.into_paint_regions();
        let (_, region) = regions.iter().next().unwrap();
        assert_eq!(region.rects(), &[rect(10.0, 21.0, 20.0, 31.0)]);
    }

    #[test]
    fn snapped_bounds_are_culled_where_they_paint() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, true, false);
        ctx.begin_subtree();
        assert!(ctx.push_cull_rect(rect(20.0, 0.0, 100.0, 100.0), false));
        ctx.begin_subtree();
        ctx.push_transform(&Matrix::translate(10.6, 0.0));
        ctx.will_paint_with_integral_transform();
        // Unsnapped this ends at 19.9; snapped it reaches into column 20.
        ctx.add_layer_bounds(rect(0.0, 0.0, 9.3, 10.0));
        let span = ctx.current_subtree_region();
        let id = LayerId::next();
        ctx.set_layer_paint_region(id, span);
        ctx.end_subtree();
        ctx.end_subtree();
        let regions = ctx.into_paint_regions();
        let rects = regions.get(id).unwrap().rects();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].x0, 11.0);
        assert!(rects[0].x1 > 20.0);
    }

    #[test]
    fn integral_transform_ignored_without_raster_cache() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.begin_subtree();
        ctx.push_transform(&Matrix::translate(10.4, 20.6));
        ctx.will_paint_with_integral_transform();
        ctx.add_layer_bounds(rect(0.0, 0.0, 10.0, 10.0));
        let span = ctx.current_subtree_region();
        let id = LayerId::next();
        ctx.set_layer_paint_region(id, span);
        ctx.end_subtree();
        let regions = ctx.into_paint_regions();
        assert_eq!(
            regions.get(id).unwrap().rects(),
            &[rect(10.4, 20.6, 20.4, 30.6)]
        );
    }

    #[test]
    fn frozen_regions_share_storage_and_preserved_keep_theirs() {
        let a = LayerId::next();
        let b = LayerId::next();
        let empty = PaintRegionMap::new();
        let mut first = DiffContext::new(FRAME, &empty, false, false);
        leaf(&mut first, a, rect(0.0, 0.0, 10.0, 10.0), true);
        leaf(&mut first, b, rect(20.0, 0.0, 30.0, 10.0), true);
        let regions = first.into_paint_regions();
        let ra = regions.get(a).unwrap();
        let rb = regions.get(b).unwrap();
        assert!(ra.shares_storage_with(rb));

        let mut second = DiffContext::new(FRAME, &regions, false, false);
        second.with_subtree(|ctx| {
            let old = ctx.old_layer_paint_region(a);
            ctx.add_existing_paint_region(&old);
            ctx.preserve_layer_paint_region(a);
        });
        leaf(&mut second, b, rect(20.0, 0.0, 30.0, 10.0), false);
        let next = second.into_paint_regions();
        assert!(next.get(a).unwrap().shares_storage_with(ra));
        assert!(!next.get(b).unwrap().shares_storage_with(ra));
        assert_eq!(next.get(b).unwrap().rects(), rb.rects());
    }

    #[test]
    fn trace_observes_dirty_and_bounds() {
        let last = PaintRegionMap::new();
        let mut recorder = DiffRecorder::new();
        {
            let mut ctx = DiffContext::new(FRAME, &last, false, false);
            ctx.set_trace(&mut recorder);
            ctx.with_subtree(|ctx| {
                ctx.mark_subtree_dirty_rect(Rect::ZERO);
                ctx.add_layer_bounds(rect(0.0, 0.0, 5.0, 5.0));
            });
        }
        assert_eq!(recorder.dirty_depths().collect::<Vec<_>>(), [1]);
        assert_eq!(recorder.events().len(), 2);
    }

    #[test]
    #[should_panic(expected = "without a matching begin_subtree")]
    fn unbalanced_end_subtree_panics() {
        let last = PaintRegionMap::new();
        let mut ctx = DiffContext::new(FRAME, &last, false, false);
        ctx.end_subtree();
    }
}
