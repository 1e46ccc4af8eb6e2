// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers with children.

use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::Rect;
use understory_layer_diff::{DiffContext, LayerId};
use understory_matrix_clip::rect::join;

use crate::{Layer, LayerIdentity, PaintContext, PrerollContext, mark_dirty_if, old_as};

/// An ordered list of child layers, painted back to front.
///
/// Used directly as a grouping layer and embedded by every layer type that
/// has children.
#[derive(Debug)]
pub struct ContainerLayer {
    identity: LayerIdentity,
    children: Vec<Arc<dyn Layer>>,
    child_paint_bounds: Rect,
}

impl ContainerLayer {
    /// Creates a container over `children`.
    #[must_use]
    pub fn new(children: Vec<Arc<dyn Layer>>) -> Self {
        let child_paint_bounds = children
            .iter()
            .map(|child| child.paint_bounds())
            .fold(Rect::ZERO, join);
        Self {
            identity: LayerIdentity::new(),
            children,
            child_paint_bounds,
        }
    }

    /// Marks this container as the replacement of `old` in the tree.
    ///
    /// Wrapping layers (transform, clip, ...) take their identity from their
    /// container, so this is also how they declare a replacement.
    #[must_use]
    pub fn replacing(mut self, old: &dyn Layer) -> Self {
        self.identity = LayerIdentity::replacing(old);
        self
    }

    /// The children, back to front.
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn Layer>] {
        &self.children
    }

    /// Diffs the children against `old`'s.
    ///
    /// In a dirty subtree, or without an old container, every child is diffed
    /// against nothing. Otherwise the longest matching prefix and suffix of
    /// replacing children are paired up; old children outside them are
    /// damaged where they painted and new ones are diffed against nothing.
    /// A paired child that is the very same instance is retained without
    /// being walked, unless its previous region involved a readback or a
    /// texture.
    pub fn diff_children(&self, ctx: &mut DiffContext<'_>, old: Option<&Self>) {
        let old = match old {
            Some(old) if !ctx.is_subtree_dirty() => old,
            _ => {
                for child in &self.children {
                    child.diff(ctx, None);
                }
                return;
            }
        };
        let new_children = &self.children;
        let old_children = &old.children;

        let mut prefix = 0;
        while prefix < new_children.len()
            && prefix < old_children.len()
            && new_children[prefix].is_replacing(&*old_children[prefix])
        {
            prefix += 1;
        }
        let mut suffix = 0;
        while suffix < new_children.len() - prefix
            && suffix < old_children.len() - prefix
            && new_children[new_children.len() - 1 - suffix]
                .is_replacing(&*old_children[old_children.len() - 1 - suffix])
        {
            suffix += 1;
        }

        for removed in &old_children[prefix..old_children.len() - suffix] {
            let region = ctx.old_layer_paint_region(removed.unique_id());
            ctx.add_damage_region(&region);
        }

        for (i, child) in new_children.iter().enumerate() {
            let paired = if i < prefix {
                Some(i)
            } else if i >= new_children.len() - suffix {
                Some(old_children.len() - (new_children.len() - i))
            } else {
                None
            };
            let Some(old_index) = paired else {
                child.diff(ctx, None);
                continue;
            };
            let old_child = &old_children[old_index];
            let region = ctx.old_layer_paint_region(old_child.unique_id());
            if Arc::ptr_eq(child, old_child)
                && region.is_valid()
                && !region.has_readback()
                && !region.has_texture()
            {
                ctx.add_existing_paint_region(&region);
                child.preserve_paint_region(ctx);
            } else {
                child.diff(ctx, Some(&**old_child));
            }
        }
    }

    /// Preserves this container's region and every descendant's.
    pub fn preserve_children(&self, ctx: &mut DiffContext<'_>) {
        ctx.preserve_layer_paint_region(self.unique_id());
        for child in &self.children {
            child.preserve_paint_region(ctx);
        }
    }

    /// Prerolls every child.
    pub fn preroll_children(&self, ctx: &mut PrerollContext) {
        for child in &self.children {
            child.preroll(ctx);
        }
    }

    /// Paints every child whose bounds intersect the cull rect.
    pub fn paint_children(&self, ctx: &mut PaintContext<'_>) {
        for child in &self.children {
            if !ctx.content_culled(child.paint_bounds()) {
                child.paint(ctx);
            }
        }
    }
}

impl Layer for ContainerLayer {
    fn unique_id(&self) -> LayerId {
        self.identity.unique
    }

    fn original_layer_id(&self) -> LayerId {
        self.identity.original
    }

    fn paint_bounds(&self) -> Rect {
        self.child_paint_bounds
    }

    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>) {
        ctx.with_subtree(|ctx| {
            let prev = old_as::<Self>(old);
            mark_dirty_if(ctx, old, prev.is_none());
            self.diff_children(ctx, prev);
            let region = ctx.current_subtree_region();
            ctx.set_layer_paint_region(self.unique_id(), region);
        });
    }

    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        self.preserve_children(ctx);
    }

    fn preroll(&self, ctx: &mut PrerollContext) {
        self.preroll_children(ctx);
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        self.paint_children(ctx);
    }
}
