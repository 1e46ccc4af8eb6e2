// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Layer`] trait and identity helpers shared by every layer type.

use core::any::Any;
use core::fmt;

use kurbo::Rect;
use understory_layer_diff::{DiffContext, LayerId};

use crate::{PaintContext, PrerollContext};

/// A node of a retained layer tree.
///
/// Layers are immutable once built and shared between frames through
/// `Arc<dyn Layer>`. A frame that reuses an `Arc` from the previous tree
/// tells the diff that the whole subtree is unchanged.
///
/// Each layer has two identities:
///
/// - [`unique_id`](Self::unique_id) names this instance and keys its paint
///   region from one frame to the next.
/// - [`original_layer_id`](Self::original_layer_id) is shared by a layer and
///   every layer built to replace it, which is how the diff pairs a new
///   layer with the old one it supersedes.
pub trait Layer: Any + fmt::Debug + Send + Sync {
    /// Identity of this instance.
    fn unique_id(&self) -> LayerId;

    /// Identity shared with the layers this one replaces.
    fn original_layer_id(&self) -> LayerId;

    /// Bounds of everything this layer paints, in parent space.
    fn paint_bounds(&self) -> Rect;

    /// Whether this layer takes the place of `old` from the previous frame.
    fn is_replacing(&self, old: &dyn Layer) -> bool {
        self.original_layer_id() == old.original_layer_id()
    }

    /// Records this layer's paint region and damage, comparing against `old`.
    ///
    /// `old` is the layer this one replaces, or `None` if it is new or its
    /// parent is already dirty.
    fn diff(&self, ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>);

    /// Carries the previous frame's paint region forward for a retained subtree.
    ///
    /// Containers also preserve every descendant, so the regions can still be
    /// found once the subtree is diffed again.
    fn preserve_paint_region(&self, ctx: &mut DiffContext<'_>) {
        ctx.preserve_layer_paint_region(self.unique_id());
    }

    /// Collects what the compositor needs to know before painting.
    fn preroll(&self, ctx: &mut PrerollContext);

    /// Paints the layer.
    fn paint(&self, ctx: &mut PaintContext<'_>);
}

/// Unique and original identities of a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerIdentity {
    /// Identity of the instance.
    pub unique: LayerId,
    /// Identity shared along a chain of replacements.
    pub original: LayerId,
}

impl LayerIdentity {
    /// A fresh identity that replaces nothing.
    #[must_use]
    pub fn new() -> Self {
        let id = LayerId::next();
        Self {
            unique: id,
            original: id,
        }
    }

    /// A fresh instance identity that inherits `old`'s original identity.
    #[must_use]
    pub fn replacing(old: &dyn Layer) -> Self {
        Self {
            unique: LayerId::next(),
            original: old.original_layer_id(),
        }
    }
}

impl Default for LayerIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Downcasts a layer to its concrete type.
#[must_use]
pub fn downcast_layer<T: Layer>(layer: &dyn Layer) -> Option<&T> {
    let any: &dyn Any = layer;
    any.downcast_ref::<T>()
}

pub(crate) fn old_as<T: Layer>(old: Option<&dyn Layer>) -> Option<&T> {
    old.and_then(downcast_layer::<T>)
}

/// Marks the current subtree dirty when `changed`, damaging `old`'s previous region.
pub(crate) fn mark_dirty_if(ctx: &mut DiffContext<'_>, old: Option<&dyn Layer>, changed: bool) {
    if !changed || ctx.is_subtree_dirty() {
        return;
    }
    let region = old
        .map(|old| ctx.old_layer_paint_region(old.unique_id()))
        .unwrap_or_default();
    ctx.mark_subtree_dirty(&region);
}
