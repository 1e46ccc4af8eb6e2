// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preroll and paint passes over small trees, observed through a
//! `RecordingCanvas`.

use std::sync::Arc;

use kurbo::{Point, Rect, RoundedRect, Size};
use peniko::Color;
use understory_layer_tree::{
    BackdropFilterLayer, CanvasOp, ClipBehavior, ClipLayer, ClipShape, ContainerLayer,
    ImageFilter, Layer, LayerTree, OpacityLayer, Picture, PictureLayer, PictureOp,
    RecordingCanvas, SaveLayer, TextureLayer, downcast_layer,
};
use understory_matrix_clip::IntSize;

const FRAME: IntSize = IntSize::new(100, 100);

fn square(x: f64, y: f64) -> Arc<dyn Layer> {
    Arc::new(PictureLayer::new(
        Point::new(x, y),
        Arc::new(Picture::new(vec![PictureOp::FillRect {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            color: Color::WHITE,
        }])),
    ))
}

fn paint(tree: &LayerTree, cull: Rect) -> RecordingCanvas {
    let mut canvas = RecordingCanvas::new();
    tree.paint(&mut canvas, cull);
    assert_eq!(canvas.save_depth(), 0, "paint left saves open");
    canvas
}

#[test]
fn negative_frame_sizes_are_rejected() {
    let err = LayerTree::new(None, IntSize::new(-1, 10)).unwrap_err();
    assert_eq!(err.size, IntSize::new(-1, 10));
    assert!(err.to_string().contains("-1x10"));
    assert!(LayerTree::new(None, IntSize::new(0, 0)).is_ok());
}

#[test]
fn culled_children_are_not_painted() {
    let root: Arc<dyn Layer> = Arc::new(ContainerLayer::new(vec![
        square(0.0, 0.0),
        square(50.0, 50.0),
    ]));
    let tree = LayerTree::new(Some(root), FRAME).unwrap();
    assert_eq!(paint(&tree, tree.frame_rect()).pictures().count(), 2);
    assert_eq!(
        paint(&tree, Rect::new(0.0, 0.0, 20.0, 20.0))
            .pictures()
            .count(),
        1
    );
}

#[test]
fn redundant_clips_are_skipped() {
    let covering: Arc<dyn Layer> = Arc::new(ClipLayer::new(
        ClipShape::RoundedRect(RoundedRect::new(-50.0, -50.0, 200.0, 200.0, 5.0)),
        ClipBehavior::AntiAlias,
        ContainerLayer::new(vec![square(0.0, 0.0)]),
    ));
    let tree = LayerTree::new(Some(covering), FRAME).unwrap();
    let canvas = paint(&tree, tree.frame_rect());
    assert!(
        !canvas
            .ops()
            .iter()
            .any(|op| matches!(op, CanvasOp::Clip { .. }))
    );

    let partial: Arc<dyn Layer> = Arc::new(ClipLayer::new(
        ClipShape::Oval(Rect::new(0.0, 0.0, 50.0, 50.0)),
        ClipBehavior::HardEdge,
        ContainerLayer::new(vec![square(0.0, 0.0)]),
    ));
    let tree = LayerTree::new(Some(partial), FRAME).unwrap();
    let canvas = paint(&tree, tree.frame_rect());
    assert!(canvas.ops().iter().any(|op| matches!(
        op,
        CanvasOp::Clip {
            anti_alias: false,
            ..
        }
    )));
}

#[test]
fn translucent_opacity_uses_save_layer() {
    let opacity: Arc<dyn Layer> = Arc::new(OpacityLayer::new(
        64,
        Point::new(5.0, 5.0),
        ContainerLayer::new(vec![square(0.0, 0.0)]),
    ));
    let tree = LayerTree::new(Some(opacity.clone()), FRAME).unwrap();
    let canvas = paint(&tree, tree.frame_rect());
    assert!(canvas.ops().contains(&CanvasOp::SaveLayer(
        SaveLayer::new()
            .with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_alpha(64)
    )));
    assert_eq!(
        downcast_layer::<OpacityLayer>(&*opacity).map(OpacityLayer::alpha),
        Some(64)
    );
}

#[test]
fn preroll_reports_readback_and_textures() {
    let plain = LayerTree::new(Some(square(0.0, 0.0)), FRAME).unwrap();
    let result = plain.preroll(plain.frame_rect());
    assert!(!result.surface_needs_readback);
    assert!(!result.has_texture_layer);

    let backdrop: Arc<dyn Layer> = Arc::new(BackdropFilterLayer::new(
        ImageFilter::blur(4.0),
        ContainerLayer::new(Vec::new()),
    ));
    let texture: Arc<dyn Layer> = Arc::new(TextureLayer::new(
        Point::new(10.0, 10.0),
        Size::new(20.0, 20.0),
        3,
        true,
    ));
    let root: Arc<dyn Layer> = Arc::new(ContainerLayer::new(vec![backdrop, texture]));
    let tree = LayerTree::new(Some(root), FRAME).unwrap();
    let result = tree.preroll(tree.frame_rect());
    assert!(result.surface_needs_readback);
    assert!(result.has_texture_layer);

    let canvas = paint(&tree, tree.frame_rect());
    assert!(canvas.ops().contains(&CanvasOp::DrawTexture {
        texture_id: 3,
        bounds: Rect::new(10.0, 10.0, 30.0, 30.0),
        freeze: true,
    }));
}

#[test]
fn fully_clipped_subtree_skips_preroll() {
    let texture: Arc<dyn Layer> =
        Arc::new(TextureLayer::new(Point::ZERO, Size::new(20.0, 20.0), 1, false));
    let root: Arc<dyn Layer> = Arc::new(ClipLayer::new(
        ClipShape::Rect(Rect::ZERO),
        ClipBehavior::HardEdge,
        ContainerLayer::new(vec![texture]),
    ));
    let tree = LayerTree::new(Some(root), FRAME).unwrap();
    assert!(!tree.preroll(tree.frame_rect()).has_texture_layer);
}
