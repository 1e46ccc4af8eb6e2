// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for whole frames through `understory_frame_damage`.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use peniko::Color;
use understory_frame_damage::{
    CompositorConfig, CompositorContext, FrameDamage, FramebufferInfo,
};
use understory_layer_tree::{
    ContainerLayer, Layer, LayerTree, Picture, PictureLayer, PictureOp, RecordingCanvas,
};
use understory_matrix_clip::{IntRect, IntSize};

const FRAME: IntSize = IntSize::new(1920, 1080);

fn grid(count: usize) -> Arc<LayerTree> {
    let picture = Arc::new(Picture::new(vec![PictureOp::FillRect {
        rect: Rect::new(0.0, 0.0, 40.0, 40.0),
        color: Color::WHITE,
    }]));
    let children: Vec<Arc<dyn Layer>> = (0..count)
        .map(|i| {
            let offset = Point::new((i % 40) as f64 * 48.0, (i / 40) as f64 * 48.0);
            Arc::new(PictureLayer::new(offset, picture.clone())) as Arc<dyn Layer>
        })
        .collect();
    let root: Arc<dyn Layer> = Arc::new(ContainerLayer::new(children));
    Arc::new(LayerTree::new(Some(root), FRAME).unwrap())
}

fn bench_frame_damage(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_frame_damage");
    group.sample_size(50);

    for &count in &[64_usize, 512, 880] {
        let tree = grid(count);
        let mut seed = FrameDamage::new();
        seed.compute_clip_rect(&tree, false, false);
        let retained = seed.take_retained_frame();

        group.bench_function(format!("compute_clip_rect_unchanged(n={count})"), |b| {
            b.iter(|| {
                let mut damage = FrameDamage::new();
                damage.set_previous_frame(retained.clone());
                black_box(damage.compute_clip_rect(&tree, false, false))
            });
        });

        group.bench_function(format!("raster_unchanged(n={count})"), |b| {
            let mut compositor = CompositorContext::new(CompositorConfig::default());
            let buffer = FramebufferInfo::partial(IntRect::ZERO);
            let mut now = 0_u64;
            b.iter(|| {
                let mut canvas = RecordingCanvas::new();
                let mut frame = compositor.acquire_frame(now);
                black_box(frame.raster(&tree, &buffer, &mut canvas, None));
                now += 16;
                frame.finish(now);
                black_box(canvas);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame_damage);
criterion_main!(benches);
