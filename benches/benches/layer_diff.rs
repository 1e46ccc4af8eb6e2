// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for the diff pass of `understory_layer_diff` over
//! `understory_layer_tree` trees.

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use peniko::Color;
use understory_layer_diff::{DiffContext, PaintRegionMap};
use understory_layer_tree::{
    ContainerLayer, Layer, LayerTree, Picture, PictureLayer, PictureOp, TransformLayer,
    downcast_layer,
};
use understory_matrix_clip::{IntRect, IntSize, Matrix};

const FRAME: IntSize = IntSize::new(1920, 1080);

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

fn picture(ops: usize, rng: &mut Lcg) -> Arc<Picture> {
    let ops = (0..ops)
        .map(|_| PictureOp::FillRect {
            rect: Rect::new(
                f64::from(rng.next_u32() % 40),
                f64::from(rng.next_u32() % 40),
                f64::from(40 + rng.next_u32() % 40),
                f64::from(40 + rng.next_u32() % 40),
            ),
            color: Color::WHITE,
        })
        .collect();
    Arc::new(Picture::new(ops))
}

/// `groups` translated containers of `leaves` pictures each.
fn build_tree(groups: usize, leaves: usize, seed: u64) -> Arc<LayerTree> {
    let mut rng = Lcg::new(seed);
    let children: Vec<Arc<dyn Layer>> = (0..groups)
        .map(|g| {
            let group_leaves: Vec<Arc<dyn Layer>> = (0..leaves)
                .map(|i| {
                    let offset = Point::new((i % 20) as f64 * 90.0, (i / 20) as f64 * 90.0);
                    Arc::new(PictureLayer::new(offset, picture(8, &mut rng))) as Arc<dyn Layer>
                })
                .collect();
            let transform = Matrix::translate((g % 4) as f64 * 10.0, (g / 4) as f64 * 10.0);
            Arc::new(TransformLayer::new(transform, ContainerLayer::new(group_leaves)))
                as Arc<dyn Layer>
        })
        .collect();
    let root: Arc<dyn Layer> = Arc::new(ContainerLayer::new(children));
    Arc::new(LayerTree::new(Some(root), FRAME).unwrap())
}

fn diff(tree: &LayerTree, old: Option<&LayerTree>, last: &PaintRegionMap) -> PaintRegionMap {
    let mut ctx = DiffContext::new(FRAME, last, false, false);
    tree.diff(&mut ctx, old);
    black_box(ctx.compute_damage(IntRect::ZERO, 1, 1));
    ctx.into_paint_regions()
}

/// Rebuilds `tree` with one leaf replaced, keeping every other `Arc`.
fn rebuild_with_changed_leaf(tree: &LayerTree, rng: &mut Lcg) -> Arc<LayerTree> {
    let root = tree.root().unwrap();
    let root_container = downcast_layer::<ContainerLayer>(&**root).unwrap();
    let groups = root_container.children();
    let target = rng.gen_range_usize(groups.len());
    let children: Vec<Arc<dyn Layer>> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            if i != target {
                return group.clone();
            }
            let group = downcast_layer::<TransformLayer>(&**group).unwrap();
            let leaves = group.container().children();
            let changed = rng.gen_range_usize(leaves.len());
            let new_leaves: Vec<Arc<dyn Layer>> = leaves
                .iter()
                .enumerate()
                .map(|(j, leaf)| {
                    if j == changed {
                        Arc::new(
                            PictureLayer::new(Point::new(3.0, 3.0), picture(8, rng))
                                .replacing(&**leaf),
                        ) as Arc<dyn Layer>
                    } else {
                        leaf.clone()
                    }
                })
                .collect();
            Arc::new(TransformLayer::new(
                *group.transform(),
                ContainerLayer::new(new_leaves).replacing(group),
            )) as Arc<dyn Layer>
        })
        .collect();
    let root = ContainerLayer::new(children).replacing(&**root);
    Arc::new(LayerTree::new(Some(Arc::new(root)), FRAME).unwrap())
}

fn bench_layer_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_layer_diff");
    group.sample_size(50);

    for &(groups, leaves) in &[(4_usize, 16_usize), (16, 64), (64, 64)] {
        let tree = build_tree(groups, leaves, 0xD1FF_0000_0000_0001);
        let empty = PaintRegionMap::new();
        let regions = diff(&tree, None, &empty);

        group.bench_function(format!("first_frame(g={groups},l={leaves})"), |b| {
            b.iter(|| black_box(diff(&tree, None, &empty)));
        });

        group.bench_function(format!("unchanged(g={groups},l={leaves})"), |b| {
            b.iter(|| black_box(diff(&tree, Some(&tree), &regions)));
        });

        group.bench_function(format!("one_leaf_changed(g={groups},l={leaves})"), |b| {
            let mut rng = Lcg::new(0xD1FF_0000_0000_0002);
            b.iter_batched(
                || rebuild_with_changed_leaf(&tree, &mut rng),
                |next| black_box(diff(&next, Some(&tree), &regions)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_layer_diff);
criterion_main!(benches);
