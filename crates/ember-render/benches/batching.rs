// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Benchmarks for the CPU side of batching: UI quad accumulation and map
//! bucket packing, both against the mock device.
//!
//! Run with: cargo bench --package ember-render --bench batching

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use ember_core::math::{Extent2D, LinearRgba};
use ember_core::mock::MockGraphicsDevice;
use ember_core::scene::MapVertex;
use ember_render::scene::{build_draw_commands, BatchEntry, DrawBatch, MapInstance};
use ember_render::ui::geometry::{rect_corners, PixelRect, UvRect};
use ember_render::ui::{solid_quad, UiBatcher};
use std::hint::black_box;

const VIEWPORT: Extent2D = Extent2D::new(1920, 1080);

fn benchmark_ui_quads(c: &mut Criterion) {
    let device = MockGraphicsDevice::new();
    let mut batcher = UiBatcher::new(&device, 256, 64).expect("ui batcher");

    let mut group = c.benchmark_group("ui_batching");
    group.throughput(Throughput::Elements(4096));
    group.bench_function("4096_colored_quads", |b| {
        b.iter(|| {
            batcher.reset();
            for i in 0..4096u32 {
                let x = (i % 64) as f32 * 30.0;
                let y = (i / 64) as f32 * 16.0;
                let corners = rect_corners(VIEWPORT, PixelRect::new(x, y, 28.0, 14.0), UvRect::NONE);
                batcher
                    .append_quad(solid_quad(corners, LinearRgba::WHITE))
                    .expect("append");
            }
            batcher.apply_pending_resize(&device).expect("resize");
            black_box(batcher.flush(&device).expect("flush"))
        });
    });
    group.finish();
}

fn benchmark_bucket_packing(c: &mut Criterion) {
    let device = MockGraphicsDevice::new();
    let models: Vec<(Vec<MapVertex>, Vec<u32>)> = (0..512)
        .map(|_| {
            (
                vec![MapVertex::default(); 24],
                (0..36).map(|i| i % 24).collect(),
            )
        })
        .collect();

    let mut group = c.benchmark_group("bucket_packing");
    group.throughput(Throughput::Elements(models.len() as u64));

    group.bench_function("draw_commands_512_models", |b| {
        b.iter(|| {
            black_box(build_draw_commands(
                models
                    .iter()
                    .map(|(v, i)| (v.len() as u32, i.len() as u32)),
            ))
        });
    });

    let mut batch: DrawBatch<MapVertex, MapInstance> = DrawBatch::new("Bench");
    group.bench_function("pack_512_models", |b| {
        b.iter(|| {
            let entries: Vec<_> = models
                .iter()
                .enumerate()
                .map(|(n, (vertices, indices))| BatchEntry {
                    vertices: vertices.as_slice(),
                    indices: indices.as_slice(),
                    instance: MapInstance {
                        texture_index: n as u32 % 8,
                    },
                })
                .collect();
            black_box(batch.pack(&device, &entries).expect("pack"))
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_ui_quads, benchmark_bucket_packing);
criterion_main!(benches);
