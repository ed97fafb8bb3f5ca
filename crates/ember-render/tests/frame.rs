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

//! Whole frames driven against the mock backend.

use ember_core::asset::{
    AssetId, ImageAsset, Material, MemoryAssetSource, ModelDefinition, ModelLod, ShadingMode,
};
use ember_core::math::{LinearRgba, Mat4, Vec3};
use ember_core::mock::{MockGraphicsDevice, MockSurface, RecordedCommand};
use ember_core::scene::{
    Actor, ActorId, ActorModel, Camera, Level, MapModel, MapVertex, ModelVertex, Viewmodel,
};
use ember_render::{
    shaders, FrameStatus, RendererConfig, RendererContext, RendererError, ShadingBucket,
};
use std::sync::{Arc, Mutex};

struct Harness {
    renderer: RendererContext,
    device: MockGraphicsDevice,
    surface: MockSurface,
}

fn sky_model() -> ModelDefinition {
    ModelDefinition {
        id: AssetId::from_name("sky"),
        name: "sky".into(),
        materials: vec![Arc::new(Material::new("sky", None, ShadingMode::Sky))],
        skins: vec![vec![0]],
        lods: vec![ModelLod {
            id: 0,
            distance: 0.0,
            vertices: vec![ModelVertex::default(); 4],
            slot_indices: vec![vec![0, 1, 2, 0, 2, 3]],
        }],
    }
}

fn harness() -> Harness {
    harness_with(RendererConfig::default())
}

fn harness_with(config: RendererConfig) -> Harness {
    let device = MockGraphicsDevice::new();
    let surface = MockSurface::new(640, 480);
    let mut assets = MemoryAssetSource::new();
    shaders::register_builtin(&mut assets);
    assets.insert_model(sky_model());
    let renderer = RendererContext::new(
        Arc::new(device.clone()),
        Box::new(surface.clone()),
        &assets,
        config,
    )
    .unwrap();
    Harness {
        renderer,
        device,
        surface,
    }
}

fn map_model(shading: ShadingMode, texture: Option<Arc<ImageAsset>>) -> MapModel {
    MapModel {
        vertices: vec![MapVertex::default(); 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        material: Arc::new(Material::new(format!("{shading:?}"), texture, shading)),
    }
}

fn crate_model() -> Arc<ModelDefinition> {
    let lod = |id: u32, distance: f32| ModelLod {
        id,
        distance,
        vertices: vec![ModelVertex::default(); 4],
        slot_indices: vec![vec![0, 1, 2], vec![0, 2, 3]],
    };
    Arc::new(ModelDefinition {
        id: AssetId::from_name("crate"),
        name: "crate".into(),
        materials: vec![
            Arc::new(Material::new("wood", None, ShadingMode::Shaded)),
            Arc::new(Material::new("glow", None, ShadingMode::Unshaded)),
        ],
        skins: vec![vec![0, 1]],
        lods: vec![lod(0, 0.0), lod(1, 25.0)],
    })
}

fn actor(id: u64, x: f32) -> Actor {
    let mut actor = Actor::new(
        ActorId(id),
        Some(ActorModel {
            definition: crate_model(),
            skin: 0,
        }),
    );
    actor.transform = Mat4::from_translation(Vec3::new(x, 0.0, 0.0));
    actor
}

fn pipeline_order(device: &MockGraphicsDevice, commands: &[RecordedCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::SetPipeline(id) => device.pipeline_label(*id),
            _ => None,
        })
        .collect()
}

#[test]
fn test_three_shaded_models_pack_into_one_bucket() {
    let mut h = harness();
    let level = Level::new(vec![
        map_model(ShadingMode::Shaded, None),
        map_model(ShadingMode::Shaded, None),
        map_model(ShadingMode::Shaded, None),
    ]);

    assert_eq!(h.renderer.begin_frame().unwrap(), FrameStatus::Ready);
    h.renderer.render_scene(&level, &Camera::default()).unwrap();
    assert_eq!(h.renderer.end_frame().unwrap(), FrameStatus::Presented);

    let shaded = h.renderer.map().batch(ShadingBucket::Shaded);
    assert_eq!(shaded.vertex_count(), 12);
    assert_eq!(shaded.index_count(), 18);
    let first_indices: Vec<u32> = shaded.commands().iter().map(|c| c.first_index).collect();
    let base_vertices: Vec<i32> = shaded.commands().iter().map(|c| c.base_vertex).collect();
    assert_eq!(first_indices, vec![0, 6, 12]);
    assert_eq!(base_vertices, vec![0, 4, 8]);

    let unshaded = h.renderer.map().batch(ShadingBucket::Unshaded);
    assert_eq!(unshaded.vertex_count(), 0);
    assert!(unshaded.draw().is_none());

    let submitted = h.device.last_submission().unwrap();
    let multi_draws: Vec<u32> = submitted
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::MultiDrawIndexedIndirect(_, _, count) => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(multi_draws, vec![3]);
}

#[test]
fn test_same_level_is_packed_once() {
    let mut h = harness();
    let level = Level::new(vec![map_model(ShadingMode::Unshaded, None)]);
    for _ in 0..3 {
        h.renderer.begin_frame().unwrap();
        h.renderer.render_scene(&level, &Camera::default()).unwrap();
        h.renderer.end_frame().unwrap();
    }
    assert_eq!(h.renderer.map().repack_count(), 1);

    let next = Level::new(vec![map_model(ShadingMode::Shaded, None)]);
    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&next, &Camera::default()).unwrap();
    h.renderer.end_frame().unwrap();
    assert_eq!(h.renderer.map().repack_count(), 2);
    assert_eq!(h.renderer.map().loaded(), Some(next.identity));
}

#[test]
fn test_ui_reset_uploads_only_the_current_frame() {
    let mut h = harness();
    h.renderer.begin_frame().unwrap();
    h.renderer
        .draw_colored_quad(0.0, 0.0, 10.0, 10.0, LinearRgba::RED)
        .unwrap();
    h.renderer.end_frame().unwrap();

    h.renderer.begin_frame().unwrap();
    h.renderer
        .draw_colored_quad(5.0, 5.0, 10.0, 10.0, LinearRgba::GREEN)
        .unwrap();
    h.device.clear_log();
    h.renderer.end_frame().unwrap();

    let stats = h.renderer.frame_stats();
    assert_eq!(stats.upload_bytes, 4 * 36 + 6 * 4);
    assert_eq!(stats.indexed_draws, 1);
    let (vertices, indices) = h.renderer.ui().buffers().unwrap();
    assert_eq!(h.device.writes_to(vertices).len(), 1);
    assert_eq!(h.device.writes_to(indices).len(), 1);
    assert_eq!(h.renderer.ui().vertex_count(), 4);
}

#[test]
fn test_ui_growth_frame_uploads_each_buffer_once() {
    let mut h = harness_with(RendererConfig {
        initial_ui_quads: 1,
        ..RendererConfig::default()
    });
    assert_eq!(h.renderer.begin_frame().unwrap(), FrameStatus::Ready);
    for i in 0..3 {
        h.renderer
            .draw_colored_quad(i as f32 * 20.0, 0.0, 10.0, 10.0, LinearRgba::RED)
            .unwrap();
    }
    h.device.clear_log();
    assert_eq!(h.renderer.end_frame().unwrap(), FrameStatus::Presented);

    let (vertices, indices) = h.renderer.ui().buffers().unwrap();
    assert_eq!(h.device.writes_to(vertices).len(), 1);
    assert_eq!(h.device.writes_to(indices).len(), 1);
    assert_eq!(h.renderer.frame_stats().upload_bytes, 3 * (4 * 36 + 6 * 4));
    assert_eq!(h.surface.present_count(), 1);
}

#[test]
fn test_draw_order_is_sky_map_viewmodel_actors_ui() {
    let mut h = harness();
    let mut level = Level::new(vec![
        map_model(ShadingMode::Shaded, None),
        map_model(ShadingMode::Unshaded, None),
    ]);
    level.viewmodel = Viewmodel {
        enabled: true,
        model: Some(crate_model()),
        skin: 0,
        transform: Mat4::IDENTITY,
    };
    level.actors = Arc::new(Mutex::new(vec![actor(1, 0.0)]));

    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&level, &Camera::default()).unwrap();
    h.renderer
        .draw_colored_quad(0.0, 0.0, 4.0, 4.0, LinearRgba::WHITE)
        .unwrap();
    h.renderer.end_frame().unwrap();

    let order = pipeline_order(&h.device, &h.device.last_submission().unwrap());
    assert_eq!(
        order,
        vec![
            "Sky Pipeline",
            "Map Shaded Pipeline",
            "Map Unshaded Pipeline",
            "Viewmodel Shaded Pipeline",
            "Viewmodel Unshaded Pipeline",
            "Actor Shaded Pipeline",
            "Actor Unshaded Pipeline",
            "UI Pipeline",
        ]
    );
    assert_eq!(h.renderer.frame_stats().visible_actors, 1);
    assert!(!h.renderer.lod_lock().is_held());
}

#[test]
fn test_actors_sharing_a_model_upload_it_once() {
    let mut h = harness();
    let mut level = Level::new(Vec::new());
    level.actors = Arc::new(Mutex::new(vec![actor(1, 0.0), actor(2, 4.0)]));

    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&level, &Camera::default()).unwrap();
    h.renderer.end_frame().unwrap();
    assert_eq!(h.renderer.actors().resident_lod_count(), 2);
    assert_eq!(h.renderer.actors().resident_actor_count(), 2);
    let uploads = h.renderer.actors().lod_upload_count();

    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&level, &Camera::default()).unwrap();
    h.renderer.end_frame().unwrap();
    assert_eq!(h.renderer.actors().lod_upload_count(), uploads);

    // Two slots per actor, split across both buckets.
    assert_eq!(h.renderer.actors().commands(ShadingBucket::Shaded).len(), 2);
    assert_eq!(h.renderer.actors().commands(ShadingBucket::Unshaded).len(), 2);
}

#[test]
fn test_level_change_clears_actor_cache() {
    let mut h = harness();
    let mut first = Level::new(Vec::new());
    first.actors = Arc::new(Mutex::new(vec![actor(1, 0.0)]));
    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&first, &Camera::default()).unwrap();
    h.renderer.end_frame().unwrap();
    assert_eq!(h.renderer.actors().resident_actor_count(), 1);

    let second = Level::new(Vec::new());
    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&second, &Camera::default()).unwrap();
    h.renderer.end_frame().unwrap();
    assert_eq!(h.renderer.actors().resident_actor_count(), 0);
    assert_eq!(h.renderer.actors().resident_lod_count(), 0);
}

#[test]
fn test_texture_failure_is_fatal_and_releases_lod_lock() {
    let mut h = harness();
    let wall = Arc::new(ImageAsset::solid("wall", 8, 8, [200, 200, 200, 255]));
    let level = Level::new(vec![map_model(ShadingMode::Shaded, Some(wall))]);
    h.device.fail_texture_creations(true);

    h.renderer.begin_frame().unwrap();
    let err = h
        .renderer
        .render_scene(&level, &Camera::default())
        .unwrap_err();
    assert!(matches!(err, RendererError::TextureUpload { .. }));
    assert!(err.is_fatal());
    assert!(!h.renderer.lod_lock().is_held());

    h.renderer.shutdown();
    assert!(!h.renderer.lod_worker().is_running());
    assert!(!h.surface.has_frame());
}

#[test]
fn test_scene_can_only_be_rendered_once_per_frame() {
    let mut h = harness();
    let level = Level::new(Vec::new());
    h.renderer.begin_frame().unwrap();
    h.renderer.render_scene(&level, &Camera::default()).unwrap();
    assert!(matches!(
        h.renderer.render_scene(&level, &Camera::default()),
        Err(RendererError::InvalidFrameState { .. })
    ));
    h.renderer.end_frame().unwrap();
}

#[test]
fn test_resize_recreates_depth_and_minimize_skips_frames() {
    let mut h = harness();
    h.renderer.resize(1024, 768).unwrap();
    assert_eq!(h.surface.resizes(), vec![(1024, 768)]);
    assert_eq!(h.renderer.extent().width, 1024);

    h.renderer.resize(0, 0).unwrap();
    assert_eq!(h.renderer.begin_frame().unwrap(), FrameStatus::NotReady);
    h.renderer.resize(800, 600).unwrap();
    assert_eq!(h.renderer.begin_frame().unwrap(), FrameStatus::Ready);
    h.renderer.end_frame().unwrap();
    assert_eq!(h.surface.present_count(), 1);
}
