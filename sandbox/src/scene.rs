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

//! Procedural content for the demo level.

use std::sync::{Arc, Mutex};

use ember_core::asset::{AssetId, ImageAsset, Material, ModelDefinition, ModelLod, ShadingMode};
use ember_core::math::LinearRgba;
use ember_core::scene::{Actor, ActorId, ActorModel, Level, MapModel, MapVertex, ModelVertex};
use ember_render::decode_image;

const CRATE_COUNT: u64 = 8;

/// Optional badge image next to the executable's working directory.
const BADGE_PATH: &str = "hud_badge.png";

/// Images drawn by the HUD.
pub struct Hud {
    pub badge: ImageAsset,
}

impl Hud {
    /// Uses `hud_badge.png` if it exists and decodes, a checkerboard otherwise.
    pub fn new() -> Self {
        let badge = match std::fs::read(BADGE_PATH) {
            Ok(bytes) => match decode_image("hud_badge", &bytes) {
                Ok(image) => {
                    log::info!("Loaded HUD badge from {}", BADGE_PATH);
                    Some(image)
                }
                Err(e) => {
                    log::warn!("Ignoring {}: {}", BADGE_PATH, e);
                    None
                }
            },
            Err(_) => None,
        };
        let badge = badge.unwrap_or_else(|| {
            checkerboard("hud_badge", 32, [255, 160, 32, 255], [40, 20, 0, 200])
        });
        Self {
            badge: badge.with_sampling(false, false, false),
        }
    }
}

fn checkerboard(name: &str, size: u32, a: [u8; 4], b: [u8; 4]) -> ImageAsset {
    let cell = (size / 8).max(1);
    let pixels: Vec<u8> = (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size / cell, i / size / cell);
            if (x + y) % 2 == 0 {
                a
            } else {
                b
            }
        })
        .collect();
    ImageAsset::new(name, size, size, pixels).unwrap_or_else(|e| {
        log::warn!("Checkerboard '{}' rejected ({}), using a solid color", name, e);
        ImageAsset::solid(name, size, size, a)
    })
}

/// A cube of half-extent `h`, four vertices per face so every face gets its
/// own normal and UVs. Faces wind outwards unless `inward`.
fn cube(h: f32, inward: bool) -> (Vec<ModelVertex>, Vec<u32>) {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = std::array::from_fn(|k| (normal[k] + u[k] * su + v[k] * sv) * h);
            let normal = if inward { normal.map(|n| -n) } else { normal };
            vertices.push(ModelVertex {
                position,
                uv: [(su + 1.0) / 2.0, (1.0 - sv) / 2.0],
                normal,
            });
        }
        let quad = if inward { [0, 2, 1, 0, 3, 2] } else { [0, 1, 2, 0, 2, 3] };
        indices.extend(quad.iter().map(|i| base + i));
    }
    (vertices, indices)
}

/// An inside-out cube carrying the sky material.
pub fn sky_model() -> ModelDefinition {
    let (vertices, indices) = cube(1.0, true);
    ModelDefinition {
        id: AssetId::from_name("sky"),
        name: "sky".into(),
        materials: vec![Arc::new(Material::new("sky", None, ShadingMode::Sky))],
        skins: vec![vec![0]],
        lods: vec![ModelLod {
            id: 0,
            distance: 0.0,
            vertices,
            slot_indices: vec![indices],
        }],
    }
}

/// A crate with a full and a reduced LOD. The far LOD keeps two wooden
/// faces and the glowing trim.
fn crate_model() -> Arc<ModelDefinition> {
    let wood = Arc::new(checkerboard("wood", 64, [150, 100, 50, 255], [110, 70, 30, 255]));
    let (vertices, indices) = cube(0.5, false);
    let (trim_at, body) = indices.split_at(6);
    let lod = |id: u32, distance: f32, body: Vec<u32>| ModelLod {
        id,
        distance,
        vertices: vertices.clone(),
        slot_indices: vec![body, trim_at.to_vec()],
    };
    Arc::new(ModelDefinition {
        id: AssetId::from_name("crate"),
        name: "crate".into(),
        materials: vec![
            Arc::new(Material::new("crate_wood", Some(wood), ShadingMode::Shaded)),
            Arc::new(
                Material::new("crate_trim", None, ShadingMode::Unshaded)
                    .with_color(LinearRgba::new(0.2, 0.9, 1.0, 1.0)),
            ),
        ],
        skins: vec![vec![0, 1]],
        lods: vec![lod(0, 0.0, body.to_vec()), lod(1, 30.0, body[..12].to_vec())],
    })
}

fn floor() -> MapModel {
    let texture = Arc::new(
        checkerboard("floor", 128, [200, 200, 200, 255], [60, 60, 60, 255])
            .with_sampling(true, true, true),
    );
    let corner = |x: f32, z: f32| MapVertex {
        position: [x * 40.0, 0.0, z * 40.0],
        uv: [x * 10.0, z * 10.0],
        color: [1.0; 4],
        normal: [0.0, 1.0, 0.0],
    };
    MapModel {
        vertices: vec![
            corner(-1.0, -1.0),
            corner(-1.0, 1.0),
            corner(1.0, 1.0),
            corner(1.0, -1.0),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        material: Arc::new(Material::new("floor", Some(texture), ShadingMode::Shaded)),
    }
}

/// The floor, the sky and a ring of crates.
pub fn demo_level() -> Level {
    let mut level = Level::new(vec![floor()]);
    level.sky_texture = Some(Arc::new(
        checkerboard("sky", 16, [90, 140, 220, 255], [110, 160, 235, 255])
            .with_sampling(true, true, false),
    ));
    let model = crate_model();
    let actors = (0..CRATE_COUNT)
        .map(|i| {
            Actor::new(
                ActorId(i),
                Some(ActorModel {
                    definition: Arc::clone(&model),
                    skin: 0,
                }),
            )
        })
        .collect();
    level.actors = Arc::new(Mutex::new(actors));
    level
}
