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

use super::actor::ActorList;
use crate::asset::{ImageAsset, Material, ModelDefinition};
use crate::math::{LinearRgba, Mat4};
use crate::scene::MapVertex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCENE_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded level. Two levels never share one, even if their
/// contents are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneIdentity(u64);

impl SceneIdentity {
    /// Allocates a fresh identity.
    pub fn next() -> Self {
        Self(NEXT_SCENE_IDENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One piece of static level geometry with a single material.
#[derive(Debug, Clone, PartialEq)]
pub struct MapModel {
    /// Vertex data.
    pub vertices: Vec<MapVertex>,
    /// Indices local to `vertices`.
    pub indices: Vec<u32>,
    /// The material.
    pub material: Arc<Material>,
}

/// The level's directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Elevation in radians.
    pub pitch: f32,
    /// Heading in radians.
    pub yaw: f32,
    /// Light color.
    pub color: LinearRgba,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            color: LinearRgba::WHITE,
        }
    }
}

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    /// Fog color.
    pub color: LinearRgba,
    /// Distance where fog starts.
    pub start: f32,
    /// Distance where fog is opaque.
    pub end: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: LinearRgba::from_argb(0xff00_0000),
            start: 2000.0,
            end: 2500.0,
        }
    }
}

/// The first-person held item.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewmodel {
    /// Whether the viewmodel is drawn.
    pub enabled: bool,
    /// The equipped item's model.
    pub model: Option<Arc<ModelDefinition>>,
    /// Skin of the model.
    pub skin: usize,
    /// Placement relative to the camera.
    pub transform: Mat4,
}

impl Default for Viewmodel {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
            skin: 0,
            transform: Mat4::IDENTITY,
        }
    }
}

/// A loaded level as seen by the renderer.
#[derive(Debug, Clone)]
pub struct Level {
    /// Identity compared against the GPU-resident level.
    pub identity: SceneIdentity,
    /// Static geometry.
    pub models: Vec<MapModel>,
    /// Texture of the sky dome.
    pub sky_texture: Option<Arc<ImageAsset>>,
    /// Directional light.
    pub lighting: Lighting,
    /// Fog.
    pub fog: Fog,
    /// Physics tick counter, read for interpolation only.
    pub physics_tick: u64,
    /// The held item.
    pub viewmodel: Viewmodel,
    /// Live actors, shared with the game and the LOD worker.
    pub actors: ActorList,
}

impl Level {
    /// Creates a level with a fresh identity and default light and fog.
    pub fn new(models: Vec<MapModel>) -> Self {
        Self {
            identity: SceneIdentity::next(),
            models,
            sky_texture: None,
            lighting: Lighting::default(),
            fog: Fog::default(),
            physics_tick: 0,
            viewmodel: Viewmodel::default(),
            actors: ActorList::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_get_distinct_identities() {
        let a = Level::new(Vec::new());
        let b = Level::new(Vec::new());
        assert_ne!(a.identity, b.identity);
        assert_eq!(a.clone().identity, a.identity);
    }

    #[test]
    fn test_default_fog() {
        let fog = Fog::default();
        assert_eq!(fog.color, LinearRgba::BLACK);
        assert_eq!((fog.start, fog.end), (2000.0, 2500.0));
    }
}
