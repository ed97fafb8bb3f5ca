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

//! Level geometry on the GPU: the static map, the held viewmodel and the sky.
//!
//! [`SceneGeometryPacker`] keeps the GPU copy of the level's static geometry
//! in sync with the level being rendered. It has two states:
//!
//! ```text
//!            level identity differs
//!   Idle(L) ─────────────────────────▶ Repacking ──▶ Idle(requested)
//!      ▲                                               │
//!      └──────────────── same identity ◀───────────────┘
//! ```
//!
//! Repacking runs synchronously inside `render_scene`, before any draw of
//! that frame is recorded.

pub mod batch;
pub mod sky;
pub mod viewmodel;

pub use batch::{build_draw_commands, BatchEntry, DrawBatch, IndirectDraw};
pub use sky::SkyMesh;
pub use viewmodel::{ModelInstance, ViewmodelPacker};

use crate::error::{report_failure, RendererError};
use crate::textures::TextureResidencyTable;
use bytemuck::{Pod, Zeroable};
use ember_core::asset::ShadingMode;
use ember_core::renderer::{
    packed_attributes, GraphicsDevice, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use ember_core::scene::{Level, MapModel, MapVertex, SceneIdentity};
use std::borrow::Cow;

/// Per-instance data of one map model.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MapInstance {
    pub texture_index: u32,
}

impl MapInstance {
    /// Instance-rate layout at location 4, after [`MapVertex`].
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Instance,
            attributes: Cow::Owned(packed_attributes(&[VertexFormat::Uint32], 4)),
        }
    }
}

/// The two shading pipelines geometry is split across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingBucket {
    /// Lit and fogged.
    Shaded,
    /// Drawn with its texture and vertex color only.
    Unshaded,
}

impl ShadingBucket {
    /// Both buckets, in packing and drawing order.
    pub const ALL: [ShadingBucket; 2] = [ShadingBucket::Shaded, ShadingBucket::Unshaded];

    /// The bucket for a shading mode, or `None` for modes that cannot be
    /// drawn as level or model geometry.
    pub fn of(mode: ShadingMode) -> Option<Self> {
        match mode {
            ShadingMode::Shaded => Some(ShadingBucket::Shaded),
            ShadingMode::Unshaded => Some(ShadingBucket::Unshaded),
            ShadingMode::Sky => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShadingBucket::Shaded => "shaded",
            ShadingBucket::Unshaded => "unshaded",
        }
    }
}

/// Packs the static geometry of the current level into one draw batch per
/// shading bucket.
#[derive(Debug)]
pub struct SceneGeometryPacker {
    loaded: Option<SceneIdentity>,
    shaded: DrawBatch<MapVertex, MapInstance>,
    unshaded: DrawBatch<MapVertex, MapInstance>,
    repacks: u64,
}

impl Default for SceneGeometryPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGeometryPacker {
    pub fn new() -> Self {
        Self {
            loaded: None,
            shaded: DrawBatch::new("Map Shaded"),
            unshaded: DrawBatch::new("Map Unshaded"),
            repacks: 0,
        }
    }

    /// Makes `level` the GPU-resident level, repacking only if its identity
    /// differs from the one already loaded. Returns `Ok(true)` if it repacked.
    ///
    /// ## Errors
    /// * `RendererError::UnsupportedShading` - A map model uses sky shading.
    ///   Nothing is packed and the previous level stays loaded.
    /// * Texture and buffer failures. The packer is left with no level loaded.
    pub fn ensure_loaded(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        level: &Level,
    ) -> Result<bool, RendererError> {
        if self.loaded == Some(level.identity) {
            return Ok(false);
        }

        if let Some(model) = level
            .models
            .iter()
            .find(|m| ShadingBucket::of(m.material.shading).is_none())
        {
            return Err(report_failure(
                "SceneGeometryPacker: Failed to load map model",
                RendererError::UnsupportedShading {
                    material: model.material.name.clone(),
                    shading: format!("{:?}", model.material.shading),
                    batch: "map geometry",
                },
            ));
        }

        self.loaded = None;
        for bucket in ShadingBucket::ALL {
            self.pack_bucket(device, textures, bucket, &level.models)?;
        }
        self.loaded = Some(level.identity);
        self.repacks += 1;
        log::info!(
            "SceneGeometryPacker: Loaded level {} ({} shaded, {} unshaded draws)",
            level.identity.raw(),
            self.shaded.draw_count(),
            self.unshaded.draw_count()
        );
        Ok(true)
    }

    fn pack_bucket(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        bucket: ShadingBucket,
        models: &[MapModel],
    ) -> Result<(), RendererError> {
        let mut entries = Vec::new();
        for model in models
            .iter()
            .filter(|m| ShadingBucket::of(m.material.shading) == Some(bucket))
        {
            let texture_index = textures.resolve_optional(device, model.material.texture.as_ref())?;
            entries.push(BatchEntry {
                vertices: model.vertices.as_slice(),
                indices: model.indices.as_slice(),
                instance: MapInstance { texture_index },
            });
        }
        let batch = match bucket {
            ShadingBucket::Shaded => &mut self.shaded,
            ShadingBucket::Unshaded => &mut self.unshaded,
        };
        batch.pack(device, &entries).map_err(|e| {
            report_failure(
                "SceneGeometryPacker: Failed to pack map geometry",
                RendererError::from(e),
            )
        })?;
        Ok(())
    }

    /// The batch of one bucket.
    pub fn batch(&self, bucket: ShadingBucket) -> &DrawBatch<MapVertex, MapInstance> {
        match bucket {
            ShadingBucket::Shaded => &self.shaded,
            ShadingBucket::Unshaded => &self.unshaded,
        }
    }

    /// Identity of the GPU-resident level.
    pub fn loaded(&self) -> Option<SceneIdentity> {
        self.loaded
    }

    /// Number of repacks since creation.
    pub fn repack_count(&self) -> u64 {
        self.repacks
    }

    /// Forgets the loaded level so the next `ensure_loaded` repacks.
    pub fn unload(&mut self) {
        self.loaded = None;
        self.shaded.clear();
        self.unshaded.clear();
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.unload();
        self.shaded.destroy(device);
        self.unshaded.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LodLock;
    use ember_core::asset::Material;
    use ember_core::mock::MockGraphicsDevice;
    use std::sync::Arc;

    fn model(vertex_count: usize, index_count: usize, shading: ShadingMode) -> MapModel {
        MapModel {
            vertices: vec![MapVertex::default(); vertex_count],
            indices: (0..index_count as u32).map(|i| i % vertex_count as u32).collect(),
            material: Arc::new(Material::new(format!("{shading:?}"), None, shading)),
        }
    }

    fn setup() -> (MockGraphicsDevice, TextureResidencyTable, SceneGeometryPacker) {
        let device = MockGraphicsDevice::new();
        let textures = TextureResidencyTable::new(&device, 8, false, LodLock::new()).unwrap();
        (device, textures, SceneGeometryPacker::new())
    }

    #[test]
    fn test_three_shaded_models_pack_as_prefix_sums() {
        let (device, mut textures, mut packer) = setup();
        let level = Level::new(vec![
            model(4, 6, ShadingMode::Shaded),
            model(4, 6, ShadingMode::Shaded),
            model(4, 6, ShadingMode::Shaded),
        ]);
        assert!(packer.ensure_loaded(&device, &mut textures, &level).unwrap());

        let shaded = packer.batch(ShadingBucket::Shaded);
        assert_eq!(shaded.vertex_count(), 12);
        assert_eq!(shaded.index_count(), 18);
        let first: Vec<_> = shaded.commands().iter().map(|c| c.first_index).collect();
        let base: Vec<_> = shaded.commands().iter().map(|c| c.base_vertex).collect();
        assert_eq!(first, vec![0, 6, 12]);
        assert_eq!(base, vec![0, 4, 8]);

        let unshaded = packer.batch(ShadingBucket::Unshaded);
        assert!(unshaded.is_empty());
        assert!(unshaded.draw().is_none());
    }

    #[test]
    fn test_same_level_is_not_repacked() {
        let (device, mut textures, mut packer) = setup();
        let level = Level::new(vec![model(3, 3, ShadingMode::Unshaded)]);
        assert!(packer.ensure_loaded(&device, &mut textures, &level).unwrap());
        device.clear_log();
        assert!(!packer.ensure_loaded(&device, &mut textures, &level).unwrap());
        assert_eq!(device.write_count(), 0);
        assert_eq!(packer.repack_count(), 1);

        let other = Level::new(vec![model(3, 3, ShadingMode::Unshaded)]);
        assert!(packer.ensure_loaded(&device, &mut textures, &other).unwrap());
        assert_eq!(packer.loaded(), Some(other.identity));
    }

    #[test]
    fn test_buckets_split_by_shading() {
        let (device, mut textures, mut packer) = setup();
        let level = Level::new(vec![
            model(3, 3, ShadingMode::Shaded),
            model(5, 6, ShadingMode::Unshaded),
            model(4, 6, ShadingMode::Shaded),
        ]);
        packer.ensure_loaded(&device, &mut textures, &level).unwrap();
        assert_eq!(packer.batch(ShadingBucket::Shaded).draw_count(), 2);
        assert_eq!(packer.batch(ShadingBucket::Unshaded).draw_count(), 1);
        let shaded = packer.batch(ShadingBucket::Shaded).commands();
        assert_eq!(shaded[1].base_vertex, 3);
        assert_eq!(shaded[1].first_instance, 1);
    }

    #[test]
    fn test_sky_material_in_map_is_fatal() {
        let (device, mut textures, mut packer) = setup();
        let good = Level::new(vec![model(3, 3, ShadingMode::Shaded)]);
        packer.ensure_loaded(&device, &mut textures, &good).unwrap();

        let bad = Level::new(vec![
            model(3, 3, ShadingMode::Shaded),
            model(3, 3, ShadingMode::Sky),
        ]);
        let err = packer
            .ensure_loaded(&device, &mut textures, &bad)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(packer.loaded(), Some(good.identity));
    }

    #[test]
    fn test_material_textures_become_instance_slots() {
        let (device, mut textures, mut packer) = setup();
        let image = Arc::new(ember_core::asset::ImageAsset::solid("floor", 2, 2, [1; 4]));
        let mut floor = model(3, 3, ShadingMode::Shaded);
        floor.material = Arc::new(Material::new("floor", Some(image), ShadingMode::Shaded));
        let level = Level::new(vec![model(3, 3, ShadingMode::Shaded), floor]);
        packer.ensure_loaded(&device, &mut textures, &level).unwrap();

        let buffers = packer.batch(ShadingBucket::Shaded).draw().unwrap();
        let bytes = device.buffer_contents(buffers.instances).unwrap();
        assert_eq!(
            bytemuck::cast_slice::<u8, u32>(&bytes),
            &[crate::textures::UNTEXTURED, 0]
        );
    }
}
