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

//! The sky dome mesh, loaded once when the renderer starts.

use super::batch::replace_contents;
use crate::error::{report_failure, RendererError};
use ember_core::asset::{AssetError, ModelDefinition, ShadingMode};
use ember_core::renderer::{BufferId, BufferUsage, GraphicsDevice, GrowableGpuBuffer};
use ember_core::scene::ModelVertex;

#[derive(Debug)]
pub struct SkyMesh {
    vertices: GrowableGpuBuffer<ModelVertex>,
    indices: GrowableGpuBuffer<u32>,
}

impl Default for SkyMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl SkyMesh {
    pub fn new() -> Self {
        Self {
            vertices: GrowableGpuBuffer::new("Sky Vertices", BufferUsage::VERTEX, false),
            indices: GrowableGpuBuffer::new("Sky Indices", BufferUsage::INDEX, false),
        }
    }

    /// Uploads LOD 0, material slot 0 of `model`. Extra skins, materials and
    /// LODs are discarded with a warning, as is a material that is not sky
    /// shaded.
    pub fn load(
        &mut self,
        device: &dyn GraphicsDevice,
        model: &ModelDefinition,
    ) -> Result<(), RendererError> {
        if model.skins.len() > 1 {
            log::warn!(
                "SkyMesh: Discarding {} extra skins from sky model '{}'",
                model.skins.len() - 1,
                model.name
            );
        }
        if model.materials.len() > 1 {
            log::warn!(
                "SkyMesh: Discarding {} extra materials from sky model '{}'",
                model.materials.len() - 1,
                model.name
            );
        }
        if model
            .materials
            .first()
            .is_some_and(|m| m.shading != ShadingMode::Sky)
        {
            log::warn!("SkyMesh: Ignoring incorrect material shading on sky model '{}'", model.name);
        }
        if model.lods.len() > 1 {
            log::warn!(
                "SkyMesh: Discarding {} extra LODs from sky model '{}'",
                model.lods.len() - 1,
                model.name
            );
        }

        let lod = model.lods.first().ok_or_else(|| {
            report_failure(
                "SkyMesh: Failed to load sky model",
                RendererError::Asset(AssetError::Malformed {
                    name: model.name.clone(),
                    reason: "model has no LODs".into(),
                }),
            )
        })?;
        let indices = lod.slot_indices.first().map(Vec::as_slice).unwrap_or_default();

        replace_contents(device, &mut self.vertices, &lod.vertices)
            .and_then(|_| replace_contents(device, &mut self.indices, indices))
            .map_err(|e| report_failure("SkyMesh: Failed to upload sky model", e.into()))?;
        log::info!(
            "SkyMesh: Loaded '{}' ({} vertices, {} indices)",
            model.name,
            lod.vertices.len(),
            indices.len()
        );
        Ok(())
    }

    /// Number of indices to draw. Zero means the sky is skipped.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex and index buffers, or `None` if there is nothing to draw.
    pub fn buffers(&self) -> Option<(BufferId, BufferId)> {
        if self.indices.is_empty() {
            return None;
        }
        Some((self.vertices.buffer()?, self.indices.buffer()?))
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.vertices.destroy(device);
        self.indices.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::asset::{AssetId, Material, ModelLod};
    use ember_core::mock::MockGraphicsDevice;
    use std::sync::Arc;

    fn dome(lods: usize, indices: Vec<u32>) -> ModelDefinition {
        ModelDefinition {
            id: AssetId::from_name("sky"),
            name: "sky".into(),
            materials: vec![
                Arc::new(Material::new("sky", None, ShadingMode::Sky)),
                Arc::new(Material::new("extra", None, ShadingMode::Shaded)),
            ],
            skins: vec![vec![0]],
            lods: (0..lods as u32)
                .map(|id| ModelLod {
                    id,
                    distance: 0.0,
                    vertices: vec![ModelVertex::default(); 3],
                    slot_indices: vec![indices.clone()],
                })
                .collect(),
        }
    }

    #[test]
    fn test_loads_first_lod_and_slot() {
        let device = MockGraphicsDevice::new();
        let mut sky = SkyMesh::new();
        sky.load(&device, &dome(2, vec![0, 1, 2])).unwrap();
        assert_eq!(sky.index_count(), 3);
        assert!(sky.buffers().is_some());
        assert_eq!(device.write_count(), 2);
    }

    #[test]
    fn test_empty_sky_is_skipped() {
        let device = MockGraphicsDevice::new();
        let mut sky = SkyMesh::new();
        sky.load(&device, &dome(1, Vec::new())).unwrap();
        assert_eq!(sky.index_count(), 0);
        assert!(sky.buffers().is_none());
    }

    #[test]
    fn test_model_without_lods_is_an_error() {
        let device = MockGraphicsDevice::new();
        let mut sky = SkyMesh::new();
        assert!(sky.load(&device, &dome(0, Vec::new())).is_err());
    }
}
