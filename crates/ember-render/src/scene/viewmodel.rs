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

//! The first-person viewmodel.
//!
//! The held model is packed once per `(model, skin)` pair: LOD 0's vertices
//! and the indices of every material slot go into shared buffers, and each
//! slot gets one instance record and one indirect draw in the bucket of its
//! material.

use super::batch::{replace_contents, IndirectDraw};
use super::ShadingBucket;
use crate::error::{report_failure, RendererError};
use crate::textures::TextureResidencyTable;
use bytemuck::{Pod, Zeroable};
use ember_core::asset::{AssetError, AssetId, ModelDefinition};
use ember_core::renderer::{
    packed_attributes, BufferUsage, DrawIndexedIndirect, GraphicsDevice,
    GrowableGpuBuffer, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use ember_core::scene::{ModelVertex, Viewmodel};
use std::borrow::Cow;

/// Per-material-slot data of a model drawn without a transform of its own.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ModelInstance {
    pub color: [f32; 4],
    pub texture_index: u32,
}

impl ModelInstance {
    /// Instance-rate layout at locations 3 and 4, after [`ModelVertex`].
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Instance,
            attributes: Cow::Owned(packed_attributes(
                &[VertexFormat::Float32x4, VertexFormat::Uint32],
                3,
            )),
        }
    }
}

#[derive(Debug)]
pub struct ViewmodelPacker {
    loaded: Option<(AssetId, usize)>,
    vertices: GrowableGpuBuffer<ModelVertex>,
    indices: GrowableGpuBuffer<u32>,
    instances: GrowableGpuBuffer<ModelInstance>,
    shaded: GrowableGpuBuffer<DrawIndexedIndirect>,
    unshaded: GrowableGpuBuffer<DrawIndexedIndirect>,
}

impl Default for ViewmodelPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewmodelPacker {
    pub fn new() -> Self {
        Self {
            loaded: None,
            vertices: GrowableGpuBuffer::new("Viewmodel Vertices", BufferUsage::VERTEX, false),
            indices: GrowableGpuBuffer::new("Viewmodel Indices", BufferUsage::INDEX, false),
            instances: GrowableGpuBuffer::new("Viewmodel Instance Data", BufferUsage::VERTEX, false),
            shaded: GrowableGpuBuffer::new(
                "Viewmodel Shaded Draw Commands",
                BufferUsage::INDIRECT,
                true,
            ),
            unshaded: GrowableGpuBuffer::new(
                "Viewmodel Unshaded Draw Commands",
                BufferUsage::INDIRECT,
                true,
            ),
        }
    }

    /// Packs the held model if the model or its skin changed since the last
    /// call. Returns `Ok(true)` if it packed. A viewmodel without a model
    /// unloads whatever was packed.
    pub fn ensure_loaded(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        viewmodel: &Viewmodel,
    ) -> Result<bool, RendererError> {
        let Some(model) = viewmodel.model.as_ref() else {
            if self.loaded.take().is_some() {
                self.clear();
            }
            return Ok(false);
        };
        let key = (model.id, viewmodel.skin);
        if self.loaded == Some(key) {
            return Ok(false);
        }

        self.loaded = None;
        self.clear();
        self.pack(device, textures, model, viewmodel.skin)
            .map_err(|e| report_failure("ViewmodelPacker: Failed to load viewmodel", e))?;
        self.loaded = Some(key);
        log::info!(
            "ViewmodelPacker: Loaded '{}' skin {} ({} shaded, {} unshaded draws)",
            model.name,
            viewmodel.skin,
            self.shaded.len(),
            self.unshaded.len()
        );
        Ok(true)
    }

    fn pack(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        model: &ModelDefinition,
        skin: usize,
    ) -> Result<(), RendererError> {
        model.validate()?;
        let lod = model.lods.first().ok_or_else(|| AssetError::Malformed {
            name: model.name.clone(),
            reason: "model has no LODs".into(),
        })?;

        let mut instances = Vec::with_capacity(lod.slot_indices.len());
        let mut shaded = Vec::new();
        let mut unshaded = Vec::new();
        let mut first_index = 0u32;
        for (slot, slot_indices) in lod.slot_indices.iter().enumerate() {
            let material = model
                .material(skin, slot)
                .ok_or_else(|| AssetError::Malformed {
                    name: model.name.clone(),
                    reason: format!("skin {skin} has no material for slot {slot}"),
                })?;
            let bucket = ShadingBucket::of(material.shading).ok_or_else(|| {
                RendererError::UnsupportedShading {
                    material: material.name.clone(),
                    shading: format!("{:?}", material.shading),
                    batch: "the viewmodel",
                }
            })?;
            let texture_index = textures.resolve_optional(device, material.texture.as_ref())?;
            instances.push(ModelInstance {
                color: material.color.to_array(),
                texture_index,
            });
            let command = DrawIndexedIndirect {
                index_count: slot_indices.len() as u32,
                instance_count: 1,
                first_index,
                base_vertex: 0,
                first_instance: slot as u32,
            };
            match bucket {
                ShadingBucket::Shaded => shaded.push(command),
                ShadingBucket::Unshaded => unshaded.push(command),
            }
            first_index += slot_indices.len() as u32;
        }

        replace_contents(device, &mut self.vertices, &lod.vertices)?;
        replace_contents(device, &mut self.indices, &lod.flattened_indices())?;
        replace_contents(device, &mut self.instances, &instances)?;
        replace_contents(device, &mut self.shaded, &shaded)?;
        replace_contents(device, &mut self.unshaded, &unshaded)?;
        Ok(())
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.instances.clear();
        self.shaded.clear();
        self.unshaded.clear();
    }

    /// What to bind for one bucket, or `None` if it has no draws.
    pub fn draw(&self, bucket: ShadingBucket) -> Option<IndirectDraw> {
        let commands = match bucket {
            ShadingBucket::Shaded => &self.shaded,
            ShadingBucket::Unshaded => &self.unshaded,
        };
        if commands.is_empty() {
            return None;
        }
        Some(IndirectDraw {
            vertices: self.vertices.buffer()?,
            indices: self.indices.buffer()?,
            instances: self.instances.buffer()?,
            commands: commands.buffer()?,
            draw_count: commands.len() as u32,
        })
    }

    /// The indirect commands of one bucket.
    pub fn commands(&self, bucket: ShadingBucket) -> &[DrawIndexedIndirect] {
        match bucket {
            ShadingBucket::Shaded => self.shaded.as_slice().unwrap_or_default(),
            ShadingBucket::Unshaded => self.unshaded.as_slice().unwrap_or_default(),
        }
    }

    /// The `(model, skin)` currently packed.
    pub fn loaded(&self) -> Option<(AssetId, usize)> {
        self.loaded
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.loaded = None;
        self.vertices.destroy(device);
        self.indices.destroy(device);
        self.instances.destroy(device);
        self.shaded.destroy(device);
        self.unshaded.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LodLock;
    use ember_core::asset::{Material, ModelLod, ShadingMode};
    use ember_core::math::LinearRgba;
    use ember_core::mock::MockGraphicsDevice;
    use std::sync::Arc;

    fn gun() -> Arc<ModelDefinition> {
        let red = Material::new("red", None, ShadingMode::Shaded).with_color(LinearRgba::RED);
        let glow = Material::new("glow", None, ShadingMode::Unshaded);
        let sky = Material::new("sky", None, ShadingMode::Sky);
        Arc::new(ModelDefinition {
            id: AssetId::from_name("gun"),
            name: "gun".into(),
            materials: vec![Arc::new(red), Arc::new(glow), Arc::new(sky)],
            skins: vec![vec![0, 1], vec![1, 1], vec![0, 2]],
            lods: vec![ModelLod {
                id: 0,
                distance: 0.0,
                vertices: vec![ModelVertex::default(); 4],
                slot_indices: vec![vec![0, 1, 2], vec![0, 2, 3, 3, 2, 1]],
            }],
        })
    }

    fn setup() -> (MockGraphicsDevice, TextureResidencyTable) {
        let device = MockGraphicsDevice::new();
        let textures = TextureResidencyTable::new(&device, 4, false, LodLock::new()).unwrap();
        (device, textures)
    }

    fn held(skin: usize) -> Viewmodel {
        Viewmodel {
            enabled: true,
            model: Some(gun()),
            skin,
            ..Viewmodel::default()
        }
    }

    #[test]
    fn test_slots_split_by_material_shading() {
        let (device, mut textures) = setup();
        let mut packer = ViewmodelPacker::new();
        assert!(packer.ensure_loaded(&device, &mut textures, &held(0)).unwrap());

        let shaded = packer.commands(ShadingBucket::Shaded);
        let unshaded = packer.commands(ShadingBucket::Unshaded);
        assert_eq!(shaded.len(), 1);
        assert_eq!(unshaded.len(), 1);
        assert_eq!(unshaded[0].first_index, 3);
        assert_eq!(unshaded[0].index_count, 6);
        assert_eq!(unshaded[0].first_instance, 1);
    }

    #[test]
    fn test_reload_only_on_model_or_skin_change() {
        let (device, mut textures) = setup();
        let mut packer = ViewmodelPacker::new();
        packer.ensure_loaded(&device, &mut textures, &held(0)).unwrap();
        device.clear_log();
        assert!(!packer.ensure_loaded(&device, &mut textures, &held(0)).unwrap());
        assert_eq!(device.write_count(), 0);

        assert!(packer.ensure_loaded(&device, &mut textures, &held(1)).unwrap());
        assert!(packer.draw(ShadingBucket::Shaded).is_none());
        assert_eq!(packer.draw(ShadingBucket::Unshaded).unwrap().draw_count, 2);
    }

    #[test]
    fn test_instance_data_carries_material_color() {
        let (device, mut textures) = setup();
        let mut packer = ViewmodelPacker::new();
        packer.ensure_loaded(&device, &mut textures, &held(0)).unwrap();
        let draw = packer.draw(ShadingBucket::Shaded).unwrap();
        let bytes = device.buffer_contents(draw.instances).unwrap();
        let instances: &[ModelInstance] = bytemuck::cast_slice(&bytes);
        assert_eq!(instances[0].color, LinearRgba::RED.to_array());
    }

    #[test]
    fn test_sky_material_is_rejected() {
        let (device, mut textures) = setup();
        let mut packer = ViewmodelPacker::new();
        let err = packer
            .ensure_loaded(&device, &mut textures, &held(2))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(packer.loaded(), None);
    }

    #[test]
    fn test_removing_the_model_unloads() {
        let (device, mut textures) = setup();
        let mut packer = ViewmodelPacker::new();
        packer.ensure_loaded(&device, &mut textures, &held(0)).unwrap();
        let empty = Viewmodel::default();
        assert!(!packer.ensure_loaded(&device, &mut textures, &empty).unwrap());
        assert!(packer.draw(ShadingBucket::Shaded).is_none());
        assert_eq!(packer.loaded(), None);
    }
}
