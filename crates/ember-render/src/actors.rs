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

//! GPU residency for actor models.
//!
//! Every LOD of every model an actor has used is uploaded once into two
//! append-only buffers (vertices, indices) and stays there until the level
//! changes. Each actor owns a contiguous range of instance records, one per
//! material slot, holding its transform, color and texture slot. The indirect
//! draw lists are rebuilt every frame from the actors' current LODs.
//!
//! ```text
//!  vertices: [ crate lod0 | crate lod1 | barrel lod0 | ... ]   append-only
//!  indices:  [ crate lod0 | crate lod1 | barrel lod0 | ... ]   append-only
//!  instances:[ actor 4 (2 slots) | actor 9 (1 slot) | free | ... ]
//! ```

use crate::error::{report_failure, RendererError};
use crate::scene::{IndirectDraw, ShadingBucket};
use crate::textures::TextureResidencyTable;
use bytemuck::{Pod, Zeroable};
use ember_core::asset::{AssetError, AssetId, ModelDefinition};
use ember_core::collections::{Keyed, SortedVec};
use ember_core::renderer::{
    packed_attributes, BufferUsage, DrawIndexedIndirect, GraphicsDevice, GrowableGpuBuffer,
    GrowthPolicy, ResourceError, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use ember_core::scene::{Actor, ActorId, ModelVertex};
use std::borrow::Cow;

/// Per-(actor, material slot) instance record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ActorInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub texture_index: u32,
}

impl ActorInstance {
    /// Instance-rate layout: the model matrix at locations 3 to 6, the color
    /// at 7 and the texture slot at 8.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Instance,
            attributes: Cow::Owned(packed_attributes(
                &[
                    VertexFormat::Float32x4,
                    VertexFormat::Float32x4,
                    VertexFormat::Float32x4,
                    VertexFormat::Float32x4,
                    VertexFormat::Float32x4,
                    VertexFormat::Uint32,
                ],
                3,
            )),
        }
    }
}

/// Where one LOD of a model lives in the shared buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidentLod {
    pub model: AssetId,
    pub lod: u32,
    pub base_vertex: u32,
    pub first_index: u32,
    /// Index count of each material slot, in slot order.
    pub slot_index_counts: Vec<u32>,
}

impl Keyed for ResidentLod {
    type Key = (AssetId, u32);

    fn key(&self) -> Self::Key {
        (self.model, self.lod)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActorSlot {
    bucket: ShadingBucket,
    color: [f32; 4],
    texture_index: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct ResidentActor {
    id: ActorId,
    model: AssetId,
    skin: usize,
    instance_offset: u32,
    slots: Vec<ActorSlot>,
}

impl Keyed for ResidentActor {
    type Key = ActorId;

    fn key(&self) -> Self::Key {
        self.id
    }
}

/// Counts from the last [`ActorModelCache::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActorFrame {
    pub visible_actors: u32,
    pub loaded_actors: u32,
    pub forgotten_actors: u32,
    pub draws: u32,
}

#[derive(Debug)]
pub struct ActorModelCache {
    lods: SortedVec<ResidentLod>,
    actors: SortedVec<ResidentActor>,
    vertices: GrowableGpuBuffer<ModelVertex>,
    indices: GrowableGpuBuffer<u32>,
    instances: GrowableGpuBuffer<ActorInstance>,
    instance_cursor: u32,
    /// Released instance ranges as `(offset, length)`.
    free_ranges: Vec<(u32, u32)>,
    shaded: GrowableGpuBuffer<DrawIndexedIndirect>,
    unshaded: GrowableGpuBuffer<DrawIndexedIndirect>,
    lod_uploads: u64,
}

impl Default for ActorModelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorModelCache {
    /// Extra commands and instance records allocated whenever those buffers grow.
    const SLACK: usize = 16;

    pub fn new() -> Self {
        Self {
            lods: SortedVec::new(),
            actors: SortedVec::new(),
            vertices: GrowableGpuBuffer::new("Actor Vertices", BufferUsage::VERTEX, false),
            indices: GrowableGpuBuffer::new("Actor Indices", BufferUsage::INDEX, false),
            instances: GrowableGpuBuffer::new("Actor Instance Data", BufferUsage::VERTEX, true),
            instance_cursor: 0,
            free_ranges: Vec::new(),
            shaded: GrowableGpuBuffer::new(
                "Actor Shaded Draw Commands",
                BufferUsage::INDIRECT,
                true,
            ),
            unshaded: GrowableGpuBuffer::new(
                "Actor Unshaded Draw Commands",
                BufferUsage::INDIRECT,
                true,
            ),
            lod_uploads: 0,
        }
    }

    /// Makes the actor's model resident and gives it instance records.
    ///
    /// Returns `Ok(true)` if anything was loaded. An actor already resident
    /// with the same model and skin costs nothing; one whose model or skin
    /// changed is reloaded. Actors without a model are skipped.
    ///
    /// ## Errors
    /// * `RendererError::UnsupportedShading` - A slot uses sky shading.
    /// * Asset validation, texture and buffer failures.
    pub fn ensure_loaded(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        actor: &Actor,
    ) -> Result<bool, RendererError> {
        let Some(actor_model) = actor.model.as_ref() else {
            return Ok(false);
        };
        let definition = actor_model.definition.as_ref();
        if let Some(resident) = self.actors.get(actor.id) {
            if resident.model == definition.id && resident.skin == actor_model.skin {
                return Ok(false);
            }
            self.forget(actor.id);
        }

        let slots = Self::resolve_slots(device, textures, definition, actor_model.skin)
            .map_err(|e| report_failure("ActorModelCache: Failed to load actor model", e))?;
        self.load_lods(device, definition)
            .map_err(|e| report_failure("ActorModelCache: Failed to upload actor model", e))?;

        let instance_offset = self.allocate_instances(slots.len() as u32);
        self.actors.insert(ResidentActor {
            id: actor.id,
            model: definition.id,
            skin: actor_model.skin,
            instance_offset,
            slots,
        });
        log::debug!(
            "ActorModelCache: Actor {} uses '{}' skin {} (instances at {})",
            actor.id.0,
            definition.name,
            actor_model.skin,
            instance_offset
        );
        Ok(true)
    }

    fn resolve_slots(
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        definition: &ModelDefinition,
        skin: usize,
    ) -> Result<Vec<ActorSlot>, RendererError> {
        definition.validate()?;
        (0..definition.material_slot_count())
            .map(|slot| {
                let material = definition.material(skin, slot).ok_or_else(|| {
                    AssetError::Malformed {
                        name: definition.name.clone(),
                        reason: format!("skin {skin} has no material for slot {slot}"),
                    }
                })?;
                let bucket = ShadingBucket::of(material.shading).ok_or_else(|| {
                    RendererError::UnsupportedShading {
                        material: material.name.clone(),
                        shading: format!("{:?}", material.shading),
                        batch: "actor models",
                    }
                })?;
                Ok(ActorSlot {
                    bucket,
                    color: material.color.to_array(),
                    texture_index: textures.resolve_optional(device, material.texture.as_ref())?,
                })
            })
            .collect()
    }

    /// Appends every LOD of `definition` not yet resident. Each buffer grows
    /// at most once and receives a single write.
    fn load_lods(
        &mut self,
        device: &dyn GraphicsDevice,
        definition: &ModelDefinition,
    ) -> Result<(), RendererError> {
        let missing: Vec<_> = definition
            .lods
            .iter()
            .filter(|lod| !self.lods.contains((definition.id, lod.id)))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let vertex_base = self.vertices.len();
        let index_base = self.indices.len();
        let new_vertices: usize = missing.iter().map(|lod| lod.vertices.len()).sum();
        let new_indices: usize = missing.iter().map(|lod| lod.index_count()).sum();

        let mut vertices = Vec::with_capacity(new_vertices);
        let mut indices = Vec::with_capacity(new_indices);
        let mut entries = Vec::with_capacity(missing.len());
        for lod in &missing {
            entries.push(ResidentLod {
                model: definition.id,
                lod: lod.id,
                base_vertex: (vertex_base + vertices.len()) as u32,
                first_index: (index_base + indices.len()) as u32,
                slot_index_counts: lod.slot_indices.iter().map(|s| s.len() as u32).collect(),
            });
            vertices.extend_from_slice(&lod.vertices);
            for slot in &lod.slot_indices {
                indices.extend_from_slice(slot);
            }
        }

        Self::append(device, &mut self.vertices, vertex_base, &vertices)?;
        Self::append(device, &mut self.indices, index_base, &indices)?;
        for entry in entries {
            self.lods.insert(entry);
        }
        self.lod_uploads += missing.len() as u64;
        log::info!(
            "ActorModelCache: Uploaded {} LODs of '{}' ({} vertices, {} indices)",
            missing.len(),
            definition.name,
            new_vertices,
            new_indices
        );
        Ok(())
    }

    fn append<T: Pod>(
        device: &dyn GraphicsDevice,
        buffer: &mut GrowableGpuBuffer<T>,
        offset: usize,
        data: &[T],
    ) -> Result<(), ResourceError> {
        if data.is_empty() {
            return Ok(());
        }
        buffer.reserve(device, offset + data.len(), GrowthPolicy::Exact)?;
        buffer.write(device, offset, data)?;
        buffer.set_len(offset + data.len())
    }

    fn allocate_instances(&mut self, count: u32) -> u32 {
        if let Some(position) = self.free_ranges.iter().position(|(_, len)| *len == count) {
            return self.free_ranges.swap_remove(position).0;
        }
        let offset = self.instance_cursor;
        self.instance_cursor += count;
        offset
    }

    /// Drops an actor's residency and recycles its instance records. The
    /// model's LODs stay resident.
    pub fn forget(&mut self, id: ActorId) -> bool {
        match self.actors.remove(id) {
            Some(resident) => {
                if !resident.slots.is_empty() {
                    self.free_ranges
                        .push((resident.instance_offset, resident.slots.len() as u32));
                }
                true
            }
            None => false,
        }
    }

    /// Brings the cache in line with `actors`, a snapshot of the actor list:
    /// forgets vanished actors, loads new ones, uploads every visible actor's
    /// instance records in one write and rebuilds both draw lists.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureResidencyTable,
        actors: &[Actor],
    ) -> Result<ActorFrame, RendererError> {
        let mut frame = ActorFrame::default();
        let mut present: Vec<ActorId> = actors
            .iter()
            .filter(|a| a.model.is_some())
            .map(|a| a.id)
            .collect();
        present.sort_unstable();
        let vanished: Vec<ActorId> = self
            .actors
            .iter()
            .map(|r| r.id)
            .filter(|id| present.binary_search(id).is_err())
            .collect();
        for id in vanished {
            self.forget(id);
            frame.forgotten_actors += 1;
        }
        for actor in actors {
            if self.ensure_loaded(device, textures, actor)? {
                frame.loaded_actors += 1;
            }
        }

        self.instances
            .reserve(device, self.instance_cursor as usize, GrowthPolicy::Slack(Self::SLACK))
            .map_err(|e| report_failure("ActorModelCache: Failed to grow instance data", e.into()))?;

        let mut shaded = Vec::new();
        let mut unshaded = Vec::new();
        for actor in actors.iter().filter(|a| a.visible) {
            let Some(actor_model) = actor.model.as_ref() else {
                continue;
            };
            let Some(resident) = self.actors.get(actor.id) else {
                continue;
            };
            let lods = &actor_model.definition.lods;
            let Some(lod) = lods.get(actor.lod.min(lods.len().saturating_sub(1))) else {
                continue;
            };
            let Some(placement) = self.lods.get((resident.model, lod.id)) else {
                continue;
            };

            let records: Vec<ActorInstance> = resident
                .slots
                .iter()
                .map(|slot| ActorInstance {
                    model: actor.transform.to_cols_array_2d(),
                    color: slot.color,
                    texture_index: slot.texture_index,
                })
                .collect();
            self.instances
                .stage(resident.instance_offset as usize, &records)
                .map_err(|e| report_failure("ActorModelCache: Failed to stage instance data", e.into()))?;

            let mut first_index = placement.first_index;
            for (slot_index, (slot, index_count)) in resident
                .slots
                .iter()
                .zip(&placement.slot_index_counts)
                .enumerate()
            {
                let command = DrawIndexedIndirect {
                    index_count: *index_count,
                    instance_count: 1,
                    first_index,
                    base_vertex: placement.base_vertex as i32,
                    first_instance: resident.instance_offset + slot_index as u32,
                };
                match slot.bucket {
                    ShadingBucket::Shaded => shaded.push(command),
                    ShadingBucket::Unshaded => unshaded.push(command),
                }
                first_index += index_count;
            }
            frame.visible_actors += 1;
        }

        self.instances
            .set_len(self.instance_cursor as usize)
            .and_then(|_| self.instances.flush(device))
            .and_then(|_| Self::replace_commands(device, &mut self.shaded, &shaded))
            .and_then(|_| Self::replace_commands(device, &mut self.unshaded, &unshaded))
            .map_err(|e| report_failure("ActorModelCache: Failed to upload actor draws", e.into()))?;
        frame.draws = (shaded.len() + unshaded.len()) as u32;
        Ok(frame)
    }

    fn replace_commands(
        device: &dyn GraphicsDevice,
        buffer: &mut GrowableGpuBuffer<DrawIndexedIndirect>,
        commands: &[DrawIndexedIndirect],
    ) -> Result<(), ResourceError> {
        buffer.clear();
        if commands.is_empty() {
            return Ok(());
        }
        buffer.reserve(device, commands.len(), GrowthPolicy::Slack(Self::SLACK))?;
        buffer.write(device, 0, commands)?;
        buffer.set_len(commands.len())
    }

    /// What to bind for one bucket this frame, or `None` if it has no draws.
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

    pub fn commands(&self, bucket: ShadingBucket) -> &[DrawIndexedIndirect] {
        match bucket {
            ShadingBucket::Shaded => self.shaded.as_slice().unwrap_or_default(),
            ShadingBucket::Unshaded => self.unshaded.as_slice().unwrap_or_default(),
        }
    }

    /// Placement of one resident LOD.
    pub fn lod(&self, model: AssetId, lod: u32) -> Option<&ResidentLod> {
        self.lods.get((model, lod))
    }

    /// First instance record of a resident actor.
    pub fn instance_offset(&self, id: ActorId) -> Option<u32> {
        self.actors.get(id).map(|r| r.instance_offset)
    }

    pub fn resident_lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn resident_actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Number of LODs uploaded since creation.
    pub fn lod_upload_count(&self) -> u64 {
        self.lod_uploads
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Forgets every model and actor. Called when the level changes;
    /// allocations are kept for the next level.
    pub fn reset(&mut self) {
        self.lods.clear();
        self.actors.clear();
        self.vertices.clear();
        self.indices.clear();
        self.instances.clear();
        self.instance_cursor = 0;
        self.free_ranges.clear();
        self.shaded.clear();
        self.unshaded.clear();
        log::debug!("ActorModelCache: Reset");
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.reset();
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
    use ember_core::math::{Mat4, Vec3};
    use ember_core::mock::MockGraphicsDevice;
    use ember_core::scene::ActorModel;
    use std::sync::Arc;

    fn crate_model(name: &str, lod_sizes: &[(usize, usize)]) -> Arc<ModelDefinition> {
        let wood = Material::new("wood", None, ShadingMode::Shaded);
        let lamp = Material::new("lamp", None, ShadingMode::Unshaded);
        Arc::new(ModelDefinition {
            id: AssetId::from_name(name),
            name: name.into(),
            materials: vec![Arc::new(wood), Arc::new(lamp)],
            skins: vec![vec![0, 1], vec![0, 0]],
            lods: lod_sizes
                .iter()
                .enumerate()
                .map(|(id, (vertices, indices))| ModelLod {
                    id: id as u32,
                    distance: id as f32 * 10.0,
                    vertices: vec![ModelVertex::default(); *vertices],
                    slot_indices: vec![vec![0; *indices], vec![0; 3]],
                })
                .collect(),
        })
    }

    fn actor(id: u64, model: &Arc<ModelDefinition>, skin: usize) -> Actor {
        Actor::new(
            ActorId(id),
            Some(ActorModel {
                definition: model.clone(),
                skin,
            }),
        )
    }

    fn setup() -> (MockGraphicsDevice, TextureResidencyTable, ActorModelCache) {
        let device = MockGraphicsDevice::new();
        let textures = TextureResidencyTable::new(&device, 4, false, LodLock::new()).unwrap();
        (device, textures, ActorModelCache::new())
    }

    #[test]
    fn test_loaded_actor_is_not_reloaded() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6)]);
        let a = actor(1, &model, 0);
        assert!(cache.ensure_loaded(&device, &mut textures, &a).unwrap());
        device.clear_log();
        assert!(!cache.ensure_loaded(&device, &mut textures, &a).unwrap());
        assert_eq!(device.write_count(), 0);
    }

    #[test]
    fn test_shared_model_is_uploaded_once() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6), (3, 3)]);
        cache.ensure_loaded(&device, &mut textures, &actor(1, &model, 0)).unwrap();
        cache.ensure_loaded(&device, &mut textures, &actor(2, &model, 1)).unwrap();

        assert_eq!(cache.lod_upload_count(), 2);
        assert_eq!(cache.resident_lod_count(), 2);
        assert_eq!(cache.vertex_count(), 7);
        assert_eq!(cache.index_count(), 6 + 3 + 3 + 3);
        let lod1 = cache.lod(model.id, 1).unwrap();
        assert_eq!((lod1.base_vertex, lod1.first_index), (4, 9));
        assert_eq!(lod1.slot_index_counts, vec![3, 3]);
        assert_ne!(cache.instance_offset(ActorId(1)), cache.instance_offset(ActorId(2)));
    }

    #[test]
    fn test_growth_keeps_earlier_lods() {
        let (device, mut textures, mut cache) = setup();
        let first = crate_model("crate", &[(3, 3)]);
        let second = crate_model("barrel", &[(5, 6)]);
        cache.ensure_loaded(&device, &mut textures, &actor(1, &first, 0)).unwrap();
        device.clear_log();
        cache.ensure_loaded(&device, &mut textures, &actor(2, &second, 0)).unwrap();

        // One append write per buffer, at the old end.
        let writes = device.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].offset, 3 * std::mem::size_of::<ModelVertex>() as u64);
        assert_eq!(writes[1].offset, 6 * 4);

        let barrel = cache.lod(second.id, 0).unwrap();
        assert_eq!((barrel.base_vertex, barrel.first_index), (3, 6));
        assert!(cache.lod(first.id, 0).is_some());
    }

    #[test]
    fn test_skin_change_reloads_slots() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6)]);
        cache
            .update(&device, &mut textures, &[actor(1, &model, 0)])
            .unwrap();
        assert_eq!(cache.commands(ShadingBucket::Unshaded).len(), 1);

        let frame = cache
            .update(&device, &mut textures, &[actor(1, &model, 1)])
            .unwrap();
        assert_eq!(frame.loaded_actors, 1);
        assert!(cache.commands(ShadingBucket::Unshaded).is_empty());
        assert_eq!(cache.commands(ShadingBucket::Shaded).len(), 2);
        assert_eq!(cache.lod_upload_count(), 1);
    }

    #[test]
    fn test_vanished_actor_is_forgotten_and_its_records_reused() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6)]);
        cache
            .update(&device, &mut textures, &[actor(1, &model, 0), actor(2, &model, 0)])
            .unwrap();
        let freed = cache.instance_offset(ActorId(1)).unwrap();

        let frame = cache
            .update(&device, &mut textures, &[actor(2, &model, 0), actor(3, &model, 0)])
            .unwrap();
        assert_eq!(frame.forgotten_actors, 1);
        assert_eq!(cache.instance_offset(ActorId(1)), None);
        assert_eq!(cache.instance_offset(ActorId(3)), Some(freed));
        assert_eq!(cache.resident_actor_count(), 2);
    }

    #[test]
    fn test_draws_follow_lod_and_visibility() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6), (3, 3)]);
        let mut near = actor(1, &model, 0);
        let mut far = actor(2, &model, 0);
        far.lod = 7;
        far.transform = Mat4::from_translation(Vec3::new(0.0, 0.0, 50.0));
        cache
            .update(&device, &mut textures, &[near.clone(), far.clone()])
            .unwrap();

        let shaded = cache.commands(ShadingBucket::Shaded);
        assert_eq!(shaded.len(), 2);
        assert_eq!((shaded[0].first_index, shaded[0].index_count), (0, 6));
        // Out-of-range LODs clamp to the coarsest one.
        assert_eq!((shaded[1].first_index, shaded[1].base_vertex), (9, 4));
        assert_eq!(
            shaded[1].first_instance,
            cache.instance_offset(ActorId(2)).unwrap()
        );

        near.visible = false;
        let frame = cache.update(&device, &mut textures, &[near, far]).unwrap();
        assert_eq!(frame.visible_actors, 1);
        assert_eq!(cache.commands(ShadingBucket::Shaded).len(), 1);
    }

    #[test]
    fn test_instance_records_carry_transform() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6)]);
        let mut a = actor(5, &model, 0);
        a.transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        cache.update(&device, &mut textures, &[a]).unwrap();

        let draw = cache.draw(ShadingBucket::Shaded).unwrap();
        let bytes = device.buffer_contents(draw.instances).unwrap();
        let records: &[ActorInstance] =
            bytemuck::cast_slice(&bytes[..2 * std::mem::size_of::<ActorInstance>()]);
        assert_eq!(records[0].model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(records[1].texture_index, crate::textures::UNTEXTURED);
    }

    #[test]
    fn test_sky_material_is_rejected() {
        let (device, mut textures, mut cache) = setup();
        let mut definition = (*crate_model("dome", &[(3, 3)])).clone();
        definition.materials[1] = Arc::new(Material::new("sky", None, ShadingMode::Sky));
        let model = Arc::new(definition);
        let err = cache
            .ensure_loaded(&device, &mut textures, &actor(1, &model, 0))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(cache.resident_actor_count(), 0);
        assert_eq!(cache.resident_lod_count(), 0);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let (device, mut textures, mut cache) = setup();
        let model = crate_model("crate", &[(4, 6)]);
        cache
            .update(&device, &mut textures, &[actor(1, &model, 0)])
            .unwrap();
        cache.reset();
        assert_eq!(cache.resident_lod_count(), 0);
        assert!(cache.draw(ShadingBucket::Shaded).is_none());
        cache
            .update(&device, &mut textures, &[actor(1, &model, 0)])
            .unwrap();
        assert_eq!(cache.instance_offset(ActorId(1)), Some(0));
    }
}
