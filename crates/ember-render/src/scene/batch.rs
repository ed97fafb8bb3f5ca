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

//! One shading bucket: vertex, index, per-instance and indirect-draw arrays.

use bytemuck::Pod;
use ember_core::renderer::{
    BufferId, BufferUsage, DrawIndexedIndirect, GraphicsDevice, GrowableGpuBuffer, GrowthPolicy,
    ResourceError,
};

/// Replaces the contents of `buffer` with `data`: sized to fit exactly and
/// written with a single call.
pub fn replace_contents<T: Pod>(
    device: &dyn GraphicsDevice,
    buffer: &mut GrowableGpuBuffer<T>,
    data: &[T],
) -> Result<(), ResourceError> {
    buffer.clear();
    if data.is_empty() {
        return Ok(());
    }
    buffer.reserve(device, data.len(), GrowthPolicy::Exact)?;
    buffer.write(device, 0, data)?;
    buffer.set_len(data.len())
}

/// One mesh to pack: its vertices, its model-local indices and one
/// per-instance record.
#[derive(Debug, Clone, Copy)]
pub struct BatchEntry<'a, V, I> {
    pub vertices: &'a [V],
    pub indices: &'a [u32],
    pub instance: I,
}

/// Everything needed to issue one multi-draw-indirect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectDraw {
    pub vertices: BufferId,
    pub indices: BufferId,
    pub instances: BufferId,
    pub commands: BufferId,
    pub draw_count: u32,
}

/// Builds one indirect command per mesh from `(vertex_count, index_count)`
/// pairs. `first_index` and `base_vertex` are running sums over the
/// preceding meshes and `first_instance` is the mesh's position, so indices
/// stay local to their mesh.
pub fn build_draw_commands(
    counts: impl IntoIterator<Item = (u32, u32)>,
) -> Vec<DrawIndexedIndirect> {
    let mut vertex_cursor = 0u32;
    let mut index_cursor = 0u32;
    counts
        .into_iter()
        .zip(0u32..)
        .map(|((vertex_count, index_count), position)| {
            let command = DrawIndexedIndirect {
                index_count,
                instance_count: 1,
                first_index: index_cursor,
                base_vertex: vertex_cursor as i32,
                first_instance: position,
            };
            vertex_cursor += vertex_count;
            index_cursor += index_count;
            command
        })
        .collect()
}

/// A draw batch for one shading pipeline.
///
/// Packing always rebuilds the whole batch: each array is sized to exactly
/// fit and uploaded with one write. The per-instance and indirect arrays
/// always hold the same number of entries.
#[derive(Debug)]
pub struct DrawBatch<V: Pod, I: Pod> {
    name: &'static str,
    vertices: GrowableGpuBuffer<V>,
    indices: GrowableGpuBuffer<u32>,
    instances: GrowableGpuBuffer<I>,
    commands: GrowableGpuBuffer<DrawIndexedIndirect>,
}

impl<V: Pod, I: Pod> DrawBatch<V, I> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            vertices: GrowableGpuBuffer::new(format!("{name} Vertices"), BufferUsage::VERTEX, false),
            indices: GrowableGpuBuffer::new(format!("{name} Indices"), BufferUsage::INDEX, false),
            instances: GrowableGpuBuffer::new(
                format!("{name} Instance Data"),
                BufferUsage::VERTEX,
                false,
            ),
            commands: GrowableGpuBuffer::new(
                format!("{name} Draw Commands"),
                BufferUsage::INDIRECT,
                true,
            ),
        }
    }

    /// Replaces the batch contents with `entries`, in order. Returns the
    /// number of bytes uploaded.
    ///
    /// On error the batch is left empty, so no draw is issued from partially
    /// written data.
    pub fn pack(
        &mut self,
        device: &dyn GraphicsDevice,
        entries: &[BatchEntry<'_, V, I>],
    ) -> Result<u64, ResourceError> {
        self.clear();
        if entries.is_empty() {
            return Ok(0);
        }

        let vertex_total: usize = entries.iter().map(|e| e.vertices.len()).sum();
        let index_total: usize = entries.iter().map(|e| e.indices.len()).sum();

        self.vertices
            .reserve(device, vertex_total, GrowthPolicy::Exact)?;
        self.indices.reserve(device, index_total, GrowthPolicy::Exact)?;
        self.instances
            .reserve(device, entries.len(), GrowthPolicy::Exact)?;
        self.commands
            .reserve(device, entries.len(), GrowthPolicy::Exact)?;

        let mut vertices = Vec::with_capacity(vertex_total);
        let mut indices = Vec::with_capacity(index_total);
        let mut instances = Vec::with_capacity(entries.len());
        for entry in entries {
            vertices.extend_from_slice(entry.vertices);
            indices.extend_from_slice(entry.indices);
            instances.push(entry.instance);
        }
        let commands = build_draw_commands(
            entries
                .iter()
                .map(|e| (e.vertices.len() as u32, e.indices.len() as u32)),
        );

        self.vertices.write(device, 0, &vertices)?;
        self.indices.write(device, 0, &indices)?;
        self.instances.write(device, 0, &instances)?;
        self.commands.write(device, 0, &commands)?;

        self.vertices.set_len(vertex_total)?;
        self.indices.set_len(index_total)?;
        self.instances.set_len(entries.len())?;
        self.commands.set_len(entries.len())?;

        log::debug!(
            "DrawBatch({}): Packed {} meshes, {} vertices, {} indices",
            self.name,
            entries.len(),
            vertex_total,
            index_total
        );
        Ok(self.vertices.byte_len()
            + self.indices.byte_len()
            + self.instances.byte_len()
            + self.commands.byte_len())
    }

    /// Marks the batch as empty. Allocations are kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.instances.clear();
        self.commands.clear();
    }

    /// Number of indirect draws.
    pub fn draw_count(&self) -> u32 {
        self.commands.len() as u32
    }

    /// Returns `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// The packed indirect commands.
    pub fn commands(&self) -> &[DrawIndexedIndirect] {
        self.commands.as_slice().unwrap_or_default()
    }

    /// The draw to issue, or `None` while the batch is empty.
    pub fn draw(&self) -> Option<IndirectDraw> {
        if self.is_empty() {
            return None;
        }
        Some(IndirectDraw {
            vertices: self.vertices.buffer()?,
            indices: self.indices.buffer()?,
            instances: self.instances.buffer()?,
            commands: self.commands.buffer()?,
            draw_count: self.draw_count(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.vertices.destroy(device);
        self.indices.destroy(device);
        self.instances.destroy(device);
        self.commands.destroy(device);
    }
}
