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

//! Immediate-mode UI batching.
//!
//! Every UI primitive drawn during a frame is appended to one CPU-mirrored
//! vertex buffer and one index buffer. At the end of the frame each buffer
//! is uploaded with a single write and the whole batch is drawn with a
//! single indexed draw.

pub mod geometry;

use crate::textures::UNTEXTURED;
use bytemuck::{Pod, Zeroable};
use ember_core::math::LinearRgba;
use ember_core::renderer::{
    packed_attributes, BufferId, BufferUsage, GraphicsDevice, GrowableGpuBuffer, GrowthPolicy,
    ResourceError, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use geometry::Corner;
use std::borrow::Cow;

/// Vertices per quad.
pub const QUAD_VERTICES: usize = 4;
/// Indices per quad.
pub const QUAD_INDICES: usize = 6;

/// A UI vertex in NDC. `texture_index` is a texture-table slot or
/// [`UNTEXTURED`] for a solid color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct UiVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub texture_index: u32,
}

impl UiVertex {
    pub fn new(corner: Corner, color: LinearRgba, texture_index: u32) -> Self {
        Self {
            position: [corner[0], corner[1]],
            uv: [corner[2], corner[3]],
            color: color.to_array(),
            texture_index,
        }
    }

    /// Vertex buffer layout, locations 0 to 3.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Owned(packed_attributes(
                &[
                    VertexFormat::Float32x2,
                    VertexFormat::Float32x2,
                    VertexFormat::Float32x4,
                    VertexFormat::Uint32,
                ],
                0,
            )),
        }
    }
}

/// The per-frame UI vertex and index accumulator.
#[derive(Debug)]
pub struct UiBatcher {
    vertices: GrowableGpuBuffer<UiVertex>,
    indices: GrowableGpuBuffer<u32>,
    /// Quads of slack added whenever storage grows.
    slack_quads: usize,
}

impl UiBatcher {
    /// Allocates room for `initial_quads` quads.
    pub fn new(
        device: &dyn GraphicsDevice,
        initial_quads: usize,
        slack_quads: usize,
    ) -> Result<Self, ResourceError> {
        let initial_quads = initial_quads.max(1);
        Ok(Self {
            vertices: GrowableGpuBuffer::with_capacity(
                device,
                "UI Vertex Buffer",
                BufferUsage::VERTEX,
                true,
                initial_quads * QUAD_VERTICES,
            )?,
            indices: GrowableGpuBuffer::with_capacity(
                device,
                "UI Index Buffer",
                BufferUsage::INDEX,
                true,
                initial_quads * QUAD_INDICES,
            )?,
            slack_quads,
        })
    }

    /// Forgets everything appended so far. Capacity is kept.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Makes room for `additional_vertices` and `additional_indices` more
    /// elements. Growth happens on the CPU mirror right away and is flagged
    /// for the GPU buffers. Returns `true` if either buffer grew.
    pub fn ensure_capacity(&mut self, additional_vertices: usize, additional_indices: usize) -> bool {
        let grew_vertices = self.vertices.request_capacity(
            self.vertices.len() + additional_vertices,
            GrowthPolicy::Slack(self.slack_quads * QUAD_VERTICES),
        );
        let grew_indices = self.indices.request_capacity(
            self.indices.len() + additional_indices,
            GrowthPolicy::Slack(self.slack_quads * QUAD_INDICES),
        );
        grew_vertices || grew_indices
    }

    /// Appends one quad. Indices are `[o, o+1, o+2, o, o+2, o+3]` where `o`
    /// is the current vertex cursor.
    pub fn append_quad(&mut self, corners: [UiVertex; 4]) -> Result<(), ResourceError> {
        self.ensure_capacity(QUAD_VERTICES, QUAD_INDICES);
        let base = self.vertices.len();
        let o = base as u32;
        self.vertices.stage(base, &corners)?;
        let index_base = self.indices.len();
        self.indices
            .stage(index_base, &[o, o + 1, o + 2, o, o + 2, o + 3])?;
        self.vertices.set_len(base + QUAD_VERTICES)?;
        self.indices.set_len(index_base + QUAD_INDICES)
    }

    /// Appends an indexed triangle mesh whose indices are local to `vertices`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If an index points past `vertices`;
    ///   nothing is appended in that case.
    pub fn append_triangle_mesh(
        &mut self,
        vertices: &[UiVertex],
        indices: &[u32],
    ) -> Result<(), ResourceError> {
        if indices.iter().any(|i| *i as usize >= vertices.len()) {
            log::warn!("UiBatcher: Triangle mesh index out of range, mesh dropped");
            return Err(ResourceError::OutOfBounds);
        }
        if indices.is_empty() {
            return Ok(());
        }
        self.ensure_capacity(vertices.len(), indices.len());
        let base = self.vertices.len();
        let offset = base as u32;
        self.vertices.stage(base, vertices)?;
        let shifted: Vec<u32> = indices.iter().map(|i| i + offset).collect();
        let index_base = self.indices.len();
        self.indices.stage(index_base, &shifted)?;
        self.vertices.set_len(base + vertices.len())?;
        self.indices.set_len(index_base + indices.len())
    }

    /// Returns `true` if a GPU reallocation is waiting.
    pub fn needs_resize(&self) -> bool {
        self.vertices.needs_resize() || self.indices.needs_resize()
    }

    /// Applies a flagged reallocation. Must run outside any render pass.
    /// Nothing is carried into the new buffers: [`flush`](Self::flush)
    /// uploads the whole frame right after.
    pub fn apply_pending_resize(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ResourceError> {
        let vertices = self.vertices.apply_pending_resize_discarding(device)?;
        let indices = self.indices.apply_pending_resize_discarding(device)?;
        Ok(vertices || indices)
    }

    /// Uploads this frame's geometry, one write per buffer. Returns the
    /// number of bytes written.
    pub fn flush(&self, device: &dyn GraphicsDevice) -> Result<u64, ResourceError> {
        if self.indices.is_empty() {
            return Ok(0);
        }
        Ok(self.vertices.flush(device)? + self.indices.flush(device)?)
    }

    /// Number of vertices appended this frame.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices appended this frame.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Returns `true` if nothing was appended this frame.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Quads the current storage holds.
    pub fn quad_capacity(&self) -> usize {
        (self.vertices.capacity() / QUAD_VERTICES).min(self.indices.capacity() / QUAD_INDICES)
    }

    /// The vertex and index buffers.
    pub fn buffers(&self) -> Option<(BufferId, BufferId)> {
        Some((self.vertices.buffer()?, self.indices.buffer()?))
    }

    /// Vertices appended this frame.
    pub fn vertices(&self) -> &[UiVertex] {
        self.vertices.as_slice().unwrap_or_default()
    }

    /// Indices appended this frame.
    pub fn indices(&self) -> &[u32] {
        self.indices.as_slice().unwrap_or_default()
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.vertices.destroy(device);
        self.indices.destroy(device);
    }
}

/// A colored quad with no texture.
pub fn solid_quad(corners: [Corner; 4], color: LinearRgba) -> [UiVertex; 4] {
    corners.map(|corner| UiVertex::new(corner, color, UNTEXTURED))
}

/// A textured quad modulated by `color`.
pub fn textured_quad(corners: [Corner; 4], color: LinearRgba, texture_index: u32) -> [UiVertex; 4] {
    corners.map(|corner| UiVertex::new(corner, color, texture_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::mock::MockGraphicsDevice;

    fn quad(x: f32) -> [UiVertex; 4] {
        solid_quad([[x, 0.0, 0.0, 0.0]; 4], LinearRgba::WHITE)
    }

    #[test]
    fn test_vertex_layout_stride() {
        assert_eq!(UiVertex::layout().array_stride, 36);
        assert_eq!(UiVertex::layout().attributes[3].offset, 32);
    }

    #[test]
    fn test_quad_indices_follow_vertex_cursor() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 4, 16).unwrap();
        batcher.append_quad(quad(0.0)).unwrap();
        batcher.append_quad(quad(1.0)).unwrap();
        assert_eq!(batcher.indices(), &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(batcher.vertex_count(), 8);
    }

    #[test]
    fn test_triangle_mesh_indices_are_offset() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 4, 16).unwrap();
        batcher.append_quad(quad(0.0)).unwrap();
        let mesh = [UiVertex::default(); 3];
        batcher.append_triangle_mesh(&mesh, &[2, 1, 0]).unwrap();
        assert_eq!(&batcher.indices()[6..], &[6, 5, 4]);
        assert!(batcher
            .indices()
            .iter()
            .all(|i| (*i as usize) < batcher.vertex_count()));
    }

    #[test]
    fn test_bad_mesh_is_rejected_whole() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 4, 16).unwrap();
        let mesh = [UiVertex::default(); 2];
        assert_eq!(
            batcher.append_triangle_mesh(&mesh, &[0, 1, 2]),
            Err(ResourceError::OutOfBounds)
        );
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_growth_adds_slack_and_defers_gpu() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 1, 16).unwrap();
        batcher.append_quad(quad(0.0)).unwrap();
        assert!(!batcher.needs_resize());

        batcher.append_quad(quad(1.0)).unwrap();
        assert!(batcher.needs_resize());
        assert_eq!(batcher.quad_capacity(), 2 + 16);
        assert_eq!(device.created_buffer_count(), 2);
        assert!(batcher.flush(&device).is_err());

        assert!(batcher.apply_pending_resize(&device).unwrap());
        assert_eq!(batcher.flush(&device).unwrap(), 8 * 36 + 12 * 4);
    }

    #[test]
    fn test_growth_frame_writes_each_buffer_once() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 1, 16).unwrap();
        for x in 0..3 {
            batcher.append_quad(quad(x as f32)).unwrap();
        }
        device.clear_log();

        assert!(batcher.apply_pending_resize(&device).unwrap());
        batcher.flush(&device).unwrap();

        let (vertices, indices) = batcher.buffers().unwrap();
        assert_eq!(device.writes_to(vertices).len(), 1);
        assert_eq!(device.writes_to(indices).len(), 1);
        assert_eq!(device.write_count(), 2);
    }

    /// Reads back what the last flush left in the index buffer.
    fn flushed_indices(device: &MockGraphicsDevice, batcher: &UiBatcher) -> Vec<u32> {
        let (_, indices) = batcher.buffers().unwrap();
        let bytes = device.buffer_contents(indices).unwrap();
        let mut indices: Vec<u32> = bytemuck::pod_collect_to_vec(&bytes);
        indices.truncate(batcher.index_count() as usize);
        indices
    }

    #[test]
    fn test_flushed_indices_stay_below_vertex_count() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 1, 2).unwrap();
        let fan = [UiVertex::default(); 5];
        let fan_indices = [0, 1, 2, 0, 2, 3, 0, 3, 4];
        let strip = [UiVertex::default(); 4];
        let strip_indices = [0, 1, 2, 2, 1, 3];

        // Small LCG so every frame mixes quads and meshes in a different order
        // and the buffers grow at different points.
        let mut seed: u32 = 0x2545_f491;
        let mut next = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) as usize
        };

        for frame in 0..40 {
            batcher.reset();
            let operations = next() % 24;
            for _ in 0..operations {
                match next() % 3 {
                    0 => batcher.append_quad(quad(frame as f32)).unwrap(),
                    1 => batcher.append_triangle_mesh(&fan, &fan_indices).unwrap(),
                    _ => batcher.append_triangle_mesh(&strip, &strip_indices).unwrap(),
                }
            }
            batcher.apply_pending_resize(&device).unwrap();
            device.clear_log();
            batcher.flush(&device).unwrap();

            if batcher.is_empty() {
                assert_eq!(device.write_count(), 0);
                continue;
            }
            assert_eq!(device.write_count(), 2, "frame {frame}");
            let indices = flushed_indices(&device, &batcher);
            assert_eq!(indices.len() % 3, 0);
            assert!(
                indices.iter().all(|i| (*i as usize) < batcher.vertex_count()),
                "frame {frame}: index past {} vertices",
                batcher.vertex_count()
            );
        }
        assert!(batcher.quad_capacity() > 1);
    }

    #[test]
    fn test_reset_zeroes_occupancy_not_capacity() {
        let device = MockGraphicsDevice::new();
        let mut batcher = UiBatcher::new(&device, 2, 16).unwrap();
        batcher.append_quad(quad(0.0)).unwrap();
        batcher.flush(&device).unwrap();
        batcher.reset();
        batcher.append_quad(quad(1.0)).unwrap();
        device.clear_log();

        assert_eq!(batcher.flush(&device).unwrap(), 4 * 36 + 6 * 4);
        assert_eq!(device.write_count(), 2);
        assert_eq!(batcher.quad_capacity(), 2);
    }
}
