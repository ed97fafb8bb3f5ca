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

//! Physics debug overlay: world-space lines and triangles, rebuilt every frame.

use bytemuck::{Pod, Zeroable};
use ember_core::math::{LinearRgba, Vec3};
use ember_core::renderer::{
    packed_attributes, BufferId, BufferUsage, GraphicsDevice, GrowableGpuBuffer, GrowthPolicy,
    ResourceError, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use std::borrow::Cow;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DebugDrawVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugDrawVertex {
    pub fn new(position: Vec3, color: LinearRgba) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    /// Vertex layout, locations 0 and 1.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Owned(packed_attributes(
                &[VertexFormat::Float32x3, VertexFormat::Float32x4],
                0,
            )),
        }
    }
}

/// Which of the two debug lists a primitive goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugPrimitive {
    Line,
    Triangle,
}

impl DebugPrimitive {
    pub const fn vertex_count(&self) -> usize {
        match self {
            DebugPrimitive::Line => 2,
            DebugPrimitive::Triangle => 3,
        }
    }
}

/// Accumulates debug lines and triangles for one frame.
///
/// Storage grows on the CPU as primitives arrive; the GPU buffers follow at
/// the next [`apply_pending_resize`](Self::apply_pending_resize).
#[derive(Debug)]
pub struct DebugDrawBatcher {
    lines: GrowableGpuBuffer<DebugDrawVertex>,
    triangles: GrowableGpuBuffer<DebugDrawVertex>,
    /// Primitives of slack added on growth.
    slack: usize,
}

impl DebugDrawBatcher {
    pub fn new(
        device: &dyn GraphicsDevice,
        initial_vertices: usize,
        slack: usize,
    ) -> Result<Self, ResourceError> {
        let initial_vertices = initial_vertices.max(DebugPrimitive::Triangle.vertex_count());
        Ok(Self {
            lines: GrowableGpuBuffer::with_capacity(
                device,
                "Debug Line Vertices",
                BufferUsage::VERTEX,
                true,
                initial_vertices,
            )?,
            triangles: GrowableGpuBuffer::with_capacity(
                device,
                "Debug Triangle Vertices",
                BufferUsage::VERTEX,
                true,
                initial_vertices,
            )?,
            slack,
        })
    }

    fn push(
        &mut self,
        primitive: DebugPrimitive,
        vertices: &[DebugDrawVertex],
    ) -> Result<(), ResourceError> {
        let slack = self.slack * primitive.vertex_count();
        let buffer = match primitive {
            DebugPrimitive::Line => &mut self.lines,
            DebugPrimitive::Triangle => &mut self.triangles,
        };
        let offset = buffer.len();
        buffer.request_capacity(offset + vertices.len(), GrowthPolicy::Slack(slack));
        buffer.stage(offset, vertices)?;
        buffer.set_len(offset + vertices.len())
    }

    /// Adds a line. `color` is packed `0xRRGGBB`.
    pub fn line(&mut self, start: Vec3, end: Vec3, color: u32) -> Result<(), ResourceError> {
        let color = LinearRgba::from_rgb_hex(color);
        self.push(
            DebugPrimitive::Line,
            &[
                DebugDrawVertex::new(start, color),
                DebugDrawVertex::new(end, color),
            ],
        )
    }

    /// Adds a filled triangle. `color` is packed `0xRRGGBB`.
    pub fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: u32) -> Result<(), ResourceError> {
        let color = LinearRgba::from_rgb_hex(color);
        self.push(
            DebugPrimitive::Triangle,
            &[
                DebugDrawVertex::new(a, color),
                DebugDrawVertex::new(b, color),
                DebugDrawVertex::new(c, color),
            ],
        )
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.triangles.clear();
    }

    pub fn needs_resize(&self) -> bool {
        self.lines.needs_resize() || self.triangles.needs_resize()
    }

    /// Reallocates whichever GPU buffer outgrew its allocation. Must run
    /// outside a render pass. The new buffers start empty; [`flush`](Self::flush)
    /// fills them.
    pub fn apply_pending_resize(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ResourceError> {
        let lines = self.lines.apply_pending_resize_discarding(device)?;
        let triangles = self.triangles.apply_pending_resize_discarding(device)?;
        Ok(lines || triangles)
    }

    /// Uploads both lists. Returns the bytes written.
    pub fn flush(&self, device: &dyn GraphicsDevice) -> Result<u64, ResourceError> {
        let mut bytes = 0;
        if !self.lines.is_empty() {
            bytes += self.lines.flush(device)?;
        }
        if !self.triangles.is_empty() {
            bytes += self.triangles.flush(device)?;
        }
        Ok(bytes)
    }

    /// The buffer and vertex count of one list, `None` if it is empty.
    pub fn draw(&self, primitive: DebugPrimitive) -> Option<(BufferId, u32)> {
        let buffer = match primitive {
            DebugPrimitive::Line => &self.lines,
            DebugPrimitive::Triangle => &self.triangles,
        };
        if buffer.is_empty() {
            return None;
        }
        Some((buffer.buffer()?, buffer.len() as u32))
    }

    pub fn line_vertex_count(&self) -> usize {
        self.lines.len()
    }

    pub fn triangle_vertex_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.lines.destroy(device);
        self.triangles.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::mock::MockGraphicsDevice;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<DebugDrawVertex>(), 28);
        assert_eq!(DebugDrawVertex::layout().attributes[1].offset, 12);
    }

    #[test]
    fn test_hex_color_is_opaque() {
        let device = MockGraphicsDevice::new();
        let mut batcher = DebugDrawBatcher::new(&device, 16, 16).unwrap();
        batcher.line(Vec3::ZERO, Vec3::X, 0xFF0000).unwrap();
        let (buffer, count) = batcher.draw(DebugPrimitive::Line).unwrap();
        assert_eq!(count, 2);
        batcher.flush(&device).unwrap();
        let bytes = device.buffer_contents(buffer).unwrap();
        let vertices: &[DebugDrawVertex] = bytemuck::cast_slice(&bytes[..56]);
        assert_eq!(vertices[1].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_growth_is_deferred_and_adds_slack() {
        let device = MockGraphicsDevice::new();
        let mut batcher = DebugDrawBatcher::new(&device, 3, 16).unwrap();
        batcher.triangle(Vec3::ZERO, Vec3::X, Vec3::Y, 0x00FF00).unwrap();
        assert!(!batcher.needs_resize());
        batcher.triangle(Vec3::ZERO, Vec3::X, Vec3::Y, 0x00FF00).unwrap();
        assert!(batcher.needs_resize());

        let created = device.created_buffer_count();
        assert!(batcher.apply_pending_resize(&device).unwrap());
        assert_eq!(device.created_buffer_count(), created + 1);
        let (buffer, count) = batcher.draw(DebugPrimitive::Triangle).unwrap();
        assert_eq!(count, 6);
        let vertex_size = std::mem::size_of::<DebugDrawVertex>() as u64;
        assert_eq!(device.buffer_size(buffer), Some((6 + 16 * 3) * vertex_size));

        batcher.flush(&device).unwrap();
        assert_eq!(device.writes_to(buffer).len(), 1);
    }

    #[test]
    fn test_reset_empties_both_lists() {
        let device = MockGraphicsDevice::new();
        let mut batcher = DebugDrawBatcher::new(&device, 16, 16).unwrap();
        batcher.line(Vec3::ZERO, Vec3::Y, 0xFFFFFF).unwrap();
        batcher.triangle(Vec3::ZERO, Vec3::X, Vec3::Y, 0xFFFFFF).unwrap();
        batcher.reset();
        assert!(batcher.draw(DebugPrimitive::Line).is_none());
        assert!(batcher.draw(DebugPrimitive::Triangle).is_none());
        device.clear_log();
        assert_eq!(batcher.flush(&device).unwrap(), 0);
        assert_eq!(device.write_count(), 0);
    }
}
