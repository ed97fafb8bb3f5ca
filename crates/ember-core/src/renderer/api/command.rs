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

//! Command recording types: pass descriptors and indirect draw arguments.

use super::TextureViewId;
use crate::math::LinearRgba;

/// An opaque handle to a finished command buffer, ready for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// Index element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Describes the single render pass a frame is recorded into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Color attachment.
    pub color_target: TextureViewId,
    /// Clear color, `None` to load the existing contents.
    pub clear_color: Option<LinearRgba>,
    /// Depth attachment, if any.
    pub depth_target: Option<TextureViewId>,
    /// Depth clear value, `None` to load.
    pub clear_depth: Option<f32>,
}

/// Arguments of one indexed indirect draw, laid out the way GPUs read them.
///
/// `base_vertex` is added to every index fetched by the draw, so index data
/// can stay local to each mesh inside a packed vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DrawIndexedIndirect {
    /// Number of indices to draw.
    pub index_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// First index inside the bound index buffer.
    pub first_index: u32,
    /// Value added to each index before fetching the vertex.
    pub base_vertex: i32,
    /// First instance, also the offset into instance-rate vertex buffers.
    pub first_instance: u32,
}

impl DrawIndexedIndirect {
    /// Size of one command in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_command_layout() {
        assert_eq!(DrawIndexedIndirect::SIZE, 20);
        let cmd = DrawIndexedIndirect {
            index_count: 6,
            instance_count: 1,
            first_index: 12,
            base_vertex: 8,
            first_instance: 2,
        };
        let words: &[u32] = bytemuck::cast_slice(std::slice::from_ref(&cmd));
        assert_eq!(words, &[6, 1, 12, 8, 2]);
    }
}
