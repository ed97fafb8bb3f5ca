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

use crate::renderer::api::{
    packed_attributes, VertexBufferLayout, VertexFormat, VertexStepMode,
};
use std::borrow::Cow;

/// A vertex of static level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct MapVertex {
    /// Position in world space.
    pub position: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// Baked vertex color.
    pub color: [f32; 4],
    /// Surface normal.
    pub normal: [f32; 3],
}

impl MapVertex {
    /// Vertex buffer layout, locations 0 to 3.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Owned(packed_attributes(
                &[
                    VertexFormat::Float32x3,
                    VertexFormat::Float32x2,
                    VertexFormat::Float32x4,
                    VertexFormat::Float32x3,
                ],
                0,
            )),
        }
    }
}

/// A vertex of a model LOD (viewmodels, actors and the sky).
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ModelVertex {
    /// Position in model space.
    pub position: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// Surface normal.
    pub normal: [f32; 3],
}

impl ModelVertex {
    /// Vertex buffer layout, locations 0 to 2.
    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: Cow::Owned(packed_attributes(
                &[
                    VertexFormat::Float32x3,
                    VertexFormat::Float32x2,
                    VertexFormat::Float32x3,
                ],
                0,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_strides() {
        assert_eq!(MapVertex::layout().array_stride, 48);
        assert_eq!(ModelVertex::layout().array_stride, 32);
        let last = MapVertex::layout().attributes.last().copied().unwrap();
        assert_eq!((last.offset, last.shader_location), (36, 3));
    }
}
