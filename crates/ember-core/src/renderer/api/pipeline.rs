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

//! Shader, pipeline and vertex-layout descriptors.

use super::flags::ShaderStageFlags;
use super::{BufferId, TextureFormat, TextureTableId};
use std::borrow::Cow;

/// An opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModuleId(pub usize);

/// An opaque handle to a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(pub usize);

/// An opaque handle to a uniform bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutId(pub usize);

/// An opaque handle to a uniform bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// Shader code in one of the forms a backend accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSource {
    /// WGSL text.
    Wgsl(String),
    /// SPIR-V words.
    SpirV(Vec<u32>),
}

/// A descriptor used to create a [`ShaderModuleId`].
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The shader code.
    pub source: &'a ShaderSource,
}

/// Format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One `f32`.
    Float32,
    /// Two `f32`.
    Float32x2,
    /// Three `f32`.
    Float32x3,
    /// Four `f32`.
    Float32x4,
    /// One `u32`.
    Uint32,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub const fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute format.
    pub format: VertexFormat,
    /// Byte offset inside one element.
    pub offset: u64,
    /// Shader input location.
    pub shader_location: u32,
}

/// Whether a buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// Advance once per vertex.
    Vertex,
    /// Advance once per instance.
    Instance,
}

/// Layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferLayout<'a> {
    /// Size of one element in bytes.
    pub array_stride: u64,
    /// Step rate.
    pub step_mode: VertexStepMode,
    /// Attributes read from each element.
    pub attributes: Cow<'a, [VertexAttribute]>,
}

/// Assembles attributes with tightly packed offsets, in order.
pub fn packed_attributes(formats: &[VertexFormat], first_location: u32) -> Vec<VertexAttribute> {
    let mut offset = 0;
    formats
        .iter()
        .zip(first_location..)
        .map(|(format, shader_location)| {
            let attribute = VertexAttribute {
                format: *format,
                offset,
                shader_location,
            };
            offset += format.size();
            attribute
        })
        .collect()
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Every three vertices form a triangle.
    TriangleList,
    /// Every two vertices form a line.
    LineList,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Draw both faces.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// Depth comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Always pass.
    Always,
    /// Pass if the new depth is smaller.
    Less,
    /// Pass if the new depth is smaller or equal.
    LessEqual,
}

/// Depth test state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Depth attachment format.
    pub format: TextureFormat,
    /// Whether fragments write depth.
    pub write_enabled: bool,
    /// Comparison against the stored depth.
    pub compare: CompareFunction,
}

/// Color blending of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Replace the target.
    Opaque,
    /// Standard `src_alpha, 1 - src_alpha` blending.
    AlphaBlend,
}

/// One bind group slot of a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBinding {
    /// A uniform bind group of the given layout.
    Uniforms(BindGroupLayoutId),
    /// The bind group of a texture table.
    TextureTable(TextureTableId),
}

/// A descriptor used to create a [`RenderPipelineId`].
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The module containing both entry points.
    pub shader: ShaderModuleId,
    /// Vertex entry point.
    pub vertex_entry: &'a str,
    /// Fragment entry point.
    pub fragment_entry: &'a str,
    /// Vertex buffer slots, in slot order.
    pub vertex_buffers: &'a [VertexBufferLayout<'a>],
    /// Bind group slots, in group order.
    pub bindings: &'a [PipelineBinding],
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Depth state, `None` if the pipeline ignores depth.
    pub depth: Option<DepthState>,
    /// Color blending.
    pub blend: BlendMode,
    /// Format of the color target.
    pub color_format: TextureFormat,
}

/// One uniform buffer entry of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLayoutEntry {
    /// Binding index.
    pub binding: u32,
    /// Stages that read the uniform.
    pub visibility: ShaderStageFlags,
}

/// A descriptor used to create a [`BindGroupLayoutId`].
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Uniform entries.
    pub entries: &'a [UniformLayoutEntry],
}

/// One buffer binding inside a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    /// Binding index.
    pub binding: u32,
    /// Bound buffer.
    pub buffer: BufferId,
    /// Byte offset into the buffer.
    pub offset: u64,
    /// Bound size, `None` for the rest of the buffer.
    pub size: Option<u64>,
}

/// A descriptor used to create a [`BindGroupId`].
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// Buffer bindings.
    pub entries: &'a [BufferBinding],
}
