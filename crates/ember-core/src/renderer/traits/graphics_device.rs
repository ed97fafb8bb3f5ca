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

use crate::math::Extent3D;
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// The main interface for creating and managing GPU resources.
///
/// Every method is callable from the render thread through `&self`; a
/// backend keeps its resource tables behind interior locks.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a shader module from the provided descriptor.
    /// ## Errors
    /// * `ResourceError::ShaderCompilation` - If the source fails to compile.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys a shader module.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a layout for a group of uniform buffers.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Destroys a bind group layout.
    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError>;

    /// Creates a group of uniform buffer bindings.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Destroys a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Creates a render pipeline from the provided descriptor.
    /// ## Errors
    /// * `ResourceError` - If a referenced module, layout or table is unknown,
    ///   or if the backend rejects the pipeline.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates a new GPU buffer.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the allocation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` into the buffer at byte `offset`. The write is ordered
    /// before any command buffer submitted afterwards.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer size.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Creates a texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Uploads one full mip level of a texture.
    fn write_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        data: &[u8],
        bytes_per_row: u32,
        size: Extent3D,
    ) -> Result<(), ResourceError>;

    /// Creates a view covering every mip level of a texture.
    fn create_texture_view(
        &self,
        texture: TextureId,
        label: Option<&str>,
    ) -> Result<TextureViewId, ResourceError>;

    /// Destroys a texture view.
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a fixed-capacity texture table.
    fn create_texture_table(
        &self,
        descriptor: &TextureTableDescriptor,
    ) -> Result<TextureTableId, ResourceError>;

    /// Points `slot` of a texture table at a view and sampler.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `slot` is not below the table capacity.
    fn write_texture_table_slot(
        &self,
        table: TextureTableId,
        slot: u32,
        view: TextureViewId,
        sampler: SamplerId,
    ) -> Result<(), ResourceError>;

    /// Destroys a texture table.
    fn destroy_texture_table(&self, id: TextureTableId) -> Result<(), ResourceError>;

    /// Creates a new command encoder.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a finished command buffer to the queue.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId);
}
