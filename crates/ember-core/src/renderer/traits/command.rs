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
    BindGroupId, BufferId, CommandBufferId, IndexFormat, RenderPassDescriptor, RenderPipelineId,
    TextureTableId,
};
use std::ops::Range;

/// A trait representing an active render pass, used for recording drawing commands.
///
/// Resource handles are plain IDs; a backend resolves them when the command is
/// recorded and logs (rather than fails) on an unknown ID.
pub trait RenderPass {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a uniform bind group to the given group index.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId);

    /// Binds the bind group of a texture table to the given group index.
    fn set_texture_table(&mut self, index: u32, table: TextureTableId);

    /// Binds a vertex buffer to a specific input slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64);

    /// Binds an index buffer for indexed drawing.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat);

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Records `count` indexed draws whose arguments are read from `buffer`,
    /// starting at byte `offset` and laid out as
    /// [`DrawIndexedIndirect`](crate::renderer::api::DrawIndexedIndirect).
    fn multi_draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64, count: u32);
}

/// A trait for an object that records a sequence of GPU commands.
///
/// Commands are recorded into an internal buffer; [`finish`](Self::finish)
/// produces a [`CommandBufferId`] the device can submit.
pub trait CommandEncoder {
    /// Begins a new render pass. The encoder stays mutably borrowed until the
    /// returned pass is dropped.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder>;

    /// Records a buffer-to-buffer copy. Must not be called while a pass is open.
    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Finalizes the recording.
    fn finish(self: Box<Self>) -> CommandBufferId;
}
