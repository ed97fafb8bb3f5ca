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

use ember_core::renderer::{
    BindGroupId, BufferId, CommandBufferId, CommandEncoder, IndexFormat, RenderPass,
    RenderPassDescriptor, RenderPipelineId, TextureTableId,
};
use std::ops::Range;

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

pub struct WgpuRenderPass<'a> {
    pub(crate) pass: wgpu::RenderPass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl RenderPass for WgpuRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline_id: RenderPipelineId) {
        if let Some(pipeline) = self.device.render_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!(
                "WgpuRenderPass: RenderPipelineId {:?} not found.",
                pipeline_id
            );
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId) {
        if let Some(bind_group) = self.device.bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuRenderPass: BindGroupId {:?} not found.", bind_group_id);
        }
    }

    fn set_texture_table(&mut self, index: u32, table: TextureTableId) {
        if let Some(bind_group) = self.device.texture_table_bind_group(table) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuRenderPass: TextureTableId {:?} not found.", table);
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer_id: BufferId, offset: u64) {
        if let Some(buffer) = self.device.buffer(buffer_id) {
            self.pass.set_vertex_buffer(slot, buffer.slice(offset..));
        } else {
            log::warn!("WgpuRenderPass: Vertex BufferId {:?} not found.", buffer_id);
        }
    }

    fn set_index_buffer(&mut self, buffer_id: BufferId, offset: u64, index_format: IndexFormat) {
        if let Some(buffer) = self.device.buffer(buffer_id) {
            self.pass
                .set_index_buffer(buffer.slice(offset..), index_format.into_wgpu());
        } else {
            log::warn!("WgpuRenderPass: Index BufferId {:?} not found.", buffer_id);
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }

    fn multi_draw_indexed_indirect(&mut self, buffer_id: BufferId, offset: u64, count: u32) {
        if let Some(buffer) = self.device.buffer(buffer_id) {
            self.pass
                .multi_draw_indexed_indirect(buffer.as_ref(), offset, count);
        } else {
            log::warn!(
                "WgpuRenderPass: Indirect BufferId {:?} not found.",
                buffer_id
            );
        }
    }
}

/// A pass that records nothing, handed out when the encoder is unusable.
struct InertRenderPass;

impl RenderPass for InertRenderPass {
    fn set_pipeline(&mut self, _: RenderPipelineId) {}
    fn set_bind_group(&mut self, _: u32, _: BindGroupId) {}
    fn set_texture_table(&mut self, _: u32, _: TextureTableId) {}
    fn set_vertex_buffer(&mut self, _: u32, _: BufferId, _: u64) {}
    fn set_index_buffer(&mut self, _: BufferId, _: u64, _: IndexFormat) {}
    fn draw(&mut self, _: Range<u32>, _: Range<u32>) {}
    fn draw_indexed(&mut self, _: Range<u32>, _: i32, _: Range<u32>) {}
    fn multi_draw_indexed_indirect(&mut self, _: BufferId, _: u64, _: u32) {}
}

pub struct WgpuCommandEncoder {
    pub(crate) encoder: Option<wgpu::CommandEncoder>,
    pub(crate) device: WgpuDevice,
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        let Some(color_view) = self.device.texture_view(descriptor.color_target) else {
            log::error!(
                "WgpuCommandEncoder: Color target {:?} not found, pass '{}' skipped.",
                descriptor.color_target,
                descriptor.label.unwrap_or_default()
            );
            return Box::new(InertRenderPass);
        };
        let depth_view = descriptor
            .depth_target
            .and_then(|id| self.device.texture_view(id));

        let color_attachments = [Some(wgpu::RenderPassColorAttachment {
            view: &color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: match descriptor.clear_color {
                    Some(color) => wgpu::LoadOp::Clear(color.into_wgpu()),
                    None => wgpu::LoadOp::Load,
                },
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })];

        let depth_stencil_attachment =
            depth_view
                .as_deref()
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: match descriptor.clear_depth {
                            Some(depth) => wgpu::LoadOp::Clear(depth),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let wgpu_descriptor = wgpu::RenderPassDescriptor {
            label: descriptor.label,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        };

        let Some(encoder) = self.encoder.as_mut() else {
            log::error!("WgpuCommandEncoder: Render pass begun on a finished encoder.");
            return Box::new(InertRenderPass);
        };
        let pass = encoder.begin_render_pass(&wgpu_descriptor);

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        let (Some(source_buffer), Some(destination_buffer)) =
            (self.device.buffer(source), self.device.buffer(destination))
        else {
            log::warn!(
                "WgpuCommandEncoder: Copy between unknown buffers {:?} -> {:?} skipped.",
                source,
                destination
            );
            return;
        };
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.copy_buffer_to_buffer(
                &source_buffer,
                source_offset,
                &destination_buffer,
                destination_offset,
                size,
            );
        }
    }

    fn finish(mut self: Box<Self>) -> CommandBufferId {
        match self.encoder.take() {
            Some(encoder) => self.device.register_command_buffer(encoder.finish()),
            None => {
                log::error!("WgpuCommandEncoder: finish() called twice.");
                CommandBufferId(u64::MAX)
            }
        }
    }
}
