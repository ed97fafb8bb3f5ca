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

//! Recorded pass commands.
//!
//! Draws are recorded while the frame is built and replayed into the single
//! render pass at `end_frame`, so the pass is only open for the replay.

use crate::scene::IndirectDraw;
use crate::stats::FrameStats;
use ember_core::renderer::{
    BindGroupId, BufferId, IndexFormat, RenderPass, RenderPipelineId,
    TextureTableId,
};
use std::ops::Range;

/// One call on a [`RenderPass`].
#[derive(Debug, Clone, PartialEq)]
pub enum PassCommand {
    SetPipeline(RenderPipelineId),
    SetBindGroup(u32, BindGroupId),
    SetTextureTable(u32, TextureTableId),
    SetVertexBuffer(u32, BufferId),
    SetIndexBuffer(BufferId),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
    MultiDrawIndexedIndirect {
        commands: BufferId,
        count: u32,
    },
}

/// The ordered draw list of one frame.
#[derive(Debug, Default)]
pub struct FrameCommands {
    commands: Vec<PassCommand>,
    bound_pipeline: Option<RenderPipelineId>,
}

impl FrameCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: PassCommand) {
        self.commands.push(command);
    }

    /// Binds `pipeline` unless it is already the bound one.
    pub fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        if self.bound_pipeline != Some(pipeline) {
            self.bound_pipeline = Some(pipeline);
            self.commands.push(PassCommand::SetPipeline(pipeline));
        }
    }

    /// Binds the frame-wide groups: uniforms at 0, the texture table at 1.
    pub fn bind_globals(&mut self, uniforms: BindGroupId, textures: TextureTableId) {
        self.commands.push(PassCommand::SetBindGroup(0, uniforms));
        self.commands.push(PassCommand::SetTextureTable(1, textures));
    }

    /// Records one indirect multi-draw of a packed batch. Slot 0 is the
    /// vertex buffer, slot 1 the per-instance data.
    pub fn indirect(&mut self, pipeline: RenderPipelineId, draw: IndirectDraw) {
        self.set_pipeline(pipeline);
        self.commands.extend([
            PassCommand::SetVertexBuffer(0, draw.vertices),
            PassCommand::SetVertexBuffer(1, draw.instances),
            PassCommand::SetIndexBuffer(draw.indices),
            PassCommand::MultiDrawIndexedIndirect {
                commands: draw.commands,
                count: draw.draw_count,
            },
        ]);
    }

    /// Records an indexed draw of a single vertex buffer.
    pub fn indexed(
        &mut self,
        pipeline: RenderPipelineId,
        vertices: BufferId,
        indices: BufferId,
        index_count: u32,
    ) {
        self.set_pipeline(pipeline);
        self.commands.extend([
            PassCommand::SetVertexBuffer(0, vertices),
            PassCommand::SetIndexBuffer(indices),
            PassCommand::DrawIndexed {
                indices: 0..index_count,
                base_vertex: 0,
                instances: 0..1,
            },
        ]);
    }

    /// Records a non-indexed draw of a single vertex buffer.
    pub fn vertices(&mut self, pipeline: RenderPipelineId, vertices: BufferId, vertex_count: u32) {
        self.set_pipeline(pipeline);
        self.commands.extend([
            PassCommand::SetVertexBuffer(0, vertices),
            PassCommand::Draw {
                vertices: 0..vertex_count,
                instances: 0..1,
            },
        ]);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.bound_pipeline = None;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn as_slice(&self) -> &[PassCommand] {
        &self.commands
    }

    /// Encodes every command into `pass` in order and counts what was drawn.
    pub fn replay(&self, pass: &mut dyn RenderPass, stats: &mut FrameStats) {
        for command in &self.commands {
            match command {
                PassCommand::SetPipeline(pipeline) => {
                    pass.set_pipeline(*pipeline);
                    stats.pipeline_switches += 1;
                }
                PassCommand::SetBindGroup(index, group) => pass.set_bind_group(*index, *group),
                PassCommand::SetTextureTable(index, table) => pass.set_texture_table(*index, *table),
                PassCommand::SetVertexBuffer(slot, buffer) => pass.set_vertex_buffer(*slot, *buffer, 0),
                PassCommand::SetIndexBuffer(buffer) => {
                    pass.set_index_buffer(*buffer, 0, IndexFormat::Uint32)
                }
                PassCommand::Draw {
                    vertices,
                    instances,
                } => {
                    pass.draw(vertices.clone(), instances.clone());
                    stats.draws += 1;
                }
                PassCommand::DrawIndexed {
                    indices,
                    base_vertex,
                    instances,
                } => {
                    pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                    stats.indexed_draws += 1;
                }
                PassCommand::MultiDrawIndexedIndirect { commands, count } => {
                    pass.multi_draw_indexed_indirect(*commands, 0, *count);
                    stats.multi_draw_calls += 1;
                    stats.indirect_draws += count;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingPass {
        calls: Vec<&'static str>,
    }

    impl RenderPass for CountingPass {
        fn set_pipeline(&mut self, _: RenderPipelineId) {
            self.calls.push("pipeline");
        }
        fn set_bind_group(&mut self, _: u32, _: BindGroupId) {
            self.calls.push("bind_group");
        }
        fn set_texture_table(&mut self, _: u32, _: TextureTableId) {
            self.calls.push("texture_table");
        }
        fn set_vertex_buffer(&mut self, _: u32, _: BufferId, _: u64) {
            self.calls.push("vertex_buffer");
        }
        fn set_index_buffer(&mut self, _: BufferId, _: u64, _: IndexFormat) {
            self.calls.push("index_buffer");
        }
        fn draw(&mut self, _: Range<u32>, _: Range<u32>) {
            self.calls.push("draw");
        }
        fn draw_indexed(&mut self, _: Range<u32>, _: i32, _: Range<u32>) {
            self.calls.push("draw_indexed");
        }
        fn multi_draw_indexed_indirect(&mut self, _: BufferId, _: u64, _: u32) {
            self.calls.push("multi_draw");
        }
    }

    fn batch(draw_count: u32) -> IndirectDraw {
        IndirectDraw {
            vertices: BufferId(1),
            indices: BufferId(2),
            instances: BufferId(3),
            commands: BufferId(4),
            draw_count,
        }
    }

    #[test]
    fn test_same_pipeline_is_bound_once() {
        let mut commands = FrameCommands::new();
        commands.indirect(RenderPipelineId(7), batch(3));
        commands.indirect(RenderPipelineId(7), batch(2));
        commands.indirect(RenderPipelineId(8), batch(1));
        let switches = commands
            .as_slice()
            .iter()
            .filter(|c| matches!(c, PassCommand::SetPipeline(_)))
            .count();
        assert_eq!(switches, 2);
    }

    #[test]
    fn test_replay_counts_draws() {
        let mut commands = FrameCommands::new();
        commands.bind_globals(BindGroupId(1), TextureTableId(1));
        commands.indexed(RenderPipelineId(1), BufferId(5), BufferId(6), 36);
        commands.indirect(RenderPipelineId(2), batch(4));
        commands.vertices(RenderPipelineId(3), BufferId(9), 6);

        let mut pass = CountingPass::default();
        let mut stats = FrameStats::default();
        commands.replay(&mut pass, &mut stats);

        assert_eq!(pass.calls.first(), Some(&"bind_group"));
        assert_eq!(stats.pipeline_switches, 3);
        assert_eq!(stats.indexed_draws, 1);
        assert_eq!(stats.multi_draw_calls, 1);
        assert_eq!(stats.indirect_draws, 4);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.draw_calls(), 3);
    }

    #[test]
    fn test_clear_forgets_bound_pipeline() {
        let mut commands = FrameCommands::new();
        commands.set_pipeline(RenderPipelineId(1));
        commands.clear();
        assert!(commands.is_empty());
        commands.set_pipeline(RenderPipelineId(1));
        assert_eq!(commands.len(), 1);
    }
}
