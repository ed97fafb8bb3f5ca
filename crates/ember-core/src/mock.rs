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

//! A recording, in-memory graphics backend for headless tests.
//!
//! [`MockGraphicsDevice`] keeps the bytes of every buffer, logs every write,
//! applies buffer copies when a command buffer is submitted and can be told
//! to fail allocations or writes. [`MockSurface`] is a scriptable swapchain.
//! Both are cheap handles over shared state, so a test can keep a clone
//! after handing one to the renderer.

use crate::math::{Extent2D, Extent3D};
use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, SurfaceError};
use crate::renderer::traits::{
    CommandEncoder, GraphicsDevice, PresentOutcome, PresentationSurface, RenderPass, SurfaceFrame,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One command captured by a [`MockCommandEncoder`] or its render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// A render pass started.
    BeginPass {
        /// Color target of the pass.
        color_target: TextureViewId,
        /// Depth target of the pass.
        depth_target: Option<TextureViewId>,
    },
    /// `set_pipeline`.
    SetPipeline(RenderPipelineId),
    /// `set_bind_group`.
    SetBindGroup(u32, BindGroupId),
    /// `set_texture_table`.
    SetTextureTable(u32, TextureTableId),
    /// `set_vertex_buffer`.
    SetVertexBuffer(u32, BufferId, u64),
    /// `set_index_buffer`.
    SetIndexBuffer(BufferId, u64, IndexFormat),
    /// `draw`.
    Draw(Range<u32>, Range<u32>),
    /// `draw_indexed`.
    DrawIndexed(Range<u32>, i32, Range<u32>),
    /// `multi_draw_indexed_indirect`.
    MultiDrawIndexedIndirect(BufferId, u64, u32),
    /// The render pass ended.
    EndPass,
    /// `copy_buffer_to_buffer`.
    CopyBuffer {
        /// Source buffer.
        source: BufferId,
        /// Source offset.
        source_offset: u64,
        /// Destination buffer.
        destination: BufferId,
        /// Destination offset.
        destination_offset: u64,
        /// Bytes copied.
        size: u64,
    },
}

/// A logged `write_buffer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferWrite {
    /// The written buffer.
    pub buffer: BufferId,
    /// Byte offset.
    pub offset: u64,
    /// Bytes written.
    pub size: u64,
}

#[derive(Debug)]
struct MockBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug)]
struct MockTexture {
    size: Extent3D,
    mip_level_count: u32,
    written_mips: Vec<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    buffers: HashMap<BufferId, MockBuffer>,
    destroyed_buffers: HashSet<BufferId>,
    created_buffers: usize,
    writes: Vec<BufferWrite>,
    textures: HashMap<TextureId, MockTexture>,
    views: HashMap<TextureViewId, TextureId>,
    samplers: HashMap<SamplerId, (AddressMode, FilterMode, FilterMode)>,
    tables: HashMap<TextureTableId, Vec<Option<(TextureViewId, SamplerId)>>>,
    slot_writes: Vec<(TextureTableId, u32)>,
    shaders: HashSet<ShaderModuleId>,
    pipelines: HashMap<RenderPipelineId, String>,
    layouts: HashSet<BindGroupLayoutId>,
    bind_groups: HashSet<BindGroupId>,
    finished: HashMap<u64, Vec<RecordedCommand>>,
    submissions: Vec<Vec<RecordedCommand>>,
    fail_buffer_creations: usize,
    fail_buffer_writes: bool,
    fail_texture_creations: bool,
}

impl MockState {
    fn apply_copy(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        let bytes = match self.buffers.get(&source) {
            Some(buffer) => {
                let start = source_offset as usize;
                buffer.data[start..start + size as usize].to_vec()
            }
            None => return,
        };
        if let Some(buffer) = self.buffers.get_mut(&destination) {
            let start = destination_offset as usize;
            buffer.data[start..start + bytes.len()].copy_from_slice(&bytes);
        }
    }
}

/// A graphics device that records everything and keeps buffer bytes in memory.
#[derive(Debug, Clone)]
pub struct MockGraphicsDevice {
    next_id: Arc<AtomicUsize>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphicsDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicUsize::new(1)),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Makes the next `count` buffer creations fail with `OutOfMemory`.
    pub fn fail_next_buffer_creations(&self, count: usize) {
        self.state().fail_buffer_creations = count;
    }

    /// Makes every buffer write fail until switched off.
    pub fn fail_buffer_writes(&self, fail: bool) {
        self.state().fail_buffer_writes = fail;
    }

    /// Makes every texture creation fail until switched off.
    pub fn fail_texture_creations(&self, fail: bool) {
        self.state().fail_texture_creations = fail;
    }

    /// Bytes currently held by a live buffer.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state().buffers.get(&id).map(|b| b.data.clone())
    }

    /// Size in bytes of a live buffer.
    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.state().buffers.get(&id).map(|b| b.data.len() as u64)
    }

    /// Label of a live buffer.
    pub fn buffer_label(&self, id: BufferId) -> Option<String> {
        self.state().buffers.get(&id).map(|b| b.label.clone())
    }

    /// Usage of a live buffer.
    pub fn buffer_usage(&self, id: BufferId) -> Option<BufferUsage> {
        self.state().buffers.get(&id).map(|b| b.usage)
    }

    /// Number of buffers ever created successfully.
    pub fn created_buffer_count(&self) -> usize {
        self.state().created_buffers
    }

    /// Number of buffers currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.state().buffers.len()
    }

    /// Returns `true` if the buffer was destroyed.
    pub fn is_destroyed(&self, id: BufferId) -> bool {
        self.state().destroyed_buffers.contains(&id)
    }

    /// Every buffer write since creation or the last [`clear_log`](Self::clear_log).
    pub fn writes(&self) -> Vec<BufferWrite> {
        self.state().writes.clone()
    }

    /// Writes that targeted `id`.
    pub fn writes_to(&self, id: BufferId) -> Vec<BufferWrite> {
        self.state()
            .writes
            .iter()
            .filter(|w| w.buffer == id)
            .copied()
            .collect()
    }

    /// Number of logged buffer writes.
    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Forgets logged writes, slot writes and submissions.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.slot_writes.clear();
        state.submissions.clear();
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.state().textures.len()
    }

    /// Mip levels of a live texture, and which of them were written.
    pub fn texture_mips(&self, id: TextureId) -> Option<(u32, Vec<u32>)> {
        self.state()
            .textures
            .get(&id)
            .map(|t| (t.mip_level_count, t.written_mips.clone()))
    }

    /// Size of a live texture.
    pub fn texture_size(&self, id: TextureId) -> Option<Extent3D> {
        self.state().textures.get(&id).map(|t| t.size)
    }

    /// Every live texture with its mip level count.
    pub fn textures(&self) -> Vec<(TextureId, u32)> {
        let mut textures: Vec<_> = self
            .state()
            .textures
            .iter()
            .map(|(id, t)| (*id, t.mip_level_count))
            .collect();
        textures.sort_by_key(|(id, _)| *id);
        textures
    }

    /// The `(view, sampler)` written into a table slot.
    pub fn table_slot(&self, table: TextureTableId, slot: u32) -> Option<(TextureViewId, SamplerId)> {
        self.state()
            .tables
            .get(&table)
            .and_then(|slots| slots.get(slot as usize).copied().flatten())
    }

    /// Logged texture-table slot writes.
    pub fn slot_writes(&self) -> Vec<(TextureTableId, u32)> {
        self.state().slot_writes.clone()
    }

    /// Address mode and filters of a live sampler.
    pub fn sampler_modes(&self, id: SamplerId) -> Option<(AddressMode, FilterMode, FilterMode)> {
        self.state().samplers.get(&id).copied()
    }

    /// Number of live samplers.
    pub fn sampler_count(&self) -> usize {
        self.state().samplers.len()
    }

    /// Number of live render pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.state().pipelines.len()
    }

    /// Label of a live render pipeline.
    pub fn pipeline_label(&self, id: RenderPipelineId) -> Option<String> {
        self.state().pipelines.get(&id).cloned()
    }

    /// Number of submitted command buffers.
    pub fn submission_count(&self) -> usize {
        self.state().submissions.len()
    }

    /// Commands of every submitted command buffer, in submission order.
    pub fn submissions(&self) -> Vec<Vec<RecordedCommand>> {
        self.state().submissions.clone()
    }

    /// Commands of the last submitted command buffer.
    pub fn last_submission(&self) -> Option<Vec<RecordedCommand>> {
        self.state().submissions.last().cloned()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader_module(
        &self,
        _descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let id = ShaderModuleId(self.next());
        self.state().shaders.insert(id);
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.state()
            .shaders
            .remove(&id)
            .then_some(())
            .ok_or(ResourceError::NotFound)
    }

    fn create_bind_group_layout(
        &self,
        _descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let id = BindGroupLayoutId(self.next());
        self.state().layouts.insert(id);
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.state()
            .layouts
            .remove(&id)
            .then_some(())
            .ok_or(ResourceError::NotFound)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.state();
        if !state.layouts.contains(&descriptor.layout) {
            return Err(ResourceError::NotFound);
        }
        let id = BindGroupId(self.next());
        state.bind_groups.insert(id);
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        self.state()
            .bind_groups
            .remove(&id)
            .then_some(())
            .ok_or(ResourceError::NotFound)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let mut state = self.state();
        if !state.shaders.contains(&descriptor.shader) {
            return Err(ResourceError::NotFound);
        }
        let id = RenderPipelineId(self.next());
        state
            .pipelines
            .insert(id, descriptor.label.unwrap_or_default().to_string());
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        self.state()
            .pipelines
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        if state.fail_buffer_creations > 0 {
            state.fail_buffer_creations -= 1;
            return Err(ResourceError::OutOfMemory);
        }
        let id = BufferId(self.next());
        state.buffers.insert(
            id,
            MockBuffer {
                label: descriptor.label.as_deref().unwrap_or_default().to_string(),
                usage: descriptor.usage,
                data: vec![0; descriptor.size as usize],
            },
        );
        state.created_buffers += 1;
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state();
        state.buffers.remove(&id).ok_or(ResourceError::NotFound)?;
        state.destroyed_buffers.insert(id);
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        if state.fail_buffer_writes {
            return Err(ResourceError::BackendError("injected write failure".into()));
        }
        let buffer = state.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.data.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.data[start..end].copy_from_slice(data);
        state.writes.push(BufferWrite {
            buffer: id,
            offset,
            size: data.len() as u64,
        });
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let mut state = self.state();
        if state.fail_texture_creations {
            return Err(ResourceError::OutOfMemory);
        }
        let id = TextureId(self.next());
        state.textures.insert(
            id,
            MockTexture {
                size: descriptor.size,
                mip_level_count: descriptor.mip_level_count,
                written_mips: Vec::new(),
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.state()
            .textures
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        data: &[u8],
        bytes_per_row: u32,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        let texture = state.textures.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if mip_level >= texture.mip_level_count
            || data.len() < (bytes_per_row * size.height) as usize
        {
            return Err(ResourceError::OutOfBounds);
        }
        texture.written_mips.push(mip_level);
        Ok(())
    }

    fn create_texture_view(
        &self,
        texture: TextureId,
        _label: Option<&str>,
    ) -> Result<TextureViewId, ResourceError> {
        let mut state = self.state();
        if !state.textures.contains_key(&texture) {
            return Err(ResourceError::NotFound);
        }
        let id = TextureViewId(self.next());
        state.views.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        self.state()
            .views
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let id = SamplerId(self.next());
        self.state().samplers.insert(
            id,
            (
                descriptor.address_mode,
                descriptor.min_filter,
                descriptor.mipmap_filter,
            ),
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.state()
            .samplers
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_texture_table(
        &self,
        descriptor: &TextureTableDescriptor,
    ) -> Result<TextureTableId, ResourceError> {
        let id = TextureTableId(self.next());
        self.state()
            .tables
            .insert(id, vec![None; descriptor.capacity as usize]);
        Ok(id)
    }

    fn write_texture_table_slot(
        &self,
        table: TextureTableId,
        slot: u32,
        view: TextureViewId,
        sampler: SamplerId,
    ) -> Result<(), ResourceError> {
        let mut state = self.state();
        if !state.views.contains_key(&view) || !state.samplers.contains_key(&sampler) {
            return Err(ResourceError::NotFound);
        }
        let slots = state.tables.get_mut(&table).ok_or(ResourceError::NotFound)?;
        let entry = slots
            .get_mut(slot as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        *entry = Some((view, sampler));
        state.slot_writes.push((table, slot));
        Ok(())
    }

    fn destroy_texture_table(&self, id: TextureTableId) -> Result<(), ResourceError> {
        self.state()
            .tables
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockCommandEncoder {
            device: self.clone(),
            commands: Vec::new(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let mut state = self.state();
        let Some(commands) = state.finished.remove(&command_buffer.0) else {
            log::warn!("MockGraphicsDevice: Unknown command buffer {command_buffer:?} submitted");
            return;
        };
        for command in &commands {
            if let RecordedCommand::CopyBuffer {
                source,
                source_offset,
                destination,
                destination_offset,
                size,
            } = *command
            {
                state.apply_copy(source, source_offset, destination, destination_offset, size);
            }
        }
        state.submissions.push(commands);
    }
}

/// A command encoder that records into a list.
#[derive(Debug)]
pub struct MockCommandEncoder {
    device: MockGraphicsDevice,
    commands: Vec<RecordedCommand>,
}

/// A render pass that appends to its encoder's list, and records
/// [`RecordedCommand::EndPass`] when dropped.
#[derive(Debug)]
pub struct MockRenderPass<'a> {
    commands: &'a mut Vec<RecordedCommand>,
}

impl Drop for MockRenderPass<'_> {
    fn drop(&mut self) {
        self.commands.push(RecordedCommand::EndPass);
    }
}

impl RenderPass for MockRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.commands.push(RecordedCommand::SetPipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId) {
        self.commands
            .push(RecordedCommand::SetBindGroup(index, bind_group));
    }

    fn set_texture_table(&mut self, index: u32, table: TextureTableId) {
        self.commands
            .push(RecordedCommand::SetTextureTable(index, table));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, offset: u64) {
        self.commands
            .push(RecordedCommand::SetVertexBuffer(slot, buffer, offset));
    }

    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, index_format: IndexFormat) {
        self.commands
            .push(RecordedCommand::SetIndexBuffer(buffer, offset, index_format));
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(RecordedCommand::Draw(vertices, instances));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands
            .push(RecordedCommand::DrawIndexed(indices, base_vertex, instances));
    }

    fn multi_draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64, count: u32) {
        self.commands
            .push(RecordedCommand::MultiDrawIndexedIndirect(buffer, offset, count));
    }
}

impl CommandEncoder for MockCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        self.commands.push(RecordedCommand::BeginPass {
            color_target: descriptor.color_target,
            depth_target: descriptor.depth_target,
        });
        Box::new(MockRenderPass {
            commands: &mut self.commands,
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
        self.commands.push(RecordedCommand::CopyBuffer {
            source,
            source_offset,
            destination,
            destination_offset,
            size,
        });
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let id = self.device.next() as u64;
        let MockCommandEncoder { device, commands } = *self;
        device.state().finished.insert(id, commands);
        CommandBufferId(id)
    }
}

#[derive(Debug)]
struct MockSurfaceState {
    extent: Extent2D,
    window_extent: Extent2D,
    acquired: bool,
    acquire_script: VecDeque<Result<bool, SurfaceError>>,
    present_script: VecDeque<Result<PresentOutcome, SurfaceError>>,
    resize_script: VecDeque<Result<(), SurfaceError>>,
    resizes: Vec<(u32, u32)>,
    presents: usize,
    discards: usize,
}

/// A scriptable swapchain. Unscripted calls succeed.
#[derive(Debug, Clone)]
pub struct MockSurface {
    view: TextureViewId,
    state: Arc<Mutex<MockSurfaceState>>,
}

impl MockSurface {
    /// View id reported for every acquired frame.
    pub const FRAME_VIEW: TextureViewId = TextureViewId(usize::MAX);

    /// Creates a surface configured for `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            view: Self::FRAME_VIEW,
            state: Arc::new(Mutex::new(MockSurfaceState {
                extent: Extent2D::new(width, height),
                window_extent: Extent2D::new(width, height),
                acquired: false,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                resize_script: VecDeque::new(),
                resizes: Vec::new(),
                presents: 0,
                discards: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockSurfaceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queues the outcome of the next acquire: `Ok(suboptimal)` or an error.
    pub fn script_acquire(&self, outcome: Result<bool, SurfaceError>) {
        self.state().acquire_script.push_back(outcome);
    }

    /// Queues the outcome of the next present.
    pub fn script_present(&self, outcome: Result<PresentOutcome, SurfaceError>) {
        self.state().present_script.push_back(outcome);
    }

    /// Queues the outcome of the next resize.
    pub fn script_resize(&self, outcome: Result<(), SurfaceError>) {
        self.state().resize_script.push_back(outcome);
    }

    /// Simulates the user resizing the window.
    pub fn set_window_extent(&self, width: u32, height: u32) {
        self.state().window_extent = Extent2D::new(width, height);
    }

    /// Every resize request received.
    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.state().resizes.clone()
    }

    /// Number of presented frames.
    pub fn present_count(&self) -> usize {
        self.state().presents
    }

    /// Number of discarded frames.
    pub fn discard_count(&self) -> usize {
        self.state().discards
    }

    /// Returns `true` while a frame is acquired.
    pub fn has_frame(&self) -> bool {
        self.state().acquired
    }
}

impl PresentationSurface for MockSurface {
    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn extent(&self) -> Extent2D {
        self.state().extent
    }

    fn window_extent(&self) -> Extent2D {
        self.state().window_extent
    }

    fn acquire_frame(&mut self) -> Result<SurfaceFrame, SurfaceError> {
        let view = self.view;
        let mut state = self.state();
        let suboptimal = state.acquire_script.pop_front().unwrap_or(Ok(false))?;
        state.acquired = true;
        Ok(SurfaceFrame { view, suboptimal })
    }

    fn present(&mut self) -> Result<PresentOutcome, SurfaceError> {
        let mut state = self.state();
        if !state.acquired {
            return Err(SurfaceError::NoFrame);
        }
        state.acquired = false;
        let outcome = state
            .present_script
            .pop_front()
            .unwrap_or(Ok(PresentOutcome::Presented))?;
        state.presents += 1;
        Ok(outcome)
    }

    fn discard_frame(&mut self) {
        let mut state = self.state();
        if state.acquired {
            state.acquired = false;
            state.discards += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        let mut state = self.state();
        state.resizes.push((width, height));
        state.resize_script.pop_front().unwrap_or(Ok(()))?;
        if width > 0 && height > 0 {
            state.extent = Extent2D::new(width, height);
        }
        Ok(())
    }
}
