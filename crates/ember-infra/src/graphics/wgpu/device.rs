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

use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ember_core::math::Extent3D;
use ember_core::renderer::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutId,
    BufferDescriptor, BufferId, CommandBufferId, CommandEncoder, GraphicsDevice, PipelineBinding,
    RenderPipelineDescriptor, RenderPipelineId, ResourceError, SamplerDescriptor, SamplerId,
    ShaderModuleDescriptor, ShaderModuleId, ShaderSource, TextureDescriptor,
    TextureId, TextureTableDescriptor, TextureTableId, TextureViewId,
};

use super::command::WgpuCommandEncoder;
use super::context::WgpuGraphicsContext;
use super::conversions::IntoWgpu;

/// One slot of a texture table: what was written to it, if anything.
type TableSlot = Option<(TextureViewId, SamplerId)>;

#[derive(Debug)]
struct WgpuBufferEntry {
    wgpu_buffer: Arc<wgpu::Buffer>,
    size: u64,
}

#[derive(Debug)]
struct WgpuTextureTableEntry {
    layout: Arc<wgpu::BindGroupLayout>,
    slots: Vec<TableSlot>,
    bind_group: Arc<wgpu::BindGroup>,
}

/// A 1x1 white texture bound into every texture-table slot nothing was
/// written to, so the bind group always validates.
#[derive(Debug)]
struct Placeholder {
    _texture: wgpu::Texture,
    view: Arc<wgpu::TextureView>,
    sampler: Arc<wgpu::Sampler>,
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    placeholder: Placeholder,

    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    pipelines: Mutex<HashMap<RenderPipelineId, Arc<wgpu::RenderPipeline>>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, Arc<wgpu::Texture>>>,
    texture_views: Mutex<HashMap<TextureViewId, Arc<wgpu::TextureView>>>,
    samplers: Mutex<HashMap<SamplerId, Arc<wgpu::Sampler>>>,
    texture_tables: Mutex<HashMap<TextureTableId, WgpuTextureTableEntry>>,

    // One counter for every resource kind; ids are never reused.
    next_id: AtomicUsize,
    vram_allocated_bytes: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU graphics device.
///
/// Engine handles are plain ids; this device owns the `wgpu` objects behind
/// them in one table per resource kind.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

fn remove<K: std::hash::Hash + Eq, V>(
    table: &Mutex<HashMap<K, V>>,
    what: &str,
    id: K,
) -> Result<V, ResourceError> {
    lock(table, what)?.remove(&id).ok_or(ResourceError::NotFound)
}

impl WgpuDevice {
    /// Wraps the logical device of `context`.
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Result<Self, ResourceError> {
        let placeholder = {
            let guard = lock(&context, "context")?;
            Self::create_placeholder(&guard)
        };
        Ok(Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                placeholder,
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                texture_tables: Mutex::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        })
    }

    fn create_placeholder(context: &WgpuGraphicsContext) -> Placeholder {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Texture Table Placeholder"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Table Placeholder Sampler"),
            ..Default::default()
        });
        Placeholder {
            _texture: texture,
            view: Arc::new(view),
            sampler: Arc::new(sampler),
        }
    }

    fn next_id(&self) -> usize {
        self.internal.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs `operation` with the context locked.
    fn with_context<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&WgpuGraphicsContext) -> Result<R, ResourceError>,
    {
        let context_guard = lock(&self.internal.context, "context")?;
        operation(&context_guard)
    }

    /// Bytes currently allocated for buffers and textures.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    pub(crate) fn render_pipeline(&self, id: RenderPipelineId) -> Option<Arc<wgpu::RenderPipeline>> {
        lock(&self.internal.pipelines, "pipelines")
            .ok()?
            .get(&id)
            .cloned()
    }

    pub(crate) fn buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        lock(&self.internal.buffers, "buffers")
            .ok()?
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    pub(crate) fn bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        lock(&self.internal.bind_groups, "bind_groups")
            .ok()?
            .get(&id)
            .cloned()
    }

    pub(crate) fn texture_table_bind_group(
        &self,
        id: TextureTableId,
    ) -> Option<Arc<wgpu::BindGroup>> {
        lock(&self.internal.texture_tables, "texture_tables")
            .ok()?
            .get(&id)
            .map(|entry| Arc::clone(&entry.bind_group))
    }

    pub(crate) fn texture_view(&self, id: TextureViewId) -> Option<Arc<wgpu::TextureView>> {
        lock(&self.internal.texture_views, "texture_views")
            .ok()?
            .get(&id)
            .cloned()
    }

    /// Registers a view of a swapchain texture, returning its abstract id.
    pub(crate) fn register_surface_view(
        &self,
        texture: &wgpu::Texture,
    ) -> Result<TextureViewId, ResourceError> {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Surface Frame View"),
            ..Default::default()
        });
        let id = TextureViewId(self.next_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        Ok(id)
    }

    /// Registers a finished wgpu::CommandBuffer, returning an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match lock(&self.internal.pending_command_buffers, "command_buffers") {
            Ok(mut pending) => {
                pending.insert(id, buffer);
            }
            Err(e) => log::error!("WgpuDevice: Dropping command buffer {:?}: {}", id, e),
        }
        id
    }

    /// Blocks until the queue is idle. Used on shutdown before resources are
    /// released.
    pub fn wait_idle(&self) {
        match self.internal.context.lock() {
            Ok(context_guard) => {
                if let Err(e) = context_guard.device.poll(wgpu::PollType::wait_indefinitely()) {
                    log::warn!("WgpuDevice: Failed to poll device during shutdown: {:?}", e);
                }
            }
            Err(_) => log::error!("WgpuDevice: Context mutex was poisoned during shutdown poll."),
        }
    }

    /// Rebuilds the bind group of a table from its slots. Unwritten slots
    /// point at the placeholder.
    fn build_table_bind_group(
        &self,
        device: &wgpu::Device,
        label: Option<&str>,
        layout: &wgpu::BindGroupLayout,
        slots: &[TableSlot],
    ) -> Result<wgpu::BindGroup, ResourceError> {
        let views = lock(&self.internal.texture_views, "texture_views")?;
        let samplers = lock(&self.internal.samplers, "samplers")?;
        let placeholder = &self.internal.placeholder;

        let mut slot_views: Vec<&wgpu::TextureView> = Vec::with_capacity(slots.len());
        let mut slot_samplers: Vec<&wgpu::Sampler> = Vec::with_capacity(slots.len());
        for slot in slots {
            let (view, sampler) = match slot {
                Some((view, sampler)) => (
                    views.get(view).ok_or(ResourceError::NotFound)?.as_ref(),
                    samplers.get(sampler).ok_or(ResourceError::NotFound)?.as_ref(),
                ),
                None => (placeholder.view.as_ref(), placeholder.sampler.as_ref()),
            };
            slot_views.push(view);
            slot_samplers.push(sampler);
        }

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureViewArray(&slot_views),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::SamplerArray(&slot_samplers),
                },
            ],
        }))
    }

    /// Size of a texture with `mip_level_count` levels.
    fn texture_bytes(size: Extent3D, mip_level_count: u32, bytes_per_pixel: u32) -> u64 {
        (0..mip_level_count.max(1))
            .map(|level| {
                let mip = size.mip_size(level);
                mip.width as u64
                    * mip.height as u64
                    * mip.depth_or_array_layers as u64
                    * bytes_per_pixel as u64
            })
            .sum()
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match descriptor.source {
            ShaderSource::Wgsl(source) => wgpu::ShaderSource::Wgsl(Cow::Owned(source.clone())),
            ShaderSource::SpirV(_) => {
                return Err(ResourceError::BackendError(format!(
                    "SPIR-V shader '{}' is not supported by the wgpu backend",
                    descriptor.label.unwrap_or_default()
                )))
            }
        };

        let module = self.with_context(|context| {
            Ok(context
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: descriptor.label,
                    source: wgpu_source,
                }))
        })?;

        let id = ShaderModuleId(self.next_id());
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, Arc::new(module));
        log::info!(
            "WgpuDevice: Created shader module '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        remove(&self.internal.shader_modules, "shader_modules", id)?;
        log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
        Ok(())
    }

    // --- Uniform bind groups ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let layout = self.with_context(|context| {
            Ok(context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                }))
        })?;

        let id = BindGroupLayoutId(self.next_id());
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .insert(id, Arc::new(layout));
        log::debug!("WgpuDevice: Created bind group layout {:?}", id);
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        remove(&self.internal.bind_group_layouts, "bind_group_layouts", id).map(|_| ())
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .get(&descriptor.layout)
            .cloned()
            .ok_or(ResourceError::NotFound)?;
        let buffers: Vec<(u32, Arc<wgpu::Buffer>, u64, Option<u64>)> = descriptor
            .entries
            .iter()
            .map(|binding| {
                self.buffer(binding.buffer)
                    .map(|buffer| (binding.binding, buffer, binding.offset, binding.size))
                    .ok_or(ResourceError::NotFound)
            })
            .collect::<Result<_, _>>()?;

        let bind_group = self.with_context(|context| {
            let entries: Vec<wgpu::BindGroupEntry> = buffers
                .iter()
                .map(|(binding, buffer, offset, size)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: *offset,
                        size: size.and_then(wgpu::BufferSize::new),
                    }),
                })
                .collect();
            Ok(context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: descriptor.label,
                    layout: &layout,
                    entries: &entries,
                }))
        })?;

        let id = BindGroupId(self.next_id());
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, Arc::new(bind_group));
        log::debug!("WgpuDevice: Created bind group {:?}", id);
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        remove(&self.internal.bind_groups, "bind_groups", id).map(|_| ())
    }

    // --- Render Pipeline Operations ---

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        log::debug!(
            "WgpuDevice: Creating render pipeline with label: {:?}",
            descriptor.label
        );

        // 1. Resolve the shader module and every bind group layout.
        let module = lock(&self.internal.shader_modules, "shader_modules")?
            .get(&descriptor.shader)
            .cloned()
            .ok_or(ResourceError::NotFound)?;
        let group_layouts: Vec<Arc<wgpu::BindGroupLayout>> = {
            let layouts = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?;
            let tables = lock(&self.internal.texture_tables, "texture_tables")?;
            descriptor
                .bindings
                .iter()
                .map(|binding| match binding {
                    PipelineBinding::Uniforms(id) => layouts.get(id).cloned(),
                    PipelineBinding::TextureTable(id) => {
                        tables.get(id).map(|table| Arc::clone(&table.layout))
                    }
                })
                .collect::<Option<_>>()
                .ok_or(ResourceError::NotFound)?
        };

        // 2. Convert vertex buffers layout
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = descriptor
            .vertex_buffers
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|attribute| wgpu::VertexAttribute {
                        format: attribute.format.into_wgpu(),
                        offset: attribute.offset,
                        shader_location: attribute.shader_location,
                    })
                    .collect()
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_buffers
            .iter()
            .zip(attributes.iter())
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: layout.step_mode.into_wgpu(),
                attributes,
            })
            .collect();

        // 3. Fixed-function state
        let depth_stencil = descriptor.depth.map(|depth| wgpu::DepthStencilState {
            format: depth.format.into_wgpu(),
            depth_write_enabled: Some(depth.write_enabled),
            depth_compare: Some(depth.compare.into_wgpu()),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });
        let color_targets = [Some(wgpu::ColorTargetState {
            format: descriptor.color_format.into_wgpu(),
            blend: descriptor.blend.into_wgpu(),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        // 4. Create pipeline layout and render pipeline
        let pipeline = self.with_context(|context| {
            let layout_refs: Vec<Option<&wgpu::BindGroupLayout>> =
                group_layouts.iter().map(|l| Some(l.as_ref())).collect();
            let layout_label = descriptor.label.map(|s| format!("{s} Layout"));
            let pipeline_layout =
                context
                    .device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: layout_label.as_deref(),
                        bind_group_layouts: &layout_refs,
                        immediate_size: 0,
                    });

            Ok(context
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: descriptor.label,
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some(descriptor.vertex_entry),
                        buffers: &vertex_buffers,
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some(descriptor.fragment_entry),
                        targets: &color_targets,
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: descriptor.topology.into_wgpu(),
                        cull_mode: descriptor.cull_mode.into_wgpu(),
                        ..Default::default()
                    },
                    depth_stencil,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                }))
        })?;

        let id = RenderPipelineId(self.next_id());
        lock(&self.internal.pipelines, "pipelines")?.insert(id, Arc::new(pipeline));
        log::info!(
            "WgpuDevice: Created render pipeline '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        remove(&self.internal.pipelines, "pipelines", id)?;
        log::debug!("WgpuDevice: Destroyed render pipeline with ID: {id:?}");
        Ok(())
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        // Writes must be 4-byte aligned; so is the allocation.
        let size = descriptor.size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let usage: wgpu::BufferUsages = descriptor.usage.into_wgpu();
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = self.with_context(|context| {
            Ok(context.device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size,
                usage,
                mapped_at_creation: false,
            }))
        })?;

        let id = BufferId(self.next_id());
        self.internal
            .vram_allocated_bytes
            .fetch_add(size, Ordering::Relaxed);
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(buffer),
                size,
            },
        );
        log::debug!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = remove(&self.internal.buffers, "buffers", id)?;
        entry.wgpu_buffer.destroy();
        self.internal
            .vram_allocated_bytes
            .fetch_sub(entry.size, Ordering::Relaxed);
        log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self.buffer(id).ok_or(ResourceError::NotFound)?;
        let end_offset = offset + data.len() as u64;
        if end_offset > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        self.with_context(|context| {
            context.queue.write_buffer(&buffer, offset, data);
            Ok(())
        })?;
        log::trace!(
            "WgpuDevice: Wrote {} bytes to buffer ID: {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }

    // --- Textures ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let texture = self.with_context(|context| {
            Ok(context.device.create_texture(&wgpu::TextureDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size.into_wgpu(),
                mip_level_count: descriptor.mip_level_count.max(1),
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.into_wgpu(),
                usage: descriptor.usage.into_wgpu(),
                view_formats: &[],
            }))
        })?;

        let id = TextureId(self.next_id());
        self.internal
            .vram_allocated_bytes
            .fetch_add(
                Self::texture_bytes(
                    descriptor.size,
                    descriptor.mip_level_count,
                    descriptor.format.bytes_per_pixel(),
                ),
                Ordering::Relaxed,
            );
        lock(&self.internal.textures, "textures")?.insert(id, Arc::new(texture));
        log::debug!(
            "WgpuDevice: Created texture '{}' with ID: {:?} ({}x{}, {} mips)",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.mip_level_count
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let texture = remove(&self.internal.textures, "textures", id)?;
        let size = Extent3D {
            width: texture.width(),
            height: texture.height(),
            depth_or_array_layers: texture.depth_or_array_layers(),
        };
        // Every engine format is four bytes per texel.
        let bytes = Self::texture_bytes(size, texture.mip_level_count(), 4);
        texture.destroy();
        self.internal
            .vram_allocated_bytes
            .fetch_sub(bytes, Ordering::Relaxed);
        log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    fn write_texture(
        &self,
        id: TextureId,
        mip_level: u32,
        data: &[u8],
        bytes_per_row: u32,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let texture = lock(&self.internal.textures, "textures")?
            .get(&id)
            .cloned()
            .ok_or(ResourceError::NotFound)?;
        if mip_level >= texture.mip_level_count() {
            return Err(ResourceError::OutOfBounds);
        }
        self.with_context(|context| {
            context.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size.height),
                },
                size.into_wgpu(),
            );
            Ok(())
        })
    }

    fn create_texture_view(
        &self,
        texture: TextureId,
        label: Option<&str>,
    ) -> Result<TextureViewId, ResourceError> {
        let texture = lock(&self.internal.textures, "textures")?
            .get(&texture)
            .cloned()
            .ok_or(ResourceError::NotFound)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            ..Default::default()
        });
        let id = TextureViewId(self.next_id());
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        remove(&self.internal.texture_views, "texture_views", id).map(|_| ())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let address_mode = descriptor.address_mode.into_wgpu();
        let sampler = self.with_context(|context| {
            Ok(context.device.create_sampler(&wgpu::SamplerDescriptor {
                label: descriptor.label.as_deref(),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: descriptor.mag_filter.into_wgpu(),
                min_filter: descriptor.min_filter.into_wgpu(),
                mipmap_filter: descriptor.mipmap_filter.into_wgpu(),
                lod_min_clamp: 0.0,
                lod_max_clamp: descriptor.lod_max_clamp,
                compare: None,
                anisotropy_clamp: descriptor.anisotropy_clamp.max(1),
                border_color: None,
            }))
        })?;
        let id = SamplerId(self.next_id());
        lock(&self.internal.samplers, "samplers")?.insert(id, Arc::new(sampler));
        log::debug!(
            "WgpuDevice: Created sampler '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        remove(&self.internal.samplers, "samplers", id).map(|_| ())
    }

    // --- Texture tables ---

    fn create_texture_table(
        &self,
        descriptor: &TextureTableDescriptor,
    ) -> Result<TextureTableId, ResourceError> {
        let count = NonZeroU32::new(descriptor.capacity).ok_or(ResourceError::OutOfBounds)?;
        let slots: Vec<TableSlot> = vec![None; descriptor.capacity as usize];
        let label = descriptor.label.as_deref();

        let (layout, bind_group) = self.with_context(|context| {
            let layout = context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label,
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: Some(count),
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: Some(count),
                        },
                    ],
                });
            let bind_group = self.build_table_bind_group(&context.device, label, &layout, &slots)?;
            Ok((layout, bind_group))
        })?;

        let id = TextureTableId(self.next_id());
        lock(&self.internal.texture_tables, "texture_tables")?.insert(
            id,
            WgpuTextureTableEntry {
                layout: Arc::new(layout),
                slots,
                bind_group: Arc::new(bind_group),
            },
        );
        log::info!(
            "WgpuDevice: Created texture table '{}' with {} slots",
            label.unwrap_or_default(),
            descriptor.capacity
        );
        Ok(id)
    }

    fn write_texture_table_slot(
        &self,
        table: TextureTableId,
        slot: u32,
        view: TextureViewId,
        sampler: SamplerId,
    ) -> Result<(), ResourceError> {
        let mut tables = lock(&self.internal.texture_tables, "texture_tables")?;
        let entry = tables.get_mut(&table).ok_or(ResourceError::NotFound)?;
        let target = entry
            .slots
            .get_mut(slot as usize)
            .ok_or(ResourceError::OutOfBounds)?;
        let previous = target.replace((view, sampler));

        let rebuilt = self.with_context(|context| {
            self.build_table_bind_group(&context.device, None, &entry.layout, &entry.slots)
        });
        match rebuilt {
            Ok(bind_group) => {
                entry.bind_group = Arc::new(bind_group);
                Ok(())
            }
            Err(e) => {
                entry.slots[slot as usize] = previous;
                Err(e)
            }
        }
    }

    fn destroy_texture_table(&self, id: TextureTableId) -> Result<(), ResourceError> {
        remove(&self.internal.texture_tables, "texture_tables", id).map(|_| ())
    }

    // --- Commands ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = match self.internal.context.lock() {
            Ok(context) => Some(
                context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }),
            ),
            Err(_) => {
                log::error!("WgpuDevice: Context mutex poisoned, encoder will record nothing");
                None
            }
        };
        Box::new(WgpuCommandEncoder {
            encoder,
            device: self.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) {
        let buffer = match lock(&self.internal.pending_command_buffers, "command_buffers") {
            Ok(mut pending) => pending.remove(&command_buffer),
            Err(e) => {
                log::error!("WgpuDevice: {}", e);
                return;
            }
        };
        let Some(buffer) = buffer else {
            log::error!(
                "WgpuDevice: Attempted to submit a CommandBufferId ({:?}) that does not exist.",
                command_buffer
            );
            return;
        };
        if let Err(e) = self.with_context(|context| {
            context.queue.submit(std::iter::once(buffer));
            Ok(())
        }) {
            log::error!("WgpuDevice: Failed to submit command buffer: {}", e);
        }
    }
}
