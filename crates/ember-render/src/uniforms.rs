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

//! Per-frame uniform block shared by every pipeline (bind group 0).

use crate::config::RendererConfig;
use bytemuck::{Pod, Zeroable};
use ember_core::math::{Extent2D, Mat4, Vec3};
use ember_core::renderer::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutId,
    BufferBinding, BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ResourceError,
    ShaderStageFlags, UniformLayoutEntry,
};
use ember_core::scene::{Camera, Level};
use std::borrow::Cow;

/// Direction the level light shines from, for a pitch and yaw in radians.
pub fn light_direction(pitch: f32, yaw: f32) -> Vec3 {
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();
    Vec3::new(-cp * sy, sp, -cp * cy)
}

/// GPU layout of the frame uniforms. 256 bytes, every field 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniformData {
    pub view_projection: [[f32; 4]; 4],
    pub viewmodel_matrix: [[f32; 4]; 4],
    pub sky_matrix: [[f32; 4]; 4],
    pub light_color: [f32; 4],
    /// xyz is the light direction, w is unused.
    pub light_direction: [f32; 4],
    pub fog_color: [f32; 4],
    pub fog_start: f32,
    pub fog_end: f32,
    pub sky_texture_index: u32,
    pub _padding: u32,
}

impl Default for FrameUniformData {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            viewmodel_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            sky_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            light_color: [1.0; 4],
            light_direction: [0.0, 1.0, 0.0, 0.0],
            fog_color: [0.0, 0.0, 0.0, 1.0],
            fog_start: 2000.0,
            fog_end: 2500.0,
            sky_texture_index: crate::textures::UNTEXTURED,
            _padding: 0,
        }
    }
}

impl FrameUniformData {
    /// Uniforms for drawing `level` from `camera` into a target of `extent`.
    pub fn compute(
        camera: &Camera,
        level: &Level,
        extent: Extent2D,
        config: &RendererConfig,
        sky_texture_index: u32,
    ) -> Self {
        let aspect = extent.aspect_ratio();
        let projection = camera.projection(aspect, config.near_z, config.far_z);
        let viewmodel_projection = Mat4::perspective_lh(
            config.viewmodel_fov_degrees.to_radians(),
            aspect,
            config.near_z,
            config.far_z,
        );
        let light = light_direction(level.lighting.pitch, level.lighting.yaw);
        Self {
            view_projection: (projection * camera.view()).to_cols_array_2d(),
            viewmodel_matrix: (viewmodel_projection * level.viewmodel.transform).to_cols_array_2d(),
            sky_matrix: (projection * camera.rotation_only_view()).to_cols_array_2d(),
            light_color: level.lighting.color.to_array(),
            light_direction: light.extend(0.0).to_array(),
            fog_color: level.fog.color.to_array(),
            fog_start: level.fog.start,
            fog_end: level.fog.end,
            sky_texture_index,
            _padding: 0,
        }
    }
}

/// The uniform buffer, its layout and its bind group.
#[derive(Debug)]
pub struct FrameUniforms {
    layout: BindGroupLayoutId,
    buffer: BufferId,
    bind_group: BindGroupId,
    current: FrameUniformData,
}

impl FrameUniforms {
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame Uniforms Layout"),
            entries: &[UniformLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            }],
        })?;
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("Frame Uniforms")),
            size: std::mem::size_of::<FrameUniformData>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Frame Uniforms Bind Group"),
            layout,
            entries: &[BufferBinding {
                binding: 0,
                buffer,
                offset: 0,
                size: None,
            }],
        })?;
        let current = FrameUniformData::default();
        device.write_buffer(buffer, 0, bytemuck::bytes_of(&current))?;
        Ok(Self {
            layout,
            buffer,
            bind_group,
            current,
        })
    }

    /// Uploads `data` unless it equals what the GPU already holds.
    /// Returns `true` if a write happened.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        data: FrameUniformData,
    ) -> Result<bool, ResourceError> {
        if data == self.current {
            return Ok(false);
        }
        device.write_buffer(self.buffer, 0, bytemuck::bytes_of(&data))?;
        self.current = data;
        Ok(true)
    }

    pub fn current(&self) -> &FrameUniformData {
        &self.current
    }

    pub fn layout(&self) -> BindGroupLayoutId {
        self.layout
    }

    pub fn bind_group(&self) -> BindGroupId {
        self.bind_group
    }

    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        if let Err(e) = device.destroy_bind_group(self.bind_group) {
            log::warn!("FrameUniforms: Failed to destroy bind group: {:?}", e);
        }
        if let Err(e) = device.destroy_buffer(self.buffer) {
            log::warn!("FrameUniforms: Failed to destroy buffer: {:?}", e);
        }
        if let Err(e) = device.destroy_bind_group_layout(self.layout) {
            log::warn!("FrameUniforms: Failed to destroy layout: {:?}", e);
        }
    }
}
