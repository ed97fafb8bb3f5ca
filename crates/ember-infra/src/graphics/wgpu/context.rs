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

use crate::graphics::wgpu::conversions::from_wgpu_texture_format;
use crate::platform::WinitWindow;
use anyhow::{anyhow, bail, Result};
use ember_core::math::Extent2D;
use wgpu::{Features, Instance};

/// Device features the renderer relies on: one bindable array of textures
/// and samplers indexed per instance, and indirect draws that start past
/// instance zero.
pub fn required_features() -> Features {
    Features::TEXTURE_BINDING_ARRAY
        | Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
        | Features::INDIRECT_FIRST_INSTANCE
}

/// Holds the core WGPU state objects required for rendering to one window.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    // Configuration for the surface's swapchain behavior
    pub surface_config: wgpu::SurfaceConfiguration,

    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
}

impl WgpuGraphicsContext {
    /// Creates the surface for `window`, picks an adapter able to present to
    /// it and opens the logical device.
    ///
    /// ## Errors
    /// Fails if no adapter is found or if the adapter lacks
    /// [`required_features`].
    pub async fn new(instance: &Instance, window: WinitWindow) -> Result<Self> {
        log::info!("WgpuGraphicsContext: Initializing...");
        let window_size = window.inner_size();

        // --- 1. Create Surface ---
        let surface = instance
            .create_surface(window)
            .map_err(|e| anyhow!("Failed to create surface: {}", e))?;
        log::debug!("WgpuGraphicsContext: Surface created for the window.");

        // --- 2. Select Adapter ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter: {}", e))?;
        let adapter_info = adapter.get_info();
        log::info!(
            "WgpuGraphicsContext: Using adapter \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let required_features = required_features();
        if !adapter.features().contains(required_features) {
            bail!(
                "Adapter \"{}\" lacks required features: {:?}",
                adapter_info.name,
                required_features
            );
        }

        // --- 3. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Ember Logical Device"),
                required_features,
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("WgpuGraphicsContext: Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WgpuGraphicsContext: Uncaptured error: {e:?}");
        }));

        // --- 4. Configure Surface ---
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb() && from_wgpu_texture_format(*f).is_some())
            .or_else(|| {
                surface_caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| from_wgpu_texture_format(*f).is_some())
            })
            .ok_or_else(|| anyhow!("Surface offers no supported color format"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            // Fifo is guaranteed to be supported
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "WgpuGraphicsContext: Surface configured ({:?}, {}x{})",
            surface_format,
            surface_config.width,
            surface_config.height
        );

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
        })
    }

    /// Reconfigures the swapchain. Zero sizes are ignored.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            log::info!(
                "WgpuGraphicsContext: Resizing surface configuration to {new_width}x{new_height}"
            );
            self.surface_config.width = new_width;
            self.surface_config.height = new_height;
            self.surface.configure(&self.device, &self.surface_config);
        } else {
            log::warn!(
                "WgpuGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.surface_config.width, self.surface_config.height)
    }
}
