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

//! Bootstraps the wgpu backend for one window.

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};
use wgpu::Backend;

use super::context::WgpuGraphicsContext;
use super::device::WgpuDevice;
use super::surface::WgpuSurface;
use crate::platform::WinitWindow;

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

/// Creates the device and the presentation surface of `window`.
///
/// Blocks on adapter and device creation.
pub fn create_backend(window: WinitWindow) -> Result<(WgpuDevice, WgpuSurface)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
    let context = pollster::block_on(WgpuGraphicsContext::new(&instance, window.clone()))?;
    log::info!(
        "Graphics backend ready: {} on \"{}\"",
        backend_name(context.adapter_backend),
        context.adapter_name
    );

    let context = Arc::new(Mutex::new(context));
    let device = WgpuDevice::new(Arc::clone(&context))
        .map_err(|e| anyhow!("Failed to create the graphics device: {}", e))?;
    let surface = WgpuSurface::new(context, device.clone(), window)
        .map_err(|e| anyhow!("Failed to create the presentation surface: {}", e))?;
    Ok((device, surface))
}
