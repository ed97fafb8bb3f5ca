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

use std::sync::{Arc, Mutex};

use ember_core::math::Extent2D;
use ember_core::renderer::traits::{PresentOutcome, SurfaceFrame};
use ember_core::renderer::{
    GraphicsDevice, PresentationSurface, SurfaceError, TextureFormat, TextureViewId,
};

use super::context::WgpuGraphicsContext;
use super::conversions::{from_wgpu_surface_error, from_wgpu_texture_format};
use super::device::WgpuDevice;
use crate::platform::WinitWindow;

/// The swapchain of a [`WinitWindow`], backed by the surface of a
/// [`WgpuGraphicsContext`].
pub struct WgpuSurface {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    device: WgpuDevice,
    window: WinitWindow,
    format: TextureFormat,
    current: Option<AcquiredFrame>,
}

struct AcquiredFrame {
    texture: wgpu::SurfaceTexture,
    view: TextureViewId,
    suboptimal: bool,
}

impl WgpuSurface {
    /// Wraps the surface already configured by `context`.
    ///
    /// ## Errors
    /// Fails if the configured format is not one the engine can render to.
    pub fn new(
        context: Arc<Mutex<WgpuGraphicsContext>>,
        device: WgpuDevice,
        window: WinitWindow,
    ) -> Result<Self, SurfaceError> {
        let wgpu_format = context
            .lock()
            .map_err(|_| SurfaceError::Other("Context mutex poisoned".into()))?
            .surface_config
            .format;
        let format = from_wgpu_texture_format(wgpu_format).ok_or_else(|| {
            SurfaceError::Other(format!("Unsupported surface format {wgpu_format:?}"))
        })?;
        Ok(Self {
            context,
            device,
            window,
            format,
            current: None,
        })
    }

    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    fn release_view(&self, frame: &AcquiredFrame) {
        if let Err(e) = self.device.destroy_texture_view(frame.view) {
            log::warn!("WgpuSurface: Failed to release frame view: {}", e);
        }
    }
}

impl PresentationSurface for WgpuSurface {
    fn format(&self) -> TextureFormat {
        self.format
    }

    fn extent(&self) -> Extent2D {
        match self.context.lock() {
            Ok(context) => context.extent(),
            Err(_) => Extent2D::new(0, 0),
        }
    }

    fn window_extent(&self) -> Extent2D {
        self.window.inner_size()
    }

    fn acquire_frame(&mut self) -> Result<SurfaceFrame, SurfaceError> {
        if let Some(frame) = &self.current {
            return Ok(SurfaceFrame {
                view: frame.view,
                suboptimal: frame.suboptimal,
            });
        }

        let texture = {
            let context = self
                .context
                .lock()
                .map_err(|_| SurfaceError::Other("Context mutex poisoned".into()))?;
            context
                .surface
                .get_current_texture()
                .map_err(from_wgpu_surface_error)?
        };
        let view = self
            .device
            .register_surface_view(&texture.texture)
            .map_err(|e| SurfaceError::Other(e.to_string()))?;
        let suboptimal = texture.suboptimal;
        if suboptimal {
            log::debug!("WgpuSurface: Acquired a suboptimal frame.");
        }

        self.current = Some(AcquiredFrame {
            texture,
            view,
            suboptimal,
        });
        Ok(SurfaceFrame { view, suboptimal })
    }

    fn present(&mut self) -> Result<PresentOutcome, SurfaceError> {
        let frame = self.current.take().ok_or(SurfaceError::NoFrame)?;
        self.release_view(&frame);
        let suboptimal = frame.suboptimal;
        frame.texture.present();
        Ok(if suboptimal {
            PresentOutcome::Suboptimal
        } else {
            PresentOutcome::Presented
        })
    }

    fn discard_frame(&mut self) {
        if let Some(frame) = self.current.take() {
            self.release_view(&frame);
            log::debug!("WgpuSurface: Discarded acquired frame.");
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        // The swapchain cannot be reconfigured while a frame is out.
        self.discard_frame();
        let mut context = self
            .context
            .lock()
            .map_err(|_| SurfaceError::Other("Context mutex poisoned".into()))?;
        context.resize(width, height);
        Ok(())
    }
}
