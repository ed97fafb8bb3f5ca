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

use crate::math::Extent2D;
use crate::renderer::api::{TextureFormat, TextureViewId};
use crate::renderer::error::SurfaceError;

/// A frame acquired from a [`PresentationSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFrame {
    /// The color target to render into.
    pub view: TextureViewId,
    /// The frame is usable but the swapchain should be reconfigured after presenting.
    pub suboptimal: bool,
}

/// The result of a successful present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The frame was presented.
    Presented,
    /// The frame was presented, but the swapchain no longer matches the surface.
    Suboptimal,
}

/// The swapchain of a window.
///
/// At most one frame is acquired at a time.
pub trait PresentationSurface: Send {
    /// The pixel format of acquired frames.
    fn format(&self) -> TextureFormat;

    /// The size the swapchain is currently configured for.
    fn extent(&self) -> Extent2D;

    /// The current size of the underlying window, which can differ from
    /// [`extent`](Self::extent) after the window was resized.
    fn window_extent(&self) -> Extent2D;

    /// Acquires the next frame.
    /// ## Errors
    /// * `SurfaceError::OutOfDate` / `SurfaceError::Lost` - The swapchain must be
    ///   reconfigured with [`resize`](Self::resize) before retrying.
    fn acquire_frame(&mut self) -> Result<SurfaceFrame, SurfaceError>;

    /// Presents the acquired frame.
    fn present(&mut self) -> Result<PresentOutcome, SurfaceError>;

    /// Drops the acquired frame without presenting it. Does nothing if no
    /// frame is acquired.
    fn discard_frame(&mut self);

    /// Reconfigures the swapchain. A zero-sized request is ignored.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;
}
