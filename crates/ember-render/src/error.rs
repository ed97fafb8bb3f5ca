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

//! Error taxonomy of the renderer.
//!
//! Three classes of failure exist:
//!
//! - fatal: out of memory, poisoned lock, malformed asset, texture upload
//!   failure, device loss. The frame cannot continue and the caller should
//!   shut the renderer down.
//! - transient: a minimized window or an out-of-date swapchain. These are
//!   reported through [`FrameStatus`](crate::FrameStatus), never as errors.
//! - propagated: any other backend failure. Logged with its context and
//!   code, then returned; the rest of the frame's work is abandoned.

use ember_core::asset::AssetError;
use ember_core::renderer::{ResourceError, SurfaceError};
use thiserror::Error;

/// Where to look when the device is lost.
pub const DEVICE_LOST_HELP_URL: &str = "https://starflight.dev/media/VK_ERROR_DEVICE_LOST.webp";

/// Errors returned by renderer operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendererError {
    /// A GPU resource operation failed.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The presentation surface failed in a way a resize cannot fix.
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// An asset could not be fetched.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// A material uses a shading mode the geometry being packed cannot be drawn with.
    #[error("material '{material}' uses shading mode {shading} which cannot be packed into {batch}")]
    UnsupportedShading {
        /// The material.
        material: String,
        /// Its shading mode.
        shading: String,
        /// The batch being packed.
        batch: &'static str,
    },

    /// An image could not be uploaded. There is no fallback texture.
    #[error("failed to upload texture '{name}': {source}")]
    TextureUpload {
        /// The image.
        name: String,
        /// The device error.
        source: ResourceError,
    },

    /// Every slot of the texture table is taken.
    #[error("texture table is full ({capacity} slots), cannot make '{name}' resident")]
    TextureTableFull {
        /// The image that did not fit.
        name: String,
        /// The table capacity.
        capacity: u32,
    },

    /// A mutex shared with the LOD worker was poisoned.
    #[error("lock '{0}' was poisoned by a panicking thread")]
    LockPoisoned(&'static str),

    /// A frame operation was called in the wrong order.
    #[error("cannot {operation} while {state}")]
    InvalidFrameState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the renderer was in.
        state: &'static str,
    },

    /// The configuration is invalid.
    #[error("invalid renderer configuration: {0}")]
    Config(String),
}

impl RendererError {
    /// Returns `true` if the renderer cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            RendererError::Resource(e) => {
                matches!(e, ResourceError::OutOfMemory | ResourceError::DeviceLost)
            }
            RendererError::Surface(e) => {
                matches!(e, SurfaceError::OutOfMemory | SurfaceError::DeviceLost)
            }
            RendererError::Asset(AssetError::UnknownShading { .. }) => true,
            RendererError::Asset(_) => false,
            RendererError::UnsupportedShading { .. }
            | RendererError::TextureUpload { .. }
            | RendererError::TextureTableFull { .. }
            | RendererError::LockPoisoned(_) => true,
            RendererError::InvalidFrameState { .. } | RendererError::Config(_) => false,
        }
    }

    /// Returns `true` if the error means the device was lost.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            RendererError::Resource(ResourceError::DeviceLost)
                | RendererError::Surface(SurfaceError::DeviceLost)
                | RendererError::TextureUpload {
                    source: ResourceError::DeviceLost,
                    ..
                }
        )
    }

    /// A numeric code, negative for failures reported by the backend.
    pub fn code(&self) -> i32 {
        match self {
            RendererError::Resource(e) => e.code(),
            RendererError::Surface(e) => e.code(),
            RendererError::TextureUpload { source, .. } => source.code(),
            RendererError::Asset(_) => 1001,
            RendererError::UnsupportedShading { .. } => 1002,
            RendererError::TextureTableFull { .. } => 1003,
            RendererError::LockPoisoned(_) => 1004,
            RendererError::InvalidFrameState { .. } => 1005,
            RendererError::Config(_) => 1006,
        }
    }
}

/// Logs a failed operation with its context and result code, and points at
/// the device-lost help page when relevant. Returns the error for `?`-style
/// propagation.
pub fn report_failure(context: &str, error: RendererError) -> RendererError {
    if error.is_fatal() {
        log::error!("{context}: {error}");
    } else {
        log::warn!("{context}: {error}");
    }
    log::error!("Error code: {}", error.code());
    if error.is_device_lost() {
        log::error!("See {DEVICE_LOST_HELP_URL} for more information");
    }
    error
}

/// Extension for attaching a context string to a fallible call.
pub(crate) trait ReportExt<T> {
    /// Logs the error with `context` (see [`report_failure`]) and converts it.
    fn report(self, context: &str) -> Result<T, RendererError>;
}

impl<T, E: Into<RendererError>> ReportExt<T> for Result<T, E> {
    fn report(self, context: &str) -> Result<T, RendererError> {
        self.map_err(|e| report_failure(context, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RendererError::Resource(ResourceError::OutOfMemory).is_fatal());
        assert!(!RendererError::Resource(ResourceError::OutOfBounds).is_fatal());
        assert!(RendererError::LockPoisoned("lod").is_fatal());
        assert!(RendererError::Asset(AssetError::UnknownShading { value: 9 }).is_fatal());
        assert!(!RendererError::Surface(SurfaceError::Timeout).is_fatal());
    }

    #[test]
    fn test_device_lost_detection_and_code() {
        let lost = RendererError::TextureUpload {
            name: "wall".into(),
            source: ResourceError::DeviceLost,
        };
        assert!(lost.is_device_lost());
        assert!(lost.is_fatal());
        assert_eq!(lost.code(), ResourceError::DeviceLost.code());
    }

    #[test]
    fn test_report_converts_core_errors() {
        let result: Result<(), ResourceError> = Err(ResourceError::NotFound);
        assert_eq!(
            result.report("write"),
            Err(RendererError::Resource(ResourceError::NotFound))
        );
    }
}
