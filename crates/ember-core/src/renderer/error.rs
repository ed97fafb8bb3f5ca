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

//! Defines the error types reported by graphics backends.

use std::fmt;

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The resource referenced by the ID does not exist.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// The device could not allocate memory for the resource.
    OutOfMemory,
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
    /// The shader module failed to compile.
    ShaderCompilation {
        /// Label of the shader.
        label: String,
        /// Compiler output.
        details: String,
    },
    /// The device was lost.
    DeviceLost,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl ResourceError {
    /// A stable numeric code, logged alongside the failing call's context.
    pub fn code(&self) -> i32 {
        match self {
            ResourceError::NotFound => -1,
            ResourceError::InvalidHandle => -2,
            ResourceError::OutOfMemory => -3,
            ResourceError::OutOfBounds => -4,
            ResourceError::ShaderCompilation { .. } => -5,
            ResourceError::DeviceLost => -6,
            ResourceError::BackendError(_) => -7,
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::OutOfMemory => write!(f, "Out of device memory."),
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::ShaderCompilation { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ResourceError::DeviceLost => write!(f, "The graphics device was lost."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error reported while acquiring or presenting a surface frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// The swapchain no longer matches the surface and must be reconfigured.
    OutOfDate,
    /// The surface was lost and must be reconfigured.
    Lost,
    /// Acquiring a frame timed out.
    Timeout,
    /// There is no memory left to allocate a new frame.
    OutOfMemory,
    /// The device was lost.
    DeviceLost,
    /// A frame was presented or discarded without being acquired.
    NoFrame,
    /// Any other backend failure.
    Other(String),
}

impl SurfaceError {
    /// Returns `true` when reconfiguring the surface recovers from the error.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(self, SurfaceError::OutOfDate | SurfaceError::Lost)
    }

    /// A stable numeric code, logged alongside the failing call's context.
    pub fn code(&self) -> i32 {
        match self {
            SurfaceError::OutOfDate => -1000,
            SurfaceError::Lost => -1001,
            SurfaceError::Timeout => 2,
            SurfaceError::OutOfMemory => -2,
            SurfaceError::DeviceLost => -4,
            SurfaceError::NoFrame => -1002,
            SurfaceError::Other(_) => -13,
        }
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::OutOfDate => write!(f, "Surface is out of date."),
            SurfaceError::Lost => write!(f, "Surface was lost."),
            SurfaceError::Timeout => write!(f, "Timed out acquiring a surface frame."),
            SurfaceError::OutOfMemory => write!(f, "Out of memory acquiring a surface frame."),
            SurfaceError::DeviceLost => write!(f, "The graphics device was lost."),
            SurfaceError::NoFrame => write!(f, "No surface frame is currently acquired."),
            SurfaceError::Other(msg) => write!(f, "Surface error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}
