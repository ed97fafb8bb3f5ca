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

//! Texture, sampler and texture-table descriptors.

use crate::math::Extent3D;
use std::borrow::Cow;

/// An opaque handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a view into a texture, or into the current surface frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureViewId(pub usize);

/// An opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub usize);

/// An opaque handle to a fixed-capacity texture table.
///
/// A texture table is a bindable array of `(view, sampler)` slots that
/// shaders index with a per-instance or per-vertex slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureTableId(pub usize);

/// Pixel formats the renderer creates or renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, linear.
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB encoded.
    Bgra8UnormSrgb,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        4
    }

    /// Returns `true` for depth formats.
    pub const fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

crate::ember_bitflags! {
    /// Allowed usages of a texture.
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// The texture can be written by the queue.
        const COPY_DST = 1 << 1;
        /// The texture can be sampled by shaders.
        const TEXTURE_BINDING = 1 << 2;
        /// The texture can be a render pass attachment.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Size of mip level 0.
    pub size: Extent3D,
    /// Number of mip levels, at least 1.
    pub mip_level_count: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation between texels.
    Linear,
}

/// Behavior of texture coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Addressing along U, V and W.
    pub address_mode: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Filter between mip levels.
    pub mipmap_filter: FilterMode,
    /// Highest mip level the sampler may select.
    pub lod_max_clamp: f32,
    /// Anisotropy clamp, 1 disables anisotropic filtering.
    pub anisotropy_clamp: u16,
}

/// A descriptor used to create a [`TextureTableId`].
#[derive(Debug, Clone)]
pub struct TextureTableDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Number of slots. Fixed for the table's lifetime.
    pub capacity: u32,
}
