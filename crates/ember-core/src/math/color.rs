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

//! Defines the `LinearRgba` color type.

use serde::{Deserialize, Serialize};

/// A color in linear RGBA space with `f32` components.
///
/// `#[repr(C)]` and `Pod` allow the color to be copied straight into vertex,
/// instance and uniform data.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component.
    pub r: f32,
    /// The green component.
    pub g: f32,
    /// The blue component.
    pub b: f32,
    /// The alpha component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque white (`[1.0, 1.0, 1.0, 1.0]`).
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black (`[0.0, 0.0, 0.0, 1.0]`).
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Opaque red (`[1.0, 0.0, 0.0, 1.0]`).
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Opaque green (`[0.0, 1.0, 0.0, 1.0]`).
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new `LinearRgba` with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a new opaque `LinearRgba` (alpha = 1.0).
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Unpacks a `0xAARRGGBB` value. Components are normalized, not gamma corrected.
    pub fn from_argb(packed: u32) -> Self {
        Self {
            r: channel(packed, 16),
            g: channel(packed, 8),
            b: channel(packed, 0),
            a: channel(packed, 24),
        }
    }

    /// Unpacks a `0xRRGGBB` value into an opaque color. The top byte is ignored.
    pub fn from_rgb_hex(packed: u32) -> Self {
        Self::rgb(channel(packed, 16), channel(packed, 8), channel(packed, 0))
    }

    /// Returns a copy with a different alpha.
    #[inline]
    pub fn with_alpha(&self, a: f32) -> Self {
        Self { a, ..*self }
    }

    /// Returns the components as an array.
    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for LinearRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for LinearRgba {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

#[inline]
fn channel(packed: u32, shift: u32) -> f32 {
    ((packed >> shift) & 0xff) as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_argb_unpacks_each_channel() {
        let c = LinearRgba::from_argb(0x80ff0033);
        assert_relative_eq!(c.r, 1.0);
        assert_relative_eq!(c.g, 0.0);
        assert_relative_eq!(c.b, 0.2);
        assert_relative_eq!(c.a, 128.0 / 255.0);
    }

    #[test]
    fn test_from_rgb_hex_is_opaque() {
        let c = LinearRgba::from_rgb_hex(0xff00ff00);
        assert_eq!(c, LinearRgba::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_fog_default_packed_value_is_opaque_black() {
        assert_eq!(LinearRgba::from_argb(0xff000000), LinearRgba::BLACK);
    }
}
