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

//! Integer extents used for surfaces and textures.

/// A two-dimensional extent, typically a window or surface size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either side is zero, as happens for a minimized window.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or `1.0` for an empty extent.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A three-dimensional extent, representing width, height, and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// A single-layer 2D extent.
    pub const fn flat(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    /// The size of mip `level`, never smaller than 1x1.
    pub fn mip_size(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }

    /// Number of mip levels in a full chain: `floor(log2(max(w, h))) + 1`.
    pub fn max_mip_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_mip_levels() {
        assert_eq!(Extent3D::flat(1, 1).max_mip_levels(), 1);
        assert_eq!(Extent3D::flat(256, 64).max_mip_levels(), 9);
        assert_eq!(Extent3D::flat(300, 20).max_mip_levels(), 9);
    }

    #[test]
    fn test_mip_size_clamps_to_one() {
        let size = Extent3D::flat(8, 2).mip_size(3);
        assert_eq!((size.width, size.height), (1, 1));
    }

    #[test]
    fn test_empty_extent_aspect() {
        assert!(Extent2D::new(0, 600).is_empty());
        assert_eq!(Extent2D::new(0, 600).aspect_ratio(), 1.0);
        assert_eq!(Extent2D::new(800, 400).aspect_ratio(), 2.0);
    }
}
