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

//! Pixel-space rectangles and lines turned into quad corners.
//!
//! UI coordinates have their origin in the top-left corner of the window,
//! with y growing downwards. Normalized device coordinates have y growing
//! upwards, so y is flipped on conversion.

use ember_core::math::Extent2D;

/// One corner of a quad: NDC position followed by texture coordinates.
pub type Corner = [f32; 4];

/// An axis-aligned rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A texture-coordinate rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: Self = Self {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };
    /// All corners sample the origin; used for untextured quads.
    pub const NONE: Self = Self {
        u0: 0.0,
        v0: 0.0,
        u1: 0.0,
        v1: 0.0,
    };

    /// The pixel region `(x, y, width, height)` of an image of the given size.
    pub fn from_region(x: f32, y: f32, width: f32, height: f32, image: Extent2D) -> Self {
        let (iw, ih) = (image.width.max(1) as f32, image.height.max(1) as f32);
        let u0 = x / iw;
        let v0 = y / ih;
        Self {
            u0,
            v0,
            u1: u0 + width / iw,
            v1: v0 + height / ih,
        }
    }
}

/// Converts a window-pixel position to NDC.
pub fn to_ndc(viewport: Extent2D, x: f32, y: f32) -> [f32; 2] {
    let width = viewport.width.max(1) as f32;
    let height = viewport.height.max(1) as f32;
    [x / width * 2.0 - 1.0, 1.0 - y / height * 2.0]
}

/// Corners of a rectangle, in the order every UI quad uses:
/// top-right, top-left, bottom-left, bottom-right.
pub fn rect_corners(viewport: Extent2D, rect: PixelRect, uv: UvRect) -> [Corner; 4] {
    let [start_x, start_y] = to_ndc(viewport, rect.x, rect.y);
    let [end_x, end_y] = to_ndc(viewport, rect.x + rect.width, rect.y + rect.height);
    [
        [end_x, start_y, uv.u1, uv.v0],
        [start_x, start_y, uv.u0, uv.v0],
        [start_x, end_y, uv.u0, uv.v1],
        [end_x, end_y, uv.u1, uv.v1],
    ]
}

/// Corners of a thick line from `start` to `end`, or `None` for a zero-length line.
///
/// The half-width offset is `thickness * (dy, dx) / (2 * length)`. Corners go
/// start+, end+, end-, start-.
pub fn line_corners(
    viewport: Extent2D,
    start: [f32; 2],
    end: [f32; 2],
    thickness: f32,
) -> Option<[Corner; 4]> {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let distance = 2.0 * (dx * dx + dy * dy).sqrt();
    if distance <= f32::EPSILON {
        return None;
    }
    let ox = thickness * dy / distance;
    let oy = thickness * dx / distance;
    let corner = |x: f32, y: f32| {
        let [nx, ny] = to_ndc(viewport, x, y);
        [nx, ny, 0.0, 0.0]
    };
    Some([
        corner(start[0] - ox, start[1] + oy),
        corner(end[0] - ox, end[1] + oy),
        corner(end[0] + ox, end[1] - oy),
        corner(start[0] + ox, start[1] - oy),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VIEWPORT: Extent2D = Extent2D::new(800, 600);

    #[test]
    fn test_ndc_corners_of_window() {
        assert_eq!(to_ndc(VIEWPORT, 0.0, 0.0), [-1.0, 1.0]);
        assert_eq!(to_ndc(VIEWPORT, 800.0, 600.0), [1.0, -1.0]);
        assert_eq!(to_ndc(VIEWPORT, 400.0, 300.0), [0.0, 0.0]);
    }

    #[test]
    fn test_rect_corner_order() {
        let corners = rect_corners(
            VIEWPORT,
            PixelRect::new(0.0, 0.0, 400.0, 300.0),
            UvRect::FULL,
        );
        assert_eq!(corners[0], [0.0, 1.0, 1.0, 0.0]);
        assert_eq!(corners[1], [-1.0, 1.0, 0.0, 0.0]);
        assert_eq!(corners[2], [-1.0, 0.0, 0.0, 1.0]);
        assert_eq!(corners[3], [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_region_uv_is_relative_to_image() {
        let uv = UvRect::from_region(16.0, 8.0, 16.0, 8.0, Extent2D::new(64, 32));
        assert_relative_eq!(uv.u0, 0.25);
        assert_relative_eq!(uv.v0, 0.25);
        assert_relative_eq!(uv.u1, 0.5);
        assert_relative_eq!(uv.v1, 0.5);
    }

    #[test]
    fn test_horizontal_line_is_offset_vertically() {
        let viewport = Extent2D::new(2, 2);
        let corners = line_corners(viewport, [0.0, 1.0], [2.0, 1.0], 2.0).unwrap();
        // dx = 2, distance = 4, offset = (0, 1) pixels.
        assert_relative_eq!(corners[0][0], -1.0);
        assert_relative_eq!(corners[0][1], -1.0);
        assert_relative_eq!(corners[1][0], 1.0);
        assert_relative_eq!(corners[2][1], 1.0);
        assert_relative_eq!(corners[3][0], -1.0);
    }

    #[test]
    fn test_zero_length_line_is_skipped() {
        assert!(line_corners(VIEWPORT, [5.0, 5.0], [5.0, 5.0], 3.0).is_none());
    }
}
