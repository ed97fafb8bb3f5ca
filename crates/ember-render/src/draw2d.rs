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

//! Immediate-mode 2D drawing on the renderer.
//!
//! Positions are window pixels with the origin in the top-left corner, unless
//! a function says its input is already in NDC. Every call appends to the
//! frame's UI batch; nothing is drawn until `end_frame`.

use crate::error::{RendererError, ReportExt};
use crate::renderer::RendererContext;
use crate::textures::UNTEXTURED;
use crate::ui::geometry::{line_corners, rect_corners, to_ndc, Corner, PixelRect, UvRect};
use crate::ui::{solid_quad, textured_quad, UiVertex};
use ember_core::asset::ImageAsset;
use ember_core::math::{Extent2D, LinearRgba};

/// A vertex of a UI triangle mesh: window-pixel position and texture
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UiPoint {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

impl UiPoint {
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { x, y, u, v }
    }
}

const COLORED_QUAD_FLOATS: usize = 8;
const TEXTURED_QUAD_FLOATS: usize = 16;

impl RendererContext {
    fn append_corners(
        &mut self,
        corners: [Corner; 4],
        color: LinearRgba,
        texture_index: u32,
    ) -> Result<(), RendererError> {
        let vertices = if texture_index == UNTEXTURED {
            solid_quad(corners, color)
        } else {
            textured_quad(corners, color, texture_index)
        };
        self.ui
            .append_quad(vertices)
            .report("RendererContext: Failed to append UI quad")
    }

    fn ui_texture(&mut self, image: &ImageAsset) -> Result<u32, RendererError> {
        let device = std::sync::Arc::clone(&self.device);
        self.textures.resolve(device.as_ref(), image)
    }

    /// A solid rectangle.
    pub fn draw_colored_quad(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a UI quad")?;
        let corners = rect_corners(
            self.extent(),
            PixelRect::new(x, y, width, height),
            UvRect::NONE,
        );
        self.append_corners(corners, color, UNTEXTURED)
    }

    /// Many solid quads of one color. `quads` holds 8 floats per quad: the
    /// x, y of each corner, already in NDC. A trailing partial quad is
    /// ignored.
    pub fn draw_colored_quads_batched(
        &mut self,
        quads: &[f32],
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw UI quads")?;
        warn_partial(quads.len(), COLORED_QUAD_FLOATS);
        for quad in quads.chunks_exact(COLORED_QUAD_FLOATS) {
            let corners = std::array::from_fn(|i| [quad[i * 2], quad[i * 2 + 1], 0.0, 0.0]);
            self.append_corners(corners, color, UNTEXTURED)?;
        }
        Ok(())
    }

    /// An image stretched over a rectangle.
    pub fn draw_textured_quad(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: &ImageAsset,
    ) -> Result<(), RendererError> {
        self.draw_textured_quad_mod(x, y, width, height, image, LinearRgba::WHITE)
    }

    /// An image stretched over a rectangle, multiplied by `color`.
    pub fn draw_textured_quad_mod(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: &ImageAsset,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a textured UI quad")?;
        let texture_index = self.ui_texture(image)?;
        let corners = rect_corners(
            self.extent(),
            PixelRect::new(x, y, width, height),
            UvRect::FULL,
        );
        self.append_corners(corners, color, texture_index)
    }

    /// The pixel `region` of an image drawn over `rect`.
    pub fn draw_textured_quad_region(
        &mut self,
        rect: PixelRect,
        region: PixelRect,
        image: &ImageAsset,
    ) -> Result<(), RendererError> {
        self.draw_textured_quad_region_mod(rect, region, image, LinearRgba::WHITE)
    }

    /// The pixel `region` of an image drawn over `rect`, multiplied by `color`.
    pub fn draw_textured_quad_region_mod(
        &mut self,
        rect: PixelRect,
        region: PixelRect,
        image: &ImageAsset,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a textured UI quad")?;
        let texture_index = self.ui_texture(image)?;
        let uv = UvRect::from_region(
            region.x,
            region.y,
            region.width,
            region.height,
            Extent2D::new(image.width, image.height),
        );
        let corners = rect_corners(self.extent(), rect, uv);
        self.append_corners(corners, color, texture_index)
    }

    /// Many quads of one image. `quads` holds 16 floats per quad: x, y, u, v
    /// of each corner, with x, y already in NDC.
    pub fn draw_textured_quads_batched(
        &mut self,
        quads: &[f32],
        image: &ImageAsset,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw textured UI quads")?;
        warn_partial(quads.len(), TEXTURED_QUAD_FLOATS);
        if quads.len() < TEXTURED_QUAD_FLOATS {
            return Ok(());
        }
        let texture_index = self.ui_texture(image)?;
        for quad in quads.chunks_exact(TEXTURED_QUAD_FLOATS) {
            let corners: [Corner; 4] = std::array::from_fn(|i| {
                [quad[i * 4], quad[i * 4 + 1], quad[i * 4 + 2], quad[i * 4 + 3]]
            });
            self.append_corners(corners, color, texture_index)?;
        }
        Ok(())
    }

    /// A line `thickness` pixels wide. Zero-length lines draw nothing.
    pub fn draw_line(
        &mut self,
        start: [f32; 2],
        end: [f32; 2],
        thickness: f32,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a UI line")?;
        match line_corners(self.extent(), start, end, thickness) {
            Some(corners) => self.append_corners(corners, color, UNTEXTURED),
            None => Ok(()),
        }
    }

    /// The outline of a rectangle, as four lines.
    pub fn draw_rect_outline(
        &mut self,
        rect: PixelRect,
        thickness: f32,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        let (left, top) = (rect.x, rect.y);
        let (right, bottom) = (rect.x + rect.width, rect.y + rect.height);
        self.draw_line([left, top], [right, top], thickness, color)?;
        self.draw_line([right, top], [right, bottom], thickness, color)?;
        self.draw_line([right, bottom], [left, bottom], thickness, color)?;
        self.draw_line([left, bottom], [left, top], thickness, color)
    }

    /// An indexed triangle mesh. Indices are local to `points`.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - An index points past `points`.
    pub fn draw_ui_triangles(
        &mut self,
        points: &[UiPoint],
        indices: &[u32],
        image: Option<&ImageAsset>,
        color: LinearRgba,
    ) -> Result<(), RendererError> {
        self.require_recording("draw UI triangles")?;
        let texture_index = match image {
            Some(image) => self.ui_texture(image)?,
            None => UNTEXTURED,
        };
        let viewport = self.extent();
        let vertices: Vec<UiVertex> = points
            .iter()
            .map(|p| {
                let [x, y] = to_ndc(viewport, p.x, p.y);
                UiVertex::new([x, y, p.u, p.v], color, texture_index)
            })
            .collect();
        self.ui
            .append_triangle_mesh(&vertices, indices)
            .report("RendererContext: Failed to append UI triangles")
    }

    /// A world-space debug line, colored `0xRRGGBB`. Does nothing unless
    /// debug drawing is enabled in the configuration.
    #[cfg(feature = "debug-draw")]
    pub fn draw_debug_line(
        &mut self,
        start: ember_core::math::Vec3,
        end: ember_core::math::Vec3,
        color: u32,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a debug line")?;
        if !self.config.debug_draw {
            return Ok(());
        }
        self.debug
            .line(start, end, color)
            .report("RendererContext: Failed to append debug line")
    }

    /// A world-space debug triangle, colored `0xRRGGBB`.
    #[cfg(feature = "debug-draw")]
    pub fn draw_debug_triangle(
        &mut self,
        a: ember_core::math::Vec3,
        b: ember_core::math::Vec3,
        c: ember_core::math::Vec3,
        color: u32,
    ) -> Result<(), RendererError> {
        self.require_recording("draw a debug triangle")?;
        if !self.config.debug_draw {
            return Ok(());
        }
        self.debug
            .triangle(a, b, c, color)
            .report("RendererContext: Failed to append debug triangle")
    }
}

fn warn_partial(len: usize, stride: usize) {
    if len % stride != 0 {
        log::warn!(
            "RendererContext: Ignoring {} trailing floats of a batched quad list",
            len % stride
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::shaders;
    use ember_core::asset::MemoryAssetSource;
    use ember_core::mock::{MockGraphicsDevice, MockSurface};
    use std::sync::Arc;

    fn recording(config: RendererConfig) -> (RendererContext, MockGraphicsDevice) {
        let device = MockGraphicsDevice::new();
        let mut assets = MemoryAssetSource::new();
        shaders::register_builtin(&mut assets);
        let mut renderer = RendererContext::new(
            Arc::new(device.clone()),
            Box::new(MockSurface::new(200, 100)),
            &assets,
            config,
        )
        .unwrap();
        renderer.begin_frame().unwrap();
        (renderer, device)
    }

    #[test]
    fn test_drawing_outside_a_frame_fails() {
        let (mut renderer, _) = recording(RendererConfig::default());
        renderer.end_frame().unwrap();
        assert!(renderer
            .draw_colored_quad(0.0, 0.0, 1.0, 1.0, LinearRgba::RED)
            .is_err());
    }

    #[test]
    fn test_colored_quad_is_untextured_ndc() {
        let (mut renderer, _) = recording(RendererConfig::default());
        renderer
            .draw_colored_quad(0.0, 0.0, 100.0, 50.0, LinearRgba::RED)
            .unwrap();
        let vertices = renderer.ui().vertices();
        assert_eq!(vertices[1].position, [-1.0, 1.0]);
        assert_eq!(vertices[3].position, [0.0, 0.0]);
        assert!(vertices.iter().all(|v| v.texture_index == UNTEXTURED));
    }

    #[test]
    fn test_textured_quad_resolves_image_once() {
        let (mut renderer, _) = recording(RendererConfig::default());
        let icon = ImageAsset::solid("icon", 4, 4, [255, 0, 0, 255]);
        renderer.draw_textured_quad(0.0, 0.0, 8.0, 8.0, &icon).unwrap();
        renderer
            .draw_textured_quad_region(
                PixelRect::new(8.0, 0.0, 8.0, 8.0),
                PixelRect::new(0.0, 0.0, 2.0, 2.0),
                &icon,
            )
            .unwrap();
        assert_eq!(renderer.textures().len(), 1);
        let region = &renderer.ui().vertices()[4..];
        assert_eq!(region[0].uv, [0.5, 0.0]);
        assert_eq!(region[2].uv, [0.0, 0.5]);
    }

    #[test]
    fn test_batched_quads_ignore_partial_tail() {
        let (mut renderer, _) = recording(RendererConfig::default());
        let mut quads = vec![0.0; COLORED_QUAD_FLOATS * 2];
        quads.extend([1.0, 2.0, 3.0]);
        renderer
            .draw_colored_quads_batched(&quads, LinearRgba::GREEN)
            .unwrap();
        assert_eq!(renderer.ui().vertex_count(), 8);
        assert_eq!(renderer.ui().index_count(), 12);
    }

    #[test]
    fn test_rect_outline_is_four_quads() {
        let (mut renderer, _) = recording(RendererConfig::default());
        renderer
            .draw_rect_outline(PixelRect::new(10.0, 10.0, 20.0, 20.0), 2.0, LinearRgba::WHITE)
            .unwrap();
        assert_eq!(renderer.ui().vertex_count(), 16);
    }

    #[test]
    fn test_ui_triangles_convert_to_ndc() {
        let (mut renderer, _) = recording(RendererConfig::default());
        let points = [
            UiPoint::new(0.0, 0.0, 0.0, 0.0),
            UiPoint::new(200.0, 0.0, 1.0, 0.0),
            UiPoint::new(200.0, 100.0, 1.0, 1.0),
        ];
        renderer
            .draw_ui_triangles(&points, &[0, 1, 2], None, LinearRgba::WHITE)
            .unwrap();
        assert_eq!(renderer.ui().vertices()[2].position, [1.0, -1.0]);
        assert!(renderer
            .draw_ui_triangles(&points, &[0, 1, 3], None, LinearRgba::WHITE)
            .is_err());
    }

    #[cfg(feature = "debug-draw")]
    #[test]
    fn test_debug_draw_follows_config_switch() {
        use ember_core::math::Vec3;

        let (mut off, _) = recording(RendererConfig::default());
        off.draw_debug_line(Vec3::ZERO, Vec3::X, 0xFFFFFF).unwrap();
        assert_eq!(off.debug_draw().line_vertex_count(), 0);

        let (mut on, _) = recording(RendererConfig {
            debug_draw: true,
            ..RendererConfig::default()
        });
        on.draw_debug_line(Vec3::ZERO, Vec3::X, 0xFFFFFF).unwrap();
        on.draw_debug_triangle(Vec3::ZERO, Vec3::X, Vec3::Y, 0x00FF00)
            .unwrap();
        assert_eq!(on.debug_draw().line_vertex_count(), 2);
        assert_eq!(on.end_frame().unwrap(), crate::FrameStatus::Presented);
        assert_eq!(on.frame_stats().draws, 2);
    }
}
