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

//! Frame orchestration.
//!
//! A frame is `begin_frame`, at most one `render_scene`, any number of 2D
//! primitives, then `end_frame`. Everything is recorded first; the render
//! pass only exists inside `end_frame`, which is where the LOD lock is held.

use crate::error::{report_failure, RendererError, ReportExt};
use crate::pipelines::PipelineKind;
use crate::renderer::RendererContext;
use crate::scene::ShadingBucket;
use crate::stats::FrameStats;
use crate::uniforms::FrameUniformData;
use ember_core::renderer::{PresentOutcome, RenderPassDescriptor, SurfaceFrame};
use ember_core::scene::{Actor, Camera, Level};
use std::sync::Arc;

/// Where the renderer is in its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// The window has no area; frames are skipped.
    Minimized,
    /// Between frames.
    Idle,
    /// Between `begin_frame` and `end_frame`.
    Recording,
}

impl FrameState {
    fn name(&self) -> &'static str {
        match self {
            FrameState::Minimized => "minimized",
            FrameState::Idle => "idle",
            FrameState::Recording => "recording a frame",
        }
    }
}

/// Outcome of `begin_frame` and `end_frame`. None of these are errors: the
/// caller skips the frame unless `begin_frame` returned `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was acquired; record into it.
    Ready,
    /// The window is minimized.
    NotReady,
    /// The swapchain was out of date and has been recreated.
    SurfaceRecreated,
    /// The frame was presented.
    Presented,
}

impl RendererContext {
    fn invalid_state(&self, operation: &'static str) -> RendererError {
        RendererError::InvalidFrameState {
            operation,
            state: if self.shut_down {
                "shut down"
            } else {
                self.state.name()
            },
        }
    }

    pub(crate) fn require_recording(&self, operation: &'static str) -> Result<(), RendererError> {
        if self.shut_down || self.state != FrameState::Recording {
            return Err(self.invalid_state(operation));
        }
        Ok(())
    }

    /// Acquires the next frame and resets every per-frame accumulator.
    ///
    /// Returns `NotReady` while minimized and `SurfaceRecreated` if the
    /// swapchain had to be rebuilt; in both cases nothing is acquired.
    pub fn begin_frame(&mut self) -> Result<FrameStatus, RendererError> {
        if self.shut_down {
            return Err(self.invalid_state("begin a frame"));
        }
        match self.state {
            FrameState::Recording => return Err(self.invalid_state("begin a frame")),
            FrameState::Minimized => return Ok(FrameStatus::NotReady),
            FrameState::Idle => {}
        }

        let frame = match self.surface.acquire_frame() {
            Ok(frame) => frame,
            Err(e) if e.needs_reconfigure() => {
                log::warn!("RendererContext: Swapchain {} on acquire, recreating", e);
                self.recreate_swapchain()?;
                return Ok(FrameStatus::SurfaceRecreated);
            }
            Err(e) => {
                return Err(report_failure(
                    "RendererContext: Failed to acquire frame",
                    e.into(),
                ))
            }
        };

        self.ui.reset();
        #[cfg(feature = "debug-draw")]
        self.debug.reset();
        self.commands.clear();
        self.commands
            .bind_globals(self.uniforms.bind_group(), self.textures.current_table());
        self.stats = FrameStats {
            frame_number: self.frames_presented,
            ..FrameStats::default()
        };
        self.scene_rendered = false;
        self.frame = Some(frame);
        self.state = FrameState::Recording;
        Ok(FrameStatus::Ready)
    }

    /// Brings the level, viewmodel and actors up to date on the GPU and
    /// records the sky, map, viewmodel and actor draws.
    ///
    /// The first frame after a level change repacks the map and clears the
    /// actor cache before any draw is recorded.
    pub fn render_scene(&mut self, level: &Level, camera: &Camera) -> Result<(), RendererError> {
        self.require_recording("render the scene")?;
        if self.scene_rendered {
            return Err(RendererError::InvalidFrameState {
                operation: "render the scene twice",
                state: FrameState::Recording.name(),
            });
        }

        let device = Arc::clone(&self.device);
        let dev = device.as_ref();

        if self.map.loaded() != Some(level.identity) {
            self.actors.reset();
        }
        self.map.ensure_loaded(dev, &mut self.textures, level)?;
        let sky_texture = self
            .textures
            .resolve_optional(dev, level.sky_texture.as_ref())?;
        if level.viewmodel.enabled {
            self.viewmodel
                .ensure_loaded(dev, &mut self.textures, &level.viewmodel)?;
        }

        let pointed_at_level = self
            .tracked_actors
            .as_ref()
            .is_some_and(|tracked| Arc::ptr_eq(tracked, &level.actors));
        if !pointed_at_level {
            self.lod_worker.set_actors(Arc::clone(&level.actors));
            self.tracked_actors = Some(Arc::clone(&level.actors));
        }
        self.lod_worker.set_camera(camera.position);

        // Released before any texture upload, which takes the LOD lock.
        let snapshot: Vec<Actor> = level
            .actors
            .lock()
            .map_err(|_| {
                report_failure(
                    "RendererContext: Failed to read actors",
                    RendererError::LockPoisoned("actors"),
                )
            })?
            .clone();
        let actor_frame = self.actors.update(dev, &mut self.textures, &snapshot)?;
        self.stats.visible_actors = actor_frame.visible_actors;

        let uniforms = FrameUniformData::compute(
            camera,
            level,
            self.surface.extent(),
            &self.config,
            sky_texture,
        );
        self.uniforms
            .update(dev, uniforms)
            .report("RendererContext: Failed to write frame uniforms")?;

        self.record_scene(level.viewmodel.enabled)?;
        self.scene_rendered = true;
        Ok(())
    }

    fn record_scene(&mut self, viewmodel_enabled: bool) -> Result<(), RendererError> {
        if let Some((vertices, indices)) = self.sky.buffers() {
            let pipeline = self.pipeline(PipelineKind::Sky)?;
            self.commands
                .indexed(pipeline, vertices, indices, self.sky.index_count());
        }
        for bucket in ShadingBucket::ALL {
            if let Some(draw) = self.map.batch(bucket).draw() {
                let pipeline = self.pipeline(PipelineKind::map(bucket))?;
                self.commands.indirect(pipeline, draw);
            }
        }
        if viewmodel_enabled {
            for bucket in ShadingBucket::ALL {
                if let Some(draw) = self.viewmodel.draw(bucket) {
                    let pipeline = self.pipeline(PipelineKind::viewmodel(bucket))?;
                    self.commands.indirect(pipeline, draw);
                }
            }
        }
        for bucket in ShadingBucket::ALL {
            if let Some(draw) = self.actors.draw(bucket) {
                let pipeline = self.pipeline(PipelineKind::actor(bucket))?;
                self.commands.indirect(pipeline, draw);
            }
        }
        Ok(())
    }

    /// Uploads the overlays, encodes the render pass and presents.
    ///
    /// Returns `SurfaceRecreated` if presenting reported the swapchain as
    /// suboptimal or out of date. On error the frame is discarded.
    pub fn end_frame(&mut self) -> Result<FrameStatus, RendererError> {
        self.require_recording("end a frame")?;
        let Some(frame) = self.frame.take() else {
            return Err(self.invalid_state("end a frame"));
        };
        self.state = FrameState::Idle;

        let result = self.submit_and_present(frame);
        if result.is_err() {
            self.surface.discard_frame();
        }
        self.last_stats = self.stats;
        result
    }

    fn record_overlays(&mut self) -> Result<(), RendererError> {
        let device = Arc::clone(&self.device);
        let dev = device.as_ref();

        #[cfg(feature = "debug-draw")]
        self.record_debug_draw(dev)?;

        self.ui
            .apply_pending_resize(dev)
            .report("RendererContext: Failed to grow UI buffers")?;
        if !self.ui.is_empty() {
            self.stats.upload_bytes += self
                .ui
                .flush(dev)
                .report("RendererContext: Failed to upload UI geometry")?;
            if let Some((vertices, indices)) = self.ui.buffers() {
                let pipeline = self.pipeline(PipelineKind::Ui)?;
                self.commands
                    .indexed(pipeline, vertices, indices, self.ui.index_count());
            }
        }
        Ok(())
    }

    #[cfg(feature = "debug-draw")]
    fn record_debug_draw(
        &mut self,
        dev: &dyn ember_core::renderer::GraphicsDevice,
    ) -> Result<(), RendererError> {
        use crate::debug_draw::DebugPrimitive;

        if !self.config.debug_draw {
            return Ok(());
        }
        self.debug
            .apply_pending_resize(dev)
            .report("RendererContext: Failed to grow debug-draw buffers")?;
        self.stats.upload_bytes += self
            .debug
            .flush(dev)
            .report("RendererContext: Failed to upload debug-draw geometry")?;
        for (primitive, kind) in [
            (DebugPrimitive::Triangle, PipelineKind::DebugTriangles),
            (DebugPrimitive::Line, PipelineKind::DebugLines),
        ] {
            if let Some((vertices, count)) = self.debug.draw(primitive) {
                let pipeline = self.pipeline(kind)?;
                self.commands.vertices(pipeline, vertices, count);
            }
        }
        Ok(())
    }

    fn submit_and_present(&mut self, frame: SurfaceFrame) -> Result<FrameStatus, RendererError> {
        self.record_overlays()?;

        let device = Arc::clone(&self.device);
        let mut encoder = device.create_command_encoder(Some("Frame Encoder"));
        {
            let _guard = self.lod_lock.enter()?;
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Main Pass"),
                color_target: frame.view,
                clear_color: Some(self.config.clear_color),
                depth_target: Some(self.depth.view),
                clear_depth: Some(1.0),
            });
            self.commands.replay(pass.as_mut(), &mut self.stats);
        }
        device.submit_command_buffer(encoder.finish());

        match self.surface.present() {
            Ok(PresentOutcome::Presented) if !frame.suboptimal => {
                self.frames_presented += 1;
                Ok(FrameStatus::Presented)
            }
            Ok(_) => {
                self.frames_presented += 1;
                log::debug!("RendererContext: Swapchain suboptimal, recreating");
                self.recreate_swapchain()?;
                Ok(FrameStatus::SurfaceRecreated)
            }
            Err(e) if e.needs_reconfigure() => {
                log::warn!("RendererContext: Swapchain {} on present, recreating", e);
                self.recreate_swapchain()?;
                Ok(FrameStatus::SurfaceRecreated)
            }
            Err(e) => Err(report_failure("RendererContext: Failed to present", e.into())),
        }
    }

    /// Reconfigures the swapchain and depth target for the window's current
    /// size, or marks the renderer minimized if the window has no area.
    pub(crate) fn recreate_swapchain(&mut self) -> Result<(), RendererError> {
        let extent = self.surface.window_extent();
        if extent.is_empty() {
            log::info!("RendererContext: Window has no area, minimizing");
            self.state = FrameState::Minimized;
            return Ok(());
        }
        self.surface
            .resize(extent.width, extent.height)
            .report("RendererContext: Failed to recreate swapchain")?;
        self.depth
            .recreate(self.device.as_ref(), extent)
            .report("RendererContext: Failed to recreate depth target")?;
        log::info!(
            "RendererContext: Swapchain recreated at {}x{}",
            extent.width,
            extent.height
        );
        Ok(())
    }

    /// The window was minimized. An open frame is discarded.
    pub fn minimize(&mut self) {
        if self.frame.take().is_some() {
            self.surface.discard_frame();
        }
        // Nothing is drawn while minimized; the list is queued again by the
        // next render_scene.
        self.lod_worker.clear_actors();
        self.tracked_actors = None;
        self.state = FrameState::Minimized;
    }

    /// The window was restored. Rebuilds the swapchain for its size.
    pub fn restore(&mut self) -> Result<(), RendererError> {
        if self.shut_down {
            return Err(self.invalid_state("restore"));
        }
        if self.state != FrameState::Minimized {
            return Ok(());
        }
        self.state = FrameState::Idle;
        self.recreate_swapchain()
    }

    /// The window was resized to `width` x `height` pixels. A zero size
    /// minimizes.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        if self.shut_down || self.state == FrameState::Recording {
            return Err(self.invalid_state("resize"));
        }
        if width == 0 || height == 0 {
            self.minimize();
            return Ok(());
        }
        self.surface
            .resize(width, height)
            .report("RendererContext: Failed to resize swapchain")?;
        let extent = self.surface.extent();
        self.depth
            .recreate(self.device.as_ref(), extent)
            .report("RendererContext: Failed to recreate depth target")?;
        self.state = FrameState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::shaders;
    use ember_core::asset::MemoryAssetSource;
    use ember_core::math::Extent2D;
    use ember_core::mock::{MockGraphicsDevice, MockSurface, RecordedCommand};
    use ember_core::renderer::SurfaceError;

    fn renderer() -> (RendererContext, MockGraphicsDevice, MockSurface) {
        let device = MockGraphicsDevice::new();
        let surface = MockSurface::new(320, 240);
        let mut assets = MemoryAssetSource::new();
        shaders::register_builtin(&mut assets);
        let renderer = RendererContext::new(
            Arc::new(device.clone()),
            Box::new(surface.clone()),
            &assets,
            RendererConfig::default(),
        )
        .unwrap();
        (renderer, device, surface)
    }

    #[test]
    fn test_empty_frame_clears_and_presents() {
        let (mut renderer, device, surface) = renderer();
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Ready);
        assert_eq!(renderer.end_frame().unwrap(), FrameStatus::Presented);
        assert_eq!(surface.present_count(), 1);
        let commands = device.last_submission().unwrap();
        assert!(matches!(commands.first(), Some(RecordedCommand::BeginPass { .. })));
        assert_eq!(commands.last(), Some(&RecordedCommand::EndPass));
        assert!(!renderer.lod_lock().is_held());
    }

    #[test]
    fn test_out_of_order_calls_are_rejected() {
        let (mut renderer, _, _) = renderer();
        assert!(matches!(
            renderer.end_frame(),
            Err(RendererError::InvalidFrameState { .. })
        ));
        renderer.begin_frame().unwrap();
        assert!(renderer.begin_frame().is_err());
        assert!(renderer.resize(10, 10).is_err());
        renderer.end_frame().unwrap();
    }

    #[test]
    fn test_minimized_frames_are_skipped() {
        let (mut renderer, _, surface) = renderer();
        renderer.minimize();
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::NotReady);
        assert!(!surface.has_frame());
        renderer.restore().unwrap();
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Ready);
        renderer.end_frame().unwrap();
    }

    #[test]
    fn test_minimize_drops_actor_list_until_next_scene() {
        let (mut renderer, _, _) = renderer();
        let level = Level::new(Vec::new());
        renderer.begin_frame().unwrap();
        renderer.render_scene(&level, &Camera::default()).unwrap();
        renderer.end_frame().unwrap();
        assert!(renderer.tracked_actors.is_some());

        renderer.minimize();
        assert!(renderer.tracked_actors.is_none());
        assert!(renderer.lod_worker().is_running());

        renderer.restore().unwrap();
        renderer.begin_frame().unwrap();
        renderer.render_scene(&level, &Camera::default()).unwrap();
        renderer.end_frame().unwrap();
        assert!(renderer
            .tracked_actors
            .as_ref()
            .is_some_and(|tracked| Arc::ptr_eq(tracked, &level.actors)));
    }

    #[test]
    fn test_out_of_date_acquire_recreates_swapchain() {
        let (mut renderer, _, surface) = renderer();
        surface.set_window_extent(800, 600);
        surface.script_acquire(Err(SurfaceError::OutOfDate));
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::SurfaceRecreated);
        assert_eq!(surface.resizes(), vec![(800, 600)]);
        assert_eq!(renderer.depth.extent(), Extent2D::new(800, 600));
        assert_eq!(renderer.state(), FrameState::Idle);
    }

    #[test]
    fn test_failed_recreate_on_present_releases_lod_lock() {
        let (mut renderer, _, surface) = renderer();
        renderer.begin_frame().unwrap();
        surface.script_present(Err(SurfaceError::OutOfDate));
        surface.script_resize(Err(SurfaceError::Other("driver".into())));
        assert!(renderer.end_frame().is_err());
        assert!(!renderer.lod_lock().is_held());
        assert_eq!(renderer.state(), FrameState::Idle);
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Ready);
    }

    #[test]
    fn test_zero_window_on_recreate_minimizes() {
        let (mut renderer, _, surface) = renderer();
        renderer.begin_frame().unwrap();
        surface.set_window_extent(0, 0);
        surface.script_present(Ok(PresentOutcome::Suboptimal));
        assert_eq!(renderer.end_frame().unwrap(), FrameStatus::SurfaceRecreated);
        assert_eq!(renderer.state(), FrameState::Minimized);
    }
}
