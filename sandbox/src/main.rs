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

// Ember sandbox
// A checkerboard floor, a ring of spinning crates and a small HUD.

mod scene;

use std::time::Instant;

use anyhow::Result;
use ember_core::asset::MemoryAssetSource;
use ember_core::math::{LinearRgba, Mat4, Vec3};
use ember_core::scene::{Camera, Level};
use ember_infra::{create_backend, init_logging, WinitWindow, WinitWindowBuilder};
use ember_render::{shaders, FrameStatus, PixelRect, RendererConfig, RendererContext};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

const CONFIG_PATH: &str = "ember.ron";

/// Reads `ember.ron` from the working directory, falling back to defaults.
fn load_config() -> RendererConfig {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(text) => match RendererConfig::from_ron(&text) {
            Ok(config) => {
                log::info!("Loaded renderer configuration from {}", CONFIG_PATH);
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", CONFIG_PATH, e);
                RendererConfig::default()
            }
        },
        Err(_) => RendererConfig::default(),
    }
}

struct Sandbox {
    window: Option<WinitWindow>,
    renderer: Option<RendererContext>,
    level: Level,
    hud: scene::Hud,
    camera: Camera,
    started: Instant,
}

impl Sandbox {
    fn new() -> Self {
        let camera = Camera {
            position: Vec3::new(0.0, 2.0, 8.0),
            pitch: -0.15,
            ..Camera::default()
        };
        Self {
            window: None,
            renderer: None,
            level: scene::demo_level(),
            hud: scene::Hud::new(),
            camera,
            started: Instant::now(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = WinitWindowBuilder::new()
            .with_title("Ember Sandbox")
            .build(event_loop)?;
        let (device, surface) = create_backend(window.clone())?;

        let mut assets = MemoryAssetSource::new();
        shaders::register_builtin(&mut assets);
        assets.insert_model(scene::sky_model());

        let renderer = RendererContext::new(
            std::sync::Arc::new(device),
            Box::new(surface),
            &assets,
            load_config(),
        )?;
        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn animate(&mut self) {
        let t = self.started.elapsed().as_secs_f32();
        self.camera.yaw = (t * 0.1).sin() * 0.4;
        let Ok(mut actors) = self.level.actors.lock() else {
            return;
        };
        let count = actors.len().max(1) as f32;
        for (i, actor) in actors.iter_mut().enumerate() {
            let angle = i as f32 / count * std::f32::consts::TAU;
            let position = Vec3::new(angle.cos() * 5.0, 0.5, angle.sin() * 5.0 - 10.0);
            actor.transform =
                Mat4::from_translation(position) * Mat4::from_rotation_y(t + angle);
        }
        self.level.physics_tick += 1;
    }

    fn draw(&mut self) -> Result<()> {
        self.animate();
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        match renderer.begin_frame()? {
            FrameStatus::Ready => {}
            status => {
                log::trace!("Frame skipped: {:?}", status);
                return Ok(());
            }
        }

        renderer.render_scene(&self.level, &self.camera)?;

        let extent = renderer.extent();
        let (cx, cy) = (extent.width as f32 / 2.0, extent.height as f32 / 2.0);
        renderer.draw_line([cx - 8.0, cy], [cx + 8.0, cy], 2.0, LinearRgba::WHITE)?;
        renderer.draw_line([cx, cy - 8.0], [cx, cy + 8.0], 2.0, LinearRgba::WHITE)?;
        renderer.draw_textured_quad(16.0, 16.0, 96.0, 96.0, &self.hud.badge)?;
        renderer.draw_rect_outline(
            PixelRect::new(16.0, 16.0, 96.0, 96.0),
            2.0,
            LinearRgba::new(1.0, 0.6, 0.1, 1.0),
        )?;
        let health = 0.5 + 0.5 * self.started.elapsed().as_secs_f32().sin();
        renderer.draw_colored_quad(
            16.0,
            extent.height as f32 - 32.0,
            200.0 * health,
            12.0,
            LinearRgba::new(0.8, 0.1, 0.1, 0.9),
        )?;

        if renderer.end_frame()? == FrameStatus::Presented
            && renderer.frames_presented() % 600 == 0
        {
            let stats = renderer.frame_stats();
            log::info!(
                "Frame {}: {} indexed draws, {} indirect draws, {} bytes uploaded",
                stats.frame_number,
                stats.indexed_draws,
                stats.indirect_draws,
                stats.upload_bytes
            );
        }
        Ok(())
    }
}

impl ApplicationHandler for Sandbox {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        log::info!("Application resumed. Initializing window and renderer...");
        if let Err(e) = self.init(event_loop) {
            log::error!("Failed to initialize the renderer: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(WinitWindow::id) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested, exiting event loop...");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(e) = renderer.resize(size.width, size.height) {
                        log::error!("Resize failed: {}", e);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw() {
                    log::error!("Rendering error: {:#}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.shutdown();
        }
        log::info!("Sandbox shut down.");
    }
}

fn main() -> Result<()> {
    init_logging();
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = Sandbox::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}
