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

//! The renderer context: every GPU resource of the frame, owned in one place.

use crate::actors::ActorModelCache;
use crate::commands::FrameCommands;
use crate::config::RendererConfig;
#[cfg(feature = "debug-draw")]
use crate::debug_draw::DebugDrawBatcher;
use crate::error::{report_failure, RendererError, ReportExt};
use crate::frame::FrameState;
use crate::lock::LodLock;
use crate::lod::LodWorker;
use crate::pipelines::{PipelineKind, PipelineSet, DEPTH_FORMAT};
use crate::scene::{SceneGeometryPacker, SkyMesh, ViewmodelPacker};
use crate::stats::FrameStats;
use crate::textures::TextureResidencyTable;
use crate::ui::UiBatcher;
use crate::uniforms::FrameUniforms;
use ember_core::asset::{AssetError, AssetSource};
use ember_core::math::{Extent2D, Extent3D};
use ember_core::renderer::{
    GraphicsDevice, PresentationSurface, RenderPipelineId, ResourceError, SurfaceFrame,
    TextureDescriptor, TextureId, TextureUsage, TextureViewId,
};
use ember_core::scene::{ActorList, Camera};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Asset name of the sky dome model.
pub const SKY_MODEL: &str = "sky";

/// The depth attachment, sized to the surface.
#[derive(Debug)]
pub(crate) struct DepthTarget {
    texture: TextureId,
    pub(crate) view: TextureViewId,
    extent: Extent2D,
}

impl DepthTarget {
    pub(crate) fn new(device: &dyn GraphicsDevice, extent: Extent2D) -> Result<Self, ResourceError> {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Depth Texture")),
            size: Extent3D::flat(extent.width.max(1), extent.height.max(1)),
            mip_level_count: 1,
            format: DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT,
        })?;
        let view = match device.create_texture_view(texture, Some("Depth Texture View")) {
            Ok(view) => view,
            Err(e) => {
                if let Err(destroy_err) = device.destroy_texture(texture) {
                    log::warn!("DepthTarget: Failed to destroy texture: {:?}", destroy_err);
                }
                return Err(e);
            }
        };
        log::info!(
            "DepthTarget: Created {}x{} depth texture",
            extent.width,
            extent.height
        );
        Ok(Self {
            texture,
            view,
            extent,
        })
    }

    /// Replaces the target with one of `extent`. Does nothing if the size
    /// did not change.
    pub(crate) fn recreate(
        &mut self,
        device: &dyn GraphicsDevice,
        extent: Extent2D,
    ) -> Result<(), ResourceError> {
        if extent == self.extent {
            return Ok(());
        }
        let replacement = Self::new(device, extent)?;
        self.destroy(device);
        *self = replacement;
        Ok(())
    }

    pub(crate) fn extent(&self) -> Extent2D {
        self.extent
    }

    pub(crate) fn destroy(&self, device: &dyn GraphicsDevice) {
        if let Err(e) = device.destroy_texture_view(self.view) {
            log::warn!("DepthTarget: Failed to destroy view: {:?}", e);
        }
        if let Err(e) = device.destroy_texture(self.texture) {
            log::warn!("DepthTarget: Failed to destroy texture: {:?}", e);
        }
    }
}

/// Owns the device, the surface and every GPU resource the frame needs.
///
/// Frames are driven with [`begin_frame`](Self::begin_frame),
/// [`render_scene`](Self::render_scene), the 2D primitives and
/// [`end_frame`](Self::end_frame). The LOD worker runs for the lifetime of
/// the context.
pub struct RendererContext {
    pub(crate) device: Arc<dyn GraphicsDevice>,
    pub(crate) surface: Box<dyn PresentationSurface>,
    pub(crate) config: RendererConfig,
    pub(crate) lod_lock: LodLock,
    pub(crate) lod_worker: LodWorker,
    pub(crate) textures: TextureResidencyTable,
    pub(crate) uniforms: FrameUniforms,
    pub(crate) pipelines: PipelineSet,
    pub(crate) depth: DepthTarget,
    pub(crate) map: SceneGeometryPacker,
    pub(crate) viewmodel: ViewmodelPacker,
    pub(crate) sky: SkyMesh,
    pub(crate) actors: ActorModelCache,
    pub(crate) ui: UiBatcher,
    #[cfg(feature = "debug-draw")]
    pub(crate) debug: DebugDrawBatcher,
    pub(crate) commands: FrameCommands,
    pub(crate) state: FrameState,
    pub(crate) frame: Option<SurfaceFrame>,
    pub(crate) scene_rendered: bool,
    /// Counters of the frame being recorded.
    pub(crate) stats: FrameStats,
    /// Counters of the last finished frame.
    pub(crate) last_stats: FrameStats,
    pub(crate) frames_presented: u64,
    /// The actor list the LOD worker was last pointed at.
    pub(crate) tracked_actors: Option<ActorList>,
    pub(crate) shut_down: bool,
}

impl fmt::Debug for RendererContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererContext")
            .field("state", &self.state)
            .field("extent", &self.surface.extent())
            .field("resident_textures", &self.textures.len())
            .field("pipelines", &self.pipelines.len())
            .field("frames_presented", &self.frames_presented)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl RendererContext {
    /// Creates every GPU resource, loads the sky model and starts the LOD
    /// worker.
    ///
    /// A missing sky model is not an error: the sky is skipped.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        surface: Box<dyn PresentationSurface>,
        assets: &dyn AssetSource,
        config: RendererConfig,
    ) -> Result<Self, RendererError> {
        config
            .validate()
            .map_err(|e| report_failure("RendererContext: Invalid configuration", e))?;
        log::info!("RendererContext: Initializing...");

        let lod_lock = LodLock::new();
        let dev = device.as_ref();
        let textures = TextureResidencyTable::new(
            dev,
            config.max_textures,
            config.mipmaps,
            lod_lock.clone(),
        )
        .report("RendererContext: Failed to create texture table")?;
        let uniforms =
            FrameUniforms::new(dev).report("RendererContext: Failed to create frame uniforms")?;
        let pipelines = PipelineSet::new(
            dev,
            assets,
            uniforms.layout(),
            textures.current_table(),
            surface.format(),
        )?;
        let depth = DepthTarget::new(dev, surface.extent())
            .report("RendererContext: Failed to create depth target")?;

        let mut sky = SkyMesh::new();
        match assets.load_model(SKY_MODEL) {
            Ok(model) => sky.load(dev, &model)?,
            Err(AssetError::NotFound { .. }) => {
                log::warn!("RendererContext: No '{}' model, the sky is skipped", SKY_MODEL);
            }
            Err(e) => {
                return Err(report_failure(
                    "RendererContext: Failed to load sky model",
                    e.into(),
                ))
            }
        }

        let ui = UiBatcher::new(dev, config.initial_ui_quads, config.ui_growth_slack)
            .report("RendererContext: Failed to create UI buffers")?;
        #[cfg(feature = "debug-draw")]
        let debug = DebugDrawBatcher::new(
            dev,
            config.initial_debug_vertices,
            config.debug_growth_slack,
        )
        .report("RendererContext: Failed to create debug-draw buffers")?;

        let mut lod_worker = LodWorker::new(lod_lock.clone(), config.lod_tick_hz);
        lod_worker.start();

        let state = if surface.extent().is_empty() {
            FrameState::Minimized
        } else {
            FrameState::Idle
        };
        log::info!(
            "RendererContext: Ready ({}x{}, {:?})",
            surface.extent().width,
            surface.extent().height,
            surface.format()
        );

        Ok(Self {
            device,
            surface,
            config,
            lod_lock,
            lod_worker,
            textures,
            uniforms,
            pipelines,
            depth,
            map: SceneGeometryPacker::new(),
            viewmodel: ViewmodelPacker::new(),
            sky,
            actors: ActorModelCache::new(),
            ui,
            #[cfg(feature = "debug-draw")]
            debug,
            commands: FrameCommands::new(),
            state,
            frame: None,
            scene_rendered: false,
            stats: FrameStats::default(),
            last_stats: FrameStats::default(),
            frames_presented: 0,
            tracked_actors: None,
            shut_down: false,
        })
    }

    pub(crate) fn pipeline(&self, kind: PipelineKind) -> Result<RenderPipelineId, RendererError> {
        self.pipelines
            .get(kind)
            .ok_or(RendererError::Resource(ResourceError::NotFound))
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// The size frames are rendered at.
    pub fn extent(&self) -> Extent2D {
        self.surface.extent()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Counters of the last finished frame.
    pub fn frame_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// A camera at the origin with the configured field of view.
    pub fn default_camera(&self) -> Camera {
        Camera {
            fov_degrees: self.config.fov_degrees,
            ..Camera::default()
        }
    }

    pub fn textures(&self) -> &TextureResidencyTable {
        &self.textures
    }

    pub fn map(&self) -> &SceneGeometryPacker {
        &self.map
    }

    pub fn viewmodel(&self) -> &ViewmodelPacker {
        &self.viewmodel
    }

    pub fn actors(&self) -> &ActorModelCache {
        &self.actors
    }

    pub fn ui(&self) -> &UiBatcher {
        &self.ui
    }

    #[cfg(feature = "debug-draw")]
    pub fn debug_draw(&self) -> &DebugDrawBatcher {
        &self.debug
    }

    /// The mutex shared with the LOD worker.
    pub fn lod_lock(&self) -> &LodLock {
        &self.lod_lock
    }

    pub fn lod_worker(&self) -> &LodWorker {
        &self.lod_worker
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Stops the LOD worker and releases every GPU resource. Later frame
    /// calls fail with `InvalidFrameState`.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("RendererContext: Shutting down...");
        self.lod_worker.stop();
        if self.frame.take().is_some() {
            self.surface.discard_frame();
        }

        let device = Arc::clone(&self.device);
        let dev = device.as_ref();
        self.ui.destroy(dev);
        #[cfg(feature = "debug-draw")]
        self.debug.destroy(dev);
        self.actors.destroy(dev);
        self.viewmodel.destroy(dev);
        self.map.destroy(dev);
        self.sky.destroy(dev);
        self.pipelines.destroy(dev);
        self.uniforms.destroy(dev);
        self.textures.destroy(dev);
        self.depth.destroy(dev);

        self.commands.clear();
        self.tracked_actors = None;
        self.shut_down = true;
        log::info!("RendererContext: Shut down.");
    }
}

impl Drop for RendererContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders;
    use ember_core::asset::{AssetId, Material, ModelDefinition, ModelLod, ShadingMode};
    use ember_core::asset::MemoryAssetSource;
    use ember_core::mock::{MockGraphicsDevice, MockSurface};
    use ember_core::scene::ModelVertex;

    fn assets(with_sky: bool) -> MemoryAssetSource {
        let mut assets = MemoryAssetSource::new();
        shaders::register_builtin(&mut assets);
        if with_sky {
            assets.insert_model(ModelDefinition {
                id: AssetId::from_name(SKY_MODEL),
                name: SKY_MODEL.into(),
                materials: vec![Arc::new(Material::new("sky", None, ShadingMode::Sky))],
                skins: vec![vec![0]],
                lods: vec![ModelLod {
                    id: 0,
                    distance: 0.0,
                    vertices: vec![ModelVertex::default(); 3],
                    slot_indices: vec![vec![0, 1, 2]],
                }],
            });
        }
        assets
    }

    #[test]
    fn test_new_starts_lod_worker_and_shutdown_stops_it() {
        let device = MockGraphicsDevice::new();
        let surface = MockSurface::new(640, 480);
        let mut renderer = RendererContext::new(
            Arc::new(device.clone()),
            Box::new(surface),
            &assets(true),
            RendererConfig::default(),
        )
        .unwrap();
        assert!(renderer.lod_worker().is_running());
        assert_eq!(renderer.state(), FrameState::Idle);
        assert_eq!(renderer.sky.index_count(), 3);

        renderer.shutdown();
        assert!(!renderer.lod_worker().is_running());
        assert!(renderer.is_shut_down());
        assert_eq!(device.pipeline_count(), 0);
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_missing_sky_model_is_not_fatal() {
        let renderer = RendererContext::new(
            Arc::new(MockGraphicsDevice::new()),
            Box::new(MockSurface::new(64, 64)),
            &assets(false),
            RendererConfig::default(),
        )
        .unwrap();
        assert!(renderer.sky.buffers().is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RendererConfig {
            max_textures: 0,
            ..RendererConfig::default()
        };
        let err = RendererContext::new(
            Arc::new(MockGraphicsDevice::new()),
            Box::new(MockSurface::new(64, 64)),
            &assets(false),
            config,
        )
        .unwrap_err();
        assert!(matches!(err, RendererError::Config(_)));
    }

    #[test]
    fn test_zero_sized_surface_starts_minimized() {
        let renderer = RendererContext::new(
            Arc::new(MockGraphicsDevice::new()),
            Box::new(MockSurface::new(0, 0)),
            &assets(false),
            RendererConfig::default(),
        )
        .unwrap();
        assert_eq!(renderer.state(), FrameState::Minimized);
        assert_eq!(renderer.default_camera().fov_degrees, 90.0);
    }
}
