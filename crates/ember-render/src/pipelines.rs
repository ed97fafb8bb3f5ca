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

//! The fixed set of render pipelines the frame is drawn with.

use crate::actors::ActorInstance;
use crate::debug_draw::DebugDrawVertex;
use crate::error::{report_failure, RendererError};
use crate::scene::{MapInstance, ModelInstance, ShadingBucket};
use crate::ui::UiVertex;
use ahash::AHashMap;
use ember_core::asset::AssetSource;
use ember_core::renderer::{
    BindGroupLayoutId, BlendMode, CompareFunction, CullMode, DepthState, GraphicsDevice,
    PipelineBinding, PrimitiveTopology, RenderPipelineDescriptor, RenderPipelineId,
    ShaderModuleDescriptor, ShaderModuleId, TextureFormat, TextureTableId, VertexBufferLayout,
};
use ember_core::scene::{MapVertex, ModelVertex};

/// Format of the depth target.
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// One pipeline of the frame, in drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Sky,
    MapShaded,
    MapUnshaded,
    ViewmodelShaded,
    ViewmodelUnshaded,
    ActorShaded,
    ActorUnshaded,
    DebugLines,
    DebugTriangles,
    Ui,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 10] = [
        PipelineKind::Sky,
        PipelineKind::MapShaded,
        PipelineKind::MapUnshaded,
        PipelineKind::ViewmodelShaded,
        PipelineKind::ViewmodelUnshaded,
        PipelineKind::ActorShaded,
        PipelineKind::ActorUnshaded,
        PipelineKind::DebugLines,
        PipelineKind::DebugTriangles,
        PipelineKind::Ui,
    ];

    pub fn map(bucket: ShadingBucket) -> Self {
        match bucket {
            ShadingBucket::Shaded => PipelineKind::MapShaded,
            ShadingBucket::Unshaded => PipelineKind::MapUnshaded,
        }
    }

    pub fn viewmodel(bucket: ShadingBucket) -> Self {
        match bucket {
            ShadingBucket::Shaded => PipelineKind::ViewmodelShaded,
            ShadingBucket::Unshaded => PipelineKind::ViewmodelUnshaded,
        }
    }

    pub fn actor(bucket: ShadingBucket) -> Self {
        match bucket {
            ShadingBucket::Shaded => PipelineKind::ActorShaded,
            ShadingBucket::Unshaded => PipelineKind::ActorUnshaded,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineKind::Sky => "Sky Pipeline",
            PipelineKind::MapShaded => "Map Shaded Pipeline",
            PipelineKind::MapUnshaded => "Map Unshaded Pipeline",
            PipelineKind::ViewmodelShaded => "Viewmodel Shaded Pipeline",
            PipelineKind::ViewmodelUnshaded => "Viewmodel Unshaded Pipeline",
            PipelineKind::ActorShaded => "Actor Shaded Pipeline",
            PipelineKind::ActorUnshaded => "Actor Unshaded Pipeline",
            PipelineKind::DebugLines => "Debug Line Pipeline",
            PipelineKind::DebugTriangles => "Debug Triangle Pipeline",
            PipelineKind::Ui => "UI Pipeline",
        }
    }

    /// Asset name of the shader module.
    pub fn shader_name(&self) -> &'static str {
        match self {
            PipelineKind::Sky => "sky",
            PipelineKind::MapShaded | PipelineKind::MapUnshaded => "map",
            PipelineKind::ViewmodelShaded | PipelineKind::ViewmodelUnshaded => "viewmodel",
            PipelineKind::ActorShaded | PipelineKind::ActorUnshaded => "actor",
            PipelineKind::DebugLines | PipelineKind::DebugTriangles => "debug",
            PipelineKind::Ui => "ui",
        }
    }

    fn fragment_entry(&self) -> &'static str {
        match self {
            PipelineKind::MapShaded | PipelineKind::ViewmodelShaded | PipelineKind::ActorShaded => {
                "fs_shaded"
            }
            PipelineKind::MapUnshaded
            | PipelineKind::ViewmodelUnshaded
            | PipelineKind::ActorUnshaded => "fs_unshaded",
            _ => "fs_main",
        }
    }

    fn vertex_buffers(&self) -> Vec<VertexBufferLayout<'static>> {
        match self {
            PipelineKind::Sky => vec![ModelVertex::layout()],
            PipelineKind::MapShaded | PipelineKind::MapUnshaded => {
                vec![MapVertex::layout(), MapInstance::layout()]
            }
            PipelineKind::ViewmodelShaded | PipelineKind::ViewmodelUnshaded => {
                vec![ModelVertex::layout(), ModelInstance::layout()]
            }
            PipelineKind::ActorShaded | PipelineKind::ActorUnshaded => {
                vec![ModelVertex::layout(), ActorInstance::layout()]
            }
            PipelineKind::DebugLines | PipelineKind::DebugTriangles => {
                vec![DebugDrawVertex::layout()]
            }
            PipelineKind::Ui => vec![UiVertex::layout()],
        }
    }

    fn topology(&self) -> PrimitiveTopology {
        match self {
            PipelineKind::DebugLines => PrimitiveTopology::LineList,
            _ => PrimitiveTopology::TriangleList,
        }
    }

    fn cull_mode(&self) -> CullMode {
        match self {
            PipelineKind::MapShaded
            | PipelineKind::MapUnshaded
            | PipelineKind::ViewmodelShaded
            | PipelineKind::ViewmodelUnshaded
            | PipelineKind::ActorShaded
            | PipelineKind::ActorUnshaded => CullMode::Back,
            _ => CullMode::None,
        }
    }

    /// The pass always has a depth attachment, so every pipeline declares a
    /// depth state; overlays just never test or write it.
    fn depth(&self) -> DepthState {
        let (write_enabled, compare) = match self {
            PipelineKind::Sky => (false, CompareFunction::LessEqual),
            PipelineKind::DebugLines | PipelineKind::DebugTriangles => {
                (false, CompareFunction::LessEqual)
            }
            PipelineKind::Ui => (false, CompareFunction::Always),
            _ => (true, CompareFunction::Less),
        };
        DepthState {
            format: DEPTH_FORMAT,
            write_enabled,
            compare,
        }
    }

    fn blend(&self) -> BlendMode {
        match self {
            PipelineKind::Ui | PipelineKind::DebugLines | PipelineKind::DebugTriangles => {
                BlendMode::AlphaBlend
            }
            _ => BlendMode::Opaque,
        }
    }
}

/// Every pipeline of the frame and the shader modules they were built from.
#[derive(Debug, Default)]
pub struct PipelineSet {
    pipelines: AHashMap<PipelineKind, RenderPipelineId>,
    shaders: AHashMap<&'static str, ShaderModuleId>,
}

impl PipelineSet {
    /// Loads every shader from `assets` and creates every pipeline. Group 0
    /// is the frame uniforms, group 1 the texture table.
    pub fn new(
        device: &dyn GraphicsDevice,
        assets: &dyn AssetSource,
        uniforms: BindGroupLayoutId,
        textures: TextureTableId,
        color_format: TextureFormat,
    ) -> Result<Self, RendererError> {
        let mut set = Self::default();
        if let Err(e) = set.build(device, assets, uniforms, textures, color_format) {
            set.destroy(device);
            return Err(report_failure("PipelineSet: Failed to create pipelines", e));
        }
        log::info!(
            "PipelineSet: Created {} pipelines from {} shader modules",
            set.pipelines.len(),
            set.shaders.len()
        );
        Ok(set)
    }

    fn build(
        &mut self,
        device: &dyn GraphicsDevice,
        assets: &dyn AssetSource,
        uniforms: BindGroupLayoutId,
        textures: TextureTableId,
        color_format: TextureFormat,
    ) -> Result<(), RendererError> {
        let bindings = [
            PipelineBinding::Uniforms(uniforms),
            PipelineBinding::TextureTable(textures),
        ];
        for kind in PipelineKind::ALL {
            let shader = self.shader(device, assets, kind.shader_name())?;
            let vertex_buffers = kind.vertex_buffers();
            let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(kind.label()),
                shader,
                vertex_entry: "vs_main",
                fragment_entry: kind.fragment_entry(),
                vertex_buffers: &vertex_buffers,
                bindings: &bindings,
                topology: kind.topology(),
                cull_mode: kind.cull_mode(),
                depth: Some(kind.depth()),
                blend: kind.blend(),
                color_format,
            })?;
            self.pipelines.insert(kind, pipeline);
        }
        Ok(())
    }

    fn shader(
        &mut self,
        device: &dyn GraphicsDevice,
        assets: &dyn AssetSource,
        name: &'static str,
    ) -> Result<ShaderModuleId, RendererError> {
        if let Some(module) = self.shaders.get(name) {
            return Ok(*module);
        }
        let asset = assets.load_shader(name)?;
        let module = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some(name),
            source: &asset.source,
        })?;
        self.shaders.insert(name, module);
        Ok(module)
    }

    pub fn get(&self, kind: PipelineKind) -> Option<RenderPipelineId> {
        self.pipelines.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for (_, pipeline) in self.pipelines.drain() {
            if let Err(e) = device.destroy_render_pipeline(pipeline) {
                log::warn!("PipelineSet: Failed to destroy pipeline: {:?}", e);
            }
        }
        for (_, module) in self.shaders.drain() {
            if let Err(e) = device.destroy_shader_module(module) {
                log::warn!("PipelineSet: Failed to destroy shader module: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders;
    use ember_core::asset::MemoryAssetSource;
    use ember_core::mock::MockGraphicsDevice;
    use ember_core::renderer::{BindGroupLayoutDescriptor, TextureTableDescriptor};

    fn layout_and_table(device: &MockGraphicsDevice) -> (BindGroupLayoutId, TextureTableId) {
        let layout = device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: None,
                entries: &[],
            })
            .unwrap();
        let table = device
            .create_texture_table(&TextureTableDescriptor {
                label: None,
                capacity: 4,
            })
            .unwrap();
        (layout, table)
    }

    #[test]
    fn test_every_kind_gets_a_pipeline() {
        let device = MockGraphicsDevice::new();
        let mut assets = MemoryAssetSource::new();
        shaders::register_builtin(&mut assets);
        let (layout, table) = layout_and_table(&device);

        let set = PipelineSet::new(&device, &assets, layout, table, TextureFormat::Bgra8UnormSrgb)
            .unwrap();
        assert_eq!(set.len(), PipelineKind::ALL.len());
        let ui = set.get(PipelineKind::Ui).unwrap();
        assert_eq!(device.pipeline_label(ui).as_deref(), Some("UI Pipeline"));
    }

    #[test]
    fn test_missing_shader_cleans_up() {
        let device = MockGraphicsDevice::new();
        let mut assets = MemoryAssetSource::new();
        for (name, source) in shaders::BUILTIN.iter().filter(|(n, _)| *n != "ui") {
            assets.insert_shader(*name, ember_core::renderer::ShaderSource::Wgsl(source.to_string()));
        }
        let (layout, table) = layout_and_table(&device);

        let err = PipelineSet::new(&device, &assets, layout, table, TextureFormat::Bgra8UnormSrgb)
            .unwrap_err();
        assert!(matches!(err, RendererError::Asset(_)));
        assert_eq!(device.pipeline_count(), 0);
    }

    #[test]
    fn test_bucket_kinds() {
        assert_eq!(PipelineKind::map(ShadingBucket::Unshaded), PipelineKind::MapUnshaded);
        assert_eq!(PipelineKind::actor(ShadingBucket::Shaded).fragment_entry(), "fs_shaded");
        assert_eq!(PipelineKind::DebugLines.topology(), PrimitiveTopology::LineList);
        assert!(!PipelineKind::Ui.depth().write_enabled);
    }
}
