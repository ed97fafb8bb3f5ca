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

//! # Ember Render
//!
//! The GPU frame-rendering core: texture residency, map and model geometry
//! packing, the actor model cache and its LOD worker, immediate-mode UI and
//! debug batching, and the frame cycle that submits all of it in a single
//! render pass.

pub mod actors;
pub mod commands;
pub mod config;
#[cfg(feature = "debug-draw")]
pub mod debug_draw;
pub mod draw2d;
pub mod error;
pub mod frame;
pub mod lock;
pub mod lod;
pub mod pipelines;
pub mod renderer;
pub mod scene;
pub mod shaders;
pub mod stats;
pub mod textures;
pub mod ui;
pub mod uniforms;

pub use actors::{ActorFrame, ActorInstance, ActorModelCache};
pub use config::RendererConfig;
pub use draw2d::UiPoint;
pub use error::RendererError;
pub use frame::{FrameState, FrameStatus};
pub use lock::{LodGuard, LodLock};
pub use lod::{LodCommand, LodWorker};
pub use pipelines::{PipelineKind, PipelineSet};
pub use renderer::RendererContext;
pub use scene::{SceneGeometryPacker, ShadingBucket, SkyMesh, ViewmodelPacker};
pub use stats::FrameStats;
pub use textures::{decode_image, TextureResidencyTable, UNTEXTURED};
pub use ui::geometry::{PixelRect, UvRect};
pub use ui::UiBatcher;
