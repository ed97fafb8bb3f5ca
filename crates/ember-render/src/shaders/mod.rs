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

//! Built-in WGSL sources for every renderer pipeline.
//!
//! Each geometry kind has one module. Shaded and unshaded pipelines share
//! the module and differ by fragment entry point (`fs_shaded` /
//! `fs_unshaded`).
//!
//! # Usage
//!
//! ```ignore
//! use ember_core::asset::MemoryAssetSource;
//! use ember_render::shaders;
//!
//! let mut assets = MemoryAssetSource::new();
//! shaders::register_builtin(&mut assets);
//! ```

use ember_core::asset::MemoryAssetSource;
use ember_core::renderer::ShaderSource;

/// Static level geometry, shaded and unshaded.
pub const MAP_WGSL: &str = include_str!("map.wgsl");

/// The held item.
pub const VIEWMODEL_WGSL: &str = include_str!("viewmodel.wgsl");

/// Actor models with a per-instance transform.
pub const ACTOR_WGSL: &str = include_str!("actor.wgsl");

/// The sky dome.
pub const SKY_WGSL: &str = include_str!("sky.wgsl");

/// Immediate-mode UI.
pub const UI_WGSL: &str = include_str!("ui.wgsl");

/// Physics debug lines and triangles.
pub const DEBUG_WGSL: &str = include_str!("debug.wgsl");

/// Every built-in shader with the asset name the renderer loads it by.
pub const BUILTIN: [(&str, &str); 6] = [
    ("map", MAP_WGSL),
    ("viewmodel", VIEWMODEL_WGSL),
    ("actor", ACTOR_WGSL),
    ("sky", SKY_WGSL),
    ("ui", UI_WGSL),
    ("debug", DEBUG_WGSL),
];

/// Registers every built-in shader in `assets`.
pub fn register_builtin(assets: &mut MemoryAssetSource) {
    for (name, source) in BUILTIN {
        assets.insert_shader(name, ShaderSource::Wgsl(source.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::asset::AssetSource;

    #[test]
    fn test_every_shader_has_both_stages() {
        for (name, source) in BUILTIN {
            assert!(source.contains("@vertex"), "{name} has no vertex stage");
            assert!(source.contains("@fragment"), "{name} has no fragment stage");
        }
    }

    #[test]
    fn test_bucketed_shaders_have_both_fragment_entries() {
        for source in [MAP_WGSL, VIEWMODEL_WGSL, ACTOR_WGSL] {
            assert!(source.contains("fn fs_shaded"));
            assert!(source.contains("fn fs_unshaded"));
        }
    }

    #[test]
    fn test_register_builtin() {
        let mut assets = MemoryAssetSource::new();
        register_builtin(&mut assets);
        assert!(assets.load_shader("ui").is_ok());
        assert!(assets.load_shader("debug").is_ok());
    }
}
