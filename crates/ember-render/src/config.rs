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

//! Renderer configuration.

use crate::error::RendererError;
use ember_core::math::LinearRgba;
use serde::{Deserialize, Serialize};

/// Settings fixed at renderer creation.
///
/// Every field has a default, so a RON file only needs the values it changes:
///
/// ```ignore
/// (mipmaps: false, max_textures: 512)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Generate mip chains for images that ask for them.
    pub mipmaps: bool,
    /// Capacity of the texture table.
    pub max_textures: u32,
    /// UI capacity allocated at start-up, in quads.
    pub initial_ui_quads: usize,
    /// Extra quads allocated whenever the UI buffers grow.
    pub ui_growth_slack: usize,
    /// Debug-draw capacity allocated at start-up, in vertices.
    pub initial_debug_vertices: usize,
    /// Debug-draw buffers grow by this many primitives past the need.
    pub debug_growth_slack: usize,
    /// Default camera field of view in degrees.
    pub fov_degrees: f32,
    /// Field of view of the viewmodel in degrees.
    pub viewmodel_fov_degrees: f32,
    /// Near clip distance.
    pub near_z: f32,
    /// Far clip distance.
    pub far_z: f32,
    /// Color the frame is cleared to.
    pub clear_color: LinearRgba,
    /// Ticks per second of the LOD worker.
    pub lod_tick_hz: u32,
    /// Draw the physics debug overlay.
    pub debug_draw: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            mipmaps: true,
            max_textures: 256,
            initial_ui_quads: 64,
            ui_growth_slack: 16,
            initial_debug_vertices: 1024,
            debug_growth_slack: 16,
            fov_degrees: 90.0,
            viewmodel_fov_degrees: 70.0,
            near_z: 0.05,
            far_z: 1000.0,
            clear_color: LinearRgba::BLACK,
            lod_tick_hz: 20,
            debug_draw: false,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, RendererError> {
        let config: Self =
            ron::from_str(text).map_err(|e| RendererError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to pretty RON.
    pub fn to_ron(&self) -> Result<String, RendererError> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty_config).map_err(|e| RendererError::Config(e.to_string()))
    }

    /// Rejects values the renderer cannot work with.
    pub fn validate(&self) -> Result<(), RendererError> {
        if self.max_textures == 0 {
            return Err(RendererError::Config("max_textures must be at least 1".into()));
        }
        if !(self.near_z > 0.0 && self.far_z > self.near_z) {
            return Err(RendererError::Config(format!(
                "invalid depth range {}..{}",
                self.near_z, self.far_z
            )));
        }
        if self.lod_tick_hz == 0 {
            return Err(RendererError::Config("lod_tick_hz must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = RendererConfig::from_ron("(mipmaps: false, max_textures: 8)").unwrap();
        assert!(!config.mipmaps);
        assert_eq!(config.max_textures, 8);
        assert_eq!(config.ui_growth_slack, 16);
        assert_eq!(config.initial_debug_vertices, 1024);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = RendererConfig {
            lod_tick_hz: 5,
            ..RendererConfig::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(RendererConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(RendererConfig::from_ron("(max_textures: 0)").is_err());
        assert!(RendererConfig::from_ron("(near_z: 10.0, far_z: 1.0)").is_err());
        assert!(RendererConfig::from_ron("(mipmaps: maybe)").is_err());
    }
}
