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

//! Decoded assets consumed by the renderer.
//!
//! Loading and decoding happen elsewhere; the renderer receives
//! [`ImageAsset`], [`ModelDefinition`] and [`ShaderAsset`] values through an
//! [`AssetSource`] and treats them as immutable.

use crate::math::LinearRgba;
use crate::renderer::api::ShaderSource;
use crate::scene::ModelVertex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A stable identity derived from an asset's logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    /// Hashes `name` with 64-bit FNV-1a. The same name always yields the same id.
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            i += 1;
        }
        Self(hash)
    }
}

/// An error raised while fetching or validating an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No asset with that name exists.
    NotFound {
        /// The requested name.
        name: String,
    },
    /// The asset exists but its contents are inconsistent.
    Malformed {
        /// The asset name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A material declared a shading mode the renderer does not know.
    UnknownShading {
        /// The raw value found in the asset.
        value: u32,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { name } => write!(f, "Asset '{name}' not found"),
            AssetError::Malformed { name, reason } => {
                write!(f, "Asset '{name}' is malformed: {reason}")
            }
            AssetError::UnknownShading { value } => write!(f, "Unknown shading mode {value}"),
        }
    }
}

impl std::error::Error for AssetError {}

/// Decoded RGBA8 pixels plus the sampling hints stored with the image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Identity derived from the name.
    pub id: AssetId,
    /// Logical name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
    /// Sample with linear rather than nearest filtering.
    pub filter_linear: bool,
    /// Repeat rather than clamp outside `[0, 1]`.
    pub repeat: bool,
    /// Generate mipmaps, if the renderer also has them enabled.
    pub mipmaps: bool,
}

impl ImageAsset {
    /// Creates an image with nearest filtering, clamping and no mipmaps.
    /// ## Errors
    /// * `AssetError::Malformed` - If the pixel count does not match the size.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let name = name.into();
        if width == 0 || height == 0 || pixels.len() != (width * height * 4) as usize {
            return Err(AssetError::Malformed {
                reason: format!(
                    "{} bytes of pixel data for a {width}x{height} image",
                    pixels.len()
                ),
                name,
            });
        }
        Ok(Self {
            id: AssetId::from_name(&name),
            name,
            width,
            height,
            pixels,
            filter_linear: false,
            repeat: false,
            mipmaps: false,
        })
    }

    /// A single-color image.
    pub fn solid(name: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let name = name.into();
        Self {
            id: AssetId::from_name(&name),
            name,
            width: width.max(1),
            height: height.max(1),
            pixels: rgba.repeat((width.max(1) * height.max(1)) as usize),
            filter_linear: false,
            repeat: false,
            mipmaps: false,
        }
    }

    /// Sets the sampling hints.
    pub fn with_sampling(mut self, filter_linear: bool, repeat: bool, mipmaps: bool) -> Self {
        self.filter_linear = filter_linear;
        self.repeat = repeat;
        self.mipmaps = mipmaps;
        self
    }
}

/// The pipeline family a material is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    /// Lit by the level's directional light and fog.
    Shaded,
    /// Drawn with its texture and color only.
    Unshaded,
    /// The sky dome shader.
    Sky,
}

impl TryFrom<u32> for ShadingMode {
    type Error = AssetError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShadingMode::Shaded),
            1 => Ok(ShadingMode::Unshaded),
            2 => Ok(ShadingMode::Sky),
            value => Err(AssetError::UnknownShading { value }),
        }
    }
}

/// Surface appearance shared by map models and model skins.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Identity derived from the name.
    pub id: AssetId,
    /// Logical name.
    pub name: String,
    /// The texture, or `None` for a color-only material.
    pub texture: Option<Arc<ImageAsset>>,
    /// Tint multiplied with the texture.
    pub color: LinearRgba,
    /// Pipeline family.
    pub shading: ShadingMode,
}

impl Material {
    /// Creates a white material.
    pub fn new(name: impl Into<String>, texture: Option<Arc<ImageAsset>>, shading: ShadingMode) -> Self {
        let name = name.into();
        Self {
            id: AssetId::from_name(&name),
            name,
            texture,
            color: LinearRgba::WHITE,
            shading,
        }
    }

    /// Sets the tint.
    pub fn with_color(mut self, color: LinearRgba) -> Self {
        self.color = color;
        self
    }
}

/// One level of detail of a model.
///
/// Indices are grouped per material slot and are local to `vertices`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLod {
    /// Index of this LOD inside its model.
    pub id: u32,
    /// Camera distance from which this LOD is used.
    pub distance: f32,
    /// Vertex data.
    pub vertices: Vec<ModelVertex>,
    /// Index data, one array per material slot.
    pub slot_indices: Vec<Vec<u32>>,
}

impl ModelLod {
    /// Total index count across every slot.
    pub fn index_count(&self) -> usize {
        self.slot_indices.iter().map(Vec::len).sum()
    }

    /// Indices of every slot, concatenated in slot order.
    pub fn flattened_indices(&self) -> Vec<u32> {
        self.slot_indices.concat()
    }
}

/// A loaded model: materials, skins and LODs.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    /// Identity derived from the name.
    pub id: AssetId,
    /// Logical name.
    pub name: String,
    /// Every material any skin refers to.
    pub materials: Vec<Arc<Material>>,
    /// Per skin, the material index used by each slot.
    pub skins: Vec<Vec<usize>>,
    /// LODs, finest first.
    pub lods: Vec<ModelLod>,
}

impl ModelDefinition {
    /// Number of material slots, taken from the finest LOD.
    pub fn material_slot_count(&self) -> usize {
        self.lods.first().map_or(0, |lod| lod.slot_indices.len())
    }

    /// The material `slot` uses under `skin`.
    pub fn material(&self, skin: usize, slot: usize) -> Option<&Arc<Material>> {
        let index = *self.skins.get(skin)?.get(slot)?;
        self.materials.get(index)
    }

    /// Checks that every skin maps every slot to an existing material and
    /// that every LOD has the same slot count.
    pub fn validate(&self) -> Result<(), AssetError> {
        let slots = self.material_slot_count();
        let malformed = |reason: String| AssetError::Malformed {
            name: self.name.clone(),
            reason,
        };
        if self.lods.is_empty() {
            return Err(malformed("model has no LODs".into()));
        }
        if let Some(lod) = self.lods.iter().find(|lod| lod.slot_indices.len() != slots) {
            return Err(malformed(format!(
                "LOD {} has {} material slots, expected {slots}",
                lod.id,
                lod.slot_indices.len()
            )));
        }
        for (skin_index, skin) in self.skins.iter().enumerate() {
            if skin.len() < slots || skin.iter().any(|m| *m >= self.materials.len()) {
                return Err(malformed(format!("skin {skin_index} is incomplete")));
            }
        }
        for lod in &self.lods {
            let vertex_count = lod.vertices.len() as u32;
            if lod.slot_indices.iter().flatten().any(|i| *i >= vertex_count) {
                return Err(malformed(format!("LOD {} indexes past its vertices", lod.id)));
            }
        }
        Ok(())
    }
}

/// Shader code with its logical name.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderAsset {
    /// Logical name.
    pub name: String,
    /// The code.
    pub source: ShaderSource,
}

/// Synchronous lookup of decoded assets by logical name.
pub trait AssetSource: Send + Sync {
    /// Fetches an image.
    fn load_image(&self, name: &str) -> Result<Arc<ImageAsset>, AssetError>;

    /// Fetches a model.
    fn load_model(&self, name: &str) -> Result<Arc<ModelDefinition>, AssetError>;

    /// Fetches a shader.
    fn load_shader(&self, name: &str) -> Result<Arc<ShaderAsset>, AssetError>;
}

/// An [`AssetSource`] backed by maps filled up front.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetSource {
    images: HashMap<String, Arc<ImageAsset>>,
    models: HashMap<String, Arc<ModelDefinition>>,
    shaders: HashMap<String, Arc<ShaderAsset>>,
}

impl MemoryAssetSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image under its name.
    pub fn insert_image(&mut self, image: ImageAsset) -> Arc<ImageAsset> {
        let image = Arc::new(image);
        self.images.insert(image.name.clone(), Arc::clone(&image));
        image
    }

    /// Registers a model under its name.
    pub fn insert_model(&mut self, model: ModelDefinition) -> Arc<ModelDefinition> {
        let model = Arc::new(model);
        self.models.insert(model.name.clone(), Arc::clone(&model));
        model
    }

    /// Registers a shader under its name.
    pub fn insert_shader(&mut self, name: impl Into<String>, source: ShaderSource) {
        let name = name.into();
        self.shaders
            .insert(name.clone(), Arc::new(ShaderAsset { name, source }));
    }
}

impl AssetSource for MemoryAssetSource {
    fn load_image(&self, name: &str) -> Result<Arc<ImageAsset>, AssetError> {
        self.images.get(name).cloned().ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })
    }

    fn load_model(&self, name: &str) -> Result<Arc<ModelDefinition>, AssetError> {
        self.models.get(name).cloned().ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })
    }

    fn load_shader(&self, name: &str) -> Result<Arc<ShaderAsset>, AssetError> {
        self.shaders.get(name).cloned().ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lod(id: u32, vertices: usize, slots: Vec<Vec<u32>>) -> ModelLod {
        ModelLod {
            id,
            distance: 0.0,
            vertices: vec![ModelVertex::default(); vertices],
            slot_indices: slots,
        }
    }

    fn model(skins: Vec<Vec<usize>>, lods: Vec<ModelLod>) -> ModelDefinition {
        ModelDefinition {
            id: AssetId::from_name("crate"),
            name: "crate".into(),
            materials: vec![Arc::new(Material::new("wood", None, ShadingMode::Shaded))],
            skins,
            lods,
        }
    }

    #[test]
    fn test_asset_id_is_deterministic() {
        assert_eq!(AssetId::from_name("wall"), AssetId::from_name("wall"));
        assert_ne!(AssetId::from_name("wall"), AssetId::from_name("floor"));
        assert_eq!(AssetId::from_name("").0, 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn test_image_rejects_wrong_pixel_count() {
        assert!(ImageAsset::new("a", 2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            ImageAsset::new("a", 2, 2, vec![0; 15]),
            Err(AssetError::Malformed { .. })
        ));
    }

    #[test]
    fn test_shading_mode_from_raw() {
        assert_eq!(ShadingMode::try_from(1), Ok(ShadingMode::Unshaded));
        assert_eq!(
            ShadingMode::try_from(7),
            Err(AssetError::UnknownShading { value: 7 })
        );
    }

    #[test]
    fn test_model_validation() {
        let good = model(vec![vec![0]], vec![lod(0, 3, vec![vec![0, 1, 2]])]);
        assert!(good.validate().is_ok());
        assert_eq!(good.material(0, 0).map(|m| m.name.as_str()), Some("wood"));
        assert!(good.material(1, 0).is_none());

        let bad_index = model(vec![vec![0]], vec![lod(0, 2, vec![vec![0, 1, 2]])]);
        assert!(bad_index.validate().is_err());

        let bad_skin = model(vec![vec![3]], vec![lod(0, 3, vec![vec![0, 1, 2]])]);
        assert!(bad_skin.validate().is_err());
    }

    #[test]
    fn test_memory_source_lookup() {
        let mut assets = MemoryAssetSource::new();
        assets.insert_image(ImageAsset::solid("white", 1, 1, [255; 4]));
        assert!(assets.load_image("white").is_ok());
        assert_eq!(
            assets.load_model("missing"),
            Err(AssetError::NotFound {
                name: "missing".into()
            })
        );
    }
}
