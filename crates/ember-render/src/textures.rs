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

//! Texture residency: image identity to a stable slot of the GPU texture table.
//!
//! Images are uploaded the first time something draws with them and stay
//! resident until shutdown. Shaders receive the slot index, never a texture
//! handle.

use crate::error::{report_failure, RendererError};
use crate::lock::LodLock;
use ahash::AHashMap;
use ember_core::asset::{AssetError, AssetId, ImageAsset};
use ember_core::math::Extent3D;
use ember_core::renderer::{
    AddressMode, FilterMode, GraphicsDevice, ResourceError, SamplerDescriptor, SamplerId,
    TextureDescriptor, TextureFormat, TextureId, TextureTableDescriptor, TextureTableId,
    TextureUsage, TextureViewId,
};
use image::imageops::FilterType;
use image::RgbaImage;
use std::borrow::Cow;
use std::sync::Arc;

/// Number of frames the CPU may record ahead of the GPU. Each frame in flight
/// owns one texture table, and every new slot is written to all of them.
pub const FRAMES_IN_FLIGHT: usize = 1;

/// Slot value meaning "no texture": shaders use the vertex or material color only.
pub const UNTEXTURED: u32 = u32::MAX;

/// The eight samplers covering every `{nearest, linear} x {clamp, repeat} x
/// {single level, mipmapped}` combination.
#[derive(Debug)]
pub struct SamplerSet {
    samplers: [SamplerId; 8],
}

impl SamplerSet {
    /// Table index of a combination.
    pub const fn index(linear: bool, repeat: bool, mipmapped: bool) -> usize {
        (linear as usize) | ((repeat as usize) << 1) | ((mipmapped as usize) << 2)
    }

    /// Creates all eight samplers.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let mut samplers = [SamplerId(0); 8];
        for (index, sampler) in samplers.iter_mut().enumerate() {
            let linear = index & 1 != 0;
            let repeat = index & 2 != 0;
            let mipmapped = index & 4 != 0;
            let filter = if linear {
                FilterMode::Linear
            } else {
                FilterMode::Nearest
            };
            *sampler = device.create_sampler(&SamplerDescriptor {
                label: Some(Cow::Owned(format!(
                    "Sampler {} {} {}",
                    if linear { "linear" } else { "nearest" },
                    if repeat { "repeat" } else { "clamp" },
                    if mipmapped { "mipmapped" } else { "single" },
                ))),
                address_mode: if repeat {
                    AddressMode::Repeat
                } else {
                    AddressMode::ClampToEdge
                },
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: if mipmapped {
                    FilterMode::Linear
                } else {
                    FilterMode::Nearest
                },
                lod_max_clamp: if mipmapped { 32.0 } else { 0.0 },
                anisotropy_clamp: if linear && mipmapped { 16 } else { 1 },
            })?;
        }
        Ok(Self { samplers })
    }

    /// Looks up the sampler of a combination.
    pub fn select(&self, linear: bool, repeat: bool, mipmapped: bool) -> SamplerId {
        self.samplers[Self::index(linear, repeat, mipmapped)]
    }

    /// Destroys every sampler.
    pub fn destroy(&self, device: &dyn GraphicsDevice) {
        for sampler in self.samplers {
            if let Err(e) = device.destroy_sampler(sampler) {
                log::warn!("SamplerSet: Failed to destroy sampler {sampler:?}: {e:?}");
            }
        }
    }
}

#[derive(Debug)]
struct ResidentTexture {
    texture: TextureId,
    view: TextureViewId,
    slot: u32,
}

/// Maps image identity to a slot of a fixed-capacity texture table,
/// uploading each image the first time it is resolved.
#[derive(Debug)]
pub struct TextureResidencyTable {
    tables: Vec<TextureTableId>,
    samplers: SamplerSet,
    resident: AHashMap<AssetId, ResidentTexture>,
    next_slot: u32,
    capacity: u32,
    mipmaps_enabled: bool,
    lod_lock: LodLock,
}

impl TextureResidencyTable {
    /// Creates the texture tables and samplers.
    pub fn new(
        device: &dyn GraphicsDevice,
        capacity: u32,
        mipmaps_enabled: bool,
        lod_lock: LodLock,
    ) -> Result<Self, ResourceError> {
        let samplers = SamplerSet::new(device)?;
        let mut tables = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for frame in 0..FRAMES_IN_FLIGHT {
            tables.push(device.create_texture_table(&TextureTableDescriptor {
                label: Some(Cow::Owned(format!("Texture Table [frame {frame}]"))),
                capacity,
            })?);
        }
        Ok(Self {
            tables,
            samplers,
            resident: AHashMap::new(),
            next_slot: 0,
            capacity,
            mipmaps_enabled,
            lod_lock,
        })
    }

    /// Returns the slot of `image`, uploading it first if it is not resident.
    ///
    /// ## Errors
    /// Every error is fatal: the texture table is full, the upload failed or
    /// the LOD lock was poisoned.
    pub fn resolve(
        &mut self,
        device: &dyn GraphicsDevice,
        image: &ImageAsset,
    ) -> Result<u32, RendererError> {
        if let Some(resident) = self.resident.get(&image.id) {
            return Ok(resident.slot);
        }
        if self.next_slot >= self.capacity {
            return Err(report_failure(
                "TextureResidencyTable: No free slot",
                RendererError::TextureTableFull {
                    name: image.name.clone(),
                    capacity: self.capacity,
                },
            ));
        }

        let generate_mips = image.mipmaps && self.mipmaps_enabled;
        let levels = build_mip_chain(image, generate_mips)?;
        let slot = self.next_slot;

        let resident = {
            let _guard = self.lod_lock.enter()?;
            self.upload(device, image, &levels, slot).map_err(|source| {
                report_failure(
                    "TextureResidencyTable: Failed to upload texture",
                    RendererError::TextureUpload {
                        name: image.name.clone(),
                        source,
                    },
                )
            })?
        };

        log::info!(
            "TextureResidencyTable: '{}' resident in slot {} ({}x{}, {} mip levels)",
            image.name,
            slot,
            image.width,
            image.height,
            levels.len()
        );
        self.resident.insert(image.id, resident);
        self.next_slot += 1;
        Ok(slot)
    }

    /// Uploads every level and writes the slot into every frame's table.
    /// Anything created is released again on failure.
    fn upload(
        &self,
        device: &dyn GraphicsDevice,
        image: &ImageAsset,
        levels: &[RgbaImage],
        slot: u32,
    ) -> Result<ResidentTexture, ResourceError> {
        let size = Extent3D::flat(image.width, image.height);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(image.name.as_str())),
            size,
            mip_level_count: levels.len() as u32,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsage::COPY_DST | TextureUsage::TEXTURE_BINDING,
        })?;

        let written = levels
            .iter()
            .enumerate()
            .try_for_each(|(level, pixels)| {
                let level_size = size.mip_size(level as u32);
                device.write_texture(
                    texture,
                    level as u32,
                    pixels.as_raw(),
                    level_size.width * TextureFormat::Rgba8UnormSrgb.bytes_per_pixel(),
                    level_size,
                )
            })
            .and_then(|_| device.create_texture_view(texture, Some(&image.name)));
        let view = match written {
            Ok(view) => view,
            Err(e) => {
                release_texture(device, texture, None);
                return Err(e);
            }
        };

        let sampler = self
            .samplers
            .select(image.filter_linear, image.repeat, levels.len() > 1);
        for table in &self.tables {
            if let Err(e) = device.write_texture_table_slot(*table, slot, view, sampler) {
                release_texture(device, texture, Some(view));
                return Err(e);
            }
        }
        Ok(ResidentTexture {
            texture,
            view,
            slot,
        })
    }

    /// Resolves an optional image; `None` maps to [`UNTEXTURED`].
    pub fn resolve_optional(
        &mut self,
        device: &dyn GraphicsDevice,
        image: Option<&Arc<ImageAsset>>,
    ) -> Result<u32, RendererError> {
        match image {
            Some(image) => self.resolve(device, image),
            None => Ok(UNTEXTURED),
        }
    }

    /// The slot of a resident image.
    pub fn slot_of(&self, id: AssetId) -> Option<u32> {
        self.resident.get(&id).map(|r| r.slot)
    }

    /// Number of resident images.
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Capacity of the table.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The table bound by the frame being recorded.
    pub fn current_table(&self) -> TextureTableId {
        self.tables[0]
    }

    /// Releases every texture, view, sampler and table.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for (_, resident) in self.resident.drain() {
            release_texture(device, resident.texture, Some(resident.view));
        }
        for table in self.tables.drain(..) {
            if let Err(e) = device.destroy_texture_table(table) {
                log::warn!("TextureResidencyTable: Failed to destroy table: {e:?}");
            }
        }
        self.samplers.destroy(device);
        self.next_slot = 0;
    }
}

fn release_texture(device: &dyn GraphicsDevice, texture: TextureId, view: Option<TextureViewId>) {
    if let Some(view) = view {
        if let Err(e) = device.destroy_texture_view(view) {
            log::warn!("TextureResidencyTable: Failed to destroy view: {e:?}");
        }
    }
    if let Err(e) = device.destroy_texture(texture) {
        log::warn!("TextureResidencyTable: Failed to destroy texture: {e:?}");
    }
}

/// Builds the mip chain of an image on the CPU. Level 0 is the image itself;
/// each further level halves the previous one with a triangle filter.
pub fn build_mip_chain(image: &ImageAsset, generate: bool) -> Result<Vec<RgbaImage>, RendererError> {
    let base = RgbaImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or_else(
        || {
            RendererError::Asset(AssetError::Malformed {
                name: image.name.clone(),
                reason: "pixel buffer does not match the image size".into(),
            })
        },
    )?;
    let size = Extent3D::flat(image.width, image.height);
    let level_count = if generate { size.max_mip_levels() } else { 1 };

    let mut levels = Vec::with_capacity(level_count as usize);
    levels.push(base);
    for level in 1..level_count {
        let level_size = size.mip_size(level);
        let previous = &levels[levels.len() - 1];
        let next = image::imageops::resize(
            previous,
            level_size.width,
            level_size.height,
            FilterType::Triangle,
        );
        levels.push(next);
    }
    Ok(levels)
}

/// Decodes an encoded image (PNG, BMP, ...) into an [`ImageAsset`].
pub fn decode_image(name: &str, bytes: &[u8]) -> Result<ImageAsset, AssetError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| AssetError::Malformed {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    ImageAsset::new(name, width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::mock::MockGraphicsDevice;

    fn table(device: &MockGraphicsDevice, capacity: u32, mipmaps: bool) -> TextureResidencyTable {
        TextureResidencyTable::new(device, capacity, mipmaps, LodLock::new()).unwrap()
    }

    #[test]
    fn test_resolve_uploads_once() {
        let device = MockGraphicsDevice::new();
        let mut textures = table(&device, 4, true);
        let wall = ImageAsset::solid("wall", 4, 4, [255, 0, 0, 255]);

        assert_eq!(textures.resolve(&device, &wall).unwrap(), 0);
        assert_eq!(textures.resolve(&device, &wall).unwrap(), 0);
        assert_eq!(device.texture_count(), 1);
        assert_eq!(device.slot_writes().len(), FRAMES_IN_FLIGHT);
    }

    #[test]
    fn test_slots_are_assigned_in_order() {
        let device = MockGraphicsDevice::new();
        let mut textures = table(&device, 4, false);
        let a = ImageAsset::solid("a", 1, 1, [0; 4]);
        let b = ImageAsset::solid("b", 1, 1, [0; 4]);

        assert_eq!(textures.resolve(&device, &a).unwrap(), 0);
        assert_eq!(textures.resolve(&device, &b).unwrap(), 1);
        assert_eq!(textures.slot_of(a.id), Some(0));
        assert!(device
            .table_slot(textures.current_table(), 1)
            .is_some());
    }

    #[test]
    fn test_mipmaps_need_image_and_global_option() {
        let device = MockGraphicsDevice::new();
        let image = ImageAsset::solid("m", 16, 4, [9; 4]).with_sampling(true, true, true);

        let mut enabled = table(&device, 4, true);
        enabled.resolve(&device, &image).unwrap();
        let mut disabled = table(&device, 4, false);
        disabled.resolve(&device, &image).unwrap();

        let textures = device.textures();
        let (first, second) = (textures[0].0, textures[1].0);
        assert_eq!(device.texture_mips(first), Some((5, vec![0, 1, 2, 3, 4])));
        assert_eq!(device.texture_mips(second), Some((1, vec![0])));
    }

    #[test]
    fn test_sampler_follows_image_flags() {
        let device = MockGraphicsDevice::new();
        let mut textures = table(&device, 4, true);
        let image = ImageAsset::solid("s", 8, 8, [0; 4]).with_sampling(true, true, true);
        let slot = textures.resolve(&device, &image).unwrap();

        let (_, sampler) = device.table_slot(textures.current_table(), slot).unwrap();
        assert_eq!(
            device.sampler_modes(sampler),
            Some((AddressMode::Repeat, FilterMode::Linear, FilterMode::Linear))
        );
        assert_eq!(SamplerSet::index(true, false, true), 5);
        assert_eq!(device.sampler_count(), 8);
    }

    #[test]
    fn test_full_table_is_fatal() {
        let device = MockGraphicsDevice::new();
        let mut textures = table(&device, 1, false);
        textures
            .resolve(&device, &ImageAsset::solid("a", 1, 1, [0; 4]))
            .unwrap();
        let err = textures
            .resolve(&device, &ImageAsset::solid("b", 1, 1, [0; 4]))
            .unwrap_err();
        assert!(matches!(err, RendererError::TextureTableFull { capacity: 1, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_upload_failure_is_fatal_and_releases_lock() {
        let device = MockGraphicsDevice::new();
        let lock = LodLock::new();
        let mut textures = TextureResidencyTable::new(&device, 4, false, lock.clone()).unwrap();
        device.fail_texture_creations(true);

        let err = textures
            .resolve(&device, &ImageAsset::solid("a", 1, 1, [0; 4]))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!lock.is_held());
        assert_eq!(lock.acquisitions(), 1);
        assert!(textures.is_empty());

        device.fail_texture_creations(false);
        assert_eq!(
            textures
                .resolve(&device, &ImageAsset::solid("a", 1, 1, [0; 4]))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_failed_slot_write_releases_texture() {
        let device = MockGraphicsDevice::new();
        let mut textures = table(&device, 4, false);
        device
            .destroy_texture_table(textures.current_table())
            .unwrap();

        let err = textures
            .resolve(&device, &ImageAsset::solid("a", 2, 2, [0; 4]))
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::TextureUpload {
                source: ResourceError::NotFound,
                ..
            }
        ));
        assert_eq!(device.texture_count(), 0);
        assert!(textures.is_empty());
    }

    #[test]
    fn test_decode_image_reads_png() {
        let mut png = Vec::new();
        RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let asset = decode_image("badge", &png).unwrap();
        assert_eq!((asset.width, asset.height), (2, 3));
        assert_eq!(&asset.pixels[..4], &[1, 2, 3, 255]);
        assert_eq!(asset.id, AssetId::from_name("badge"));
        assert!(matches!(
            decode_image("junk", b"not an image"),
            Err(AssetError::Malformed { .. })
        ));
    }

    #[test]
    fn test_mip_chain_halves_each_level() {
        let image = ImageAsset::solid("c", 8, 2, [10, 20, 30, 255]);
        let levels = build_mip_chain(&image, true).unwrap();
        let sizes: Vec<_> = levels.iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        assert_eq!(levels[3].get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
