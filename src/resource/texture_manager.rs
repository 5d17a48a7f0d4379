//! A resource manager for named textures.

use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};

/// Wrapping parameters for a texture.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureWrapping {
    /// Repeats the texture when a texture coordinate is out of bounds.
    Repeat,
    /// Repeats the mirrored texture when a texture coordinate is out of bounds.
    MirroredRepeat,
    /// Repeats the nearest edge texel when a texture coordinate is out of bounds.
    ClampToEdge,
}

impl From<TextureWrapping> for wgpu::AddressMode {
    #[inline]
    fn from(val: TextureWrapping) -> Self {
        match val {
            TextureWrapping::Repeat => wgpu::AddressMode::Repeat,
            TextureWrapping::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            TextureWrapping::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// How the bytes of an image are interpreted when sampled.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureColorSpace {
    /// Bytes are sRGB encoded and decoded to linear on sampling.
    Srgb,
    /// Bytes are used as-is. Right for data maps (bump, specular, alpha) and
    /// for color maps drawn into a linear output.
    #[default]
    Linear,
}

impl TextureColorSpace {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A GPU texture with its view and sampler.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// Texture dimensions (width, height).
    pub size: (u32, u32),
}

impl Texture {
    /// Creates an RGBA8 texture from tightly packed pixels.
    ///
    /// Coordinates wrap along `u` with `wrap_u` and along `v` with `wrap_v`.
    pub fn new(
        width: u32,
        height: u32,
        data: &[u8],
        format: wgpu::TextureFormat,
        wrap_u: TextureWrapping,
        wrap_v: TextureWrapping,
        generate_mipmaps: bool,
    ) -> Arc<Texture> {
        let ctxt = Context::get();

        let mip_level_count = if generate_mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };

        let texture = ctxt.create_texture(&wgpu::TextureDescriptor {
            label: Some("texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut level_data = data.to_vec();
        let (mut level_width, mut level_height) = (width, height);

        for mip_level in 0..mip_level_count {
            if mip_level > 0 {
                level_data = downsample_rgba(&level_data, level_width, level_height);
                level_width = (level_width / 2).max(1);
                level_height = (level_height / 2).max(1);
            }

            ctxt.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level_data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level_width * 4),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = ctxt.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wrap_u.into(),
            address_mode_v: wrap_v.into(),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: if generate_mipmaps {
                wgpu::FilterMode::Linear
            } else {
                wgpu::FilterMode::Nearest
            },
            ..Default::default()
        });

        Arc::new(Texture {
            texture,
            view,
            sampler,
            size: (width, height),
        })
    }

    /// A 1x1 texture holding the single texel of `fallback`.
    pub fn new_fallback(fallback: TextureFallback) -> Arc<Texture> {
        Self::new(
            1,
            1,
            &fallback.texel(),
            wgpu::TextureFormat::Rgba8Unorm,
            TextureWrapping::Repeat,
            TextureWrapping::Repeat,
            false,
        )
    }
}

/// What a material samples when it has no usable image for a map slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureFallback {
    /// Opaque white, for slots the material does not use. Sampling it
    /// leaves colors, alpha and specular untouched.
    White,
    /// Transparent black, for maps that are named but not loaded (yet or
    /// ever). The layer contributes nothing until its image arrives.
    Empty,
}

impl TextureFallback {
    /// The fallback of a slot mapped to `name`, `None` meaning unused.
    pub fn for_slot(name: Option<&str>) -> TextureFallback {
        match name {
            Some(_) => TextureFallback::Empty,
            None => TextureFallback::White,
        }
    }

    pub fn texel(self) -> [u8; 4] {
        match self {
            TextureFallback::White => [255, 255, 255, 255],
            TextureFallback::Empty => [0, 0, 0, 0],
        }
    }
}

/// Number of levels of a full mip chain.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Halves an RGBA8 image with a box filter.
fn downsample_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let new_width = (width / 2).max(1);
    let new_height = (height / 2).max(1);
    let mut new_data = vec![0u8; (new_width * new_height * 4) as usize];

    for y in 0..new_height {
        for x in 0..new_width {
            let mut sum = [0u32; 4];
            let mut count = 0u32;

            for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (x * 2 + sx) as usize;
                let sy = (y * 2 + sy) as usize;
                if sx < width as usize && sy < height as usize {
                    let idx = (sy * width as usize + sx) * 4;
                    for (c, s) in sum.iter_mut().enumerate() {
                        *s += data[idx + c] as u32;
                    }
                    count += 1;
                }
            }

            let dst = ((y * new_width + x) * 4) as usize;
            for (c, s) in sum.iter().enumerate() {
                new_data[dst + c] = (s / count) as u8;
            }
        }
    }

    new_data
}

/// Decodes an encoded image (JPEG, PNG, ...) into RGBA8 pixels.
///
/// `path` only names the asset in the error.
pub fn decode_image(bytes: &[u8], path: &Path) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(|source| Error::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

enum TextureSlot {
    /// Decoded on the CPU, not yet uploaded.
    Pending {
        image: RgbaImage,
        color_space: TextureColorSpace,
    },
    Ready(Arc<Texture>),
}

/// Named textures shared by every material of the window.
///
/// Images can be registered before the GPU exists: they are uploaded the
/// first time a material asks for them. Until a name is uploaded, lookups
/// fall back to a 1x1 [`TextureFallback`].
pub struct TextureManager {
    fallbacks: HashMap<TextureFallback, Arc<Texture>>,
    textures: HashMap<String, TextureSlot>,
    generate_mipmaps: bool,
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureManager {
    /// Creates an empty manager. Mipmaps are generated for every upload.
    pub fn new() -> TextureManager {
        TextureManager {
            fallbacks: HashMap::new(),
            textures: HashMap::new(),
            generate_mipmaps: true,
        }
    }

    /// Mutably applies a function to the texture manager of this thread.
    pub fn get_global_manager<T, F: FnOnce(&mut TextureManager) -> T>(f: F) -> T {
        crate::window::WINDOW_CACHE.with(|cache| f(&mut cache.borrow_mut().texture_manager))
    }

    /// The 1x1 texture of `fallback`, created on first use.
    pub fn get_fallback(&mut self, fallback: TextureFallback) -> Arc<Texture> {
        self.fallbacks
            .entry(fallback)
            .or_insert_with(|| Texture::new_fallback(fallback))
            .clone()
    }

    /// Whether an image was registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    /// Whether `name` is registered but not yet uploaded.
    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.textures.get(name), Some(TextureSlot::Pending { .. }))
    }

    /// The texture registered under `name`, uploading it if needed.
    pub fn get(&mut self, name: &str) -> Option<Arc<Texture>> {
        let generate_mipmaps = self.generate_mipmaps;
        let slot = self.textures.get_mut(name)?;

        if let TextureSlot::Pending { image, color_space } = slot {
            log::debug!(
                "uploading texture `{name}` ({}x{}, {color_space:?})",
                image.width(),
                image.height()
            );
            let texture = Texture::new(
                image.width(),
                image.height(),
                image.as_raw(),
                color_space.format(),
                TextureWrapping::Repeat,
                TextureWrapping::ClampToEdge,
                generate_mipmaps,
            );
            *slot = TextureSlot::Ready(texture);
        }

        match slot {
            TextureSlot::Ready(texture) => Some(texture.clone()),
            TextureSlot::Pending { .. } => None,
        }
    }

    /// The texture bound to a map slot: the image registered under `name`,
    /// or the fallback of [`TextureFallback::for_slot`].
    pub fn get_or_fallback(&mut self, name: Option<&str>) -> Arc<Texture> {
        match name.and_then(|name| self.get(name)) {
            Some(texture) => texture,
            None => self.get_fallback(TextureFallback::for_slot(name)),
        }
    }

    /// Registers an image under `name`, replacing any previous one.
    pub fn add_image(&mut self, name: &str, image: DynamicImage, color_space: TextureColorSpace) {
        self.add_rgba(name, image.to_rgba8(), color_space)
    }

    /// Registers RGBA8 pixels under `name`, replacing any previous texture.
    pub fn add_rgba(&mut self, name: &str, image: RgbaImage, color_space: TextureColorSpace) {
        if self.textures.contains_key(name) {
            log::debug!("replacing texture `{name}`");
        }
        let _ = self.textures.insert(
            name.to_string(),
            TextureSlot::Pending { image, color_space },
        );
    }

    /// Forgets the texture registered under `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.textures.remove(name).is_some()
    }

    /// Changes whether later uploads get a mip chain.
    pub fn set_generate_mipmaps(&mut self, enabled: bool) {
        self.generate_mipmaps = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_wait_for_the_gpu() {
        let mut manager = TextureManager::new();
        assert!(!manager.contains("earth"));

        manager.add_rgba("earth", RgbaImage::new(4, 2), TextureColorSpace::Linear);
        assert!(manager.contains("earth"));
        assert!(manager.is_pending("earth"));
    }

    #[test]
    fn adding_twice_replaces() {
        let mut manager = TextureManager::new();
        manager.add_rgba("clouds", RgbaImage::new(1, 1), TextureColorSpace::Linear);
        manager.add_rgba("clouds", RgbaImage::new(2, 2), TextureColorSpace::Srgb);
        assert_eq!(manager.textures.len(), 1);
        assert!(manager.remove("clouds"));
        assert!(!manager.contains("clouds"));
    }

    #[test]
    fn named_maps_fall_back_to_nothing() {
        assert_eq!(TextureFallback::for_slot(None), TextureFallback::White);
        assert_eq!(TextureFallback::for_slot(Some("earth-at-night.jpg")), TextureFallback::Empty);
        assert_eq!(TextureFallback::White.texel(), [255; 4]);
        assert_eq!(TextureFallback::Empty.texel(), [0; 4]);
    }

    #[test]
    fn mip_chain_length() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(4096, 2048), 13);
        assert_eq!(mip_level_count(5, 3), 3);
    }

    #[test]
    fn box_filter_averages_blocks() {
        let data = [
            0, 0, 0, 255, 100, 100, 100, 255, //
            200, 200, 200, 255, 100, 100, 100, 255,
        ];
        assert_eq!(downsample_rgba(&data, 2, 2), vec![100, 100, 100, 255]);
    }

    #[test]
    fn corrupt_bytes_name_the_asset() {
        let err = decode_image(b"not an image", Path::new("assets/earth.jpg")).unwrap_err();
        assert!(err.to_string().contains("assets/earth.jpg"));
    }
}
