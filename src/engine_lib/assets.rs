// src/engine_lib/assets.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Largest edge the renderer's device accepts (`wgpu::Limits::default()`).
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

/// Stable handle into a `TextureRegistry`. The renderer keeps its GPU textures
/// in a `Vec` indexed by the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read texture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {path} is {width}x{height}, larger than {max} on a side")]
    TooLarge {
        path: String,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// Decoded RGBA8 pixels, rows bottom-up.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Default)]
pub struct TextureRegistry {
    images: Vec<ImageData>,
    by_path: HashMap<PathBuf, TextureId>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `path` once; later loads of the same path return the cached id.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TextureId, TextureError> {
        let path = path.as_ref();
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }

        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| TextureError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        if decoded.width() > MAX_TEXTURE_DIMENSION || decoded.height() > MAX_TEXTURE_DIMENSION {
            return Err(TextureError::TooLarge {
                path: path.display().to_string(),
                width: decoded.width(),
                height: decoded.height(),
                max: MAX_TEXTURE_DIMENSION,
            });
        }
        let rgba = decoded.flipv().to_rgba8();

        let id = self.insert(ImageData {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        });
        self.by_path.insert(path.to_path_buf(), id);
        log::debug!("Loaded texture {} as {:?}", path.display(), id);
        Ok(id)
    }

    /// Registers already-decoded pixels, bypassing the path cache.
    pub fn insert(&mut self, image: ImageData) -> TextureId {
        self.images.push(image);
        TextureId(self.images.len() - 1)
    }

    pub fn get(&self, id: TextureId) -> Option<&ImageData> {
        self.images.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &ImageData)> {
        self.images.iter().enumerate().map(|(i, img)| (TextureId(i), img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sandbox3d_{}_{}.png", std::process::id(), name));
        // Top row red, bottom row blue.
        let img = image::RgbaImage::from_fn(2, 2, |_, y| {
            if y == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn same_path_loads_once() {
        let path = write_png("dedupe");
        let mut registry = TextureRegistry::new();
        let a = registry.load(&path).unwrap();
        let b = registry.load(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn images_are_flipped_vertically() {
        let path = write_png("flip");
        let mut registry = TextureRegistry::new();
        let id = registry.load(&path).unwrap();
        let img = registry.get(id).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        // First stored row is the former bottom row.
        assert_eq!(&img.rgba[0..4], &[0, 0, 255, 255]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_reported() {
        let mut registry = TextureRegistry::new();
        let err = registry.load("no/such/texture.png").unwrap_err();
        assert!(matches!(err, TextureError::Io { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn oversized_image_is_rejected() {
        let path = std::env::temp_dir().join(format!("sandbox3d_{}_wide.png", std::process::id()));
        image::RgbaImage::new(MAX_TEXTURE_DIMENSION + 1, 1).save(&path).unwrap();
        let mut registry = TextureRegistry::new();
        let err = registry.load(&path).unwrap_err();
        assert!(matches!(err, TextureError::TooLarge { width, .. } if width == MAX_TEXTURE_DIMENSION + 1));
        assert!(registry.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let path = std::env::temp_dir().join(format!("sandbox3d_{}_garbage.png", std::process::id()));
        std::fs::write(&path, b"not an image").unwrap();
        let mut registry = TextureRegistry::new();
        assert!(matches!(registry.load(&path), Err(TextureError::Decode { .. })));
        std::fs::remove_file(path).ok();
    }
}
