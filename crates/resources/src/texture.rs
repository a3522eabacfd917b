//! Texture image decoding.

use std::path::Path;

use tracing::info;

use crate::error::ResourceResult;

/// Decoded texture pixels.
#[derive(Debug)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 bytes (`width * height * 4`).
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Loads and decodes an image file into RGBA8 pixels.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the image file (any format the image crate
    ///   decodes)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        let decoded = image::open(path)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels = decoded.into_raw();

        info!(
            "Texture loaded: {} ({}x{}, {} bytes)",
            path.display(),
            width,
            height,
            pixels.len()
        );

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Returns the size of the pixel data in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_generated_png() {
        let mut path = std::env::temp_dir();
        path.push(format!("viewer-test-{}.png", std::process::id()));

        let img = image::RgbaImage::from_fn(4, 2, |x, y| {
            image::Rgba([x as u8, y as u8, 0, 255])
        });
        img.save(&path).unwrap();

        let data = TextureData::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(data.width, 4);
        assert_eq!(data.height, 2);
        assert_eq!(data.byte_size(), 4 * 2 * 4);
        // First pixel round-trips
        assert_eq!(&data.pixels[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = TextureData::load(Path::new("/nonexistent/texture.png"));
        assert!(result.is_err());
    }
}
