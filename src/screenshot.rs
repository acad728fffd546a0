//! Screenshot processing and persistence
//!
//! Captured frames are padded and resized into the agent's logical frame,
//! encoded as PNG, and optionally written to disk for the caller.

use base64::{engine::general_purpose, Engine as _};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ToolError, ToolResult};
use crate::scaling::Resolution;

/// Default directory for persisted screenshots
pub const DEFAULT_OUTPUT_DIR: &str = "./tmp/outputs";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pad an image narrower than 16:10 out to 16:10.
///
/// The source image is anchored top-left on a white canvas extended to the right.
/// Returns `None` when the image is already 16:10 or wider.
pub fn letterbox(image: &RgbaImage) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    let target_width = height * 16 / 10;
    if width >= target_width {
        return None;
    }

    let mut canvas = RgbaImage::from_pixel(target_width, height, WHITE);
    imageops::replace(&mut canvas, image, 0, 0);
    Some(canvas)
}

/// Resize an image to exactly the logical frame
pub fn fit_to_frame(image: RgbaImage, frame: Resolution) -> RgbaImage {
    if image.dimensions() == (frame.width(), frame.height()) {
        return image;
    }
    tracing::debug!(
        "Resizing screenshot from {}x{} to {}",
        image.width(),
        image.height(),
        frame
    );
    imageops::resize(&image, frame.width(), frame.height(), FilterType::Lanczos3)
}

/// Encode as PNG
pub fn encode_png(image: &RgbaImage) -> ToolResult<Vec<u8>> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(data: &str) -> ToolResult<Vec<u8>> {
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ToolError::Capture(format!("invalid base64 image: {}", e)))
}

/// Writes screenshots under one directory as `screenshot_<uuid>.png`
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl Default for ScreenshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist PNG bytes and return the path they were written to
    pub async fn save(&self, png: &[u8]) -> ToolResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("screenshot_{}.png", Uuid::new_v4().simple()));
        tokio::fs::write(&path, png).await?;

        if !tokio::fs::try_exists(&path).await? {
            return Err(ToolError::Capture(format!("{} does not exist", path.display())));
        }
        tracing::debug!("Saved screenshot to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_pads_narrow_image_to_the_right() {
        let image = RgbaImage::from_pixel(1024, 768, Rgba([10, 20, 30, 255]));
        let padded = letterbox(&image).unwrap();

        assert_eq!(padded.dimensions(), (1228, 768));
        assert_eq!(*padded.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*padded.get_pixel(1023, 767), Rgba([10, 20, 30, 255]));
        assert_eq!(*padded.get_pixel(1024, 0), WHITE);
        assert_eq!(*padded.get_pixel(1227, 767), WHITE);
    }

    #[test]
    fn test_letterbox_leaves_wide_images_alone() {
        assert!(letterbox(&RgbaImage::new(1280, 800)).is_none());
        assert!(letterbox(&RgbaImage::new(1920, 1080)).is_none());
    }

    #[test]
    fn test_fit_to_frame() {
        let frame = Resolution::new(1366, 768).unwrap();
        let fitted = fit_to_frame(RgbaImage::new(1920, 1080), frame);
        assert_eq!(fitted.dimensions(), (1366, 768));
    }

    #[test]
    fn test_png_base64_round_trip() {
        let image = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        let png = encode_png(&image).unwrap();
        let decoded = decode_base64(&encode_base64(&png)).unwrap();
        let reloaded = image::load_from_memory(&decoded).unwrap().to_rgba8();
        assert_eq!(reloaded, image);
    }

    #[tokio::test]
    async fn test_store_writes_png() {
        let dir = std::env::temp_dir().join(format!("screenpilot-test-{}", Uuid::new_v4().simple()));
        let store = ScreenshotStore::new(&dir);

        let png = encode_png(&RgbaImage::new(2, 2)).unwrap();
        let path = store.save(&png).await.unwrap();

        assert!(path.starts_with(&dir));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("screenshot_") && name.ends_with(".png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), png);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
