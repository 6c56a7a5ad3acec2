//! Frame data structures for captured camera stills

use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;

use anyhow::{Context, Result};
use base64::{prelude::BASE64_STANDARD, Engine as _};
use image::RgbaImage;
use regex::Regex;

use crate::error::DecodeError;

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime_type>[^;,]+);base64,(?P<data>.+)$")
        .expect("failed to compile regex")
});

/// A still captured from the camera, owned and never mutated
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Still image in a container format (JPEG, PNG, ...)
    bytes: Vec<u8>,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl RawFrame {
    /// Wrap an encoded still; decoding is deferred to enhancement
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            timestamp: Instant::now(),
        }
    }

    /// Parse a `data:image/...;base64,` URL as produced by browser cameras
    pub fn from_data_url(url: &str) -> Result<Self, DecodeError> {
        let caps = DATA_URL_RE
            .captures(url.trim())
            .ok_or_else(|| {
                DecodeError::DataUrl("expected data:<mime>;base64,<data>".to_string())
            })?;
        let mime_type = &caps["mime_type"];
        if !mime_type.starts_with("image/") {
            return Err(DecodeError::DataUrl(format!("unsupported MIME type {mime_type}")));
        }
        let bytes = BASE64_STANDARD
            .decode(&caps["data"])
            .map_err(|e| DecodeError::DataUrl(e.to_string()))?;
        Ok(Self::from_encoded(bytes))
    }

    /// PNG-encode an in-memory image
    #[cfg(test)]
    pub fn from_image(image: &RgbaImage) -> Self {
        let mut out = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("PNG encoding of a test image");
        Self::from_encoded(out.into_inner())
    }

    #[cfg(test)]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode into an RGBA image
    pub fn decode(&self) -> Result<RgbaImage, DecodeError> {
        let image = image::load_from_memory(&self.bytes)?.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }

    /// Write the frame to disk unchanged, for display or audit
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }
}
