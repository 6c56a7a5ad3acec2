//! Frame enhancement for OCR
//!
//! Upscale, grayscale and a gentle contrast stretch. No hard binarization: it
//! breaks the stroke shapes that separate digits like 3/8 and 1/7.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::map::map_colors;
use tracing::debug;

use crate::capture::RawFrame;
use crate::error::DecodeError;

/// Linear upscale factor applied to both axes
pub const UPSCALE_FACTOR: u32 = 2;
/// Contrast gain around the midpoint
pub const CONTRAST_GAIN: f32 = 1.5;
/// Contrast midpoint
pub const CONTRAST_MIDPOINT: f32 = 128.0;

/// Enhanced frame ready for recognition, never mutated after creation
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    image: RgbaImage,
}

impl EnhancedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }
}

/// Decode, upscale and tone-map a frame
pub fn enhance(frame: &RawFrame) -> Result<EnhancedImage, DecodeError> {
    let source = frame.decode()?;
    Ok(enhance_image(&source))
}

/// Upscale and tone-map an already decoded image
pub fn enhance_image(source: &RgbaImage) -> EnhancedImage {
    let (width, height) = source.dimensions();
    let new_width = width * UPSCALE_FACTOR;
    let new_height = height * UPSCALE_FACTOR;

    // Smooth resampling so small glyphs gain real stroke detail
    let upscaled = imageops::resize(source, new_width, new_height, FilterType::CatmullRom);

    let image = map_colors(&upscaled, |pixel: Rgba<u8>| {
        let [r, g, b, a] = pixel.0;
        let value = stretch(luminance(r, g, b));
        Rgba([value, value, value, a])
    });

    debug!(
        "Enhanced frame {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    EnhancedImage { image }
}

/// Perceptual luminance
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Linear contrast stretch around the midpoint, clamped to a byte
fn stretch(luminance: f32) -> u8 {
    let intercept = CONTRAST_MIDPOINT * (1.0 - CONTRAST_GAIN);
    (luminance * CONTRAST_GAIN + intercept).clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(255, 0, 0) - 76.245).abs() < 0.001);
        assert!((luminance(0, 255, 0) - 149.685).abs() < 0.001);
        assert!((luminance(0, 0, 255) - 29.07).abs() < 0.001);
    }

    #[test]
    fn test_stretch() {
        // Midpoint is a fixed point
        assert_eq!(stretch(128.0), 128);
        // 100 * 1.5 - 64 = 86
        assert_eq!(stretch(100.0), 86);
        // Red: 76.245 * 1.5 - 64 = 50.37
        assert_eq!(stretch(luminance(255, 0, 0)), 50);
        assert_eq!(stretch(0.0), 0);
        assert_eq!(stretch(30.0), 0);
        assert_eq!(stretch(255.0), 255);
        assert_eq!(stretch(230.0), 255);
    }

    #[test]
    fn test_enhance_doubles_dimensions() {
        let frame = RawFrame::from_image(&RgbaImage::from_pixel(3, 5, Rgba([90, 90, 90, 255])));
        let enhanced = enhance(&frame).unwrap();
        assert_eq!(enhanced.width(), 6);
        assert_eq!(enhanced.height(), 10);
    }

    #[test]
    fn test_enhance_output_is_gray_and_keeps_alpha() {
        let mut source = RgbaImage::new(4, 4);
        for (x, y, pixel) in source.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 60) as u8, (y * 60) as u8, 200, 255]);
        }
        let enhanced = enhance_image(&source);
        for pixel in enhanced.as_rgba().pixels() {
            let [r, g, b, a] = pixel.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn test_enhance_uniform_frame() {
        let source = RgbaImage::from_pixel(5, 5, Rgba([100, 100, 100, 255]));
        let enhanced = enhance_image(&source);
        for pixel in enhanced.as_rgba().pixels() {
            // 100 * 1.5 - 64 = 86, allow resampling rounding
            assert!((pixel.0[0] as i32 - 86).abs() <= 1);
        }
    }

    #[test]
    fn test_enhance_is_deterministic() {
        let mut source = RgbaImage::new(3, 3);
        for (x, y, pixel) in source.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 80) as u8, 40, (y * 90) as u8, 255]);
        }
        let a = enhance_image(&source);
        let b = enhance_image(&source);
        assert_eq!(a.as_rgba().as_raw(), b.as_rgba().as_raw());
    }

    #[test]
    fn test_enhance_bad_frame() {
        let frame = RawFrame::from_encoded(vec![0; 5]);
        assert!(enhance(&frame).is_err());
    }
}
