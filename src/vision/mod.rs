//! Vision/OCR Layer
//!
//! Turns a raw camera frame into recognized text:
//! - [`enhance`]: deterministic upscale + grayscale + contrast stretch
//! - [`ocr`]: the recognition engine seam
//! - [`tesseract`]: tesseract CLI backend

pub mod enhance;
pub mod ocr;
pub mod tesseract;

pub use enhance::{enhance, EnhancedImage};
pub use ocr::{RecognizedText, TextRecognizer, DEFAULT_LANGUAGE};
pub use tesseract::TesseractRecognizer;
