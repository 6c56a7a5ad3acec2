//! Tesseract CLI backend
//!
//! Runs the `tesseract` binary on a temporary PNG and reads plain text from
//! stdout. Everything tesseract prints on stderr (resolution estimates,
//! warnings) is captured and only surfaces in trace logs or in the error.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::RecognizerConfig;
use crate::error::RecognitionError;
use crate::vision::ocr::{RecognizedText, TextRecognizer};
use crate::vision::EnhancedImage;

/// Text recognition through the tesseract command line tool
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    page_segmentation_mode: u32,
}

impl TesseractRecognizer {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }

    /// Languages installed for this tesseract binary
    pub async fn available_languages(&self) -> Result<Vec<String>, RecognitionError> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RecognitionError::new(format!(
                    "failed to run {} --list-langs: {}",
                    self.binary.display(),
                    e
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::new(format!(
                "tesseract --list-langs failed: {}",
                stderr.trim()
            )));
        }
        Ok(parse_language_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &EnhancedImage,
        language: &str,
    ) -> Result<RecognizedText, RecognitionError> {
        let png = encode_png(image.as_rgba().clone()).await?;

        let tmp = tempfile::Builder::new()
            .prefix("ktp-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| {
                RecognitionError::new(format!("failed to create temp file for OCR: {e}"))
            })?;
        tokio::fs::write(tmp.path(), &png)
            .await
            .map_err(|e| {
                RecognitionError::new(format!("failed to write temp image for OCR: {e}"))
            })?;

        debug!(
            "Running tesseract on {}x{} image ({} bytes)",
            image.width(),
            image.height(),
            png.len()
        );

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                RecognitionError::new(format!(
                    "failed to run {} (is it installed?): {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(RecognitionError::new(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            trace!("tesseract stderr: {}", stderr.trim());
        }

        Ok(RecognizedText::from_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// PNG-encode on the blocking pool
async fn encode_png(image: RgbaImage) -> Result<Vec<u8>, RecognitionError> {
    tokio::task::spawn_blocking(move || {
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map(|_| out.into_inner())
    })
    .await
    .map_err(|e| RecognitionError::new(format!("PNG encoder task failed: {e}")))?
    .map_err(|e| RecognitionError::new(format!("failed to encode image for OCR: {e}")))
}

/// Parse `tesseract --list-langs` output (first line is a header)
fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
