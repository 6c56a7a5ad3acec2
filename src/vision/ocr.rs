//! OCR (Optical Character Recognition) module
//!
//! The recognition engine is a black box behind [`TextRecognizer`]. Latency is
//! variable, so recognition is async and awaited without blocking the runtime.

use async_trait::async_trait;

use crate::error::RecognitionError;
use crate::vision::EnhancedImage;

/// Language hint for the ID card's printed language (Indonesian)
pub const DEFAULT_LANGUAGE: &str = "ind";

/// Text recognition backend
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Backend identifier for logs
    fn name(&self) -> &'static str;

    /// Recognize the text in an image. Must not emit progress output.
    async fn recognize(
        &self,
        image: &EnhancedImage,
        language: &str,
    ) -> Result<RecognizedText, RecognitionError>;
}

/// Recognized text as lines, top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText {
    lines: Vec<String>,
}

impl RecognizedText {
    /// Split raw engine output into lines
    pub fn from_output(output: &str) -> Self {
        Self {
            lines: output.lines().map(str::to_string).collect(),
        }
    }

    #[cfg(test)]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Full text joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}
