//! Error taxonomy for the scan pipeline and visit submission
//!
//! Decode and recognition failures are absorbed by the scan loop. Validation
//! and submission failures are surfaced to the user.

use thiserror::Error;

/// The frame could not be interpreted as an image
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame has a zero dimension
    #[error("frame has empty dimensions {width}x{height}")]
    Empty { width: u32, height: u32 },
    /// Encoded still could not be decoded
    #[error("failed to decode frame: {0}")]
    Image(#[from] image::ImageError),
    /// Data URL was malformed
    #[error("invalid data URL: {0}")]
    DataUrl(String),
}

/// The recognition engine failed
#[derive(Debug, Error)]
#[error("text recognition failed: {message}")]
pub struct RecognitionError {
    message: String,
}

impl RecognitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Underlying engine message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One enhance -> recognize -> extract run failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    /// Enhancement worker panicked or was cancelled
    #[error("enhancement task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Required fields missing at submission time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required fields missing: {}", .missing.join(", "))]
pub struct ValidationError {
    missing: Vec<&'static str>,
}

impl ValidationError {
    pub fn new(missing: Vec<&'static str>) -> Self {
        Self { missing }
    }

    /// Names of the missing fields, in form order
    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }
}

/// The visit service could not record the visit
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Request never produced a usable response
    #[error("visit service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    /// Service answered with an error payload
    #[error("visit service rejected the record ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

impl SubmissionError {
    /// Human-readable detail to show the user
    pub fn detail(&self) -> String {
        match self {
            SubmissionError::Transport(e) => e.to_string(),
            SubmissionError::Rejected { detail, .. } => detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = ValidationError::new(vec!["id number", "purpose"]);
        assert_eq!(err.to_string(), "required fields missing: id number, purpose");
        assert_eq!(err.missing(), &["id number", "purpose"]);
    }

    #[test]
    fn test_rejected_detail() {
        let err = SubmissionError::Rejected {
            status: 400,
            detail: "NIK, Nama, dan Tujuan wajib diisi".to_string(),
        };
        assert_eq!(err.detail(), "NIK, Nama, dan Tujuan wajib diisi");
        assert!(err.to_string().contains("400"));
    }
}
