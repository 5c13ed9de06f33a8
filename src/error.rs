//! Error types for the extraction path

use std::time::Duration;

use thiserror::Error;

use crate::labels::LabelError;
use crate::ocr::OcrError;

/// Extraction result type
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors from `extract_and_correct`
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Missing file or undecodable image
    #[error("Image unreadable: {0}")]
    ImageUnreadable(String),

    #[error("No text detected in image")]
    NoTextDetected,

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Decode/preprocess task panicked or was cancelled
    #[error("Image processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Label cache error: {0}")]
    Labels(#[from] LabelError),
}

impl ExtractError {
    /// Stable identifier for structured output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageUnreadable(_) => "image_unreadable",
            Self::NoTextDetected => "no_text_detected",
            Self::Ocr(_) => "ocr_error",
            Self::Timeout(_) => "timeout",
            Self::Encode(_) => "encode_error",
            Self::Task(_) => "task_failed",
            Self::Labels(_) => "label_cache_error",
        }
    }

    /// Whether the input image itself is at fault
    pub fn is_bad_input(&self) -> bool {
        matches!(self, Self::ImageUnreadable(_) | Self::NoTextDetected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ExtractError::NoTextDetected.kind(), "no_text_detected");
        assert_eq!(
            ExtractError::ImageUnreadable("x".into()).kind(),
            "image_unreadable"
        );

        let ocr: ExtractError = OcrError::ProcessingError("boom".into()).into();
        assert_eq!(ocr.kind(), "ocr_error");
        assert_eq!(ocr.to_string(), "OCR error: OCR processing failed: boom");
    }

    #[test]
    fn test_bad_input_classification() {
        assert!(ExtractError::NoTextDetected.is_bad_input());
        assert!(ExtractError::ImageUnreadable("x".into()).is_bad_input());
        assert!(!ExtractError::Timeout(Duration::from_secs(5)).is_bad_input());
    }

    #[test]
    fn test_timeout_reports_subsecond_durations() {
        let timeout = ExtractError::Timeout(Duration::from_millis(20));
        assert_eq!(timeout.to_string(), "OCR timed out after 20ms");
        assert_eq!(
            ExtractError::Timeout(Duration::from_secs(120)).to_string(),
            "OCR timed out after 120s"
        );
    }

    #[tokio::test]
    async fn test_failed_task_has_own_kind() {
        let join_error = tokio::task::spawn_blocking(|| panic!("decoder crashed"))
            .await
            .unwrap_err();
        let error: ExtractError = join_error.into();

        assert_eq!(error.kind(), "task_failed");
        assert!(!error.is_bad_input());
        assert!(error.to_string().starts_with("Image processing task failed"));
    }
}
