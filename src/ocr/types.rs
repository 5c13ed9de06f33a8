//! OCR Types
//!
//! Positioned text fragments as produced by an OCR engine.

use serde::{Deserialize, Serialize};

/// 2D point in image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordered corner points of a fragment, starting at the top-left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox(pub Vec<Point>);

impl BoundingBox {
    /// Axis-aligned box from pixel left/top/width/height
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self(vec![
            Point::new(left, top),
            Point::new(left + width, top),
            Point::new(left + width, top + height),
            Point::new(left, top + height),
        ])
    }

    pub fn top_left(&self) -> Option<Point> {
        self.0.first().copied()
    }
}

/// One OCR-recognized unit of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bounding_box: BoundingBox,
    /// Recognition confidence (0-1)
    pub confidence: f64,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox, confidence: f64) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Y coordinate of the top-left corner (0 for an empty box)
    pub fn top_y(&self) -> f64 {
        self.bounding_box.top_left().map(|p| p.y).unwrap_or(0.0)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Engine output: fragment groups in emission order
#[derive(Debug, Clone, Default, Serialize)]
pub struct OcrOutput {
    pub groups: Vec<Vec<TextFragment>>,
}

impl OcrOutput {
    pub fn new(groups: Vec<Vec<TextFragment>>) -> Self {
        Self { groups }
    }

    /// All fragments in emission order; group boundaries are dropped
    pub fn fragments(&self) -> impl Iterator<Item = &TextFragment> {
        self.groups.iter().flatten()
    }

    /// Fragments carrying non-blank text
    pub fn text_fragments(&self) -> impl Iterator<Item = &TextFragment> {
        self.fragments().filter(|f| !f.is_blank())
    }

    pub fn has_text(&self) -> bool {
        self.text_fragments().next().is_some()
    }

    /// Mean confidence over text fragments, `None` when there are none
    pub fn mean_confidence(&self) -> Option<f64> {
        let (sum, count) = self
            .text_fragments()
            .fold((0.0, 0usize), |(sum, count), f| (sum + f.confidence, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),
}
