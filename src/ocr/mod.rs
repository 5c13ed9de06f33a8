//! OCR Module
//!
//! Turns prescription images into positioned text and then into plain
//! multi-line text:
//! - Image decoding and preprocessing
//! - OCR engines (Tesseract CLI)
//! - Line reconstruction from fragment geometry

mod engine;
mod layout;
mod preprocess;
mod types;

pub use engine::{parse_tsv, OcrEngine, TesseractConfig, TesseractEngine};
pub use layout::{LineReconstructor, DEFAULT_LINE_THRESHOLD};
pub use preprocess::{
    encode_png, load_grayscale, needs_preprocessing, pixel_std_dev, preprocess, PreprocessOptions,
};
pub use types::{BoundingBox, OcrError, OcrOutput, Point, TextFragment};

#[cfg(test)]
pub(crate) use engine::MockEngine;
