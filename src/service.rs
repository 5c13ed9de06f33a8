//! Extraction Service
//!
//! End-to-end path from an image file to corrected text:
//! label cache lookup, decode and preprocess, OCR under a timeout, line
//! reconstruction and correction.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, CorrectionConfig};
use crate::correction::{CorrectionPipeline, DomainLexicon, LexiconError, SpellerError};
use crate::error::{ExtractError, Result};
use crate::labels::LabelCache;
use crate::ocr::{
    encode_png, load_grayscale, needs_preprocessing, preprocess, LineReconstructor, OcrEngine,
    PreprocessOptions, TesseractConfig, TesseractEngine,
};

/// Error type for service initialization
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to load lexicon: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Failed to initialize spell corrector: {0}")]
    Speller(#[from] SpellerError),
}

/// Where the returned text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Confirmed transcription from the label cache
    LabelCache,
    /// OCR followed by correction
    Corrected,
}

/// Result of `extract_and_correct`
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub text: String,
    pub source: ExtractionSource,
    /// Reconstructed OCR text before correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub fragments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
    pub preprocessed: bool,
}

impl Extraction {
    fn from_label(text: String) -> Self {
        Self {
            text,
            source: ExtractionSource::LabelCache,
            raw_text: None,
            fragments: 0,
            mean_confidence: None,
            preprocessed: false,
        }
    }
}

/// Extraction options
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// OCR language passed to the engine
    pub language: String,
    /// Upper bound on a single OCR call
    pub timeout: Duration,
    pub line_threshold: f64,
    pub preprocess: PreprocessOptions,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            timeout: Duration::from_secs(120),
            line_threshold: crate::ocr::DEFAULT_LINE_THRESHOLD,
            preprocess: PreprocessOptions::default(),
        }
    }
}

/// Shared extraction service
///
/// Cloning is cheap; clones share the engine, pipeline and label cache.
#[derive(Clone)]
pub struct ExtractionService {
    inner: Arc<ExtractionServiceInner>,
}

struct ExtractionServiceInner {
    engine: Arc<dyn OcrEngine>,
    pipeline: CorrectionPipeline,
    labels: LabelCache,
    reconstructor: LineReconstructor,
    options: ExtractionOptions,
}

impl ExtractionService {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        pipeline: CorrectionPipeline,
        labels: LabelCache,
        options: ExtractionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ExtractionServiceInner {
                engine,
                pipeline,
                labels,
                reconstructor: LineReconstructor::new(options.line_threshold),
                options,
            }),
        }
    }

    /// Build the service from configuration with the Tesseract engine
    pub fn from_config(config: &Config) -> std::result::Result<Self, ServiceError> {
        let engine = TesseractEngine::new(TesseractConfig {
            binary: config.ocr.tesseract_bin.clone(),
            default_language: config.ocr.language.clone(),
            psm: config.ocr.psm,
            temp_dir: None,
        });
        let pipeline = build_pipeline(&config.correction)?;
        let labels = LabelCache::open(&config.labels.path);

        let options = ExtractionOptions {
            language: config.ocr.language.clone(),
            timeout: Duration::from_secs(config.ocr.timeout_secs),
            line_threshold: config.ocr.line_threshold,
            preprocess: PreprocessOptions {
                force: config.ocr.force_preprocess,
                ..Default::default()
            },
        };

        Ok(Self::new(Arc::new(engine), pipeline, labels, options))
    }

    /// Get the correction pipeline
    pub fn pipeline(&self) -> &CorrectionPipeline {
        &self.inner.pipeline
    }

    /// Get the label cache
    pub fn labels(&self) -> &LabelCache {
        &self.inner.labels
    }

    /// Check if the OCR engine can be used
    pub async fn engine_available(&self) -> bool {
        self.inner.engine.is_available().await
    }

    /// Extract and correct the text of an image.
    ///
    /// The label cache is keyed by the path string exactly as given; a
    /// hit is returned without reading the image.
    pub async fn extract_and_correct(&self, image_path: &Path) -> Result<Extraction> {
        let key = image_path.display().to_string();
        if let Some(text) = self.inner.labels.lookup(&key) {
            tracing::info!(image = %key, "Label cache hit");
            return Ok(Extraction::from_label(text));
        }

        let (png, preprocessed) = self.prepare_image(image_path).await?;

        let recognition = self
            .inner
            .engine
            .recognize(&png, Some(self.inner.options.language.as_str()));
        let output = tokio::time::timeout(self.inner.options.timeout, recognition)
            .await
            .map_err(|_| {
                tracing::warn!(
                    image = %key,
                    engine = self.inner.engine.name(),
                    "OCR timed out"
                );
                ExtractError::Timeout(self.inner.options.timeout)
            })??;

        if !output.has_text() {
            return Err(ExtractError::NoTextDetected);
        }

        let raw_text = self.inner.reconstructor.reconstruct_output(&output);
        let text = self.inner.pipeline.correct(&raw_text);
        let fragments = output.text_fragments().count();

        tracing::info!(
            image = %key,
            engine = self.inner.engine.name(),
            fragments,
            preprocessed,
            "Extracted text"
        );

        Ok(Extraction {
            text,
            source: ExtractionSource::Corrected,
            raw_text: Some(raw_text),
            fragments,
            mean_confidence: output.mean_confidence(),
            preprocessed,
        })
    }

    /// Record a confirmed transcription for an image path
    pub fn confirm(&self, image_path: &Path, text: &str) -> Result<()> {
        self.inner
            .labels
            .record(image_path.display().to_string(), text.trim())?;
        Ok(())
    }

    /// Decode, maybe preprocess, and PNG-encode on the blocking pool
    async fn prepare_image(&self, image_path: &Path) -> Result<(Vec<u8>, bool)> {
        let path = image_path.to_path_buf();
        let options = self.inner.options.preprocess.clone();

        tokio::task::spawn_blocking(move || {
            let image = load_grayscale(&path)?;
            let preprocessed = options.force || needs_preprocessing(&image, &options);
            let image = if preprocessed {
                preprocess(&image, &options)
            } else {
                image
            };
            Ok::<_, ExtractError>((encode_png(&image)?, preprocessed))
        })
        .await?
    }
}

/// Lexicon from configuration: built-in vocabulary plus optional extension
pub fn build_lexicon(config: &CorrectionConfig) -> std::result::Result<DomainLexicon, LexiconError> {
    match &config.lexicon_path {
        Some(path) => DomainLexicon::medical_with_extension(path),
        None => Ok(DomainLexicon::medical()),
    }
}

/// Correction pipeline from configuration
pub fn build_pipeline(config: &CorrectionConfig) -> std::result::Result<CorrectionPipeline, ServiceError> {
    let lexicon = build_lexicon(config)?;
    let pipeline =
        CorrectionPipeline::medical(lexicon, &config.dictionary_path, config.max_edit_distance)?;
    Ok(pipeline)
}
