//! Medscan Library
//!
//! Prescription OCR with medical-aware spelling correction. The `medscan`
//! binary in main.rs is a thin CLI over this crate.
//!
//! # Modules
//!
//! - `correction`: Domain lexicon, token classifier, spell corrector, pipeline
//! - `ocr`: Image preprocessing, OCR engines, line reconstruction
//! - `labels`: Persisted label cache and dataset labeling
//! - `service`: End-to-end `extract_and_correct`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medscan::{Config, ExtractionService};
//!
//! let service = ExtractionService::from_config(&Config::from_env()?)?;
//! let extraction = service.extract_and_correct(Path::new("rx.jpg")).await?;
//! println!("{}", extraction.text);
//! ```

pub mod config;
pub mod correction;
pub mod error;
pub mod labels;
pub mod ocr;
pub mod service;

pub use config::{Config, ConfigError};
pub use error::ExtractError;
pub use service::{
    build_lexicon, build_pipeline, Extraction, ExtractionOptions, ExtractionService,
    ExtractionSource, ServiceError,
};
