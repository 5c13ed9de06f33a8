//! Configuration management for Medscan

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default location of the SymSpell English frequency dictionary
pub const DEFAULT_DICTIONARY_PATH: &str = "data/frequency_dictionary_en_82_765.txt";

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
    pub correction: CorrectionConfig,
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub language: String,
    pub psm: u8,
    /// Preprocess every image, not only low-contrast ones
    pub force_preprocess: bool,
    pub timeout_secs: u64,
    pub line_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct CorrectionConfig {
    pub max_edit_distance: u32,
    /// English frequency dictionary ("word count" per line)
    pub dictionary_path: PathBuf,
    /// JSON lexicon extension merged over the built-in vocabulary
    pub lexicon_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LabelsConfig {
    pub path: PathBuf,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ocr: OcrConfig {
                tesseract_bin: "tesseract".to_string(),
                language: "eng".to_string(),
                psm: 3,
                force_preprocess: true,
                timeout_secs: 120,
                line_threshold: 15.0,
            },
            correction: CorrectionConfig {
                max_edit_distance: 2,
                dictionary_path: PathBuf::from(DEFAULT_DICTIONARY_PATH),
                lexicon_path: None,
            },
            labels: LabelsConfig {
                path: PathBuf::from("training_data.json"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            ocr: OcrConfig {
                tesseract_bin: env::var("MEDSCAN_TESSERACT_BIN")
                    .unwrap_or(defaults.ocr.tesseract_bin),
                language: env::var("MEDSCAN_OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                psm: parse_var("MEDSCAN_OCR_PSM")?.unwrap_or(defaults.ocr.psm),
                force_preprocess: parse_bool_var("MEDSCAN_PREPROCESS")?
                    .unwrap_or(defaults.ocr.force_preprocess),
                timeout_secs: parse_var("MEDSCAN_TIMEOUT_SECS")?
                    .unwrap_or(defaults.ocr.timeout_secs),
                line_threshold: parse_checked_var("MEDSCAN_LINE_THRESHOLD", |v: &f64| {
                    v.is_finite() && *v >= 0.0
                })?
                .unwrap_or(defaults.ocr.line_threshold),
            },
            correction: CorrectionConfig {
                max_edit_distance: parse_var("MEDSCAN_MAX_EDIT_DISTANCE")?
                    .unwrap_or(defaults.correction.max_edit_distance),
                dictionary_path: env::var("MEDSCAN_DICTIONARY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.correction.dictionary_path),
                lexicon_path: env::var("MEDSCAN_LEXICON_PATH").ok().map(PathBuf::from),
            },
            labels: LabelsConfig {
                path: env::var("MEDSCAN_LABELS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.labels.path),
            },
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(None),
    }
}

/// Like `parse_var`, rejecting parsed values that fail `valid`
fn parse_checked_var<T: FromStr>(
    var: &'static str,
    valid: impl Fn(&T) -> bool,
) -> Result<Option<T>, ConfigError> {
    match parse_var::<T>(var)? {
        Some(parsed) if !valid(&parsed) => Err(ConfigError::Invalid {
            var,
            value: env::var(var).unwrap_or_default(),
        }),
        parsed => Ok(parsed),
    }
}

fn parse_bool_var(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid { var, value }),
        },
        Err(_) => Ok(None),
    }
}
