//! OCR Engines
//!
//! Defines the engine trait and the Tesseract CLI implementation.
//!
//! ## Requirements
//!
//! - `tesseract` must be installed and available in PATH (or configured
//!   via `MEDSCAN_TESSERACT_BIN`)

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{BoundingBox, OcrError, OcrOutput, TextFragment};

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs and diagnostics
    fn name(&self) -> &str;

    /// Check if the engine can be used
    async fn is_available(&self) -> bool;

    /// Recognize text in a PNG-encoded image
    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<OcrOutput, OcrError>;
}

/// Configuration for the Tesseract engine
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Path to the tesseract executable (default: "tesseract" - uses PATH)
    pub binary: String,
    /// Default language (default: "eng")
    pub default_language: String,
    /// Page segmentation mode (default: 3, fully automatic)
    pub psm: u8,
    /// Temporary directory for input images (default: system temp)
    pub temp_dir: Option<PathBuf>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            default_language: "eng".to_string(),
            psm: 3,
            temp_dir: None,
        }
    }
}

/// Tesseract OCR engine driven through its CLI
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    /// Validate language code to prevent argument injection
    fn validate_language(lang: &str) -> Result<(), OcrError> {
        // e.g. "eng", "eng+deu", "chi_sim"
        if lang.is_empty() || lang.len() > 20 {
            return Err(OcrError::ProcessingError(
                "Invalid language code length".to_string(),
            ));
        }
        if let Some(c) = lang
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '+' && *c != '_')
        {
            return Err(OcrError::ProcessingError(format!(
                "Invalid character in language code: {}",
                c
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        let result = Command::new(&self.config.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }

    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<OcrOutput, OcrError> {
        let lang = language.unwrap_or(&self.config.default_language);
        Self::validate_language(lang)?;

        let temp_dir = self.config.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        let input_path = temp_dir.join(format!("medscan_ocr_{}.png", uuid::Uuid::new_v4()));

        tokio::fs::write(&input_path, image_data)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp file: {}", e)))?;

        let output = Command::new(&self.config.binary)
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        // Clean up input file
        let _ = tokio::fs::remove_file(&input_path).await;

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::NotAvailable(format!("{} not found", self.config.binary))
            } else {
                OcrError::ProcessingError(format!("Failed to run tesseract: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let result = parse_tsv(&tsv)?;

        tracing::debug!(
            groups = result.groups.len(),
            fragments = result.fragments().count(),
            language = lang,
            "Tesseract recognition complete"
        );

        Ok(result)
    }
}

// ============================================================================
// TSV Parsing
// ============================================================================

/// Row level tesseract uses for words
const WORD_LEVEL: u32 = 5;

/// Parse tesseract TSV output into fragments grouped by text line.
///
/// Columns: level, page, block, par, line, word, left, top, width,
/// height, conf, text. Only word rows are kept; empty words and rows
/// with negative confidence are dropped.
pub fn parse_tsv(tsv: &str) -> Result<OcrOutput, OcrError> {
    let mut groups: Vec<Vec<TextFragment>> = Vec::new();
    let mut current_line: Option<(u32, u32, u32, u32)> = None;

    for (index, row) in tsv.lines().enumerate() {
        if index == 0 && row.starts_with("level") {
            continue;
        }
        if row.trim().is_empty() {
            continue;
        }

        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 11 {
            return Err(OcrError::ProcessingError(format!(
                "Malformed TSV row {}: expected 12 columns, got {}",
                index + 1,
                cols.len()
            )));
        }

        let int = |i: usize| -> Result<u32, OcrError> {
            cols[i].trim().parse::<u32>().map_err(|e| {
                OcrError::ProcessingError(format!("Malformed TSV row {}: {}", index + 1, e))
            })
        };

        if int(0)? != WORD_LEVEL {
            continue;
        }

        let text = cols.get(11).map(|t| t.trim()).unwrap_or("");
        let conf: f64 = cols[10].trim().parse().map_err(|e| {
            OcrError::ProcessingError(format!("Malformed TSV row {}: {}", index + 1, e))
        })?;
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let line_key = (int(1)?, int(2)?, int(3)?, int(4)?);
        let bbox = BoundingBox::from_rect(
            int(6)? as f64,
            int(7)? as f64,
            int(8)? as f64,
            int(9)? as f64,
        );
        let fragment = TextFragment::new(text, bbox, conf / 100.0);

        match groups.last_mut() {
            Some(group) if current_line == Some(line_key) => group.push(fragment),
            _ => {
                groups.push(vec![fragment]);
                current_line = Some(line_key);
            }
        }
    }

    Ok(OcrOutput::new(groups))
}

// ============================================================================
// Mock Engine
// ============================================================================

/// Mock engine for testing
#[cfg(test)]
pub struct MockEngine {
    pub response: Result<OcrOutput, String>,
    pub available: bool,
    pub delay: Option<std::time::Duration>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockEngine {
    pub fn returning(output: OcrOutput) -> Self {
        Self {
            response: Ok(output),
            available: true,
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::returning(OcrOutput::default())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> Result<OcrOutput, OcrError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .map_err(OcrError::ProcessingError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t
2\t1\t1\t0\t0\t0\t40\t30\t500\t120\t-1\t
4\t1\t1\t1\t1\t0\t40\t30\t300\t25\t-1\t
5\t1\t1\t1\t1\t1\t40\t30\t80\t25\t91.5\tAmoxicillin
5\t1\t1\t1\t1\t2\t130\t31\t40\t24\t88\t500
5\t1\t1\t1\t1\t3\t175\t32\t40\t23\t45.25\tmq
5\t1\t1\t1\t2\t1\t40\t80\t60\t25\t95\t \t
5\t1\t1\t1\t2\t2\t40\t80\t60\t25\t76\ttwice
5\t1\t1\t1\t2\t3\t110\t81\t50\t25\t-1\t
5\t1\t1\t1\t2\t4\t170\t82\t50\t25\t80\tdaily
";

    #[test]
    fn test_parse_tsv_groups_words_by_line() {
        let output = parse_tsv(SAMPLE_TSV).unwrap();

        assert_eq!(output.groups.len(), 2);
        let first: Vec<&str> = output.groups[0].iter().map(|f| f.text.as_str()).collect();
        assert_eq!(first, vec!["Amoxicillin", "500", "mq"]);
        let second: Vec<&str> = output.groups[1].iter().map(|f| f.text.as_str()).collect();
        assert_eq!(second, vec!["twice", "daily"]);
    }

    #[test]
    fn test_parse_tsv_geometry_and_confidence() {
        let output = parse_tsv(SAMPLE_TSV).unwrap();
        let word = &output.groups[0][2];

        assert_eq!(word.top_y(), 32.0);
        assert_eq!(word.bounding_box.0.len(), 4);
        assert_eq!(word.bounding_box.0[2].x, 215.0);
        assert!((word.confidence - 0.4525).abs() < 1e-9);
    }

    #[test]
    fn test_parse_tsv_empty_and_malformed() {
        let header_only = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n";
        assert!(parse_tsv(header_only).unwrap().groups.is_empty());
        assert!(parse_tsv("").unwrap().groups.is_empty());

        assert!(matches!(
            parse_tsv("5\t1\t1\n"),
            Err(OcrError::ProcessingError(_))
        ));
        assert!(matches!(
            parse_tsv("5\t1\t1\t1\t1\t1\tx\t0\t1\t1\t90\tword\n"),
            Err(OcrError::ProcessingError(_))
        ));
    }

    #[test]
    fn test_validate_language() {
        assert!(TesseractEngine::validate_language("eng").is_ok());
        assert!(TesseractEngine::validate_language("eng+deu").is_ok());
        assert!(TesseractEngine::validate_language("chi_sim").is_ok());
        assert!(TesseractEngine::validate_language("").is_err());
        assert!(TesseractEngine::validate_language("eng; rm -rf").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_available() {
        let engine = TesseractEngine::new(TesseractConfig {
            binary: "medscan-no-such-tesseract".to_string(),
            ..Default::default()
        });

        assert!(!engine.is_available().await);
        assert!(matches!(
            engine.recognize(b"not a png", None).await,
            Err(OcrError::NotAvailable(_))
        ));
    }
}
