//! Domain Lexicon
//!
//! Static vocabulary used to steer correction of prescription text:
//! dosage units and abbreviations that must never be "fixed", known
//! OCR misreadings with their replacements, and medicine names.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

// ============================================================================
// Default Data
// ============================================================================

/// Units and abbreviations accepted verbatim
pub const DEFAULT_VALID_TERMS: &[&str] = &[
    "mg", "mL", "kg", "mmol", "g", "L", "mg/dL", "IU", "mcg", "cc", "cm", "mm", "mmHg",
];

/// Known medicine names
pub const DEFAULT_MEDICINE_NAMES: &[&str] = &[
    "ibuprofen",
    "paracetamol",
    "aspirin",
    "amoxicillin",
    "omeprazole",
    "atorvastatin",
];

/// Strings the OCR engine commonly produces for dosage units
pub const DEFAULT_OCR_MISREADINGS: &[(&str, &str)] = &[
    ("coma", "50mg"),
    ("l50mq", "150mg"),
    ("mq", "mg"),
    ("rnq", "mg"),
    ("rncg", "mcg"),
];

// ============================================================================
// Lexicon Trait
// ============================================================================

/// Vocabulary lookups consulted by the token classifier
pub trait Lexicon: Send + Sync {
    /// Whether the word is an accepted domain term (case-insensitive)
    fn is_valid_term(&self, word: &str) -> bool;

    /// Replacement for a known OCR misreading (case-insensitive)
    fn map_misreading(&self, word: &str) -> Option<&str>;
}

// ============================================================================
// Domain Lexicon
// ============================================================================

/// Medical lexicon backed by lower-cased sets and maps
#[derive(Debug, Clone, Default)]
pub struct DomainLexicon {
    valid_terms: HashSet<String>,
    ocr_misreadings: HashMap<String, String>,
    medicine_names: HashSet<String>,
}

impl DomainLexicon {
    /// Lexicon populated with the built-in medical vocabulary
    pub fn medical() -> Self {
        let mut lexicon = Self::default();
        lexicon.extend_valid_terms(DEFAULT_VALID_TERMS.iter().copied());
        lexicon.extend_misreadings(DEFAULT_OCR_MISREADINGS.iter().copied());
        lexicon.extend_medicine_names(DEFAULT_MEDICINE_NAMES.iter().copied());
        lexicon
    }

    /// Built-in vocabulary merged with an extension file.
    ///
    /// The file is JSON with optional `valid_terms`, `misreadings` and
    /// `medicine_names` fields. Entries in the file win over defaults.
    pub fn medical_with_extension(path: &Path) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LexiconError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let extension: LexiconFile =
            serde_json::from_str(&raw).map_err(|source| LexiconError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let mut lexicon = Self::medical();
        lexicon.extend_valid_terms(extension.valid_terms.iter().map(String::as_str));
        lexicon.extend_misreadings(
            extension
                .misreadings
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str())),
        );
        lexicon.extend_medicine_names(extension.medicine_names.iter().map(String::as_str));

        tracing::debug!(
            path = %path.display(),
            valid_terms = lexicon.valid_terms.len(),
            misreadings = lexicon.ocr_misreadings.len(),
            "Loaded lexicon extension"
        );

        Ok(lexicon)
    }

    pub fn extend_valid_terms<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) {
        self.valid_terms
            .extend(terms.into_iter().map(str::to_lowercase));
    }

    pub fn extend_misreadings<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        self.ocr_misreadings.extend(
            entries
                .into_iter()
                .map(|(from, to)| (from.to_lowercase(), to.to_string())),
        );
    }

    pub fn extend_medicine_names<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.medicine_names
            .extend(names.into_iter().map(str::to_lowercase));
    }

    /// Whether the word names a known medicine.
    ///
    /// Not consulted during classification.
    pub fn is_medicine_name(&self, word: &str) -> bool {
        self.medicine_names.contains(&word.to_lowercase())
    }

    /// Valid terms in sorted order (lower-cased)
    pub fn valid_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.valid_terms.iter().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }

    /// Medicine names in sorted order (lower-cased)
    pub fn medicine_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.medicine_names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Misreading table sorted by key
    pub fn misreadings(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .ocr_misreadings
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}

impl Lexicon for DomainLexicon {
    fn is_valid_term(&self, word: &str) -> bool {
        self.valid_terms.contains(&word.to_lowercase())
    }

    fn map_misreading(&self, word: &str) -> Option<&str> {
        self.ocr_misreadings
            .get(&word.to_lowercase())
            .map(String::as_str)
    }
}

/// On-disk lexicon extension
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LexiconFile {
    valid_terms: Vec<String>,
    misreadings: HashMap<String, String>,
    medicine_names: Vec<String>,
}

/// Lexicon loading errors
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("Failed to read lexicon file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid lexicon file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_terms_case_insensitive() {
        let lexicon = DomainLexicon::medical();

        for term in DEFAULT_VALID_TERMS {
            assert!(lexicon.is_valid_term(term), "{term} should be valid");
            assert!(lexicon.is_valid_term(&term.to_uppercase()));
        }
        assert!(lexicon.is_valid_term("MMHG"));
        assert!(!lexicon.is_valid_term("tablet"));
    }

    #[test]
    fn test_misreading_lookup() {
        let lexicon = DomainLexicon::medical();

        assert_eq!(lexicon.map_misreading("coma"), Some("50mg"));
        assert_eq!(lexicon.map_misreading("Coma"), Some("50mg"));
        assert_eq!(lexicon.map_misreading("L50MQ"), Some("150mg"));
        assert_eq!(lexicon.map_misreading("rncg"), Some("mcg"));
        assert_eq!(lexicon.map_misreading("comma"), None);
    }

    #[test]
    fn test_medicine_names_are_data_only() {
        let lexicon = DomainLexicon::medical();

        assert!(lexicon.is_medicine_name("Ibuprofen"));
        assert!(!lexicon.is_valid_term("ibuprofen"));
        assert!(lexicon.map_misreading("ibuprofen").is_none());
        assert_eq!(lexicon.medicine_names().len(), DEFAULT_MEDICINE_NAMES.len());
    }

    #[test]
    fn test_extension_file_merges_over_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lexicon.json");
        std::fs::write(
            &path,
            r#"{"valid_terms": ["BID", "TDS"], "misreadings": {"rnl": "ml", "coma": "5mg"}}"#,
        )
        .unwrap();

        let lexicon = DomainLexicon::medical_with_extension(&path).unwrap();

        assert!(lexicon.is_valid_term("bid"));
        assert!(lexicon.is_valid_term("mg"));
        assert_eq!(lexicon.map_misreading("RNL"), Some("ml"));
        assert_eq!(lexicon.map_misreading("coma"), Some("5mg"));
        assert!(lexicon.is_medicine_name("aspirin"));
    }

    #[test]
    fn test_extension_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            DomainLexicon::medical_with_extension(&missing),
            Err(LexiconError::Read { .. })
        ));

        let invalid = temp_dir.path().join("invalid.json");
        std::fs::write(&invalid, "not json").unwrap();
        assert!(matches!(
            DomainLexicon::medical_with_extension(&invalid),
            Err(LexiconError::Parse { .. })
        ));
    }
}
