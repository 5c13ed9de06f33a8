//! Token Classifier
//!
//! Decides, per token, which correction path applies. Rules are checked
//! in order and the first match wins:
//!
//! 1. accepted domain term: pass through untouched
//! 2. known OCR misreading: replace with the mapped value
//! 3. anything else: ask the generic spell corrector

use std::sync::Arc;

use serde::Serialize;

use super::lexicon::Lexicon;
use super::speller::SpellCorrector;

/// Outcome of classifying a single token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CorrectionDecision {
    /// Accepted domain term, kept as written
    PassThrough(String),
    /// Known OCR misreading replaced from the lexicon
    MappedCorrection { original: String, replacement: String },
    /// Delegated to the spell corrector; `None` keeps the original
    GenericCorrection {
        original: String,
        suggestion: Option<String>,
    },
}

impl CorrectionDecision {
    /// The word this decision puts into the output
    pub fn word(&self) -> &str {
        match self {
            Self::PassThrough(word) => word,
            Self::MappedCorrection { replacement, .. } => replacement,
            Self::GenericCorrection {
                original,
                suggestion,
            } => suggestion.as_deref().unwrap_or(original),
        }
    }

    pub fn into_word(self) -> String {
        match self {
            Self::PassThrough(word) => word,
            Self::MappedCorrection { replacement, .. } => replacement,
            Self::GenericCorrection {
                original,
                suggestion,
            } => suggestion.unwrap_or(original),
        }
    }

    /// Whether the output word differs from the input token
    pub fn is_changed(&self) -> bool {
        match self {
            Self::PassThrough(_) => false,
            Self::MappedCorrection {
                original,
                replacement,
            } => original != replacement,
            Self::GenericCorrection {
                original,
                suggestion,
            } => suggestion.as_deref().is_some_and(|s| s != original),
        }
    }
}

/// Per-token classifier over a lexicon and a spell corrector
#[derive(Clone)]
pub struct TokenClassifier {
    lexicon: Arc<dyn Lexicon>,
    speller: Arc<dyn SpellCorrector>,
}

impl TokenClassifier {
    pub fn new(lexicon: Arc<dyn Lexicon>, speller: Arc<dyn SpellCorrector>) -> Self {
        Self { lexicon, speller }
    }

    /// Classify a single whitespace-free token
    pub fn classify(&self, word: &str) -> CorrectionDecision {
        if self.lexicon.is_valid_term(word) {
            return CorrectionDecision::PassThrough(word.to_string());
        }

        if let Some(replacement) = self.lexicon.map_misreading(word) {
            return CorrectionDecision::MappedCorrection {
                original: word.to_string(),
                replacement: replacement.to_string(),
            };
        }

        CorrectionDecision::GenericCorrection {
            original: word.to_string(),
            suggestion: self.speller.suggest(word),
        }
    }
}
