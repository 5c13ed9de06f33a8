//! Generic Spell Corrector
//!
//! Dictionary-backed fuzzy correction used as the last resort for tokens
//! the domain lexicon does not recognize. Backed by SymSpell over the
//! standard English frequency dictionary, with embedded prescription
//! vocabulary layered on top.
//!
//! Only the alphabetic core of a token is looked up: surrounding
//! punctuation is kept ("days," stays "days,") and corrections follow
//! the token's capitalization.

use std::path::Path;

use symspell::{SymSpell, SymSpellBuilder, UnicodeStringStrategy, Verbosity};

/// Prescription vocabulary, one word per line
const PRESCRIPTION_TERMS: &str = include_str!("../../data/prescription_terms.txt");

/// Frequency assigned to domain terms added to the dictionary
const DOMAIN_TERM_COUNT: i64 = 1_000_000;

/// Shortest token core the corrector will look up
const MIN_WORD_LEN: usize = 3;

/// Suggests the most likely spelling for a word
pub trait SpellCorrector: Send + Sync {
    /// Best dictionary candidate, or `None` when nothing is close enough
    fn suggest(&self, word: &str) -> Option<String>;
}

/// Spell corrector errors
#[derive(Debug, thiserror::Error)]
pub enum SpellerError {
    #[error("Failed to build spelling dictionary: {0}")]
    Build(String),

    #[error("Failed to read dictionary {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// SymSpell-backed corrector
pub struct SymSpellCorrector {
    symspell: SymSpell<UnicodeStringStrategy>,
    max_edit_distance: i64,
}

impl SymSpellCorrector {
    /// Corrector over a frequency dictionary file plus the prescription
    /// vocabulary
    pub fn from_dictionary(path: &Path, max_edit_distance: u32) -> Result<Self, SpellerError> {
        let mut corrector = Self::empty(max_edit_distance)?;
        let loaded = corrector.load_dictionary_file(path)?;
        let terms = corrector.add_prescription_terms();

        tracing::debug!(
            entries = loaded,
            prescription_terms = terms,
            max_edit_distance,
            "Spelling dictionary initialized"
        );

        Ok(corrector)
    }

    /// Corrector with no dictionary entries
    pub fn empty(max_edit_distance: u32) -> Result<Self, SpellerError> {
        let max_edit_distance = i64::from(max_edit_distance);
        let symspell: SymSpell<UnicodeStringStrategy> = SymSpellBuilder::default()
            .max_dictionary_edit_distance(max_edit_distance)
            .prefix_length(7)
            .count_threshold(1)
            .build()
            .map_err(|e| SpellerError::Build(e.to_string()))?;

        Ok(Self {
            symspell,
            max_edit_distance,
        })
    }

    /// Add words to the dictionary with a high frequency
    pub fn add_words<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        for word in words {
            let line = format!("{} {}", word.to_lowercase(), DOMAIN_TERM_COUNT);
            self.symspell.load_dictionary_line(&line, 0, 1, " ");
        }
    }

    /// Add the embedded prescription vocabulary; returns the number of terms
    pub fn add_prescription_terms(&mut self) -> usize {
        let terms: Vec<&str> = PRESCRIPTION_TERMS
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();
        self.add_words(terms.iter().copied());
        terms.len()
    }

    /// Load a frequency dictionary file ("word count" per line)
    pub fn load_dictionary_file(&mut self, path: &Path) -> Result<usize, SpellerError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SpellerError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let loaded = self.load_lines(&raw);

        tracing::info!(path = %path.display(), entries = loaded, "Loaded spelling dictionary");
        Ok(loaded)
    }

    fn load_lines(&mut self, raw: &str) -> usize {
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| self.symspell.load_dictionary_line(line, 0, 1, " "))
            .count()
    }
}

impl SpellCorrector for SymSpellCorrector {
    fn suggest(&self, word: &str) -> Option<String> {
        let (prefix, core, suffix) = split_affixes(word);
        if !should_check(core) {
            return None;
        }

        let suggestions = self.symspell.lookup(
            &core.to_lowercase(),
            Verbosity::Top,
            self.max_edit_distance,
        );
        let best = suggestions.into_iter().next()?;

        // Known words keep the spelling they were written with
        if best.distance == 0 {
            Some(word.to_string())
        } else {
            Some(format!("{}{}{}", prefix, match_case(core, &best.term), suffix))
        }
    }
}

/// Split a token into leading punctuation, core and trailing punctuation
fn split_affixes(word: &str) -> (&str, &str, &str) {
    let rest = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let core = rest.trim_end_matches(|c: char| !c.is_alphanumeric());
    let start = word.len() - rest.len();
    (&word[..start], core, &word[start + core.len()..])
}

/// Whether a token core is a candidate for dictionary correction.
///
/// Only plain ASCII words of at least `MIN_WORD_LEN` letters are looked
/// up. Numbers, doses like "500mg", single letters, two-letter
/// abbreviations, "mg/dL" and non-ASCII words such as "µg" are left alone.
fn should_check(core: &str) -> bool {
    core.len() >= MIN_WORD_LEN && core.chars().all(|c| c.is_ascii_alphabetic())
}

/// Apply the capitalization of `template` to a lower-case dictionary term
fn match_case(template: &str, term: &str) -> String {
    if template.chars().all(|c| c.is_ascii_uppercase()) {
        return term.to_uppercase();
    }

    let mut chars = term.chars();
    match (template.chars().next(), chars.next()) {
        (Some(first), Some(head)) if first.is_ascii_uppercase() => {
            head.to_uppercase().chain(chars).collect()
        }
        _ => term.to_string(),
    }
}
