//! Correction Module
//!
//! Post-OCR text correction for prescription text:
//! - Domain lexicon (units, abbreviations, OCR misreadings, medicine names)
//! - Token classifier with ordered fallback rules
//! - SymSpell-backed generic spell corrector
//! - Pipeline that corrects whole texts token by token
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medscan::correction::{CorrectionPipeline, DomainLexicon};
//!
//! let dictionary = Path::new("data/frequency_dictionary_en_82_765.txt");
//! let pipeline = CorrectionPipeline::medical(DomainLexicon::medical(), dictionary, 2)?;
//! assert_eq!(pipeline.correct("mq 50 coma"), "mg 50 50mg");
//! ```

mod classifier;
mod lexicon;
mod pipeline;
mod speller;

pub use classifier::{CorrectionDecision, TokenClassifier};
pub use lexicon::{
    DomainLexicon, Lexicon, LexiconError, DEFAULT_MEDICINE_NAMES, DEFAULT_OCR_MISREADINGS,
    DEFAULT_VALID_TERMS,
};
pub use pipeline::CorrectionPipeline;
pub use speller::{SpellCorrector, SpellerError, SymSpellCorrector};

#[cfg(test)]
pub(crate) use classifier::tests::StubSpeller;
#[cfg(test)]
pub(crate) use speller::tests::write_fixture_dictionary;
