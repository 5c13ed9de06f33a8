//! Correction Pipeline
//!
//! Runs the token classifier over whitespace-delimited text. Tokens are
//! corrected independently: order and count are preserved.

use std::path::Path;
use std::sync::Arc;

use super::classifier::{CorrectionDecision, TokenClassifier};
use super::lexicon::{DomainLexicon, Lexicon};
use super::speller::{SpellCorrector, SpellerError, SymSpellCorrector};

/// Corrects OCR text token by token
#[derive(Clone)]
pub struct CorrectionPipeline {
    classifier: TokenClassifier,
}

impl CorrectionPipeline {
    pub fn new(classifier: TokenClassifier) -> Self {
        Self { classifier }
    }

    /// Pipeline over a lexicon and a spell corrector
    pub fn with_parts(lexicon: Arc<dyn Lexicon>, speller: Arc<dyn SpellCorrector>) -> Self {
        Self::new(TokenClassifier::new(lexicon, speller))
    }

    /// Pipeline over the given lexicon and an English frequency dictionary.
    ///
    /// Valid domain terms and medicine names are added to the dictionary so
    /// near-misses resolve to them rather than to a common English word.
    pub fn medical(
        lexicon: DomainLexicon,
        dictionary_path: &Path,
        max_edit_distance: u32,
    ) -> Result<Self, SpellerError> {
        let mut speller =
            SymSpellCorrector::from_dictionary(dictionary_path, max_edit_distance)?;
        speller.add_words(lexicon.valid_terms());
        speller.add_words(lexicon.medicine_names());

        Ok(Self::with_parts(Arc::new(lexicon), Arc::new(speller)))
    }

    /// Corrected text, tokens joined with single spaces
    pub fn correct(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| self.classifier.classify(token).into_word())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Per-token decisions, in input order
    pub fn explain(&self, text: &str) -> Vec<CorrectionDecision> {
        text.split_whitespace()
            .map(|token| self.classifier.classify(token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::classifier::tests::StubSpeller;
    use crate::correction::speller::tests::write_fixture_dictionary;
    use tempfile::TempDir;

    fn stub_pipeline(entries: &[(&str, &str)]) -> CorrectionPipeline {
        CorrectionPipeline::with_parts(
            Arc::new(DomainLexicon::medical()),
            Arc::new(StubSpeller::with(entries)),
        )
    }

    #[test]
    fn test_correct_maps_tokens_independently() {
        let pipeline = stub_pipeline(&[]);

        let corrected = pipeline.correct("mq 50 coma");
        assert_eq!(corrected, "mg 50 50mg");
        assert_eq!(corrected.split_whitespace().count(), 3);
    }

    #[test]
    fn test_correct_collapses_whitespace() {
        let pipeline = stub_pipeline(&[("tabelt", "tablet")]);

        assert_eq!(pipeline.correct("  1 tabelt\n\nrnq\t daily "), "1 tablet mg daily");
        assert_eq!(pipeline.correct(""), "");
        assert_eq!(pipeline.correct(" \n "), "");
    }

    #[test]
    fn test_explain_returns_decision_per_token() {
        let pipeline = stub_pipeline(&[("tabelt", "tablet")]);

        let decisions = pipeline.explain("MG tabelt coma");
        assert_eq!(decisions.len(), 3);
        assert_eq!(decisions[0], CorrectionDecision::PassThrough("MG".to_string()));
        assert_eq!(decisions[1].word(), "tablet");
        assert!(matches!(
            decisions[2],
            CorrectionDecision::MappedCorrection { .. }
        ));
    }

    fn medical_pipeline(temp_dir: &TempDir) -> CorrectionPipeline {
        let dictionary = write_fixture_dictionary(temp_dir.path());
        CorrectionPipeline::medical(DomainLexicon::medical(), &dictionary, 2).unwrap()
    }

    #[test]
    fn test_medical_pipeline_with_dictionary() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = medical_pipeline(&temp_dir);

        assert_eq!(
            pipeline.correct("Take 1 tabelt mq twice daily"),
            "Take 1 tablet mg twice daily"
        );
        assert_eq!(pipeline.correct("mg 50 coma"), "mg 50 50mg");
        assert_eq!(
            pipeline.correct("Amoxicilin 500 mq after meals"),
            "Amoxicillin 500 mg after meals"
        );
    }

    #[test]
    fn test_medical_pipeline_leaves_prescription_shorthand() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = medical_pipeline(&temp_dir);

        for text in [
            "Sig: 2 caps po bid x 7 days, Dr. Smith",
            "Ibuprofen 400 MG tds prn",
            "5 µg naïve ½ °C",
            "a b c d e f",
        ] {
            assert_eq!(pipeline.correct(text), text);
        }
    }

    #[test]
    fn test_medical_pipeline_missing_dictionary() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.txt");

        assert!(matches!(
            CorrectionPipeline::medical(DomainLexicon::medical(), &missing, 2),
            Err(SpellerError::Read { .. })
        ));
    }

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        let pipeline = stub_pipeline(&[]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = pipeline.clone();
                std::thread::spawn(move || pipeline.correct("rnq coma"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "mg 50mg");
        }
    }
}
