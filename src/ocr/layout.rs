//! Line Reconstruction
//!
//! Rebuilds multi-line text from positioned fragments. Fragments are
//! taken in emission order and a new line starts whenever the top edge
//! jumps by more than the threshold. This assumes roughly top-to-bottom,
//! left-to-right emission and does not handle multi-column layouts.

use super::types::{OcrOutput, TextFragment};

/// Default vertical distance (pixels) that starts a new line
pub const DEFAULT_LINE_THRESHOLD: f64 = 15.0;

/// Groups fragments into lines by vertical proximity
#[derive(Debug, Clone, Copy)]
pub struct LineReconstructor {
    threshold: f64,
}

impl Default for LineReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_THRESHOLD)
    }
}

impl LineReconstructor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Reconstruct text from fragments in emission order.
    ///
    /// Lines are separated by a blank line. Blank fragments are ignored.
    pub fn reconstruct<'a>(&self, fragments: impl IntoIterator<Item = &'a TextFragment>) -> String {
        let mut output = String::new();
        let mut line: Vec<&str> = Vec::new();
        let mut previous_y: Option<f64> = None;

        for fragment in fragments {
            if fragment.is_blank() {
                continue;
            }

            let y = fragment.top_y();
            if let Some(prev) = previous_y {
                if (y - prev).abs() > self.threshold {
                    output.push_str(&line.join(" "));
                    output.push_str("\n\n");
                    line.clear();
                }
            }

            line.push(fragment.text.trim());
            previous_y = Some(y);
        }

        if !line.is_empty() {
            output.push_str(&line.join(" "));
            output.push('\n');
        }

        output.trim().to_string()
    }

    /// Reconstruct engine output, flattening its groups
    pub fn reconstruct_output(&self, output: &OcrOutput) -> String {
        self.reconstruct(output.fragments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::BoundingBox;

    fn at(text: &str, y: f64) -> TextFragment {
        TextFragment::new(text, BoundingBox::from_rect(0.0, y, 20.0, 12.0), 0.9)
    }

    #[test]
    fn test_empty_input() {
        let reconstructor = LineReconstructor::default();
        assert_eq!(reconstructor.reconstruct(std::iter::empty()), "");
    }

    #[test]
    fn test_single_fragment() {
        let reconstructor = LineReconstructor::default();
        assert_eq!(reconstructor.reconstruct(&[at("Hello", 10.0)]), "Hello");
    }

    #[test]
    fn test_close_fragments_share_a_line() {
        let reconstructor = LineReconstructor::default();

        let fragments = [at("Take", 100.0), at("one", 115.0), at("tablet", 101.0)];
        assert_eq!(reconstructor.reconstruct(&fragments), "Take one tablet");
    }

    #[test]
    fn test_distant_fragments_are_separated_by_blank_line() {
        let reconstructor = LineReconstructor::default();

        let fragments = [at("Rx", 100.0), at("Paracetamol", 115.5)];
        assert_eq!(reconstructor.reconstruct(&fragments), "Rx\n\nParacetamol");

        // Upward jumps count too
        let fragments = [at("Rx", 100.0), at("Paracetamol", 80.0)];
        assert_eq!(reconstructor.reconstruct(&fragments), "Rx\n\nParacetamol");
    }

    #[test]
    fn test_multiple_lines_follow_emission_order() {
        let reconstructor = LineReconstructor::default();

        let fragments = [
            at("Amoxicillin", 10.0),
            at("500", 12.0),
            at("mq", 11.0),
            at("twice", 60.0),
            at("daily", 62.0),
            at("Dr.", 20.0),
        ];
        assert_eq!(
            reconstructor.reconstruct(&fragments),
            "Amoxicillin 500 mq\n\ntwice daily\n\nDr."
        );
    }

    #[test]
    fn test_blank_fragments_are_skipped() {
        let reconstructor = LineReconstructor::default();

        let fragments = [at("Take", 10.0), at("  ", 200.0), at("daily", 11.0)];
        assert_eq!(reconstructor.reconstruct(&fragments), "Take daily");
    }

    #[test]
    fn test_custom_threshold() {
        let reconstructor = LineReconstructor::new(5.0);

        let fragments = [at("a", 0.0), at("b", 5.0), at("c", 11.0)];
        assert_eq!(reconstructor.reconstruct(&fragments), "a b\n\nc");
    }

    #[test]
    fn test_reconstruct_output_flattens_groups() {
        let reconstructor = LineReconstructor::default();
        let output = OcrOutput::new(vec![
            vec![at("Take", 10.0)],
            vec![at("one", 12.0), at("daily", 14.0)],
            vec![at("Signed", 90.0)],
        ]);

        assert_eq!(
            reconstructor.reconstruct_output(&output),
            "Take one daily\n\nSigned"
        );
    }
}
