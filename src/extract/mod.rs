//! Field Extraction
//!
//! Maps recognized KTP text to an [`ExtractedRecord`]. One pass over the lines,
//! top to bottom; the first line that yields a field wins and later lines never
//! overwrite it. Pure and deterministic, so running it twice on the same text
//! gives the same record.

pub mod record;
pub mod rules;

pub use record::{ExtractedRecord, RecordEdit, RecordField};

use crate::vision::RecognizedText;
use rules::{Draft, LineView, RULES};

/// Extract the visitor record from recognized text
pub fn extract(text: &RecognizedText) -> ExtractedRecord {
    let lines = text.lines();
    lines
        .iter()
        .enumerate()
        .map(|(i, raw)| LineView::new(raw, lines.get(i + 1).map(String::as_str)))
        .filter(|line| !line.cleaned.is_empty())
        .fold(Draft::default(), |draft, line| {
            RULES.iter().fold(draft, |draft, rule| rule(draft, &line))
        })
        .finish()
}
