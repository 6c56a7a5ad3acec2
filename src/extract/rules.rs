//! Per-line extraction rules
//!
//! Each rule is a pure `(draft, line) -> draft` step that only touches its own
//! field, and only while that field is still empty.

use std::sync::LazyLock;

use regex::Regex;

use super::record::{ExtractedRecord, ID_NUMBER_LEN};

static ID_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{16}").expect("failed to compile regex"));
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{2}-[0-9]{2}-[0-9]{4}").expect("failed to compile regex")
});

const NAME_LABEL: &str = "NAMA";
const BIRTH_LABELS: [&str; 3] = ["TEMPAT/TGL LAHIR", "TEMPAT", "LAHIR"];
const ADDRESS_LABEL: &str = "ALAMAT";

/// A line of recognized text as the rules see it
#[derive(Debug, Clone)]
pub struct LineView<'a> {
    /// Line exactly as recognized
    pub raw: &'a str,
    /// Uppercase, punctuation-stripped, trimmed
    pub cleaned: String,
    /// Following raw line, if any
    pub next: Option<&'a str>,
}

impl<'a> LineView<'a> {
    pub fn new(raw: &'a str, next: Option<&'a str>) -> Self {
        Self {
            raw,
            cleaned: clean_line(raw),
            next,
        }
    }

    /// Next line, treating a blank continuation as absent
    fn next_non_empty(&self) -> Option<&'a str> {
        self.next.filter(|n| !n.is_empty())
    }
}

/// Record under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub record: ExtractedRecord,
    /// Id number assembled from separated digit groups; only used when no line
    /// carries a contiguous 16-digit run
    id_fallback: Option<String>,
}

impl Draft {
    /// The assembled fallback is only committed here, after every line has had
    /// its chance to supply a contiguous run. A clean run on a later line beats
    /// digit groups from an earlier one.
    pub fn finish(self) -> ExtractedRecord {
        let mut record = self.record;
        if record.id_number.is_empty() {
            if let Some(fallback) = self.id_fallback {
                record.id_number = fallback;
            }
        }
        record
    }
}

pub type Rule = fn(Draft, &LineView<'_>) -> Draft;

/// Rules in evaluation order
pub const RULES: [Rule; 4] = [id_number, full_name, birth, address];

/// Uppercase and keep only letters, digits, whitespace and `: - / .`
pub fn clean_line(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| {
            c.is_ascii_uppercase()
                || c.is_ascii_digit()
                || c.is_whitespace()
                || matches!(c, ':' | '-' | '/' | '.')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Remove the first occurrence of each label, then `:` and `.`
fn strip_labels(cleaned: &str, labels: &[&str]) -> String {
    let mut value = cleaned.to_string();
    for label in labels {
        value = value.replacen(label, "", 1);
    }
    value.retain(|c| c != ':' && c != '.');
    value.trim().to_string()
}

/// Digits are read from the raw line: mapping look-alike letters to digits
/// turns 7 into 2 and worse
pub fn id_number(mut draft: Draft, line: &LineView<'_>) -> Draft {
    if !draft.record.id_number.is_empty() {
        return draft;
    }
    if let Some(run) = ID_RUN_RE.find(line.raw) {
        draft.record.id_number = run.as_str().to_string();
        return draft;
    }
    if draft.id_fallback.is_none() {
        let digits: String = line.raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() >= ID_NUMBER_LEN {
            draft.id_fallback = Some(digits[..ID_NUMBER_LEN].to_string());
        }
    }
    draft
}

pub fn full_name(mut draft: Draft, line: &LineView<'_>) -> Draft {
    if !draft.record.full_name.is_empty() || !line.cleaned.contains(NAME_LABEL) {
        return draft;
    }
    let mut value = strip_labels(&line.cleaned, &[NAME_LABEL]);
    // Label present but the value wrapped onto the next line
    if value.chars().count() < 3 {
        if let Some(next) = line.next_non_empty() {
            value = next
                .chars()
                .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
                .collect::<String>()
                .trim()
                .to_string();
        }
    }
    draft.record.full_name = value;
    draft
}

/// Birthplace and date commit together or not at all
pub fn birth(mut draft: Draft, line: &LineView<'_>) -> Draft {
    if !draft.record.birth_date.is_empty()
        || !(line.cleaned.contains("TEMPAT") || line.cleaned.contains("LAHIR"))
    {
        return draft;
    }
    let value = strip_labels(&line.cleaned, &BIRTH_LABELS);
    if let Some(date) = DATE_RE.find(&value) {
        let place = value[..date.start()].trim_end();
        let place = place.strip_suffix(',').unwrap_or(place).trim();
        draft.record.birth_date = date.as_str().to_string();
        draft.record.birthplace = place.to_string();
    }
    draft
}

/// RT/RW codes are printed on the line below the street address
pub fn address(mut draft: Draft, line: &LineView<'_>) -> Draft {
    if !draft.record.address.is_empty() || !line.cleaned.contains(ADDRESS_LABEL) {
        return draft;
    }
    let mut value = strip_labels(&line.cleaned, &[ADDRESS_LABEL]);
    if let Some(next) = line.next {
        let upper = next.to_uppercase();
        if upper.contains("RT") || upper.contains("RW") {
            value = format!("{} {}", value, next.trim()).trim().to_string();
        }
    }
    draft.record.address = value;
    draft
}
