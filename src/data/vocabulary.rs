use crate::data::model::Split;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Class vocabulary
// ---------------------------------------------------------------------------

/// The sixteen RVL-CDIP document classes. Position `i` names `label == i`,
/// so the order must match the label encoding of the source dataset.
pub static CLASS_VOCABULARY: [&str; 16] = [
    "letter",
    "form",
    "email",
    "handwritten",
    "advertisement",
    "scientific report",
    "scientific publication",
    "specification",
    "file folder",
    "news article",
    "budget",
    "invoice",
    "presentation",
    "questionnaire",
    "resume",
    "memo",
];

/// Resolve a record label to its class name.
///
/// `split` is only used to make the error point at the offending data.
pub fn class_name(label: i64, split: Split) -> Result<&'static str> {
    usize::try_from(label)
        .ok()
        .and_then(|idx| CLASS_VOCABULARY.get(idx).copied())
        .ok_or(Error::LabelOutOfRange {
            split,
            label,
            size: CLASS_VOCABULARY.len(),
        })
}

/// Reverse lookup, name → label.
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_VOCABULARY.iter().position(|c| *c == name)
}
