use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use log::warn;
use serde::Deserialize;

use super::model::Split;
use super::vocabulary::{class_index, CLASS_VOCABULARY};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// DatasetDescription – what to keep from the source dataset
// ---------------------------------------------------------------------------

/// Per-split record caps. All three keys are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
    pub validation: usize,
}

impl SplitSizes {
    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train,
            Split::Test => self.test,
            Split::Validation => self.validation,
        }
    }
}

/// Expected JSON schema:
///
/// ```json
/// {
///   "name": "aharley/rvl_cdip",
///   "sizes": { "train": 1000, "test": 200, "validation": 200 },
///   "classes": ["letter", "invoice"]
/// }
/// ```
///
/// Extra keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetDescription {
    pub name: String,
    pub sizes: SplitSizes,
    pub classes: BTreeSet<String>,
}

impl DatasetDescription {
    /// Read and validate a description file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// Check every class against the vocabulary.
    pub fn validate(&self) -> Result<()> {
        let unknown: Vec<&str> = self
            .classes
            .iter()
            .filter(|c| class_index(c).is_none())
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Configuration(format!(
                "unknown classes {unknown:?}; expected names from {CLASS_VOCABULARY:?}"
            )));
        }
        if self.classes.is_empty() {
            warn!("dataset description '{}' lists no classes, every split will be empty", self.name);
        }
        Ok(())
    }

    pub fn allows(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

impl FromStr for DatasetDescription {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let description: DatasetDescription =
            serde_json::from_str(s).map_err(|e| Error::Configuration(e.to_string()))?;
        description.validate()?;
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "name": "aharley/rvl_cdip",
        "sizes": {"train": 2, "test": 1, "validation": 0},
        "classes": ["letter", "invoice"],
        "comment": "ignored"
    }"#;

    #[test]
    fn parses_valid_description() {
        let d: DatasetDescription = VALID.parse().unwrap();
        assert_eq!(d.name, "aharley/rvl_cdip");
        assert_eq!(d.sizes.get(Split::Train), 2);
        assert_eq!(d.sizes.get(Split::Test), 1);
        assert_eq!(d.sizes.get(Split::Validation), 0);
        assert!(d.allows("letter"));
        assert!(d.allows("invoice"));
        assert!(!d.allows("memo"));
    }

    #[test]
    fn rejects_unknown_class() {
        let json = r#"{"name": "x", "sizes": {"train": 1, "test": 1, "validation": 1},
                       "classes": ["not-a-real-class"]}"#;
        match json.parse::<DatasetDescription>() {
            Err(Error::Configuration(msg)) => assert!(msg.contains("not-a-real-class")),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_split_key() {
        let json = r#"{"name": "x", "sizes": {"train": 1, "test": 1}, "classes": ["memo"]}"#;
        assert!(matches!(
            json.parse::<DatasetDescription>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn rejects_negative_size() {
        let json = r#"{"name": "x", "sizes": {"train": -1, "test": 1, "validation": 1},
                       "classes": ["memo"]}"#;
        assert!(matches!(
            json.parse::<DatasetDescription>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn empty_class_list_is_accepted() {
        let json = r#"{"name": "x", "sizes": {"train": 1, "test": 1, "validation": 1},
                       "classes": []}"#;
        let d: DatasetDescription = json.parse().unwrap();
        assert!(d.classes.is_empty());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset_descriptions.json");
        std::fs::write(&path, VALID).unwrap();
        let d = DatasetDescription::from_path(&path).unwrap();
        assert_eq!(d.classes.len(), 2);
    }
}
