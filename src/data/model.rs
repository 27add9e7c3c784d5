use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Split – one named partition of the dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Validation,
}

impl Split {
    /// Every split, in processing order.
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Validation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Validation => "validation",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = Error;

    /// Accepts the canonical names plus the `valid` / `val` spellings used by
    /// some Hub parquet layouts.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            "validation" | "valid" | "val" => Ok(Split::Validation),
            other => Err(Error::Configuration(format!("unknown split '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records and sources
// ---------------------------------------------------------------------------

/// Anything carrying an integer class label.
pub trait LabeledRecord {
    fn label(&self) -> i64;
}

/// Lazy stream of records for one split.
pub type RecordIter<'a, R> = Box<dyn Iterator<Item = Result<R>> + 'a>;

/// A labeled dataset addressable by split.
pub trait DatasetSource {
    type Record: LabeledRecord;

    /// Open a lazy record stream for `split`.
    ///
    /// When `seed` is set the source may permute its coarse read order
    /// (e.g. shard order); row-level shuffling is done by the caller.
    fn records(&self, split: Split, seed: Option<u64>) -> Result<RecordIter<'_, Self::Record>>;
}

/// In-memory source, mostly useful for tests and small datasets.
impl<R: LabeledRecord + Clone> DatasetSource for BTreeMap<Split, Vec<R>> {
    type Record = R;

    fn records(&self, split: Split, _seed: Option<u64>) -> Result<RecordIter<'_, R>> {
        let rows = self.get(&split).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Box::new(rows.iter().cloned().map(Ok)))
    }
}

/// The reduced dataset: split → kept records.
pub type PrunedDataset<R> = BTreeMap<Split, Vec<R>>;

// ---------------------------------------------------------------------------
// RecordRef – one row of a decoded parquet record batch
// ---------------------------------------------------------------------------

/// A reference to a single row of a shared record batch.
#[derive(Debug, Clone)]
pub struct RecordRef {
    pub batch: Arc<RecordBatch>,
    pub row: usize,
    pub label: i64,
}

impl RecordRef {
    /// The row as a one-row batch (zero-copy slice).
    pub fn to_batch(&self) -> RecordBatch {
        self.batch.slice(self.row, 1)
    }
}

impl LabeledRecord for RecordRef {
    fn label(&self) -> i64 {
        self.label
    }
}

/// Identity: same batch allocation, same row.
impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.batch, &other.batch) && self.row == other.row
    }
}

impl Eq for RecordRef {}
