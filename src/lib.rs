//! Tools for building reduced copies of the RVL-CDIP document
//! classification dataset: fetch the pre-built split files, or prune the
//! full dataset down to a few classes and a fixed size per split.

pub mod data;
pub mod download;
pub mod error;

pub use data::description::{DatasetDescription, SplitSizes};
pub use data::model::{DatasetSource, LabeledRecord, PrunedDataset, RecordRef, Split};
pub use data::prune::{prune, PruneOptions};
pub use error::{Error, Result};
