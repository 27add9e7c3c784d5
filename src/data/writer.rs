use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use log::{info, warn};
use parquet::arrow::ArrowWriter;

use super::model::{PrunedDataset, RecordRef};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Parquet sink
// ---------------------------------------------------------------------------

/// Write every split to `{dir}/{split}.parquet`, creating `dir` if needed.
///
/// Empty splits still get a zero-row file as long as some other split
/// provides the schema. Returns the files written.
pub fn write_dataset(dir: &Path, pruned: &PrunedDataset<RecordRef>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let schema = pruned
        .values()
        .find_map(|records| records.first())
        .map(|r| r.batch.schema());

    let mut written = Vec::new();
    for (split, records) in pruned {
        let path = dir.join(format!("{split}.parquet"));
        if write_split(&path, records, schema.clone())? {
            info!("wrote {} {split} records to {}", records.len(), path.display());
            written.push(path);
        } else {
            warn!("{split} is empty and no schema is known; {} not written", path.display());
        }
    }
    Ok(written)
}

/// Write one split. `schema` is used when `records` is empty; returns
/// `false` when there was nothing to write and no schema to write it with.
pub fn write_split(path: &Path, records: &[RecordRef], schema: Option<SchemaRef>) -> Result<bool> {
    let schema = match records.first() {
        Some(first) => first.batch.schema(),
        None => match schema {
            Some(schema) => schema,
            None => return Ok(false),
        },
    };

    let rows: Vec<RecordBatch> = records.iter().map(RecordRef::to_batch).collect();
    let batch = concat_batches(&schema, &rows)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(true)
}
