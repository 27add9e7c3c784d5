use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Int64Type};
use arrow::record_batch::RecordBatch;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use log::{debug, info};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::model::{DatasetSource, RecordIter, RecordRef, Split};
use crate::error::{Error, Result};

/// Revision under which the Hub publishes its automatic parquet conversion.
const PARQUET_REVISION: &str = "refs/convert/parquet";

// ---------------------------------------------------------------------------
// Shard discovery
// ---------------------------------------------------------------------------

/// Work out which split a parquet shard belongs to from its path.
///
/// Recognised layouts:
/// * `default/train/0000.parquet` (Hub parquet conversion)
/// * `default/partial-train/0000.parquet`
/// * `data/train-00000-of-00004.parquet` (`push_to_hub` layout)
/// * `validation.parquet`
pub fn split_for_path(path: &Path) -> Option<Split> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let stem_prefix = stem.split(['-', '_', '.']).next().unwrap_or("");
    if let Ok(split) = stem_prefix.parse() {
        return Some(split);
    }

    path.parent()?
        .components()
        .rev()
        .filter_map(|c| c.as_os_str().to_str())
        .find_map(|dir| dir.trim_start_matches("partial-").parse().ok())
}

#[derive(Debug, Clone)]
enum Shard {
    Local(PathBuf),
    /// File name inside the Hub repo, fetched on first read.
    Remote(String),
}

impl Shard {
    fn name(&self) -> String {
        match self {
            Shard::Local(path) => path.display().to_string(),
            Shard::Remote(file) => file.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParquetDataset – a split-addressable collection of parquet shards
// ---------------------------------------------------------------------------

pub struct ParquetDataset {
    shards: BTreeMap<Split, Vec<Shard>>,
    hub: Option<(Api, Repo)>,
    label_column: String,
}

impl ParquetDataset {
    /// Collect every `*.parquet` file under `dir` whose path names a split.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_parquet_files(dir, &mut files)?;
        files.sort();

        let mut shards: BTreeMap<Split, Vec<Shard>> = BTreeMap::new();
        for path in files {
            let relative = path.strip_prefix(dir).unwrap_or(&path);
            match split_for_path(relative) {
                Some(split) => {
                    debug!("{split} shard: {}", path.display());
                    shards.entry(split).or_default().push(Shard::Local(path));
                }
                None => debug!("skipping {}: no split in path", path.display()),
            }
        }
        Ok(Self::new(shards, None))
    }

    /// List the parquet conversion of a Hub dataset. Shards are downloaded
    /// into the local Hub cache only when a split actually reads them.
    pub fn from_hub(api: &Api, dataset_id: &str) -> Result<Self> {
        let repo = Repo::with_revision(
            dataset_id.to_string(),
            RepoType::Dataset,
            PARQUET_REVISION.to_string(),
        );
        let info = api.repo(repo.clone()).info()?;

        let mut files: Vec<String> = info
            .siblings
            .into_iter()
            .map(|s| s.rfilename)
            .filter(|f| f.ends_with(".parquet"))
            .collect();
        files.sort();

        let mut shards: BTreeMap<Split, Vec<Shard>> = BTreeMap::new();
        for file in files {
            match split_for_path(Path::new(&file)) {
                Some(split) => shards.entry(split).or_default().push(Shard::Remote(file)),
                None => debug!("skipping {file}: no split in path"),
            }
        }
        info!(
            "{dataset_id}: {} parquet shards on the Hub",
            shards.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self::new(shards, Some((api.clone(), repo))))
    }

    fn new(shards: BTreeMap<Split, Vec<Shard>>, hub: Option<(Api, Repo)>) -> Self {
        Self {
            shards,
            hub,
            label_column: "label".to_string(),
        }
    }

    /// Use a label column other than `label`.
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    /// Number of shards assigned to `split`.
    pub fn shard_count(&self, split: Split) -> usize {
        self.shards.get(&split).map_or(0, Vec::len)
    }

    fn open(&self, shard: &Shard) -> Result<ParquetRecordBatchReader> {
        let path = match shard {
            Shard::Local(path) => path.clone(),
            Shard::Remote(file) => {
                let (api, repo) = self.hub.as_ref().ok_or_else(|| {
                    Error::Configuration(format!("no Hub repo to fetch {file} from"))
                })?;
                info!("fetching {file}");
                api.repo(repo.clone()).get(file)?
            }
        };
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        Ok(builder.build()?)
    }
}

impl DatasetSource for ParquetDataset {
    type Record = RecordRef;

    fn records(&self, split: Split, seed: Option<u64>) -> Result<RecordIter<'_, RecordRef>> {
        let mut shards = self.shards.get(&split).cloned().unwrap_or_default();
        if let Some(seed) = seed {
            shards.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        Ok(Box::new(ShardRecords {
            dataset: self,
            shards: shards.into_iter(),
            reader: None,
            batch: None,
        }))
    }
}

fn collect_parquet_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_parquet_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"))
        {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lazy record stream
// ---------------------------------------------------------------------------

/// Walks shards one record batch at a time, so only the current batch is
/// held in memory besides records the caller keeps.
struct ShardRecords<'a> {
    dataset: &'a ParquetDataset,
    shards: std::vec::IntoIter<Shard>,
    reader: Option<(String, ParquetRecordBatchReader)>,
    batch: Option<DecodedBatch>,
}

struct DecodedBatch {
    batch: Arc<RecordBatch>,
    labels: Vec<i64>,
    next_row: usize,
}

impl ShardRecords<'_> {
    /// Advance to the next non-empty batch. `Ok(false)` once every shard is read.
    fn load_next_batch(&mut self) -> Result<bool> {
        loop {
            if let Some((name, reader)) = self.reader.as_mut() {
                match reader.next() {
                    Some(batch) => {
                        let batch = batch?;
                        if batch.num_rows() == 0 {
                            continue;
                        }
                        let labels = extract_labels(&batch, &self.dataset.label_column, name)?;
                        self.batch = Some(DecodedBatch {
                            batch: Arc::new(batch),
                            labels,
                            next_row: 0,
                        });
                        return Ok(true);
                    }
                    None => self.reader = None,
                }
            }
            match self.shards.next() {
                Some(shard) => {
                    debug!("reading shard {}", shard.name());
                    self.reader = Some((shard.name(), self.dataset.open(&shard)?));
                }
                None => return Ok(false),
            }
        }
    }
}

impl Iterator for ShardRecords<'_> {
    type Item = Result<RecordRef>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.batch.as_mut() {
                if current.next_row < current.labels.len() {
                    let row = current.next_row;
                    current.next_row += 1;
                    return Some(Ok(RecordRef {
                        batch: Arc::clone(&current.batch),
                        row,
                        label: current.labels[row],
                    }));
                }
                self.batch = None;
            }
            match self.load_next_batch() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    // Stop after the first error.
                    self.shards = Vec::new().into_iter();
                    self.reader = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read the label column as `i64`, accepting any integer type. Values that
/// do not fit (large `UInt64`) are an error, never a silent null.
fn extract_labels(batch: &RecordBatch, column: &str, shard: &str) -> Result<Vec<i64>> {
    let col = batch
        .column_by_name(column)
        .ok_or_else(|| Error::MissingLabelColumn(shard.to_string(), column.to_string()))?;

    if !col.data_type().is_integer() {
        return Err(Error::UnsupportedLabelType {
            column: column.to_string(),
            data_type: format!("{:?}", col.data_type()),
        });
    }
    if col.null_count() > 0 {
        return Err(Error::NullLabel(column.to_string()));
    }

    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };
    let labels = cast_with_options(col, &DataType::Int64, &strict).map_err(|source| {
        Error::LabelOverflow {
            column: column.to_string(),
            source,
        }
    })?;
    Ok(labels.as_primitive::<Int64Type>().values().to_vec())
}
