use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::description::DatasetDescription;
use super::model::{DatasetSource, LabeledRecord, PrunedDataset, Split};
use super::vocabulary::class_name;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Options and per-split reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PruneOptions {
    /// Fixed seed for a reproducible run. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Set to `false` when the source order is already randomized.
    pub shuffle: bool,
    /// Rows held in the streaming shuffle buffer.
    pub buffer_size: usize,
    /// Draw a progress bar per split on stderr.
    pub progress: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            seed: None,
            shuffle: true,
            buffer_size: 4096,
            progress: false,
        }
    }
}

/// Terminal state of a split accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Reached the requested size.
    Capped,
    /// The source ran out first. Not an error.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    pub split: Split,
    pub cap: usize,
    pub kept: usize,
    /// Records whose label was checked.
    pub scanned: usize,
    /// Records pulled from the source. Exceeds `scanned` by whatever was
    /// still sitting in the shuffle buffer when the cap was met.
    pub read: usize,
    pub outcome: SplitOutcome,
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Reduce every split of `source` to at most `description.sizes[split]`
/// records whose class is in `description.classes`.
///
/// Splits are processed independently. Any record with a label outside the
/// class vocabulary aborts the whole run; no partial result is returned.
pub fn prune<S: DatasetSource>(
    source: &S,
    description: &DatasetDescription,
    options: &PruneOptions,
) -> Result<PrunedDataset<S::Record>> {
    let base_seed = options.seed.unwrap_or_else(|| rand::thread_rng().gen());

    let mut pruned = PrunedDataset::new();
    for (i, split) in Split::ALL.into_iter().enumerate() {
        let seed = base_seed.wrapping_add(i as u64);
        let (records, report) = prune_split(source, split, description, options, seed)?;
        info!(
            "{split}: kept {}/{} after scanning {} records, {} read from source ({:?})",
            report.kept, report.cap, report.scanned, report.read, report.outcome
        );
        pruned.insert(split, records);
    }
    Ok(pruned)
}

/// Collect one split. Stops reading the source as soon as the cap is met.
pub fn prune_split<S: DatasetSource>(
    source: &S,
    split: Split,
    description: &DatasetDescription,
    options: &PruneOptions,
    seed: u64,
) -> Result<(Vec<S::Record>, SplitReport)> {
    let cap = description.sizes.get(split);
    let mut kept = Vec::with_capacity(cap.min(options.buffer_size.max(1)));
    let mut report = SplitReport {
        split,
        cap,
        kept: 0,
        scanned: 0,
        read: 0,
        outcome: SplitOutcome::Capped,
    };
    if cap == 0 {
        return Ok((kept, report));
    }
    if description.classes.is_empty() {
        report.outcome = SplitOutcome::Exhausted;
        return Ok((kept, report));
    }

    let pb = progress_bar(split, cap, options.progress);
    let records = source.records(split, options.shuffle.then_some(seed))?;
    if options.shuffle {
        let mut shuffled = ShuffleBuffer::new(records, options.buffer_size, seed);
        report.scanned = collect_allowed(&mut shuffled, split, cap, description, &mut kept, &pb)?;
        report.read = shuffled.read();
    } else {
        report.scanned = collect_allowed(records, split, cap, description, &mut kept, &pb)?;
        report.read = report.scanned;
    }
    pb.finish_and_clear();

    report.kept = kept.len();
    if report.kept < cap {
        report.outcome = SplitOutcome::Exhausted;
    }
    Ok((kept, report))
}

/// Append allow-listed records to `kept` until it holds `cap` entries or the
/// stream ends. Returns how many records were scanned.
fn collect_allowed<R: LabeledRecord>(
    records: impl Iterator<Item = Result<R>>,
    split: Split,
    cap: usize,
    description: &DatasetDescription,
    kept: &mut Vec<R>,
    pb: &ProgressBar,
) -> Result<usize> {
    let mut scanned = 0;
    for record in records {
        let record = record?;
        scanned += 1;
        if description.allows(class_name(record.label(), split)?) {
            kept.push(record);
            pb.inc(1);
            if kept.len() == cap {
                break;
            }
        }
    }
    Ok(scanned)
}

fn progress_bar(split: Split, cap: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(cap as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(split.as_str());
    pb
}

// ---------------------------------------------------------------------------
// Streaming shuffle
// ---------------------------------------------------------------------------

/// Shuffles a lazy stream through a fixed-size buffer: each output is drawn
/// uniformly from the buffer, whose slot is then refilled from the source.
/// Reads at most `capacity` records ahead of what has been yielded.
pub struct ShuffleBuffer<I, R> {
    inner: I,
    buffer: Vec<R>,
    capacity: usize,
    rng: StdRng,
    done: bool,
    read: usize,
}

impl<I, R> ShuffleBuffer<I, R>
where
    I: Iterator<Item = Result<R>>,
{
    pub fn new(inner: I, capacity: usize, seed: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            buffer: Vec::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
            done: false,
            read: 0,
        }
    }

    /// Records pulled from the inner stream so far.
    pub fn read(&self) -> usize {
        self.read
    }
}

impl<I, R> Iterator for ShuffleBuffer<I, R>
where
    I: Iterator<Item = Result<R>>,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.buffer.len() < self.capacity {
            match self.inner.next() {
                Some(Ok(record)) => {
                    self.read += 1;
                    self.buffer.push(record);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => self.done = true,
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.buffer.len());
        Some(Ok(self.buffer.swap_remove(idx)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::data::description::SplitSizes;
    use crate::data::model::RecordIter;
    use crate::data::vocabulary::CLASS_VOCABULARY;
    use crate::error::Error;

    /// `id` gives each source record an identity.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Doc {
        id: usize,
        split: Split,
        label: i64,
    }

    impl LabeledRecord for Doc {
        fn label(&self) -> i64 {
            self.label
        }
    }

    fn source(splits: Vec<(Split, Vec<i64>)>) -> BTreeMap<Split, Vec<Doc>> {
        let mut id = 0;
        let mut ds = BTreeMap::new();
        for (split, labels) in splits {
            let docs = labels
                .into_iter()
                .map(|label| {
                    id += 1;
                    Doc { id, split, label }
                })
                .collect();
            ds.insert(split, docs);
        }
        ds
    }

    fn description(train: usize, test: usize, validation: usize, classes: &[&str]) -> DatasetDescription {
        DatasetDescription {
            name: "test".into(),
            sizes: SplitSizes { train, test, validation },
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn seeded(seed: u64) -> PruneOptions {
        PruneOptions {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn letter_invoice_scenario() {
        let ds = source(vec![
            (Split::Train, vec![0, 5, 11, 0, 2]),
            (Split::Test, vec![11, 3, 3]),
            (Split::Validation, vec![0, 11, 0]),
        ]);
        let d = description(2, 1, 0, &["letter", "invoice"]);

        let pruned = prune(&ds, &d, &seeded(7)).unwrap();

        let train = &pruned[&Split::Train];
        assert_eq!(train.len(), 2);
        let eligible: BTreeSet<usize> = [1, 3, 4].into_iter().collect();
        for doc in train {
            assert!(eligible.contains(&doc.id), "{doc:?} is not eligible");
        }
        assert_eq!(pruned[&Split::Test].len(), 1);
        assert_eq!(pruned[&Split::Test][0].label, 11);
        assert!(pruned[&Split::Validation].is_empty());
    }

    #[test]
    fn invariants_hold_across_seeds() {
        let labels: Vec<i64> = (0..200).map(|i| (i * 7 % 16) as i64).collect();
        let ds = source(vec![
            (Split::Train, labels.clone()),
            (Split::Test, labels[..50].to_vec()),
            (Split::Validation, labels[..10].to_vec()),
        ]);
        let d = description(30, 100, 5, &["letter", "memo", "budget"]);

        for seed in 0..20 {
            let pruned = prune(&ds, &d, &seeded(seed)).unwrap();
            for split in Split::ALL {
                let out = &pruned[&split];
                assert!(out.len() <= d.sizes.get(split));

                let ids: BTreeSet<usize> = out.iter().map(|doc| doc.id).collect();
                assert_eq!(ids.len(), out.len(), "duplicate record in {split}");

                for doc in out {
                    assert_eq!(doc.split, split);
                    assert!(d.allows(CLASS_VOCABULARY[doc.label as usize]));
                }
            }
        }
    }

    #[test]
    fn exhausted_split_is_not_an_error() {
        let ds = source(vec![(Split::Train, vec![0, 1, 0, 2, 11])]);
        let d = description(10, 5, 5, &["letter", "invoice"]);

        let (records, report) = prune_split(&ds, Split::Train, &d, &seeded(1), 1).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(report.outcome, SplitOutcome::Exhausted);
        assert_eq!(report.scanned, 5);
        assert_eq!(report.read, 5);

        let pruned = prune(&ds, &d, &seeded(1)).unwrap();
        assert!(pruned[&Split::Test].is_empty());
        assert!(pruned[&Split::Validation].is_empty());
    }

    #[test]
    fn same_seed_same_output() {
        let labels: Vec<i64> = (0..500).map(|i| (i % 16) as i64).collect();
        let ds = source(vec![(Split::Train, labels)]);
        let d = description(40, 0, 0, &["letter", "form", "email"]);

        let ids = |seed| -> Vec<usize> {
            prune(&ds, &d, &seeded(seed)).unwrap()[&Split::Train]
                .iter()
                .map(|doc| doc.id)
                .collect()
        };
        assert_eq!(ids(42), ids(42));
        assert_ne!(ids(42), ids(43));
    }

    #[test]
    fn unshuffled_keeps_source_order() {
        let ds = source(vec![(Split::Train, vec![0, 5, 11, 0, 2])]);
        let d = description(2, 0, 0, &["letter", "invoice"]);
        let options = PruneOptions {
            shuffle: false,
            ..Default::default()
        };
        let ids: Vec<usize> = prune(&ds, &d, &options).unwrap()[&Split::Train]
            .iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn out_of_range_label_is_fatal() {
        let ds = source(vec![(Split::Train, vec![0, 99, 0])]);
        let d = description(3, 0, 0, &["letter"]);
        let options = PruneOptions {
            shuffle: false,
            ..Default::default()
        };
        match prune(&ds, &d, &options) {
            Err(Error::LabelOutOfRange { split, label, .. }) => {
                assert_eq!(split, Split::Train);
                assert_eq!(label, 99);
            }
            other => panic!("expected LabelOutOfRange, got {other:?}"),
        }
    }

    /// Counts how many records were pulled from the source.
    struct Counting<'a> {
        labels: Vec<i64>,
        pulled: &'a Cell<usize>,
    }

    impl DatasetSource for Counting<'_> {
        type Record = Doc;

        fn records(&self, split: Split, _seed: Option<u64>) -> Result<RecordIter<'_, Doc>> {
            Ok(Box::new(self.labels.iter().enumerate().map(move |(id, &label)| {
                self.pulled.set(self.pulled.get() + 1);
                Ok(Doc { id, split, label })
            })))
        }
    }

    #[test]
    fn stops_reading_once_capped() {
        let pulled = Cell::new(0);
        let src = Counting {
            labels: vec![0; 1000],
            pulled: &pulled,
        };
        let d = description(5, 0, 0, &["letter"]);
        let options = PruneOptions {
            shuffle: false,
            ..Default::default()
        };
        let (records, report) = prune_split(&src, Split::Train, &d, &options, 0).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(report.outcome, SplitOutcome::Capped);
        assert_eq!(pulled.get(), 5);

        // A zero cap never touches the source.
        pulled.set(0);
        let d = description(0, 0, 0, &["letter"]);
        prune_split(&src, Split::Train, &d, &options, 0).unwrap();
        assert_eq!(pulled.get(), 0);
    }

    #[test]
    fn shuffle_buffer_bounds_read_ahead() {
        let pulled = Cell::new(0);
        let src = Counting {
            labels: vec![0; 1000],
            pulled: &pulled,
        };
        let d = description(5, 0, 0, &["letter"]);
        let options = PruneOptions {
            seed: Some(3),
            buffer_size: 16,
            ..Default::default()
        };
        let (records, report) = prune_split(&src, Split::Train, &d, &options, 3).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(report.scanned, 5);
        assert_eq!(report.read, pulled.get());
        assert_eq!(report.read, 16 + 4);
    }

    #[test]
    fn empty_allow_list_reads_nothing() {
        let pulled = Cell::new(0);
        let src = Counting {
            labels: vec![0; 100],
            pulled: &pulled,
        };
        let d = description(10, 10, 10, &[]);
        for shuffle in [true, false] {
            let options = PruneOptions {
                seed: Some(1),
                shuffle,
                ..Default::default()
            };
            let (records, report) = prune_split(&src, Split::Train, &d, &options, 1).unwrap();
            assert!(records.is_empty());
            assert_eq!(report.outcome, SplitOutcome::Exhausted);
            assert_eq!(report.read, 0);
        }
        assert_eq!(pulled.get(), 0);
    }

    #[test]
    fn shuffle_buffer_is_a_permutation() {
        let items = (0..100).map(Ok::<_, Error>);
        let mut out: Vec<i32> = ShuffleBuffer::new(items, 10, 9).map(|r| r.unwrap()).collect();
        assert_ne!(out, (0..100).collect::<Vec<_>>());
        out.sort_unstable();
        assert_eq!(out, (0..100).collect::<Vec<_>>());
    }
}
