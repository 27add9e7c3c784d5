use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{BinaryArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use docset_prune::data::vocabulary::CLASS_VOCABULARY;
use docset_prune::Split;

/// Write a small synthetic dataset in the Hub parquet layout
/// (`{out}/default/{split}/NNNN.parquet`) for trying the pruner offline.
#[derive(Parser)]
#[command(name = "generate-sample")]
struct Cli {
    #[arg(long, default_value = "sample_data")]
    output_dir: PathBuf,

    /// Rows per split
    #[arg(long, default_value = "2000")]
    rows: usize,

    /// Shards per split
    #[arg(long, default_value = "4")]
    shards: usize,

    /// Fake image size in bytes
    #[arg(long, default_value = "256")]
    image_bytes: usize,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let schema = Arc::new(Schema::new(vec![
        Field::new("image", DataType::Binary, false),
        Field::new("label", DataType::Int64, false),
        Field::new("document_id", DataType::Utf8, false),
    ]));

    let shards = cli.shards.max(1);
    let per_shard = cli.rows.div_ceil(shards);
    let mut total = 0;

    for split in Split::ALL {
        let dir = cli.output_dir.join("default").join(split.as_str());
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for shard in 0..shards {
            let start = shard * per_shard;
            let end = ((shard + 1) * per_shard).min(cli.rows);
            if start >= end {
                break;
            }

            // Rows are grouped by class inside a shard, like many raw dumps.
            let mut labels: Vec<i64> = (start..end)
                .map(|_| rng.gen_range(0..CLASS_VOCABULARY.len() as i64))
                .collect();
            labels.sort_unstable();

            let images: Vec<Vec<u8>> = labels
                .iter()
                .map(|_| (0..cli.image_bytes).map(|_| rng.gen()).collect())
                .collect();
            let ids: Vec<String> = (start..end).map(|i| format!("{split}-{i:06}")).collect();

            let batch = RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(BinaryArray::from_iter_values(images.iter())),
                    Arc::new(Int64Array::from(labels)),
                    Arc::new(StringArray::from_iter_values(ids.iter())),
                ],
            )
            .context("building record batch")?;

            let path = dir.join(format!("{shard:04}.parquet"));
            let file = std::fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
            writer.write(&batch)?;
            writer.close()?;
            total += batch.num_rows();
        }
    }

    println!(
        "Wrote {total} documents ({} splits × {} shards) to {}",
        Split::ALL.len(),
        shards,
        cli.output_dir.display()
    );
    Ok(())
}
