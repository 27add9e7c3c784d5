use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hf_hub::api::sync::Api;
use log::info;

use docset_prune::data::loader::ParquetDataset;
use docset_prune::data::writer::write_dataset;
use docset_prune::{prune, DatasetDescription, PruneOptions};

/// Build a reduced, class-filtered copy of a document dataset.
#[derive(Parser)]
#[command(name = "docset-prune", version)]
struct Cli {
    /// Path to the dataset description file
    #[arg(long, default_value = "dataset_descriptions.json")]
    dataset_description_file: PathBuf,

    /// Path to the output directory
    #[arg(long, default_value = "dataset")]
    output_dir: PathBuf,

    /// Read parquet shards from this directory instead of the Hugging Face Hub
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the source order (it is already randomized)
    #[arg(long)]
    no_shuffle: bool,

    /// Rows held in the shuffle buffer
    #[arg(long, default_value = "4096")]
    buffer_size: usize,

    /// Name of the integer label column
    #[arg(long, default_value = "label")]
    label_column: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let description = DatasetDescription::from_path(&cli.dataset_description_file).with_context(|| {
        format!("loading {}", cli.dataset_description_file.display())
    })?;

    let source = match &cli.source_dir {
        Some(dir) => ParquetDataset::from_dir(dir)
            .with_context(|| format!("scanning {}", dir.display()))?,
        None => {
            let api = Api::new().context("initialising Hugging Face Hub client")?;
            ParquetDataset::from_hub(&api, &description.name)
                .with_context(|| format!("listing {} on the Hub", description.name))?
        }
    }
    .with_label_column(cli.label_column);

    let options = PruneOptions {
        seed: cli.seed,
        shuffle: !cli.no_shuffle,
        buffer_size: cli.buffer_size,
        progress: true,
    };
    let pruned = prune(&source, &description, &options).context("pruning dataset")?;

    let written = write_dataset(&cli.output_dir, &pruned)
        .with_context(|| format!("writing to {}", cli.output_dir.display()))?;
    info!("wrote {} split files to {}", written.len(), cli.output_dir.display());
    Ok(())
}
