use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use docset_prune::download::{DownloadKey, Downloader};

/// Download the pre-built dataset splits from Google Drive.
#[derive(Parser)]
#[command(name = "download-dataset", version)]
struct Cli {
    /// Key to download from Google Drive [train | test | validation | all]
    #[arg(long)]
    key: DownloadKey,

    /// Path to save the downloaded file
    #[arg(long, default_value = "./dataset/")]
    output_folder: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let downloader = Downloader::new().context("creating HTTP client")?;
    downloader
        .download_and_extract(cli.key, &cli.output_folder)
        .with_context(|| format!("downloading into {}", cli.output_folder.display()))?;
    Ok(())
}
