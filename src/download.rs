//! Fetch the pre-built split files from Google Drive.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reqwest::header::CONTENT_TYPE;

use crate::data::model::Split;
use crate::error::{Error, Result};

const DRIVE_DOWNLOAD_URL: &str = "https://drive.usercontent.google.com/download";

/// A file on Google Drive and the name it is saved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: &'static str,
    pub filename: &'static str,
}

pub fn remote_file(split: Split) -> RemoteFile {
    match split {
        Split::Train => RemoteFile {
            id: "1aAf5D2OeNuZ-1_8vEDy-N-n9sOuqAbjj",
            filename: "train.pkl",
        },
        Split::Test => RemoteFile {
            id: "1nwdtdoM0iA-6_KoE4CT9D1cWYyW6gMae",
            filename: "test.pkl",
        },
        Split::Validation => RemoteFile {
            id: "1Y5jAomCU0cW4bDAwRTBGmLGuAos1HxPG",
            filename: "validation.pkl",
        },
    }
}

/// Which files to fetch: one split or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKey {
    One(Split),
    All,
}

impl DownloadKey {
    pub fn splits(&self) -> Vec<Split> {
        match self {
            DownloadKey::One(split) => vec![*split],
            DownloadKey::All => Split::ALL.to_vec(),
        }
    }
}

impl FromStr for DownloadKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(DownloadKey::All),
            "train" => Ok(DownloadKey::One(Split::Train)),
            "test" => Ok(DownloadKey::One(Split::Test)),
            "validation" => Ok(DownloadKey::One(Split::Validation)),
            other => Err(Error::Configuration(format!(
                "unknown key '{other}', expected train | test | validation | all"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Downloader
// ---------------------------------------------------------------------------

pub struct Downloader {
    client: reqwest::blocking::Client,
    base_url: String,
    progress: bool,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("docset-prune/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: DRIVE_DOWNLOAD_URL.to_string(),
            progress: true,
        })
    }

    /// Point at a different host serving `?id=...` downloads.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every file named by `key` into `output_folder`, skipping files
    /// that already exist. Returns the paths that were downloaded.
    pub fn download_and_extract(&self, key: DownloadKey, output_folder: &Path) -> Result<Vec<PathBuf>> {
        ensure_folder(output_folder)?;

        let mut downloaded = Vec::new();
        for split in key.splits() {
            let remote = remote_file(split);
            let destination = output_folder.join(remote.filename);
            if destination.exists() {
                info!("{} already exists, skipping", destination.display());
                continue;
            }
            info!("Downloading {} from Google Drive", destination.display());
            self.fetch(remote.id, &destination)?;
            downloaded.push(destination);
        }
        Ok(downloaded)
    }

    /// Stream one file to `destination` via a `.part` file, so an
    /// interrupted download never leaves a file that looks complete.
    pub fn fetch(&self, id: &str, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("id", id), ("export", "download"), ("confirm", "t")])
            .send()?
            .error_for_status()?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            return Err(Error::Download(format!(
                "Drive returned an HTML page for {id} (quota exceeded or file not shared?)"
            )));
        }

        let pb = match (self.progress, response.content_length()) {
            (true, Some(len)) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec}")
                {
                    pb.set_style(style.progress_chars("=>-"));
                }
                pb
            }
            _ => ProgressBar::hidden(),
        };

        let mut partial = destination.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let result = (|| -> Result<()> {
            let mut file = File::create(&partial)?;
            std::io::copy(&mut pb.wrap_read(response), &mut file)?;
            file.sync_all()?;
            Ok(())
        })();
        pb.finish_and_clear();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, destination)?;
        Ok(())
    }
}

/// Create `folder` if it is missing. An existing non-directory is an error.
fn ensure_folder(folder: &Path) -> Result<()> {
    if folder.exists() && !folder.is_dir() {
        return Err(Error::Configuration(format!(
            "{} exists and is not a directory",
            folder.display()
        )));
    }
    std::fs::create_dir_all(folder)?;
    Ok(())
}
