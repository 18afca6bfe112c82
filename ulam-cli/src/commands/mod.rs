use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;
use ulam::{DatasetSource, Session, SessionBuilder};

pub mod antipode;
pub mod batch;
pub mod info;
pub mod sample;
pub mod timestep;

/// Where to load datasets from.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Dataset file (JSON or `const bu = ...`, optionally gzipped)
    #[arg(short, long, env = "ULAM_DATASET", global = true)]
    pub dataset: Option<PathBuf>,

    /// Fallback dataset file used when no snapshot has elapsed
    #[arg(short, long, env = "ULAM_FALLBACK", global = true)]
    pub fallback: Option<PathBuf>,

    /// Pointer file URL naming the latest dataset (used without --dataset)
    #[arg(long, env = "ULAM_POINTER_URL", global = true)]
    pub pointer_url: Option<String>,

    /// Maximum datasets in cache
    #[arg(
        short,
        long,
        env = "ULAM_CACHE_SIZE",
        default_value = "4",
        global = true
    )]
    pub cache_size: u64,
}

impl DatasetArgs {
    pub fn builder(&self) -> Result<SessionBuilder> {
        let source = match (&self.dataset, &self.pointer_url) {
            (Some(path), _) => DatasetSource::File(path.clone()),
            (None, Some(url)) => DatasetSource::Pointer(url.clone()),
            (None, None) => anyhow::bail!(
                "No dataset configured. Use --dataset, --pointer-url, ULAM_DATASET or ULAM_POINTER_URL"
            ),
        };

        let mut builder = SessionBuilder::new()
            .dataset(source)
            .cache_size(self.cache_size);
        if let Some(path) = &self.fallback {
            builder = builder.fallback_file(path);
        }
        if self.pointer_url.is_some() && self.dataset.is_none() {
            builder = builder.download(ulam::download::DownloadConfig::default());
        }
        Ok(builder)
    }

    /// Load the dataset and select the snapshot for `at` (now by default).
    pub fn session(&self, at: Option<DateTime<Utc>>) -> Result<Session> {
        let at = at.unwrap_or_else(Utc::now);
        self.builder()?
            .build_at(at)
            .context("Failed to load dataset")
    }
}
