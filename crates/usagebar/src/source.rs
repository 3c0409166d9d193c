//! Source selected from the command line

use std::path::PathBuf;
use usagebar_core::{CoreError, FileSource, HttpSource, SnapshotSource, UsageSnapshot};

pub enum CliSource {
    File(FileSource),
    Http(HttpSource),
}

impl CliSource {
    /// `--file` reads a saved document; otherwise the live API is used
    pub fn from_args(file: Option<PathBuf>) -> Self {
        match file {
            Some(path) => CliSource::File(FileSource::new(path)),
            None => CliSource::Http(HttpSource::new()),
        }
    }
}

impl SnapshotSource for CliSource {
    async fn fetch(&self, model_key: &str) -> Result<UsageSnapshot, CoreError> {
        match self {
            CliSource::File(source) => source.fetch(model_key).await,
            CliSource::Http(source) => source.fetch(model_key).await,
        }
    }

    fn check_capability(&self) -> Result<(), CoreError> {
        match self {
            CliSource::File(source) => source.check_capability(),
            CliSource::Http(source) => source.check_capability(),
        }
    }
}
