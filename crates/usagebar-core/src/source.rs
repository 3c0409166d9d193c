//! Snapshot sources
//!
//! [`HttpSource`] calls the usage API; [`FileSource`] reads a saved
//! `{ "usage": ..., "summary": ... }` document for offline use and tests.

use crate::credentials::Credentials;
use crate::error::CoreError;
use crate::models::api::{CombinedUsage, UsageResponse, UsageSummaryResponse};
use crate::models::usage::UsageSnapshot;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

pub const USAGE_URL: &str = "https://cursor.com/api/usage";
pub const USAGE_SUMMARY_URL: &str = "https://cursor.com/api/usage-summary";

/// Produces a fresh usage snapshot per poll
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch current usage, reading request counts from `model_key`
    fn fetch(&self, model_key: &str) -> impl Future<Output = Result<UsageSnapshot, CoreError>> + Send;

    /// Verify the source can run at all
    ///
    /// Returns [`CoreError::MissingCapability`] when a required dependency is
    /// absent.
    fn check_capability(&self) -> Result<(), CoreError>;
}

/// Reads combined usage from a JSON file on every fetch
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_combined(&self) -> Result<CombinedUsage, CoreError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CoreError::FileRead {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| CoreError::JsonParse {
            path: self.path.clone(),
            message: source.to_string(),
            source,
        })
    }
}

impl SnapshotSource for FileSource {
    async fn fetch(&self, model_key: &str) -> Result<UsageSnapshot, CoreError> {
        debug!(path = %self.path.display(), "Reading usage file");
        self.read_combined()?.to_snapshot(model_key)
    }

    fn check_capability(&self) -> Result<(), CoreError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(CoreError::MissingCapability {
                capability: format!("usage file {}", self.path.display()),
                hint: "Pass --file with a saved usage JSON document".to_string(),
            })
        }
    }
}

/// Fetches both usage endpoints with the stored session credentials
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    state_db: Option<PathBuf>,
    usage_url: String,
    summary_url: String,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            state_db: None,
            usage_url: USAGE_URL.to_string(),
            summary_url: USAGE_SUMMARY_URL.to_string(),
        }
    }

    /// Read the token from a specific state database
    pub fn with_state_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_db = Some(path.into());
        self
    }

    /// Point both endpoints at another host (e.g. a local mock server)
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.usage_url = format!("{base}/api/usage");
        self.summary_url = format!("{base}/api/usage-summary");
        self
    }

    fn credentials(&self) -> Result<Credentials, CoreError> {
        Credentials::load(self.state_db.as_deref())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, cookie: &str) -> Result<T, CoreError> {
        let fetch_err = |source| CoreError::FetchFailed {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::COOKIE, cookie)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(fetch_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(fetch_err)
    }

    #[instrument(skip(self))]
    pub async fn fetch_combined(&self) -> Result<CombinedUsage, CoreError> {
        let cookie = self.credentials()?.cookie();

        let (usage, summary) = tokio::try_join!(
            self.get_json::<UsageResponse>(&self.usage_url, &cookie),
            self.get_json::<UsageSummaryResponse>(&self.summary_url, &cookie),
        )?;

        Ok(CombinedUsage { usage, summary })
    }
}

impl SnapshotSource for HttpSource {
    async fn fetch(&self, model_key: &str) -> Result<UsageSnapshot, CoreError> {
        self.fetch_combined().await?.to_snapshot(model_key)
    }

    fn check_capability(&self) -> Result<(), CoreError> {
        self.credentials().map(|_| ())
    }
}
