//! Resilient remote file retrieval
//!
//! Downloads stream straight to disk with caching disabled. Platform URLs are
//! built from a protocol-less template: the secure variant is tried first and
//! the insecure variant exactly once if that fails. There is no backoff and
//! no further retry.

use chrono::Local;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DownloadFailure, PopulateError, Result};

const USER_AGENT: &str = concat!("tdp-populator/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Resource file download endpoint, relative to the platform host
pub const RESOURCE_DOWNLOAD_PATH: &str = "/Relativity.Distributed/Download.aspx";
/// Import web API endpoint, relative to the platform host
pub const WEB_API_PATH: &str = "/Relativitywebapi/";

/// Transport variant of a platform URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Https,
    Http,
}

impl Protocol {
    pub fn prefix(self) -> &'static str {
        match self {
            Protocol::Https => "https://",
            Protocol::Http => "http://",
        }
    }
}

/// Host, path and query of a platform URL, without protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolTemplate {
    host_and_query: String,
}

impl ProtocolTemplate {
    pub fn new(host_and_query: impl Into<String>) -> Self {
        Self {
            host_and_query: host_and_query.into(),
        }
    }

    /// Resource file download URL for an artifact
    pub fn resource_download(host: &str, artifact_id: i64, auth_token: &str) -> Self {
        Self::new(format!(
            "{host}{RESOURCE_DOWNLOAD_PATH}?AppID=-1&AssemblyArtifactID={artifact_id}&AuthenticationToken={auth_token}"
        ))
    }

    /// Import web API URL
    pub fn web_api(host: &str) -> Self {
        Self::new(format!("{host}{WEB_API_PATH}"))
    }

    pub fn url(&self, protocol: Protocol) -> String {
        format!("{}{}", protocol.prefix(), self.host_and_query)
    }
}

/// Run `attempt` against the secure URL, then once against the insecure URL
///
/// Only transport failures (`Download` and `EngineUnavailable`) trigger the
/// insecure attempt; any other error from the secure attempt is returned as
/// is. When the insecure attempt runs, its result is returned.
pub async fn with_protocol_fallback<T, F, Fut>(template: &ProtocolTemplate, mut attempt: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let secure_url = template.url(Protocol::Https);
    match attempt(secure_url.clone()).await {
        Err(e @ (PopulateError::Download { .. } | PopulateError::EngineUnavailable { .. })) => {
            warn!(url = %secure_url, error = %e, "Secure attempt failed, retrying over http");
            attempt(template.url(Protocol::Http)).await
        }
        other => other,
    }
}

/// Unique temp path for a downloaded settings file
pub fn config_download_path() -> PathBuf {
    let file_name = format!(
        "PopulatorConfigFile_{}_{}.json",
        Uuid::new_v4(),
        Local::now().format("%Y%m%d%H%M%S%3f")
    );
    std::env::temp_dir().join(file_name)
}

/// Downloader with protocol fallback
#[derive(Clone)]
pub struct ResilientFetcher {
    http_client: reqwest::Client,
}

impl ResilientFetcher {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PopulateError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Build a fetcher over an existing HTTP client
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Stream `url` into `destination`
    ///
    /// On success the destination exists and is fully written. A partially
    /// written destination is removed on failure.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        debug!(url, destination = %destination.display(), "Downloading file");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache, no-store")
            .header(reqwest::header::PRAGMA, "no-cache")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| download_error(url, DownloadFailure::Http(e)))?;

        match write_body(response, destination).await {
            Ok(bytes) => {
                info!(url, destination = %destination.display(), bytes, "Download complete");
                Ok(())
            }
            Err(failure) => {
                if let Err(e) = tokio::fs::remove_file(destination).await {
                    debug!(error = %e, "Partial download not removed");
                }
                Err(download_error(url, failure))
            }
        }
    }

    /// Download a templated platform URL, https first and http once on failure
    pub async fn fetch_with_fallback(
        &self,
        template: &ProtocolTemplate,
        destination: &Path,
    ) -> Result<()> {
        with_protocol_fallback(template, |url| async move { self.fetch(&url, destination).await })
            .await
    }
}

async fn write_body(
    response: reqwest::Response,
    destination: &Path,
) -> std::result::Result<u64, DownloadFailure> {
    let mut file = tokio::fs::File::create(destination).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn download_error(url: &str, source: DownloadFailure) -> PopulateError {
    error!(url, error = %source, "Unable to download file");
    PopulateError::Download {
        url: url.to_string(),
        source,
    }
}
