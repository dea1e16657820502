use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorrentInfoRecord {
    pub hash: String,
    pub torrent_title: String,
    pub size: i64,
    pub source: String,
}

/// Read side: content hash to external stream id (e.g. `tt0133093:1:2`).
#[async_trait]
pub trait StreamIdIndex: Send + Sync {
    async fn strem_ids_by_hashes(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, String>, IndexError>;
}

/// Write side: torrent metadata gathered while listing stores.
#[async_trait]
pub trait TorrentInfoSink: Send + Sync {
    async fn upsert(
        &self,
        records: Vec<TorrentInfoRecord>,
        dedupe_by_hash: bool,
    ) -> Result<(), IndexError>;
}

/// Hands the batch to a detached task. No ordering between batches and no error propagation;
/// failures only show up in the logs.
pub fn spawn_upsert(
    sink: Arc<dyn TorrentInfoSink>,
    records: Vec<TorrentInfoRecord>,
    dedupe_by_hash: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let count = records.len();
        match sink.upsert(records, dedupe_by_hash).await {
            Ok(()) => debug!(records = count, "persisted torrent info batch"),
            Err(error) => warn!(
                records = count,
                error = %error,
                "failed to persist torrent info batch"
            ),
        }
    })
}

#[derive(Debug, Clone)]
pub struct HttpSideIndex {
    http: Client,
    base_url: Url,
}

impl HttpSideIndex {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("storecat/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }
}

#[derive(Debug, Serialize)]
struct StremIdsRequest<'a> {
    hashes: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StremIdsResponse {
    #[serde(default)]
    data: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    items: Vec<TorrentInfoRecord>,
    dedupe_by_hash: bool,
}

#[async_trait]
impl StreamIdIndex for HttpSideIndex {
    async fn strem_ids_by_hashes(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, String>, IndexError> {
        let lowered: Vec<String> = hashes.iter().map(|hash| hash.to_lowercase()).collect();
        let mut seen = HashSet::new();
        let unique: Vec<&str> = lowered
            .iter()
            .map(String::as_str)
            .filter(|hash| !hash.is_empty() && seen.insert(*hash))
            .collect();

        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let url = self
            .base_url
            .join("v0/torrents/strem-ids")
            .map_err(IndexError::Url)?;

        let requested = unique.len();
        let response = self
            .http
            .post(url)
            .json(&StremIdsRequest { hashes: unique })
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        let payload: StremIdsResponse = serde_json::from_slice(&bytes)?;

        debug!(
            requested,
            resolved = payload.data.len(),
            "resolved strem ids by hash"
        );

        Ok(payload.data)
    }
}

#[async_trait]
impl TorrentInfoSink for HttpSideIndex {
    async fn upsert(
        &self,
        records: Vec<TorrentInfoRecord>,
        dedupe_by_hash: bool,
    ) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        let url = self
            .base_url
            .join("v0/torrents/info")
            .map_err(IndexError::Url)?;

        self.http
            .post(url)
            .json(&UpsertRequest {
                items: records,
                dedupe_by_hash,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Stand-in when no side index is configured: resolves nothing and drops writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIndex;

#[async_trait]
impl StreamIdIndex for DisabledIndex {
    async fn strem_ids_by_hashes(
        &self,
        _hashes: &[String],
    ) -> Result<HashMap<String, String>, IndexError> {
        Ok(HashMap::new())
    }
}

#[async_trait]
impl TorrentInfoSink for DisabledIndex {
    async fn upsert(
        &self,
        records: Vec<TorrentInfoRecord>,
        _dedupe_by_hash: bool,
    ) -> Result<(), IndexError> {
        debug!(
            records = records.len(),
            "side index disabled; dropping torrent info batch"
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to build side index request url")]
    Url(#[from] url::ParseError),
    #[error("http error when querying side index: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to deserialise side index payload: {0}")]
    Deserialisation(#[from] serde_json::Error),
}
