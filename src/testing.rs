//! Test doubles for the store and side index seams.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::side_index::{IndexError, StreamIdIndex, TorrentInfoRecord, TorrentInfoSink};
use crate::store::{
    ItemStatus, ListPage, ListParams, MagnetItem, NewsItem, StoreClient, StoreError,
};

/// In-memory store that pages through fixed items and records every request.
#[derive(Debug, Default)]
pub struct MockStore {
    magnets: Vec<MagnetItem>,
    news: Vec<NewsItem>,
    endless: bool,
    fail_at_call: Option<usize>,
    calls: Mutex<Vec<ListParams>>,
    news_calls: Mutex<usize>,
}

impl MockStore {
    pub fn with_magnets(magnets: Vec<MagnetItem>) -> Self {
        Self {
            magnets,
            ..Self::default()
        }
    }

    pub fn with_news(news: Vec<NewsItem>) -> Self {
        Self {
            news,
            ..Self::default()
        }
    }

    /// Always returns full pages and never reports a total.
    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::default()
        }
    }

    /// Fails the request with the given zero-based call index.
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at_call = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<ListParams> {
        self.calls.lock().unwrap().clone()
    }

    pub fn news_calls(&self) -> usize {
        *self.news_calls.lock().unwrap()
    }

    fn record(&self, params: &ListParams) -> Result<(), StoreError> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(params.clone());
        if self.fail_at_call == Some(index) {
            let error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            return Err(StoreError::Deserialisation(error));
        }
        Ok(())
    }
}

fn window<T: Clone>(items: &[T], params: &ListParams) -> ListPage<T> {
    let start = params.offset.min(items.len());
    let end = params.offset.saturating_add(params.limit).min(items.len());
    ListPage {
        items: items[start..end].to_vec(),
        total_items: Some(items.len()),
    }
}

#[async_trait]
impl StoreClient for MockStore {
    async fn list_magnets(&self, params: &ListParams) -> Result<ListPage<MagnetItem>, StoreError> {
        self.record(params)?;
        if self.endless {
            let items = (params.offset..params.offset + params.limit)
                .map(|i| fixtures::magnet(i, ItemStatus::Downloaded))
                .collect();
            return Ok(ListPage {
                items,
                total_items: None,
            });
        }
        Ok(window(&self.magnets, params))
    }

    async fn list_news(&self, params: &ListParams) -> Result<ListPage<NewsItem>, StoreError> {
        *self.news_calls.lock().unwrap() += 1;
        self.record(params)?;
        Ok(window(&self.news, params))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedUpsert {
    pub records: Vec<TorrentInfoRecord>,
    pub dedupe_by_hash: bool,
}

/// Side index double. Records lookups and upserts even when set to fail.
#[derive(Debug, Default)]
pub struct MockIndex {
    strem_ids: HashMap<String, String>,
    fail: bool,
    delay: Option<Duration>,
    lookups: Mutex<Vec<Vec<String>>>,
    upserts: Mutex<Vec<RecordedUpsert>>,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strem_id(mut self, hash: &str, strem_id: &str) -> Self {
        self.strem_ids
            .insert(hash.to_string(), strem_id.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Makes every stream id lookup sleep before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> Vec<RecordedUpsert> {
        self.upserts.lock().unwrap().clone()
    }

    /// Yields to the runtime until the detached upsert tasks have run.
    pub async fn wait_for_upserts(&self, count: usize) -> Vec<RecordedUpsert> {
        for _ in 0..100 {
            if self.upserts.lock().unwrap().len() >= count {
                break;
            }
            tokio::task::yield_now().await;
        }
        let upserts = self.upserts();
        assert!(
            upserts.len() >= count,
            "expected {count} upserts, saw {}",
            upserts.len()
        );
        upserts
    }
}

#[async_trait]
impl StreamIdIndex for MockIndex {
    async fn strem_ids_by_hashes(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, String>, IndexError> {
        self.lookups.lock().unwrap().push(hashes.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(offline());
        }
        Ok(hashes
            .iter()
            .filter_map(|hash| {
                self.strem_ids
                    .get(hash)
                    .map(|strem_id| (hash.clone(), strem_id.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl TorrentInfoSink for MockIndex {
    async fn upsert(
        &self,
        records: Vec<TorrentInfoRecord>,
        dedupe_by_hash: bool,
    ) -> Result<(), IndexError> {
        self.upserts.lock().unwrap().push(RecordedUpsert {
            records,
            dedupe_by_hash,
        });
        if self.fail {
            return Err(offline());
        }
        Ok(())
    }
}

fn offline() -> IndexError {
    IndexError::Url(url::ParseError::EmptyHost)
}

pub mod fixtures {
    use crate::store::{ItemStatus, MagnetItem, NewsFile, NewsItem};

    pub fn magnet(i: usize, status: ItemStatus) -> MagnetItem {
        MagnetItem {
            id: format!("m{i}"),
            hash: format!("hash{i}"),
            name: format!("Item {i}"),
            size: 1_000 + i as i64,
            status,
            added_at: None,
        }
    }

    pub fn named_magnet(i: usize, name: &str) -> MagnetItem {
        MagnetItem {
            name: name.to_string(),
            ..magnet(i, ItemStatus::Downloaded)
        }
    }

    pub fn downloaded_magnets(count: usize) -> Vec<MagnetItem> {
        (0..count)
            .map(|i| magnet(i, ItemStatus::Downloaded))
            .collect()
    }

    pub fn news(i: usize, status: ItemStatus, largest_file: Option<&str>) -> NewsItem {
        let files = largest_file
            .map(|name| {
                vec![
                    NewsFile {
                        name: "sample.mkv".to_string(),
                        size: 10,
                    },
                    NewsFile {
                        name: name.to_string(),
                        size: 10_000,
                    },
                ]
            })
            .unwrap_or_default();

        NewsItem {
            id: format!("n{i}"),
            hash: format!("nhash{i}"),
            name: format!("Upload {i}"),
            status,
            files,
        }
    }
}
