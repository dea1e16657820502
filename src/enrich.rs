use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, error, warn};

use crate::classify::CatalogItem;
use crate::side_index::StreamIdIndex;

/// Attaches poster urls to the items of one response page.
#[derive(Clone)]
pub struct PosterEnricher {
    index: Arc<dyn StreamIdIndex>,
    poster_base_url: Url,
    lookup_timeout: Duration,
}

impl PosterEnricher {
    pub fn new(index: Arc<dyn StreamIdIndex>, poster_base_url: Url, lookup_timeout: Duration) -> Self {
        Self {
            index,
            poster_base_url,
            lookup_timeout,
        }
    }

    /// Best effort: a failed or overdue lookup leaves every poster empty and never reorders or
    /// drops items.
    pub async fn enrich(&self, items: &mut [CatalogItem]) {
        if items.is_empty() {
            return;
        }

        let hashes: Vec<String> = items.iter().map(|item| item.hash.clone()).collect();
        let lookup = self.index.strem_ids_by_hashes(&hashes);
        let strem_ids = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(strem_ids)) => strem_ids,
            Err(_) => {
                warn!(
                    hashes = hashes.len(),
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "strem id lookup timed out; serving page without posters"
                );
                return;
            }
            Ok(Err(error)) => {
                error!(
                    hashes = hashes.len(),
                    error = %error,
                    "failed to get strem ids by hashes"
                );
                return;
            }
        };

        let mut attached = 0;
        for item in items.iter_mut() {
            let strem_id = strem_ids
                .get(&item.hash)
                .or_else(|| strem_ids.get(&item.hash.to_lowercase()));
            let Some(strem_id) = strem_id else { continue };
            if let Some(poster) = self.poster_url(strem_id) {
                item.meta.poster = Some(poster);
                attached += 1;
            }
        }

        debug!(items = items.len(), attached, "attached posters to catalog page");
    }

    fn poster_url(&self, strem_id: &str) -> Option<String> {
        let (base_id, _) = strem_id.split_once(':').unwrap_or((strem_id, ""));
        if matches!(base_id, "" | "." | "..") {
            return None;
        }
        // Pushed as a single segment so `/` in the id is escaped and stays under the base path.
        let mut url = self.poster_base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(base_id)
            .push("img");
        Some(url.into())
    }
}
