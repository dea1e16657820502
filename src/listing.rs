use std::future::Future;
use std::time::Duration;

use tracing::{debug, error};

use crate::classify::{CatalogItem, ListedItem};
use crate::config::CatalogSettings;
use crate::side_index::TorrentInfoRecord;
use crate::store::{ListPage, ListParams, StoreClient, StoreError, StoreName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Magnets,
    Usenet,
}

#[derive(Debug, Clone)]
pub struct ListingRequest<'a> {
    pub store: StoreName,
    pub token: &'a str,
    pub client_ip: Option<&'a str>,
    pub id_prefix: &'a str,
}

/// Result of one full scan. Partial when the store failed part way through.
#[derive(Debug, Default)]
pub struct Listing {
    pub items: Vec<CatalogItem>,
    pub torrent_info: Vec<TorrentInfoRecord>,
    pub pages: usize,
    pub truncated: bool,
}

/// Walks a store listing page by page up to a fixed ceiling.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    page_size: usize,
    max_pages: usize,
    delay: Duration,
}

impl ListingFetcher {
    pub fn new(settings: &CatalogSettings) -> Self {
        let page_size = settings.fetch_page_size.max(1);
        Self {
            page_size,
            max_pages: (settings.fetch_max_items / page_size).max(1),
            delay: settings.fetch_delay,
        }
    }

    pub async fn fetch(
        &self,
        client: &dyn StoreClient,
        kind: ListingKind,
        request: &ListingRequest<'_>,
    ) -> Listing {
        match kind {
            ListingKind::Magnets => {
                self.scan(request, move |params| async move {
                    client.list_magnets(&params).await
                })
                .await
            }
            ListingKind::Usenet => {
                self.scan(request, move |params| async move {
                    client.list_news(&params).await
                })
                .await
            }
        }
    }

    async fn scan<T, F, Fut>(&self, request: &ListingRequest<'_>, fetch_page: F) -> Listing
    where
        T: ListedItem,
        F: Fn(ListParams) -> Fut,
        Fut: Future<Output = Result<ListPage<T>, StoreError>>,
    {
        let mut listing = Listing::default();
        let mut offset = 0;

        while listing.pages < self.max_pages {
            if listing.pages > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let params = ListParams {
                store: request.store,
                token: request.token.to_string(),
                client_ip: request.client_ip.map(str::to_string),
                limit: self.page_size,
                offset,
            };

            let page = match fetch_page(params).await {
                Ok(page) => page,
                Err(error) => {
                    error!(
                        store = request.store.name(),
                        offset,
                        error = %error,
                        "failed to list store items; keeping partial listing"
                    );
                    listing.truncated = true;
                    break;
                }
            };
            listing.pages += 1;

            let returned = page.items.len();
            for item in &page.items {
                if let Some(record) = item.torrent_info(request.store) {
                    listing.torrent_info.push(record);
                }
                if let Some(catalog_item) = item.classify(request.id_prefix) {
                    listing.items.push(catalog_item);
                }
            }

            offset += self.page_size;
            let remote_has_more = page.total_items.is_none_or(|total| offset < total);
            if returned < self.page_size || !remote_has_more {
                break;
            }
        }

        debug!(
            store = request.store.name(),
            pages = listing.pages,
            items = listing.items.len(),
            truncated = listing.truncated,
            "finished store listing scan"
        );

        listing
    }
}
