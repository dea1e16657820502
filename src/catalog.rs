use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::account::AccountContext;
use crate::cache::{CacheKey, CatalogCache};
use crate::classify::CatalogItem;
use crate::config::CatalogSettings;
use crate::enrich::PosterEnricher;
use crate::ids::CatalogId;
use crate::listing::{ListingFetcher, ListingKind, ListingRequest};
use crate::pager::paginate;
use crate::query::QueryDirectives;
use crate::search::SearchMatcher;
use crate::side_index::{StreamIdIndex, TorrentInfoSink, spawn_upsert};
use crate::store::{StoreClient, StoreName};
use crate::stremio::{ACTIONS_GENRE, ContentType, MetaPreview};

/// Serves filtered, paged and poster-enriched slices of cached store listings.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn StoreClient>,
    torrent_info: Arc<dyn TorrentInfoSink>,
    fetcher: ListingFetcher,
    cache: CatalogCache,
    enricher: PosterEnricher,
    page_size: usize,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn StoreClient>,
        stream_ids: Arc<dyn StreamIdIndex>,
        torrent_info: Arc<dyn TorrentInfoSink>,
        poster_base_url: Url,
        settings: &CatalogSettings,
    ) -> Self {
        Self {
            store,
            torrent_info,
            fetcher: ListingFetcher::new(settings),
            cache: CatalogCache::new("store:catalog", settings.cache_lifetime),
            enricher: PosterEnricher::new(stream_ids, poster_base_url, settings.enrich_timeout),
            page_size: settings.page_size.max(1),
        }
    }

    pub async fn catalog(
        &self,
        account: &AccountContext,
        catalog: &CatalogId,
        directives: &QueryDirectives,
    ) -> Result<Vec<MetaPreview>, CatalogError> {
        if directives.wants_actions() {
            return Ok(vec![action_meta(catalog)]);
        }

        let items = self.items(account, catalog).await;

        let matched: Vec<&CatalogItem> = match directives.search.as_deref() {
            Some(text) => SearchMatcher::new(text)?.filter(&items),
            None => items.iter().collect(),
        };

        let mut page: Vec<CatalogItem> = paginate(&matched, directives.skip, self.page_size)
            .iter()
            .map(|item| (*item).clone())
            .collect();

        debug!(
            catalog = %catalog.catalog_id(),
            cached = items.len(),
            matched = matched.len(),
            skip = directives.skip,
            returned = page.len(),
            "serving catalog page"
        );

        self.enricher.enrich(&mut page).await;

        Ok(page.into_iter().map(|item| item.meta).collect())
    }

    /// Full listing for the account, from cache or from a fresh scan of the store.
    async fn items(&self, account: &AccountContext, catalog: &CatalogId) -> Arc<Vec<CatalogItem>> {
        let id_prefix = catalog.item_prefix();
        let key = CacheKey::new(&id_prefix, &account.token);

        if let Some(items) = self.cache.get(&key).await {
            debug!(cache_key = %key, items = items.len(), "catalog cache hit");
            return items;
        }

        let kind = catalog.listing_kind();
        let request = ListingRequest {
            store: account.store,
            token: &account.token,
            client_ip: account.client_ip.as_deref(),
            id_prefix: &id_prefix,
        };
        let listing = self.fetcher.fetch(self.store.as_ref(), kind, &request).await;

        if kind == ListingKind::Magnets && !listing.torrent_info.is_empty() {
            spawn_upsert(
                self.torrent_info.clone(),
                listing.torrent_info,
                account.store != StoreName::RealDebrid,
            );
        }

        let items = Arc::new(listing.items);
        self.cache.put(key, items.clone()).await;
        items
    }
}

fn action_meta(catalog: &CatalogId) -> MetaPreview {
    MetaPreview {
        id: catalog.action_id(),
        content_type: ContentType::Other,
        name: ACTIONS_GENRE.to_string(),
        description: String::new(),
        poster_shape: None,
        poster: None,
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid search pattern: {0}")]
    SearchPattern(#[from] regex::Error),
}
