use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    AllDebrid,
    DebridLink,
    EasyDebrid,
    Offcloud,
    PikPak,
    Premiumize,
    RealDebrid,
    TorBox,
}

impl StoreName {
    pub const ALL: [StoreName; 8] = [
        StoreName::AllDebrid,
        StoreName::DebridLink,
        StoreName::EasyDebrid,
        StoreName::Offcloud,
        StoreName::PikPak,
        StoreName::Premiumize,
        StoreName::RealDebrid,
        StoreName::TorBox,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|store| store.code() == code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::AllDebrid => "ad",
            Self::DebridLink => "dl",
            Self::EasyDebrid => "ed",
            Self::Offcloud => "oc",
            Self::PikPak => "pp",
            Self::Premiumize => "pm",
            Self::RealDebrid => "rd",
            Self::TorBox => "tb",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllDebrid => "alldebrid",
            Self::DebridLink => "debridlink",
            Self::EasyDebrid => "easydebrid",
            Self::Offcloud => "offcloud",
            Self::PikPak => "pikpak",
            Self::Premiumize => "premiumize",
            Self::RealDebrid => "realdebrid",
            Self::TorBox => "torbox",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AllDebrid => "AllDebrid",
            Self::DebridLink => "DebridLink",
            Self::EasyDebrid => "EasyDebrid",
            Self::Offcloud => "Offcloud",
            Self::PikPak => "PikPak",
            Self::Premiumize => "Premiumize",
            Self::RealDebrid => "RealDebrid",
            Self::TorBox => "TorBox",
        }
    }

    pub fn supports_usenet(&self) -> bool {
        matches!(self, Self::TorBox)
    }
}

/// Everything a single page request needs besides the page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub store: StoreName,
    pub token: String,
    pub client_ip: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Cached,
    Queued,
    Downloading,
    Processing,
    Downloaded,
    Uploading,
    Failed,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagnetItem {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: i64,
    pub status: ItemStatus,
    #[serde(default)]
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub name: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub files: Vec<NewsFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsFile {
    pub name: String,
    #[serde(default)]
    pub size: i64,
}

impl NewsItem {
    pub fn largest_file_name(&self) -> &str {
        self.files
            .iter()
            .max_by_key(|file| file.size)
            .map(|file| file.name.as_str())
            .unwrap_or(self.name.as_str())
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub total_items: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Paginated listing capability exposed by a store backend.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn list_magnets(&self, params: &ListParams) -> Result<ListPage<MagnetItem>, StoreError>;

    async fn list_news(&self, params: &ListParams) -> Result<ListPage<NewsItem>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct GatewayStoreClient {
    http: Client,
    base_url: Url,
}

impl GatewayStoreClient {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("storecat/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    async fn list<T>(&self, path: &str, params: &ListParams) -> Result<ListPage<T>, StoreError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut url = self.base_url.join(path).map_err(StoreError::Url)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &params.limit.to_string());
            pairs.append_pair("offset", &params.offset.to_string());
        }

        debug!(
            store = params.store.name(),
            offset = params.offset,
            limit = params.limit,
            "requesting store listing page"
        );

        let mut request = self
            .http
            .get(url)
            .header("X-Store-Name", params.store.name())
            .bearer_auth(&params.token);
        if let Some(client_ip) = params.client_ip.as_deref() {
            request = request.header("X-Client-IP", client_ip);
        }

        let response = request.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let payload: Envelope<ListPage<T>> = serde_json::from_slice(&bytes)?;

        debug!(
            store = params.store.name(),
            offset = params.offset,
            returned = payload.data.items.len(),
            total = payload.data.total_items,
            "store listing page received"
        );

        Ok(payload.data)
    }
}

#[async_trait]
impl StoreClient for GatewayStoreClient {
    async fn list_magnets(&self, params: &ListParams) -> Result<ListPage<MagnetItem>, StoreError> {
        self.list("v0/store/magnets", params).await
    }

    async fn list_news(&self, params: &ListParams) -> Result<ListPage<NewsItem>, StoreError> {
        if !params.store.supports_usenet() {
            return Err(StoreError::UsenetUnsupported(params.store.name()));
        }
        self.list("v0/store/newz", params).await
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to build store request url")]
    Url(#[from] url::ParseError),
    #[error("http error when listing store items: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to deserialise store listing payload: {0}")]
    Deserialisation(#[from] serde_json::Error),
    #[error("store `{0}` does not support usenet")]
    UsenetUnsupported(&'static str),
}
