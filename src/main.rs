mod account;
mod cache;
mod catalog;
mod classify;
mod config;
mod enrich;
mod http;
mod ids;
mod listing;
mod pager;
mod query;
mod search;
mod side_index;
mod store;
mod stremio;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::CatalogService;
use crate::config::AppConfig;
use crate::side_index::{DisabledIndex, HttpSideIndex, StreamIdIndex, TorrentInfoSink};
use crate::store::GatewayStoreClient;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

pub type SharedAppState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let listen_addr = config.listen_addr;

    let store = GatewayStoreClient::new(config.store_base_url.clone(), config.store_timeout)
        .context("failed to construct store gateway client")?;

    let (stream_ids, torrent_info) = match &config.index_base_url {
        Some(base_url) => {
            let index = Arc::new(
                HttpSideIndex::new(base_url.clone(), config.index_timeout)
                    .context("failed to construct side index client")?,
            );
            let stream_ids: Arc<dyn StreamIdIndex> = index.clone();
            let torrent_info: Arc<dyn TorrentInfoSink> = index;
            (stream_ids, torrent_info)
        }
        None => {
            tracing::warn!("no side index configured; posters and torrent info are disabled");
            let stream_ids: Arc<dyn StreamIdIndex> = Arc::new(DisabledIndex);
            let torrent_info: Arc<dyn TorrentInfoSink> = Arc::new(DisabledIndex);
            (stream_ids, torrent_info)
        }
    };

    let catalog = CatalogService::new(
        Arc::new(store),
        stream_ids,
        torrent_info,
        config.poster_base_url.clone(),
        &config.catalog,
    );

    let state = Arc::new(AppState { catalog });
    let app = http::router(state);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {listen_addr}"))?;

    tracing::info!(
        "listening for catalog requests on {}",
        listener.local_addr()?
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server terminated unexpectedly")?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .init();
}
