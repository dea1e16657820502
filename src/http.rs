use std::{borrow::Cow, net::SocketAddr};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::SharedAppState;
use crate::account::{AccountError, UserData};
use crate::catalog::CatalogError;
use crate::ids::{CatalogId, CatalogIdError};
use crate::query::QueryDirectives;
use crate::stremio::{self, CatalogResponse, ContentType, Manifest, ManifestCatalog};

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stremio/store/{user_data}/manifest.json", get(manifest_handler))
        .route(
            "/stremio/store/{user_data}/catalog/{content_type}/{id}",
            get(catalog_handler),
        )
        .route(
            "/stremio/store/{user_data}/catalog/{content_type}/{id}/{extra}",
            get(catalog_handler),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct CatalogPath {
    user_data: String,
    content_type: String,
    id: String,
    #[serde(default)]
    extra: Option<String>,
}

async fn manifest_handler(Path(user_data): Path<String>) -> Json<Manifest> {
    let catalogs = match UserData::decode(&user_data) {
        Ok(data) => data
            .configured_stores()
            .flat_map(|store| {
                let usenet = store
                    .supports_usenet()
                    .then(|| CatalogId::new(store, true));
                std::iter::once(CatalogId::new(store, false)).chain(usenet)
            })
            .map(|catalog| ManifestCatalog::new(catalog.catalog_id(), catalog.display_name()))
            .collect(),
        Err(error) => {
            debug!(error = %error, "manifest requested with unusable user data");
            Vec::new()
        }
    };

    Json(Manifest {
        id: stremio::ADDON_ID,
        version: env!("CARGO_PKG_VERSION"),
        name: "Store",
        description: "Browse the content downloaded to your stores",
        resources: vec!["catalog"],
        types: vec![ContentType::Other],
        catalogs,
    })
}

async fn catalog_handler(
    State(state): State<SharedAppState>,
    Path(path): Path<CatalogPath>,
    request: Request,
) -> Result<Response, HttpError> {
    let user_data = UserData::decode(&path.user_data).map_err(HttpError::Account)?;

    if ContentType::parse(&path.content_type).is_none() {
        return Err(HttpError::UnsupportedContentType(path.content_type));
    }

    // The extra segment is read undecoded so encoded `&` and `=` survive until query parsing.
    let (id, extra) = match path.extra {
        Some(_) => {
            let raw_extra = request.uri().path().rsplit('/').next().unwrap_or("");
            (path.id.as_str(), strip_json_suffix(raw_extra))
        }
        None => (strip_json_suffix(&path.id), ""),
    };

    let catalog = CatalogId::parse(id)?;
    let client_ip = client_ip(request.headers(), request.extensions().get());
    let account = user_data
        .resolve(&catalog, client_ip)
        .map_err(HttpError::Account)?;

    let directives = QueryDirectives::parse(extra);

    info!(
        catalog = %catalog.catalog_id(),
        search = directives.search.as_deref(),
        skip = directives.skip,
        genre = directives.genre.as_deref(),
        "catalog request received"
    );

    let metas = state.catalog.catalog(&account, &catalog, &directives).await?;

    Ok(Json(CatalogResponse { metas }).into_response())
}

fn strip_json_suffix(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),
    #[error(transparent)]
    CatalogId(#[from] CatalogIdError),
    #[error("failed to resolve account context: {0}")]
    Account(AccountError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message): (StatusCode, Cow<'static, str>) = match &self {
            HttpError::UnsupportedContentType(_) | HttpError::CatalogId(_) => {
                (StatusCode::BAD_REQUEST, Cow::from(self.to_string()))
            }
            HttpError::Account(_) => (StatusCode::BAD_REQUEST, Cow::from("")),
            HttpError::Catalog(CatalogError::SearchPattern(_)) => (
                StatusCode::BAD_REQUEST,
                Cow::from("Failed to build search pattern"),
            ),
        };

        tracing::error!("catalog handler error: {self}");

        let body = Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}
