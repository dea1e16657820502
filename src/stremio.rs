use serde::Serialize;

pub const ADDON_ID: &str = "local.storecat.store";

/// Genre value that asks for the action menu instead of catalog items.
pub const ACTIONS_GENRE: &str = "Store Actions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Other,
}

impl ContentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterShape {
    Poster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_shape: Option<PosterShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<MetaPreview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub resources: Vec<&'static str>,
    pub types: Vec<ContentType>,
    pub catalogs: Vec<ManifestCatalog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestCatalog {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    pub extra: Vec<ManifestExtra>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestExtra {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ManifestCatalog {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            content_type: ContentType::Other,
            name,
            extra: vec![
                ManifestExtra {
                    name: "search",
                    options: Vec::new(),
                },
                ManifestExtra {
                    name: "skip",
                    options: Vec::new(),
                },
                ManifestExtra {
                    name: "genre",
                    options: vec![ACTIONS_GENRE.to_string()],
                },
            ],
        }
    }
}
