use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::side_index::TorrentInfoRecord;
use crate::store::{ItemStatus, MagnetItem, NewsItem, StoreName};
use crate::stremio::{ContentType, MetaPreview, PosterShape};

/// A catalog entry together with the content hash it was listed under.
///
/// The hash never leaves the service; it only feeds the poster lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub meta: MetaPreview,
    pub hash: String,
}

impl CatalogItem {
    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Raw listing entry returned by one of the store listing variants.
pub trait ListedItem {
    /// Maps a materialized item into the catalog; anything still in flight or failed is dropped.
    fn classify(&self, id_prefix: &str) -> Option<CatalogItem>;

    fn torrent_info(&self, _source: StoreName) -> Option<TorrentInfoRecord> {
        None
    }
}

impl ListedItem for MagnetItem {
    fn classify(&self, id_prefix: &str) -> Option<CatalogItem> {
        if self.status != ItemStatus::Downloaded {
            return None;
        }

        Some(CatalogItem {
            meta: MetaPreview {
                id: format!("{id_prefix}{}", self.id),
                content_type: ContentType::Other,
                name: self.name.clone(),
                description: torrent_description(&self.hash, &self.name, self.added_at.as_deref()),
                poster_shape: Some(PosterShape::Poster),
                poster: None,
            },
            hash: self.hash.clone(),
        })
    }

    fn torrent_info(&self, source: StoreName) -> Option<TorrentInfoRecord> {
        if self.hash.is_empty() {
            return None;
        }

        Some(TorrentInfoRecord {
            hash: self.hash.clone(),
            torrent_title: self.name.clone(),
            size: self.size,
            source: source.code().to_string(),
        })
    }
}

impl ListedItem for NewsItem {
    fn classify(&self, id_prefix: &str) -> Option<CatalogItem> {
        if self.status != ItemStatus::Downloaded {
            return None;
        }

        let name = self.largest_file_name().to_string();
        Some(CatalogItem {
            meta: MetaPreview {
                id: format!("{id_prefix}{}", self.id),
                content_type: ContentType::Other,
                description: usenet_description(&self.hash, &self.name, &name),
                name,
                poster_shape: Some(PosterShape::Poster),
                poster: None,
            },
            hash: self.hash.clone(),
        })
    }
}

pub fn torrent_description(hash: &str, name: &str, added_at: Option<&str>) -> String {
    let mut description = format!("{name}\nHash: {hash}");
    if let Some(added) = added_at.and_then(format_added_date) {
        description.push_str("\nAdded: ");
        description.push_str(&added);
    }
    description
}

pub fn usenet_description(hash: &str, submitted_name: &str, file_name: &str) -> String {
    if submitted_name == file_name || file_name.is_empty() {
        format!("{submitted_name}\nHash: {hash}")
    } else {
        format!("{submitted_name}\nFile: {file_name}\nHash: {hash}")
    }
}

fn format_added_date(value: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(value.trim(), &Rfc3339).ok()?;
    parsed
        .format(format_description!("[year]-[month]-[day]"))
        .ok()
}
