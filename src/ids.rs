use thiserror::Error;

use crate::listing::ListingKind;
use crate::store::StoreName;

const ID_NAMESPACE: &str = "st:store:";
const USENET_SUFFIX: &str = "usenet";
const ACTION_SUFFIX: &str = "action";

/// A store catalog, addressed as `st:store:<code>` or `st:store:<code>:usenet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogId {
    pub store: StoreName,
    pub usenet: bool,
}

impl CatalogId {
    pub fn new(store: StoreName, usenet: bool) -> Self {
        Self { store, usenet }
    }

    pub fn parse(value: &str) -> Result<Self, CatalogIdError> {
        let unsupported = || CatalogIdError::Unsupported(value.to_string());

        let rest = value.strip_prefix(ID_NAMESPACE).ok_or_else(unsupported)?;
        let (code, suffix) = match rest.split_once(':') {
            Some((code, suffix)) => (code, Some(suffix)),
            None => (rest, None),
        };

        let store = StoreName::from_code(code).ok_or_else(unsupported)?;
        let usenet = match suffix {
            None => false,
            Some(USENET_SUFFIX) if store.supports_usenet() => true,
            Some(_) => return Err(unsupported()),
        };

        Ok(Self { store, usenet })
    }

    pub fn listing_kind(&self) -> ListingKind {
        if self.usenet {
            ListingKind::Usenet
        } else {
            ListingKind::Magnets
        }
    }

    pub fn catalog_id(&self) -> String {
        if self.usenet {
            format!("{ID_NAMESPACE}{}:{USENET_SUFFIX}", self.store.code())
        } else {
            format!("{ID_NAMESPACE}{}", self.store.code())
        }
    }

    /// Prefix for the ids of items listed in this catalog.
    pub fn item_prefix(&self) -> String {
        format!("{}:", self.catalog_id())
    }

    pub fn action_id(&self) -> String {
        format!("{ID_NAMESPACE}{}:{ACTION_SUFFIX}", self.store.code())
    }

    pub fn display_name(&self) -> String {
        if self.usenet {
            format!("Store | {} Usenet", self.store.display_name())
        } else {
            format!("Store | {}", self.store.display_name())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogIdError {
    #[error("unsupported catalog id: {0}")]
    Unsupported(String),
}
