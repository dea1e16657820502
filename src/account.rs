use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use thiserror::Error;

use crate::ids::CatalogId;
use crate::store::StoreName;

/// Store credentials carried in the addon url.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub stores: Vec<StoreCredential>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreCredential {
    #[serde(rename = "c")]
    pub code: String,
    #[serde(rename = "t")]
    pub token: String,
}

/// The account a catalog request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub store: StoreName,
    pub token: String,
    pub client_ip: Option<String>,
}

impl UserData {
    /// Decodes base64url (padding optional) JSON.
    pub fn decode(encoded: &str) -> Result<Self, AccountError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        if trimmed.is_empty() {
            return Err(AccountError::Missing);
        }
        let bytes = URL_SAFE_NO_PAD.decode(trimmed)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn configured_stores(&self) -> impl Iterator<Item = StoreName> + '_ {
        self.stores
            .iter()
            .filter(|credential| !credential.token.is_empty())
            .filter_map(|credential| StoreName::from_code(&credential.code))
    }

    pub fn resolve(
        &self,
        catalog: &CatalogId,
        client_ip: Option<String>,
    ) -> Result<AccountContext, AccountError> {
        let credential = self
            .stores
            .iter()
            .find(|credential| credential.code == catalog.store.code())
            .ok_or(AccountError::StoreNotConfigured(catalog.store.code()))?;

        if credential.token.is_empty() {
            return Err(AccountError::StoreNotConfigured(catalog.store.code()));
        }

        Ok(AccountContext {
            store: catalog.store,
            token: credential.token.clone(),
            client_ip,
        })
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("missing user data")]
    Missing,
    #[error("user data is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("user data is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store `{0}` is not configured for this account")]
    StoreNotConfigured(&'static str),
}
