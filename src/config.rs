use std::{env, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use reqwest::Url;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub store_base_url: Url,
    pub store_timeout: Duration,
    pub index_base_url: Option<Url>,
    pub index_timeout: Duration,
    pub poster_base_url: Url,
    pub catalog: CatalogSettings,
}

/// Tunables for the listing fetch loop, the snapshot cache, page slicing and poster lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogSettings {
    pub cache_lifetime: Duration,
    pub fetch_page_size: usize,
    pub fetch_max_items: usize,
    pub fetch_delay: Duration,
    pub page_size: usize,
    pub enrich_timeout: Duration,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            cache_lifetime: Duration::from_secs(600),
            fetch_page_size: 500,
            fetch_max_items: 2000,
            fetch_delay: Duration::from_secs(1),
            page_size: 100,
            enrich_timeout: Duration::from_secs(3),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("STORECAT_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("STORECAT_PORT").unwrap_or_else(|| "7070".to_string());
        let port = port
            .trim()
            .parse::<u16>()
            .context("STORECAT_PORT must be a valid u16 integer")?;
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .context("failed to parse socket address from STORECAT_HOST and STORECAT_PORT")?;

        let raw_store_base_url = lookup("STORECAT_STORE_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8080/".to_string());
        let store_base_url = parse_root_url(&raw_store_base_url, "STORECAT_STORE_BASE_URL")?;

        let index_base_url = lookup("STORECAT_INDEX_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .map(|value| parse_root_url(&value, "STORECAT_INDEX_BASE_URL"))
            .transpose()?;

        let raw_poster_base_url = lookup("STORECAT_POSTER_BASE_URL")
            .unwrap_or_else(|| "https://images.metahub.space/poster/small/".to_string());
        let poster_base_url = parse_root_url(&raw_poster_base_url, "STORECAT_POSTER_BASE_URL")?;

        let number = |key: &str| lookup(key).and_then(|value| nonzero::<u64>(&value));

        let timeout_secs = number("STORECAT_STORE_TIMEOUT_SECS").unwrap_or(30);
        let store_timeout = Duration::from_secs(timeout_secs);
        let index_timeout =
            Duration::from_secs(number("STORECAT_INDEX_TIMEOUT_SECS").unwrap_or(timeout_secs));

        let defaults = CatalogSettings::default();
        let count = |key: &str, default: usize| {
            lookup(key)
                .and_then(|value| nonzero::<usize>(&value))
                .unwrap_or(default)
        };
        let catalog = CatalogSettings {
            cache_lifetime: number("STORECAT_CACHE_LIFETIME_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_lifetime),
            fetch_page_size: count("STORECAT_FETCH_PAGE_SIZE", defaults.fetch_page_size),
            fetch_max_items: count("STORECAT_FETCH_MAX_ITEMS", defaults.fetch_max_items),
            fetch_delay: number("STORECAT_FETCH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_delay),
            page_size: count("STORECAT_CATALOG_PAGE_SIZE", defaults.page_size),
            enrich_timeout: number("STORECAT_ENRICH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.enrich_timeout),
        };

        Ok(Self {
            listen_addr,
            store_base_url,
            store_timeout,
            index_base_url,
            index_timeout,
            poster_base_url,
            catalog,
        })
    }
}

// Zero is treated like an unset value.
fn nonzero<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value != T::default())
}

fn parse_root_url(value: &str, label: &str) -> Result<Url> {
    let mut normalized = value.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("{label} must be a valid URL"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn root_urls_gain_a_trailing_slash() {
        let url = parse_root_url(" http://gateway.local/api ", "TEST").unwrap();
        assert_eq!(url.as_str(), "http://gateway.local/api/");
        assert_eq!(
            url.join("v0/store/magnets").unwrap().as_str(),
            "http://gateway.local/api/v0/store/magnets"
        );
    }

    #[test]
    fn invalid_root_url_is_reported() {
        let err = parse_root_url("not a url", "STORECAT_STORE_BASE_URL").unwrap_err();
        assert!(err.to_string().contains("STORECAT_STORE_BASE_URL"));
    }

    #[test]
    fn default_settings_match_reference_policy() {
        let settings = CatalogSettings::default();
        assert_eq!(settings.cache_lifetime, Duration::from_secs(600));
        assert_eq!(settings.fetch_page_size, 500);
        assert_eq!(settings.fetch_max_items, 2000);
        assert_eq!(settings.fetch_delay, Duration::from_secs(1));
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.enrich_timeout, Duration::from_secs(3));
    }

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:7070".parse().unwrap());
        assert_eq!(config.store_base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.store_timeout, Duration::from_secs(30));
        assert_eq!(config.index_base_url, None);
        assert_eq!(config.index_timeout, Duration::from_secs(30));
        assert_eq!(
            config.poster_base_url.as_str(),
            "https://images.metahub.space/poster/small/"
        );
        assert_eq!(config.catalog, CatalogSettings::default());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("STORECAT_HOST", "127.0.0.1"),
            ("STORECAT_PORT", "9000"),
            ("STORECAT_INDEX_BASE_URL", "http://index.local/api"),
            ("STORECAT_STORE_TIMEOUT_SECS", "12"),
            ("STORECAT_CACHE_LIFETIME_SECS", "60"),
            ("STORECAT_FETCH_PAGE_SIZE", "250"),
            ("STORECAT_FETCH_MAX_ITEMS", "1000"),
            ("STORECAT_FETCH_DELAY_MS", "250"),
            ("STORECAT_CATALOG_PAGE_SIZE", "50"),
            ("STORECAT_ENRICH_TIMEOUT_MS", "1500"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.index_base_url.map(String::from).as_deref(),
            Some("http://index.local/api/")
        );
        assert_eq!(config.store_timeout, Duration::from_secs(12));
        assert_eq!(config.index_timeout, Duration::from_secs(12));
        assert_eq!(
            config.catalog,
            CatalogSettings {
                cache_lifetime: Duration::from_secs(60),
                fetch_page_size: 250,
                fetch_max_items: 1000,
                fetch_delay: Duration::from_millis(250),
                page_size: 50,
                enrich_timeout: Duration::from_millis(1500),
            }
        );
    }

    #[test]
    fn zero_and_invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("STORECAT_STORE_TIMEOUT_SECS", "0"),
            ("STORECAT_CACHE_LIFETIME_SECS", "soon"),
            ("STORECAT_FETCH_PAGE_SIZE", "0"),
            ("STORECAT_FETCH_DELAY_MS", "0"),
            ("STORECAT_CATALOG_PAGE_SIZE", "-5"),
            ("STORECAT_ENRICH_TIMEOUT_MS", "0"),
        ])
        .unwrap();

        assert_eq!(config.store_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog, CatalogSettings::default());
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = config_from(&[("STORECAT_PORT", "70000")]).unwrap_err();
        assert!(err.to_string().contains("STORECAT_PORT"));
    }
}
