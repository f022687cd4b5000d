use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::sources::catalog::{CatalogSettings, DEFAULT_API_HOST, DEFAULT_BASE_URL, MAX_LIMIT};
use crate::sources::resolver::ResolutionSettings;

/// Upper bound for `CACHE_TTL`
const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    // Catálogo
    pub catalog_base_url: String,
    pub catalog_api_key: Option<String>,
    pub catalog_api_host: String,
    pub request_timeout: Duration,

    // Caché
    pub cache_ttl: Duration,
    pub cache_quota_bytes: Option<usize>,

    // Paths
    pub data_dir: PathBuf,

    // Límites
    pub songs_per_genre: usize,
    pub per_genre_cap: usize,
    pub search_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            // Catálogo
            catalog_base_url: var("CATALOG_BASE_URL").unwrap_or(defaults.catalog_base_url),
            catalog_api_key: var("CATALOG_API_KEY"),
            catalog_api_host: var("CATALOG_API_HOST").unwrap_or(defaults.catalog_api_host),
            request_timeout: match var("REQUEST_TIMEOUT") {
                Some(val) => humantime::parse_duration(&val).context("REQUEST_TIMEOUT")?,
                None => defaults.request_timeout,
            },

            // Caché
            cache_ttl: match var("CACHE_TTL") {
                Some(val) => humantime::parse_duration(&val).context("CACHE_TTL")?,
                None => defaults.cache_ttl,
            },
            cache_quota_bytes: match var("CACHE_QUOTA_BYTES") {
                Some(val) => Some(val.parse().context("CACHE_QUOTA_BYTES")?),
                None => None,
            },

            // Paths
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),

            // Límites
            songs_per_genre: match var("SONGS_PER_GENRE") {
                Some(val) => val.parse().context("SONGS_PER_GENRE")?,
                None => defaults.songs_per_genre,
            },
            per_genre_cap: match var("PER_GENRE_CAP") {
                Some(val) => val.parse().context("PER_GENRE_CAP")?,
                None => defaults.per_genre_cap,
            },
            search_limit: match var("SEARCH_LIMIT") {
                Some(val) => val.parse().context("SEARCH_LIMIT")?,
                None => defaults.search_limit,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The catalog base URL must parse as an absolute URL
    /// - Timeout must be non-zero
    /// - TTL must be non-zero and at most a year
    /// - Per-request limits and the per-genre cap must be between 1 and 50
    ///   (proxy maximum)
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.catalog_base_url)
            .with_context(|| format!("Invalid CATALOG_BASE_URL: {}", self.catalog_base_url))?;

        if self.request_timeout.is_zero() {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        if self.cache_ttl.is_zero() || self.cache_ttl > MAX_CACHE_TTL {
            anyhow::bail!(
                "Cache TTL must be between 1s and {}, got: {}",
                humantime::format_duration(MAX_CACHE_TTL),
                humantime::format_duration(self.cache_ttl)
            );
        }

        if self.songs_per_genre == 0 || self.songs_per_genre > MAX_LIMIT {
            anyhow::bail!("Songs per genre must be between 1 and {}, got: {}", MAX_LIMIT, self.songs_per_genre);
        }

        if self.search_limit == 0 || self.search_limit > MAX_LIMIT {
            anyhow::bail!("Search limit must be between 1 and {}, got: {}", MAX_LIMIT, self.search_limit);
        }

        if self.per_genre_cap == 0 || self.per_genre_cap > MAX_LIMIT {
            anyhow::bail!("Per-genre cap must be between 1 and {}, got: {}", MAX_LIMIT, self.per_genre_cap);
        }

        Ok(())
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            base_url: self.catalog_base_url.clone(),
            api_key: self.catalog_api_key.clone(),
            api_host: self.catalog_api_host.clone(),
            timeout: self.request_timeout,
        }
    }

    pub fn resolution_settings(&self) -> ResolutionSettings {
        ResolutionSettings {
            per_genre_cap: self.per_genre_cap,
            songs_per_genre: self.songs_per_genre,
        }
    }

    /// Offline mode when no API key is configured
    pub fn has_catalog(&self) -> bool {
        self.catalog_api_key.is_some()
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The API key is never printed.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Catalog: {} ({}), timeout {}\n  \
            Cache: TTL {}, quota {}, dir {}\n  \
            Limits: {} songs/genre fetched, {} shown, {} per search",
            self.catalog_base_url,
            if self.has_catalog() { "key configured" } else { "offline" },
            humantime::format_duration(self.request_timeout),
            humantime::format_duration(self.cache_ttl),
            self.cache_quota_bytes.map_or("none".to_string(), |q| format!("{} bytes", q)),
            self.data_dir.display(),
            self.songs_per_genre,
            self.per_genre_cap,
            self.search_limit,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_base_url: DEFAULT_BASE_URL.to_string(),
            catalog_api_key: None,
            catalog_api_host: DEFAULT_API_HOST.to_string(),
            request_timeout: Duration::from_secs(10),

            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_quota_bytes: None,

            data_dir: "./data".into(),

            songs_per_genre: 20,
            per_genre_cap: 5,
            search_limit: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_are_valid_and_offline() {
        let config = load(&[]).unwrap();
        assert!(!config.has_catalog());
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.per_genre_cap, 5);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CATALOG_API_KEY", "secret"),
            ("CACHE_TTL", "12h"),
            ("REQUEST_TIMEOUT", "2s 500ms"),
            ("SONGS_PER_GENRE", "30"),
            ("DATA_DIR", "/tmp/music"),
        ])
        .unwrap();

        assert!(config.has_catalog());
        assert_eq!(config.cache_ttl, Duration::from_secs(12 * 3600));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.songs_per_genre, 30);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/music"));
        assert!(!config.summary().contains("secret"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("SONGS_PER_GENRE", "51")]).is_err());
        assert!(load(&[("CACHE_TTL", "forever")]).is_err());
        assert!(load(&[("CATALOG_BASE_URL", "nope")]).is_err());
        assert!(load(&[("PER_GENRE_CAP", "0")]).is_err());
    }

    #[test]
    fn test_upper_bounds() {
        assert!(load(&[("PER_GENRE_CAP", "51")]).is_err());
        assert!(load(&[("PER_GENRE_CAP", "50")]).is_ok());
        assert!(load(&[("CACHE_TTL", "1000000years")]).is_err());
        assert!(load(&[("CACHE_TTL", "365days")]).is_ok());
    }

    #[test]
    fn test_blank_api_key_means_offline() {
        let config = load(&[("CATALOG_API_KEY", "   ")]).unwrap();
        assert!(!config.has_catalog());
    }
}
