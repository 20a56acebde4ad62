//! Configuration Module
//!
//! Cache options with defaults, a partial overlay for shallow merging, and
//! loading from environment variables or JSON.

use std::env;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Default TTL in seconds for entries stored without an explicit TTL.
pub const DEFAULT_TTL: u64 = 6000;

/// Default interval in seconds between background sweeps.
pub const DEFAULT_CHECK_INTERVAL: u64 = 600;

/// Default key limit (0 = unlimited).
pub const DEFAULT_MAX_KEYS: usize = 0;

/// Resolved cache options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL in seconds applied when `set` receives no TTL (0 = never expires)
    pub default_ttl: u64,
    /// Seconds between background sweeps
    pub check_interval: u64,
    /// Maximum number of distinct keys (0 = unlimited)
    pub max_keys: usize,
}

/// Partial options. Unset fields keep the value they are merged onto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheOptionsOverlay {
    #[serde(default, alias = "defaultTTL")]
    pub default_ttl: Option<u64>,
    #[serde(default)]
    pub check_interval: Option<u64>,
    #[serde(default)]
    pub max_keys: Option<usize>,
}

impl CacheOptions {
    /// Shallow-merges `overlay` onto these options.
    pub fn overlay(&self, overlay: &CacheOptionsOverlay) -> Self {
        Self {
            default_ttl: overlay.default_ttl.unwrap_or(self.default_ttl),
            check_interval: overlay.check_interval.unwrap_or(self.check_interval),
            max_keys: overlay.max_keys.unwrap_or(self.max_keys),
        }
    }

    /// Parses a JSON overlay such as `{"maxKeys": 2}` and merges it onto the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let overlay: CacheOptionsOverlay =
            serde_json::from_str(json).map_err(|e| CacheError::InvalidOptions(e.to_string()))?;
        let options = Self::default().overlay(&overlay);
        options.validate()?;
        Ok(options)
    }

    /// Creates options by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 6000)
    /// - `CACHE_CHECK_INTERVAL` - Sweep frequency in seconds (default: 600)
    /// - `CACHE_MAX_KEYS` - Maximum distinct keys, 0 = unlimited (default: 0)
    pub fn from_env() -> Self {
        let overlay = CacheOptionsOverlay {
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok()),
            check_interval: env::var("CACHE_CHECK_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|interval| *interval > 0),
            max_keys: env::var("CACHE_MAX_KEYS")
                .ok()
                .and_then(|v| v.parse().ok()),
        };
        Self::default().overlay(&overlay)
    }

    /// Rejects options the sweep scheduler cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            return Err(CacheError::InvalidOptions(
                "check_interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }
}

impl From<CacheOptionsOverlay> for CacheOptions {
    fn from(overlay: CacheOptionsOverlay) -> Self {
        Self::default().overlay(&overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CacheOptions::default();
        assert_eq!(options.default_ttl, 6000);
        assert_eq!(options.check_interval, 600);
        assert_eq!(options.max_keys, 0);
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let overlay = CacheOptionsOverlay {
            max_keys: Some(2),
            ..Default::default()
        };
        let options = CacheOptions::default().overlay(&overlay);
        assert_eq!(options.max_keys, 2);
        assert_eq!(options.default_ttl, DEFAULT_TTL);
        assert_eq!(options.check_interval, DEFAULT_CHECK_INTERVAL);
    }

    #[test]
    fn test_from_json_overlay() {
        let options = CacheOptions::from_json(r#"{"defaultTTL": 30, "checkInterval": 5}"#).unwrap();
        assert_eq!(options.default_ttl, 30);
        assert_eq!(options.check_interval, 5);
        assert_eq!(options.max_keys, 0);

        let options = CacheOptions::from_json("{}").unwrap();
        assert_eq!(options, CacheOptions::default());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            CacheOptions::from_json(r#"{"maxKeys": "two"}"#),
            Err(CacheError::InvalidOptions(_))
        ));
        assert!(matches!(
            CacheOptions::from_json(r#"{"checkInterval": 0}"#),
            Err(CacheError::InvalidOptions(_))
        ));
        assert!(matches!(
            CacheOptions::from_json(r#"{"unknown": 1}"#),
            Err(CacheError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_options_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_CHECK_INTERVAL");
        env::remove_var("CACHE_MAX_KEYS");

        let options = CacheOptions::from_env();
        assert_eq!(options, CacheOptions::default());
    }
}
