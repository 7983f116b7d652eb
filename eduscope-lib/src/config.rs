use log::warn;
use url::Url;

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "EDUSCOPE_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

pub fn init() {
    dotenv::dotenv().ok();
}

/**
 * Get an environment variable or a default value
 *
 * # Arguments
 * @param key: &str - The environment variable key
 * @param default: &str - The default value
 *
 * # Returns
 * @return String - The value of the environment variable or the default value
 */
pub fn get_env_var_or_default(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) => val,
        Err(_) => {
            warn!("{} not set, using default value: {}", key, default);
            default.to_string()
        }
    }
}

/// Location of the admissions REST API.
///
/// The base is always stored with a trailing `/` so resource paths can be
/// appended without producing `//` or dropping the last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(base: &str) -> Result<Self, ConfigError> {
        let trimmed = base.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", trimmed, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(trimmed.to_string()));
        }
        Ok(Self { base_url })
    }

    /// Reads the base location from `EDUSCOPE_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&get_env_var_or_default(API_URL_ENV, DEFAULT_API_URL))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resource URL relative to the API root, e.g. `Application/7/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turns a stored attachment value into something fetchable. Absolute
    /// URLs are returned untouched, anything else is prefixed with the API root.
    pub fn resolve_attachment_url(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return Some(value.to_string());
        }
        Some(self.endpoint(value))
    }
}
