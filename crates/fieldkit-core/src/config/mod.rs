//! Client configuration for the remote API and the sync engine.
//!
//! Values come from an optional JSON file, then environment overrides. The
//! access token is a secret and is redacted from `Debug` output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::SyncSettings;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_API_URL: &str = "FIELDKIT_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "FIELDKIT_ACCESS_TOKEN";
pub const ENV_OFFLINE: &str = "FIELDKIT_OFFLINE";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Treat the network as unreachable; mutations queue without dispatch
    #[serde(default)]
    pub offline: bool,
    /// Overrides the sync settings stored in the database when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSettings>,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            offline: false,
            sync: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("offline", &self.offline)
            .field("sync", &self.sync)
            .finish()
    }
}

impl ClientConfig {
    /// `<config dir>/fieldkit/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fieldkit").join(CONFIG_FILE_NAME))
    }

    /// Parse and normalize a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.normalized()
    }

    /// Load the config file.
    ///
    /// An explicit path must exist. The default path is optional and falls
    /// back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(Error::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        tracing::debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(&path)?;
        Self::from_json(&raw)
    }

    /// Load the config file, then apply process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        Self::load(path)?.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `FIELDKIT_*` overrides from `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_ACCESS_TOKEN)) {
            self.access_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_OFFLINE)) {
            self.offline = parse_flag(&raw).ok_or_else(|| {
                Error::Config(format!("{ENV_OFFLINE} must be true or false, got {raw}"))
            })?;
        }
        self.normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        self.api_base_url = normalize_text_option(self.api_base_url)
            .map(|url| normalize_http_url(&url, "api_base_url"))
            .transpose()?;
        self.access_token = normalize_text_option(self.access_token);
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The API base URL, or a config error naming how to set it.
    pub fn require_api_base_url(&self) -> Result<&str> {
        self.api_base_url.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "api_base_url is not configured (set it in {CONFIG_FILE_NAME} or {ENV_API_URL})"
            ))
        })
    }
}

/// Trim, require an http(s) scheme and drop trailing slashes.
pub fn normalize_http_url(raw: &str, field: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::Config(format!("{field} must not be empty")));
    }
    if !["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
    {
        return Err(Error::Config(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Trimmed value, or `None` when absent or blank.
fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetryPolicy;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn from_json_normalizes_values() {
        let config = ClientConfig::from_json(
            r#"{
              "api_base_url": " https://api.example.com/ ",
              "access_token": "   ",
              "sync": { "policy": "fail_fast" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.access_token, None);
        assert_eq!(config.request_timeout_secs, 15);
        let sync = config.sync.unwrap();
        assert_eq!(sync.policy, RetryPolicy::FailFast);
        assert_eq!(sync.max_retries, 3);
    }

    #[test]
    fn from_json_rejects_unknown_fields_and_bad_urls() {
        let error = ClientConfig::from_json(r#"{ "api_url": "https://x" }"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));

        let error =
            ClientConfig::from_json(r#"{ "api_base_url": "api.example.com" }"#).unwrap_err();
        assert!(error.to_string().contains("http://"));

        let error = ClientConfig::from_json(r#"{ "request_timeout_secs": 0 }"#).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = ClientConfig::from_json(r#"{ "api_base_url": "https://file.example.com" }"#)
            .unwrap()
            .with_env(env(&[
                (ENV_API_URL, "http://localhost:8080/"),
                (ENV_ACCESS_TOKEN, "secret-token"),
                (ENV_OFFLINE, "yes"),
            ]))
            .unwrap();

        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.access_token.as_deref(), Some("secret-token"));
        assert!(config.offline);
    }

    #[test]
    fn env_offline_must_be_a_flag() {
        let error = ClientConfig::default()
            .with_env(env(&[(ENV_OFFLINE, "sometimes")]))
            .unwrap_err();
        assert!(error.to_string().contains(ENV_OFFLINE));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "request_timeout_secs": 30, "offline": true }"#).unwrap();

        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.offline);

        let missing = dir.path().join("missing.json");
        assert!(ClientConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn require_api_base_url_reports_how_to_configure() {
        let error = ClientConfig::default().require_api_base_url().unwrap_err();
        assert!(error.to_string().contains(ENV_API_URL));
    }

    #[test]
    fn debug_redacts_access_token() {
        let config = ClientConfig {
            access_token: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
