//! Device-local sync settings

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How the sync engine reacts to a failed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Retry with exponential backoff, blocking the queue, then dead-letter
    #[default]
    Backoff,
    /// Abort the pass on the first failure, leaving the item in place
    FailFast,
}

impl RetryPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backoff => "backoff",
            Self::FailFast => "fail_fast",
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "backoff" => Ok(Self::Backoff),
            "fail_fast" => Ok(Self::FailFast),
            other => Err(Error::InvalidInput(format!("Unknown retry policy: {other}"))),
        }
    }
}

/// Sync engine tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Failure handling policy
    pub policy: RetryPolicy,
    /// Failed attempts allowed before an item is dead-lettered
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt
    pub backoff_base_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::Backoff,
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl SyncSettings {
    /// Backoff observed after a failure at `retry_count` previous failures:
    /// `base * 2^retry_count` (1s, 2s, 4s with the default base).
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = 1_u64.checked_shl(retry_count).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn without_backoff(mut self) -> Self {
        self.backoff_base_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = SyncSettings::default();
        assert_eq!(settings.policy, RetryPolicy::Backoff);
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn test_backoff_doubles() {
        let settings = SyncSettings::default();
        assert_eq!(settings.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(settings.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(settings.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(
            SyncSettings::default().without_backoff().backoff_delay(2),
            Duration::ZERO
        );
    }

    #[test]
    fn test_backoff_saturates() {
        let settings = SyncSettings::default();
        assert_eq!(
            settings.backoff_delay(200),
            Duration::from_millis(u64::MAX)
        );
    }

    #[test]
    fn test_retry_policy_parse() {
        assert_eq!("fail-fast".parse::<RetryPolicy>().unwrap(), RetryPolicy::FailFast);
        assert_eq!("BACKOFF".parse::<RetryPolicy>().unwrap(), RetryPolicy::Backoff);
        assert!("never".parse::<RetryPolicy>().is_err());
    }

    #[test]
    fn test_settings_json_defaults_missing_fields() {
        let settings: SyncSettings = serde_json::from_str(r#"{ "policy": "fail_fast" }"#).unwrap();
        assert_eq!(settings.policy, RetryPolicy::FailFast);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.backoff_base_ms, 1_000);
    }
}
