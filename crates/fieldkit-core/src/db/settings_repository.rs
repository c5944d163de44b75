//! Settings repository implementation

use crate::error::Result;
use crate::models::SyncSettings;
use libsql::Connection;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load sync settings from the database
    async fn load(&self) -> Result<SyncSettings>;

    /// Save sync settings to the database
    async fn save(&self, settings: &SyncSettings) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn load(&self) -> Result<SyncSettings> {
        let mut settings = SyncSettings::default();

        if let Some(value) = self.get_setting("sync.policy").await? {
            match value.parse() {
                Ok(policy) => settings.policy = policy,
                Err(error) => tracing::warn!("Ignoring stored sync.policy: {error}"),
            }
        }

        if let Some(value) = self.get_setting("sync.max_retries").await? {
            if let Ok(max_retries) = value.parse() {
                settings.max_retries = max_retries;
            }
        }

        if let Some(value) = self.get_setting("sync.backoff_base_ms").await? {
            if let Ok(backoff_base_ms) = value.parse() {
                settings.backoff_base_ms = backoff_base_ms;
            }
        }

        Ok(settings)
    }

    async fn save(&self, settings: &SyncSettings) -> Result<()> {
        self.set_setting("sync.policy", settings.policy.as_str())
            .await?;
        self.set_setting("sync.max_retries", &settings.max_retries.to_string())
            .await?;
        self.set_setting(
            "sync.backoff_base_ms",
            &settings.backoff_base_ms.to_string(),
        )
        .await?;
        Ok(())
    }
}

impl LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
