use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    dao::{
        hunt_store::SettingsStore,
        models::{GuildId, GuildSettings},
        validation::validate_guild_settings,
    },
    error::ServiceError,
};

/// Repository for per-guild settings with a process-wide read-through cache.
///
/// The cache is written only here, and only after a durable write succeeded,
/// so it never shows a value that was not persisted. There is no
/// read-modify-write guard: concurrent commits for one guild are
/// last-write-wins, an accepted risk given mostly-sequential human edits.
#[derive(Clone)]
pub struct SettingsDb {
    store: Arc<dyn SettingsStore>,
    cache: Arc<DashMap<GuildId, GuildSettings>>,
}

impl SettingsDb {
    /// Repository over the given backend, starting with an empty cache.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Fetch settings from durable storage, refreshing the cache entry.
    ///
    /// Fails with [`ServiceError::SettingsNotFound`] when the guild has no
    /// record yet; whether to create a default is the caller's decision.
    pub async fn get(&self, guild_id: GuildId) -> Result<GuildSettings, ServiceError> {
        let settings = self
            .store
            .fetch(guild_id)
            .await?
            .ok_or(ServiceError::SettingsNotFound(guild_id))?;
        self.cache.insert(guild_id, settings.clone());
        Ok(settings)
    }

    /// Last successfully fetched or committed settings for the guild.
    ///
    /// Latency-sensitive read paths (per-message channel checks) use this to
    /// skip the storage round trip and tolerate slight staleness. A cache
    /// miss falls through to [`Self::get`] and populates the cache.
    pub async fn get_cached(&self, guild_id: GuildId) -> Result<GuildSettings, ServiceError> {
        if let Some(entry) = self.cache.get(&guild_id) {
            return Ok(entry.clone());
        }
        self.get(guild_id).await
    }

    /// Validate and persist the full settings record, then refresh the cache.
    pub async fn commit(&self, settings: GuildSettings) -> Result<(), ServiceError> {
        validate_guild_settings(&settings)?;
        self.store.persist(settings.clone()).await?;
        self.cache.insert(settings.guild_id, settings);
        Ok(())
    }

    /// Guilds with a stored settings record.
    pub async fn list_guilds(&self) -> Result<Vec<GuildId>, ServiceError> {
        Ok(self.store.list_guilds().await?)
    }
}
