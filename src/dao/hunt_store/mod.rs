/// Durable JSON-file backend.
pub mod json;
/// In-memory backend for tests and storage-less operation.
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::models::{GuildId, GuildSettings, PuzzleData, PuzzleKey};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for per-guild settings.
pub trait SettingsStore: Send + Sync {
    /// Fetch the settings record for a guild, if one exists.
    fn fetch(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Option<GuildSettings>>>;
    /// Persist the full settings record, replacing any previous one.
    fn persist(&self, settings: GuildSettings) -> BoxFuture<'static, StorageResult<()>>;
    /// Guilds that have a stored settings record.
    fn list_guilds(&self) -> BoxFuture<'static, StorageResult<Vec<GuildId>>>;
}

/// Abstraction over the persistence layer for puzzle records.
pub trait PuzzleStore: Send + Sync {
    /// Exact composite-key fetch.
    fn fetch(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<Option<PuzzleData>>>;
    /// Insert or replace the record stored under the puzzle's key.
    fn upsert(&self, puzzle: PuzzleData) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the record stored under `key`, if any.
    fn remove(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<()>>;
    /// Every record stored for a guild, in no particular order.
    fn fetch_all(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>>;
    /// Every record across all guilds, for export.
    fn fetch_everything(&self) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>>;
}
