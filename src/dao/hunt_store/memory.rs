use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    hunt_store::{PuzzleStore, SettingsStore},
    models::{GuildId, GuildSettings, PuzzleData, PuzzleKey},
    storage::StorageResult,
};

/// Infallible in-memory backend implementing both store traits.
///
/// Tests run against it directly; it also serves as the swap-in when no data
/// directory is configured.
#[derive(Clone, Default)]
pub struct MemoryHuntStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    settings: DashMap<GuildId, GuildSettings>,
    puzzles: DashMap<PuzzleKey, PuzzleData>,
}

impl MemoryHuntStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryHuntStore {
    fn fetch(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Option<GuildSettings>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.settings.get(&guild_id).map(|entry| entry.clone())) })
    }

    fn persist(&self, settings: GuildSettings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.settings.insert(settings.guild_id, settings);
            Ok(())
        })
    }

    fn list_guilds(&self) -> BoxFuture<'static, StorageResult<Vec<GuildId>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guilds: Vec<GuildId> =
                store.inner.settings.iter().map(|entry| *entry.key()).collect();
            guilds.sort_unstable();
            Ok(guilds)
        })
    }
}

impl PuzzleStore for MemoryHuntStore {
    fn fetch(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<Option<PuzzleData>>> {
        let store = self.clone();
        let key = key.clone();
        Box::pin(async move { Ok(store.inner.puzzles.get(&key).map(|entry| entry.clone())) })
    }

    fn upsert(&self, puzzle: PuzzleData) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.puzzles.insert(puzzle.key(), puzzle);
            Ok(())
        })
    }

    fn remove(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.clone();
        Box::pin(async move {
            store.inner.puzzles.remove(&key);
            Ok(())
        })
    }

    fn fetch_all(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .puzzles
                .iter()
                .filter(|entry| entry.key().guild_id == guild_id)
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn fetch_everything(&self) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .puzzles
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }
}
