use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::warn;

use crate::dao::{
    hunt_store::{PuzzleStore, SettingsStore},
    models::{GuildId, GuildSettings, PuzzleData, PuzzleKey},
    storage::StorageResult,
};

use super::{
    error::{JsonDaoError, JsonResult},
    models::{
        PUZZLE_PREFIX, RECORD_EXT, SETTINGS_PREFIX, parse_puzzle_doc_id, parse_settings_doc_id,
        puzzle_doc_id, settings_doc_id,
    },
};

/// Durable store backend keeping one pretty-printed JSON file per record.
#[derive(Clone)]
pub struct JsonHuntStore {
    root: Arc<PathBuf>,
}

impl JsonHuntStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> JsonResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| JsonDaoError::CreateDir {
                path: root.clone(),
                source,
            })?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    fn record_path(&self, doc_id: &str) -> PathBuf {
        self.root.join(format!("{doc_id}.{RECORD_EXT}"))
    }

    async fn read_document<T>(&self, doc_id: &str) -> JsonResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let path = self.record_path(doc_id);
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(JsonDaoError::ReadRecord { path, source }),
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|source| JsonDaoError::DecodeRecord { path, source })
    }

    async fn write_document<T>(&self, doc_id: &str, document: &T) -> JsonResult<()>
    where
        T: ?Sized + Serialize,
    {
        let path = self.record_path(doc_id);
        let payload =
            serde_json::to_vec_pretty(document).map_err(|source| JsonDaoError::EncodeRecord {
                path: path.clone(),
                source,
            })?;

        // Temp file plus rename keeps the record whole if the process dies
        // mid-write.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, payload)
            .await
            .map_err(|source| JsonDaoError::WriteRecord {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| JsonDaoError::WriteRecord { path, source })
    }

    async fn remove_document(&self, doc_id: &str) -> JsonResult<()> {
        let path = self.record_path(doc_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(JsonDaoError::RemoveRecord { path, source }),
        }
    }

    /// Document ids (file stems) currently present, filtered by prefix.
    async fn list_doc_ids(&self, prefix: &str) -> JsonResult<Vec<String>> {
        let list_err = |source| JsonDaoError::ListDir {
            path: self.root.as_ref().clone(),
            source,
        };

        let mut entries = fs::read_dir(self.root.as_ref()).await.map_err(list_err)?;
        let mut doc_ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem.starts_with(prefix) {
                doc_ids.push(stem.to_string());
            }
        }
        Ok(doc_ids)
    }

    /// Bulk-load puzzle records, optionally restricted to one guild.
    ///
    /// Files with unparsable names or contents are skipped with a warning so
    /// one corrupt record cannot take down every bulk query.
    async fn load_puzzles(&self, guild_filter: Option<GuildId>) -> StorageResult<Vec<PuzzleData>> {
        let doc_ids = self.list_doc_ids(PUZZLE_PREFIX).await?;
        let mut puzzles = Vec::new();
        for doc_id in doc_ids {
            let key = match parse_puzzle_doc_id(&doc_id) {
                Ok(key) => key,
                Err(err) => {
                    warn!(error = %err, doc_id, "skipping unrecognized puzzle document");
                    continue;
                }
            };
            if guild_filter.is_some_and(|guild_id| key.guild_id != guild_id) {
                continue;
            }
            match self.read_document::<PuzzleData>(&doc_id).await {
                Ok(Some(puzzle)) => puzzles.push(puzzle),
                Ok(None) => {}
                Err(err @ JsonDaoError::DecodeRecord { .. }) => {
                    warn!(error = %err, doc_id, "skipping undecodable puzzle document");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(puzzles)
    }
}

impl SettingsStore for JsonHuntStore {
    fn fetch(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Option<GuildSettings>>> {
        let store = self.clone();
        Box::pin(async move {
            let settings = store.read_document(&settings_doc_id(guild_id)).await?;
            Ok(settings)
        })
    }

    fn persist(&self, settings: GuildSettings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = settings_doc_id(settings.guild_id);
            store.write_document(&doc_id, &settings).await?;
            Ok(())
        })
    }

    fn list_guilds(&self) -> BoxFuture<'static, StorageResult<Vec<GuildId>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_ids = store.list_doc_ids(SETTINGS_PREFIX).await?;
            let mut guilds = Vec::new();
            for doc_id in doc_ids {
                match parse_settings_doc_id(&doc_id) {
                    Ok(guild_id) => guilds.push(guild_id),
                    Err(err) => {
                        warn!(error = %err, doc_id, "skipping unrecognized settings document");
                    }
                }
            }
            guilds.sort_unstable();
            Ok(guilds)
        })
    }
}

impl PuzzleStore for JsonHuntStore {
    fn fetch(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<Option<PuzzleData>>> {
        let store = self.clone();
        let doc_id = puzzle_doc_id(key);
        Box::pin(async move {
            let puzzle = store.read_document(&doc_id).await?;
            Ok(puzzle)
        })
    }

    fn upsert(&self, puzzle: PuzzleData) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = puzzle_doc_id(&puzzle.key());
            store.write_document(&doc_id, &puzzle).await?;
            Ok(())
        })
    }

    fn remove(&self, key: &PuzzleKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let doc_id = puzzle_doc_id(key);
        Box::pin(async move {
            store.remove_document(&doc_id).await?;
            Ok(())
        })
    }

    fn fetch_all(&self, guild_id: GuildId) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>> {
        let store = self.clone();
        Box::pin(async move { store.load_puzzles(Some(guild_id)).await })
    }

    fn fetch_everything(&self) -> BoxFuture<'static, StorageResult<Vec<PuzzleData>>> {
        let store = self.clone();
        Box::pin(async move { store.load_puzzles(None).await })
    }
}
