use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::{
    dao::{
        hunt_store::PuzzleStore,
        models::{ALL_HUNTS, ChannelId, GuildId, PuzzleData, PuzzleKey},
        storage::StorageError,
        validation::validate_puzzle,
    },
    error::ServiceError,
};

/// Repository for puzzle records.
///
/// Fetched records are value copies: callers mutate a copy and commit it
/// back, and the last commit for a composite key wins.
#[derive(Clone)]
pub struct PuzzleDb {
    store: Arc<dyn PuzzleStore>,
}

impl PuzzleDb {
    /// Repository over the given backend.
    pub fn new(store: Arc<dyn PuzzleStore>) -> Self {
        Self { store }
    }

    /// Exact composite-key lookup.
    ///
    /// A lookup with a stale round (say, a cached category id from before the
    /// puzzle moved to the solved archive) legitimately misses; callers that
    /// do not need exactness fall back to [`Self::find_by_channel`].
    pub async fn get(&self, key: &PuzzleKey) -> Result<PuzzleData, ServiceError> {
        self.store
            .fetch(key)
            .await?
            .ok_or_else(|| ServiceError::MissingPuzzle(key.clone()))
    }

    /// All records for a guild; a `hunt_id` of [`ALL_HUNTS`] matches every
    /// hunt. The store guarantees no ordering; use
    /// [`PuzzleData::sort_by_round_start`] for round-grouped chronological
    /// order.
    pub async fn get_all(
        &self,
        guild_id: GuildId,
        hunt_id: &str,
    ) -> Result<Vec<PuzzleData>, ServiceError> {
        let mut puzzles = self.store.fetch_all(guild_id).await?;
        if hunt_id != ALL_HUNTS {
            puzzles.retain(|puzzle| puzzle.hunt_id == hunt_id);
        }
        Ok(puzzles)
    }

    /// Round-agnostic search for the record attached to a channel.
    pub async fn find_by_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        hunt_id: &str,
    ) -> Result<Option<PuzzleData>, ServiceError> {
        let puzzles = self.get_all(guild_id, hunt_id).await?;
        Ok(puzzles
            .into_iter()
            .find(|puzzle| puzzle.channel_id == channel_id))
    }

    /// Solved records ready for archival: solved at least `minutes` before
    /// `now` and not yet archived. Metas stay out unless `include_meta`, so
    /// they remain visible while their round wraps up.
    pub async fn get_solved_puzzles_to_archive(
        &self,
        guild_id: GuildId,
        now: OffsetDateTime,
        include_meta: bool,
        minutes: i64,
    ) -> Result<Vec<PuzzleData>, ServiceError> {
        let puzzles = self.get_all(guild_id, ALL_HUNTS).await?;
        let delay = Duration::minutes(minutes);
        Ok(puzzles
            .into_iter()
            .filter(|puzzle| {
                if puzzle.archive_time.is_some() || !puzzle.is_solved() {
                    return false;
                }
                if puzzle.is_meta() && !include_meta {
                    return false;
                }
                match puzzle.solve_time {
                    Some(solved) => now - solved >= delay,
                    None => false,
                }
            })
            .collect())
    }

    /// Validate and upsert by composite key.
    pub async fn commit(&self, puzzle: PuzzleData) -> Result<(), ServiceError> {
        validate_puzzle(&puzzle)?;
        Ok(self.store.upsert(puzzle).await?)
    }

    /// Remove the record stored under `key`.
    pub async fn delete(&self, key: &PuzzleKey) -> Result<(), ServiceError> {
        Ok(self.store.remove(key).await?)
    }

    /// Dump every record across all guilds as nested JSON
    /// (guild → hunt → round → channel → record), for backups.
    pub async fn aggregate_json(&self) -> Result<Value, ServiceError> {
        let puzzles = self.store.fetch_everything().await?;

        let mut tree: BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>> =
            BTreeMap::new();
        for puzzle in puzzles {
            let record = serde_json::to_value(&puzzle)
                .map_err(|source| StorageError::unavailable("failed to encode record", source))?;
            tree.entry(puzzle.guild_id.to_string())
                .or_default()
                .entry(puzzle.hunt_id.clone())
                .or_default()
                .entry(puzzle.round_id.to_string())
                .or_default()
                .insert(puzzle.channel_id.to_string(), record);
        }

        serde_json::to_value(tree)
            .map_err(|source| StorageError::unavailable("failed to encode dump", source))
            .map_err(Into::into)
    }

    /// Re-ingest an [`Self::aggregate_json`] dump, committing every record.
    /// Returns how many records were restored.
    pub async fn restore_aggregate(&self, dump: &Value) -> Result<usize, ServiceError> {
        let guilds = as_object(dump, "aggregate dump")?;
        let mut restored = 0usize;
        for hunts in guilds.values() {
            for rounds in as_object(hunts, "hunt level")?.values() {
                for records in as_object(rounds, "round level")?.values() {
                    for record in as_object(records, "channel level")?.values() {
                        let puzzle: PuzzleData =
                            serde_json::from_value(record.clone()).map_err(|err| {
                                ServiceError::InvalidInput(format!("malformed puzzle record: {err}"))
                            })?;
                        self.commit(puzzle).await?;
                        restored += 1;
                    }
                }
            }
        }
        Ok(restored)
    }
}

fn as_object<'a>(
    value: &'a Value,
    what: &str,
) -> Result<&'a serde_json::Map<String, Value>, ServiceError> {
    value
        .as_object()
        .ok_or_else(|| ServiceError::InvalidInput(format!("{what} must be a JSON object")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::hunt_store::memory::MemoryHuntStore;
    use crate::dao::models::RoundId;
    use time::macros::datetime;

    fn db() -> PuzzleDb {
        PuzzleDb::new(Arc::new(MemoryHuntStore::new()))
    }

    fn sample_puzzle(name: &str, channel_id: ChannelId) -> PuzzleData {
        let mut puzzle = PuzzleData::new(name, "Mystery Hunt", "emotions");
        puzzle.guild_id = 1;
        puzzle.channel_id = channel_id;
        puzzle.round_id = RoundId::Category(500);
        puzzle.hunt_id = "mh2026".to_string();
        puzzle
    }

    #[tokio::test]
    async fn commit_get_delete_round_trips() {
        let db = db();
        let puzzle = sample_puzzle("tollbooth", 700);
        let key = puzzle.key();

        db.commit(puzzle.clone()).await.unwrap();
        assert_eq!(db.get(&key).await.unwrap(), puzzle);

        db.delete(&key).await.unwrap();
        let err = db.get(&key).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingPuzzle(missing) if missing == key));
    }

    #[tokio::test]
    async fn lookup_with_stale_round_misses_but_relaxed_search_finds() {
        let db = db();
        let mut puzzle = sample_puzzle("tollbooth", 700);
        puzzle.round_id = RoundId::Solved;
        db.commit(puzzle.clone()).await.unwrap();

        let stale = PuzzleKey {
            round_id: RoundId::Category(500),
            ..puzzle.key()
        };
        assert!(matches!(
            db.get(&stale).await.unwrap_err(),
            ServiceError::MissingPuzzle(_)
        ));
        assert_eq!(
            db.find_by_channel(1, 700, "mh2026").await.unwrap(),
            Some(puzzle)
        );
    }

    #[tokio::test]
    async fn get_all_filters_by_hunt() {
        let db = db();
        let mut other = sample_puzzle("other", 701);
        other.hunt_id = "teammate_hunt".to_string();
        db.commit(sample_puzzle("tollbooth", 700)).await.unwrap();
        db.commit(other).await.unwrap();

        assert_eq!(db.get_all(1, ALL_HUNTS).await.unwrap().len(), 2);
        let filtered = db.get_all(1, "mh2026").await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "tollbooth");
    }

    #[tokio::test]
    async fn archive_query_applies_grace_window() {
        let db = db();
        let now = datetime!(2026-01-15 12:00 UTC);

        let mut old_solve = sample_puzzle("old", 700);
        old_solve.solution = "ANSWER".to_string();
        old_solve.solve_time = Some(now - Duration::minutes(10));

        let mut fresh_solve = sample_puzzle("fresh", 701);
        fresh_solve.solution = "ANSWER".to_string();
        fresh_solve.solve_time = Some(now - Duration::minutes(1));

        let mut never_solved = sample_puzzle("unsolved", 702);
        never_solved.solve_time = None;

        let mut already_archived = sample_puzzle("archived", 703);
        already_archived.solution = "ANSWER".to_string();
        already_archived.solve_time = Some(now - Duration::minutes(30));
        already_archived.archive_time = Some(now - Duration::minutes(5));

        for puzzle in [old_solve, fresh_solve, never_solved, already_archived] {
            db.commit(puzzle).await.unwrap();
        }

        let due = db
            .get_solved_puzzles_to_archive(1, now, false, 5)
            .await
            .unwrap();
        let names: Vec<&str> = due.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["old"]);
    }

    #[tokio::test]
    async fn metas_wait_for_include_meta() {
        let db = db();
        let now = datetime!(2026-01-15 12:00 UTC);

        let mut meta = sample_puzzle("meta", 700);
        meta.solution = "META ANSWER".to_string();
        meta.solve_time = Some(now - Duration::minutes(30));
        db.commit(meta).await.unwrap();

        assert!(
            db.get_solved_puzzles_to_archive(1, now, false, 5)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            db.get_solved_puzzles_to_archive(1, now, true, 5)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn aggregate_dump_restores_equal_records() {
        let db = db();
        let mut solved = sample_puzzle("solved", 701);
        solved.round_id = RoundId::Solved;
        db.commit(sample_puzzle("tollbooth", 700)).await.unwrap();
        db.commit(solved).await.unwrap();

        let dump = db.aggregate_json().await.unwrap();

        let restored_db = PuzzleDb::new(Arc::new(MemoryHuntStore::new()));
        assert_eq!(restored_db.restore_aggregate(&dump).await.unwrap(), 2);

        let mut original = db.get_all(1, ALL_HUNTS).await.unwrap();
        let mut restored = restored_db.get_all(1, ALL_HUNTS).await.unwrap();
        original.sort_by_key(|p| p.channel_id);
        restored.sort_by_key(|p| p.channel_id);
        assert_eq!(original, restored);
    }

    #[tokio::test]
    async fn commit_rejects_invalid_hunt_id() {
        let db = db();
        let mut puzzle = sample_puzzle("tollbooth", 700);
        puzzle.hunt_id = "Mystery Hunt".to_string();
        assert!(matches!(
            db.commit(puzzle).await.unwrap_err(),
            ServiceError::InvalidInput(_)
        ));
    }
}
