use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::models::{GuildId, PuzzleData},
    services::scheduler::{self, TaskHandle},
    state::SharedState,
};

/// Default period between nexus refresh passes.
pub const NEXUS_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Failure reported by a dashboard updater.
#[derive(Debug, Error)]
#[error("nexus update failed for sheet `{sheet_id}`")]
pub struct NexusUpdateError {
    /// Sheet the update targeted.
    pub sheet_id: String,
    /// Underlying collaborator failure.
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl NexusUpdateError {
    /// Wrap a collaborator failure for `sheet_id`.
    pub fn new(sheet_id: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            source: Box::new(source),
        }
    }
}

/// Dashboard collaborator: idempotent upsert of puzzle rows into a sheet.
///
/// Implemented by the out-of-scope spreadsheet integration.
pub trait NexusUpdater: Send + Sync {
    /// Replace the sheet's puzzle rows with `puzzles`.
    fn update(
        &self,
        sheet_id: &str,
        puzzles: Vec<PuzzleData>,
    ) -> BoxFuture<'static, Result<(), NexusUpdateError>>;
}

/// Arm the periodic nexus refresh, gated on the app readiness signal.
pub fn spawn(state: SharedState, updater: Arc<dyn NexusUpdater>, period: Duration) -> TaskHandle {
    let ready = state.ready_watcher();
    scheduler::spawn_periodic("nexus-sync", period, ready, move || {
        refresh_all(state.clone(), updater.clone())
    })
}

/// One refresh pass: push every active hunt with a configured sheet.
///
/// Hunts are processed sequentially; a failure on one is logged and never
/// aborts the remaining hunts or the loop.
pub async fn refresh_all(state: SharedState, updater: Arc<dyn NexusUpdater>) {
    let guilds = match state.settings().list_guilds().await {
        Ok(guilds) => guilds,
        Err(err) => {
            warn!(error = %err, "unable to list guilds for nexus refresh");
            return;
        }
    };

    for guild_id in guilds {
        let settings = match state.settings().get_cached(guild_id).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(guild_id, error = %err, "unable to load settings for nexus refresh");
                continue;
            }
        };

        for (hunt_id, hunt) in &settings.hunt_settings {
            if hunt.drive_nexus_sheet_id.is_empty() || !hunt.is_active() {
                continue;
            }
            match refresh_hunt(&state, updater.as_ref(), guild_id, hunt_id, &hunt.drive_nexus_sheet_id)
                .await
            {
                Ok(count) => debug!(guild_id, hunt_id, count, "nexus sheet refreshed"),
                Err(err) => warn!(guild_id, hunt_id, error = %err, "nexus refresh failed for hunt"),
            }
        }
    }
}

async fn refresh_hunt(
    state: &SharedState,
    updater: &dyn NexusUpdater,
    guild_id: GuildId,
    hunt_id: &str,
    sheet_id: &str,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let puzzles = state.puzzles().get_all(guild_id, hunt_id).await?;
    let count = puzzles.len();
    updater.update(sheet_id, puzzles).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::hunt_store::memory::MemoryHuntStore;
    use crate::dao::models::{GuildSettings, HuntSettings, PuzzleData, RoundId};
    use crate::state::AppState;
    use std::collections::HashSet;
    use std::io;
    use std::sync::Mutex;
    use time::macros::datetime;
    use tokio::time::{advance, sleep};

    /// Updater stub recording the sheets it was asked to refresh.
    struct RecordingUpdater {
        calls: Arc<Mutex<Vec<String>>>,
        fail_sheets: HashSet<String>,
    }

    impl RecordingUpdater {
        fn new(fail_sheets: impl IntoIterator<Item = &'static str>) -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let updater = Arc::new(Self {
                calls: calls.clone(),
                fail_sheets: fail_sheets.into_iter().map(String::from).collect(),
            });
            (updater, calls)
        }
    }

    impl NexusUpdater for RecordingUpdater {
        fn update(
            &self,
            sheet_id: &str,
            _puzzles: Vec<PuzzleData>,
        ) -> BoxFuture<'static, Result<(), NexusUpdateError>> {
            let calls = self.calls.clone();
            let fail = self.fail_sheets.contains(sheet_id);
            let sheet_id = sheet_id.to_string();
            Box::pin(async move {
                calls.lock().unwrap().push(sheet_id.clone());
                if fail {
                    return Err(NexusUpdateError::new(
                        sheet_id,
                        io::Error::other("sheet rejected the update"),
                    ));
                }
                Ok(())
            })
        }
    }

    fn hunt(sheet_id: &str, ended: bool) -> HuntSettings {
        HuntSettings {
            drive_nexus_sheet_id: sheet_id.to_string(),
            end_time: ended.then(|| datetime!(2026-01-20 12:00 UTC)),
            ..HuntSettings::default()
        }
    }

    async fn seeded_state(hunts: Vec<(&str, HuntSettings)>) -> SharedState {
        let store = Arc::new(MemoryHuntStore::new());
        let state = AppState::new(store.clone(), store);

        let mut settings = GuildSettings::new(1);
        for (hunt_id, hunt) in hunts {
            settings.hunt_settings.insert(hunt_id.to_string(), hunt);
        }
        state.settings().commit(settings).await.unwrap();

        let mut puzzle = PuzzleData::new("tollbooth", "Mystery Hunt", "emotions");
        puzzle.guild_id = 1;
        puzzle.channel_id = 700;
        puzzle.round_id = RoundId::Category(500);
        puzzle.hunt_id = "active".to_string();
        state.puzzles().commit(puzzle).await.unwrap();

        state
    }

    #[tokio::test]
    async fn only_active_hunts_with_sheets_are_refreshed() {
        let state = seeded_state(vec![
            ("active", hunt("sheet-active", false)),
            ("ended", hunt("sheet-ended", true)),
            ("sheetless", hunt("", false)),
        ])
        .await;

        let (updater, calls) = RecordingUpdater::new([]);
        refresh_all(state, updater).await;

        assert_eq!(*calls.lock().unwrap(), vec!["sheet-active".to_string()]);
    }

    #[tokio::test]
    async fn one_failing_hunt_does_not_stop_the_next() {
        let state = seeded_state(vec![
            ("active", hunt("sheet-a", false)),
            ("second", hunt("sheet-b", false)),
        ])
        .await;

        let (updater, calls) = RecordingUpdater::new(["sheet-a"]);
        refresh_all(state, updater).await;

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["sheet-a".to_string(), "sheet-b".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_sync_waits_for_readiness() {
        let state = seeded_state(vec![("active", hunt("sheet-active", false))]).await;
        let (updater, calls) = RecordingUpdater::new([]);

        let handle = spawn(state.clone(), updater, NEXUS_REFRESH_PERIOD);
        advance(Duration::from_secs(600)).await;
        assert!(calls.lock().unwrap().is_empty());

        state.notify_ready();
        sleep(Duration::from_millis(1)).await;
        assert_eq!(*calls.lock().unwrap(), vec!["sheet-active".to_string()]);

        handle.shutdown().await;
    }
}
