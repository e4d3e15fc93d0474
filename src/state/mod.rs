//! Shared application state wiring the repositories together.

use std::sync::Arc;

use tokio::sync::watch;

use crate::dao::{
    hunt_store::{PuzzleStore, SettingsStore},
    puzzle::PuzzleDb,
    settings::SettingsDb,
};

/// Cheap-to-clone handle on the process-wide state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the repositories and readiness signal.
pub struct AppState {
    settings: SettingsDb,
    puzzles: PuzzleDb,
    ready: watch::Sender<bool>,
}

impl AppState {
    /// Build the state around injected store backends.
    ///
    /// Periodic tasks stay parked until [`Self::notify_ready`] fires.
    pub fn new(
        settings_store: Arc<dyn SettingsStore>,
        puzzle_store: Arc<dyn PuzzleStore>,
    ) -> SharedState {
        let (ready_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            settings: SettingsDb::new(settings_store),
            puzzles: PuzzleDb::new(puzzle_store),
            ready: ready_tx,
        })
    }

    /// Settings repository; the sole writer of the settings cache.
    pub fn settings(&self) -> &SettingsDb {
        &self.settings
    }

    /// Puzzle record repository.
    pub fn puzzles(&self) -> &PuzzleDb {
        &self.puzzles
    }

    /// Signal that the host chat connection is up, arming periodic tasks.
    pub fn notify_ready(&self) {
        let _ = self.ready.send(true);
    }

    /// Subscribe to the readiness flag.
    pub fn ready_watcher(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }
}
