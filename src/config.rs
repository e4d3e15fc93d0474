//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::nexus_sync::NEXUS_REFRESH_PERIOD;

/// Default location on disk where the JSON configuration is looked for.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HUNT_NEXUS_CONFIG_PATH";
/// Data directory used when the configuration does not name one.
const DEFAULT_DATA_DIR: &str = "data";
/// Minutes a solved puzzle stays in place before it is eligible for archival.
const DEFAULT_ARCHIVE_DELAY_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Root directory of the JSON record store.
    pub data_dir: PathBuf,
    /// Period of the nexus synchronization task.
    pub sync_period: Duration,
    /// Grace window before a solved puzzle is archived.
    pub archive_delay_minutes: i64,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        data_dir = %config.data_dir.display(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sync_period: NEXUS_REFRESH_PERIOD,
            archive_delay_minutes: DEFAULT_ARCHIVE_DELAY_MINUTES,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    data_dir: Option<PathBuf>,
    sync_period_secs: Option<u64>,
    archive_delay_minutes: Option<i64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            sync_period: raw
                .sync_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_period),
            archive_delay_minutes: raw
                .archive_delay_minutes
                .unwrap_or(defaults.archive_delay_minutes),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
