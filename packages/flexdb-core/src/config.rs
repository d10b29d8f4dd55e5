//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store configuration shared by the catalog and sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the catalog file and per-database files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// SQLite busy timeout in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Pause between close and reopen during a connection reset, in milliseconds
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_reset_delay_ms() -> u64 {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout_ms(),
            reset_delay_ms: default_reset_delay_ms(),
        }
    }
}

impl StoreConfig {
    /// Returns the path of the physical file backing a logical database.
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.db"))
    }

    /// Returns the database file plus the sidecar artifacts SQLite may
    /// leave next to it.
    pub fn database_artifacts(&self, name: &str) -> Vec<PathBuf> {
        vec![
            self.data_dir.join(format!("{name}.db")),
            self.data_dir.join(format!("{name}.db-wal")),
            self.data_dir.join(format!("{name}.db-shm")),
            self.data_dir.join(format!("{name}.db-journal")),
        ]
    }

    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Reset pause as a [`Duration`].
    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}
