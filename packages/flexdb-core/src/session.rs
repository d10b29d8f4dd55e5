//! Session over the single active per-database handle.
//!
//! The session is an explicit context object owned by the caller; it only
//! represents "the selected database". Catalog operations never go
//! through it; they open their own short-lived connections.

use std::fs;
use std::thread;

use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::DbError;

/// The currently open database handle.
#[derive(Debug)]
struct ActiveDatabase {
    /// Logical database name the handle was opened for
    name: String,
    /// Open handle onto the database file
    conn: Connection,
}

/// Connection manager holding at most one open database handle.
///
/// States: closed (initial) → open(name) → closed.
#[derive(Debug)]
pub struct Session {
    config: StoreConfig,
    active: Option<ActiveDatabase>,
}

impl Session {
    /// Creates a closed session.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Opens a database by name, closing any previously open handle
    /// first. The physical file is created on first open.
    pub fn open(&mut self, name: &str) -> Result<(), DbError> {
        self.close();
        fs::create_dir_all(&self.config.data_dir)?;
        let conn = Connection::open(self.config.database_path(name))?;
        conn.busy_timeout(self.config.busy_timeout())?;
        self.active = Some(ActiveDatabase {
            name: name.to_string(),
            conn,
        });
        tracing::debug!("opened database {}", name);
        Ok(())
    }

    /// Closes the active handle, if any.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!("closed database {}", active.name);
        }
    }

    /// Recovery action for a stuck handle: closes the current handle,
    /// pauses for the configured delay so underlying locks can release,
    /// then reopens the previously active database. A no-op success when
    /// nothing was open.
    pub fn reset(&mut self) -> Result<(), DbError> {
        let name = self.active.as_ref().map(|a| a.name.clone());
        self.close();
        thread::sleep(self.config.reset_delay());
        match name {
            Some(name) => {
                self.open(&name)?;
                tracing::debug!("reset connection to {}", name);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Name of the currently open database, if any.
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    /// Whether a database is currently open.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Carries a database rename over to the tracked name. The open
    /// handle itself is left untouched.
    pub fn rename_active(&mut self, new: &str) {
        if let Some(active) = self.active.as_mut() {
            active.name = new.to_string();
        }
    }

    /// Probes the active handle with a trivial query.
    ///
    /// # Returns
    /// `Ok(true)` when a handle is open and answers, `Ok(false)` when the
    /// session is closed.
    pub fn ping(&self) -> Result<bool, DbError> {
        match &self.active {
            Some(active) => {
                active.conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
