// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements issued by one process are serialized through tokio-rusqlite's
//! single background thread. Other processes may open the same file; SQLite's
//! locking plus `busy_timeout` arbitrates between them.

use std::path::Path;
use std::time::Duration;

use atrium_config::model::StorageConfig;
use atrium_core::AtriumError;
use tracing::debug;

/// Connection tuning applied at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl From<&StorageConfig> for OpenOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

/// Handle to one SQLite database file.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` with default options.
    pub async fn open(path: &str) -> Result<Self, AtriumError> {
        Self::open_with(path, OpenOptions::default()).await
    }

    /// Open the database, apply PRAGMAs, and run pending migrations.
    pub async fn open_with(path: &str, options: OpenOptions) -> Result<Self, AtriumError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AtriumError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| AtriumError::Storage {
                source: Box::new(e),
            })?;

        let OpenOptions {
            wal_mode,
            busy_timeout,
        } = options;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(busy_timeout)?;
            if wal_mode {
                let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get(0)
                })?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => AtriumError::StoreUnavailable {
                    message: other.to_string(),
                },
            })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, waiting for queued calls to finish.
    pub async fn close(self) -> Result<(), AtriumError> {
        self.conn.close().await.map_err(|e| AtriumError::Storage {
            source: Box::new(e),
        })
    }
}

/// Map a tokio-rusqlite error onto the engine taxonomy.
///
/// Lock contention and a closed connection are transient; anything else is
/// an unexpected storage fault.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AtriumError {
    match e {
        tokio_rusqlite::Error::ConnectionClosed => AtriumError::StoreUnavailable {
            message: "database connection closed".to_string(),
        },
        tokio_rusqlite::Error::Error(inner) => map_sqlite_err(inner),
        other => AtriumError::Storage {
            source: Box::new(other),
        },
    }
}

/// Map a raw rusqlite error onto the engine taxonomy.
pub fn map_sqlite_err(e: rusqlite::Error) -> AtriumError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
            AtriumError::StoreUnavailable {
                message: e.to_string(),
            }
        }
        _ => AtriumError::Storage {
            source: Box::new(e),
        },
    }
}
