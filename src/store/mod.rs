// src/store/mod.rs
//! The run-scoped DuckDB database every source is loaded into.

pub mod loader;

use std::{
    fs,
    path::{Path, PathBuf},
};

use duckdb::Connection;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};

pub use loader::load_table;

const STORE_FILE: &str = "tabmerge.duckdb";

/// Quote an identifier for DuckDB, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Exclusive handle on the transient store.
///
/// Dropping it closes the connection first and then deletes the backing
/// file, whichever way the run ends.
pub struct Store {
    conn: Connection,
    // Declared after `conn` so it drops after the connection is closed.
    artifacts: Artifacts,
}

impl Store {
    /// Open a store backed by a file in a fresh temporary directory.
    pub fn open_temp() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("tabmerge-")
            .tempdir()
            .map_err(|e| EtlError::Store {
                path: std::env::temp_dir(),
                reason: e.to_string(),
            })?;
        let path = dir.path().join(STORE_FILE);
        let conn = connect(&path)?;
        debug!(path = %path.display(), "opened temporary store");
        Ok(Self {
            conn,
            artifacts: Artifacts {
                path,
                scratch: Some(dir),
            },
        })
    }

    /// Open a store backed by `path`, replacing whatever file was there.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // start fresh, a leftover file from an aborted run would hold stale relations
        for stale in [path.clone(), wal_path(&path)] {
            if stale.exists() {
                warn!(path = %stale.display(), "removing leftover store file");
                fs::remove_file(&stale).map_err(|e| EtlError::Store {
                    path: stale.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        let conn = connect(&path)?;
        info!(path = %path.display(), "opened store");
        Ok(Self {
            conn,
            artifacts: Artifacts {
                path,
                scratch: None,
            },
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Location of the backing file (removed on drop).
    pub fn path(&self) -> &Path {
        &self.artifacts.path
    }
}

fn connect(path: &Path) -> Result<Connection> {
    Connection::open(path).map_err(|e| EtlError::Store {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn wal_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".wal");
    PathBuf::from(os)
}

struct Artifacts {
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        if self.scratch.is_some() {
            // TempDir removes the whole directory when it drops.
            return;
        }
        for file in [self.path.clone(), wal_path(&self.path)] {
            if let Err(e) = fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %file.display(), error = %e, "could not remove store file");
                }
            }
        }
        debug!(path = %self.path.display(), "store torn down");
    }
}
