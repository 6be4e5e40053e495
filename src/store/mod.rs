// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Local key-value storage with an in-memory fallback

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::{Result, VeriscopeError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// Durable key-value store (thread-safe wrapper).
///
/// The `try_*` methods touch the durable backend only and report its
/// failures. The plain `get`/`set`/`remove` methods never fail: on any
/// backend error they fall back to a process-lifetime in-memory map and
/// log a warning. Data that only ever reached the fallback is lost on
/// exit.
#[derive(Clone)]
pub struct KvStore {
    conn: Option<Arc<Mutex<Connection>>>,
    memory: Arc<Mutex<HashMap<String, String>>>,
}

impl KvStore {
    /// Open or create the backing database
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        match Self::open_backend(path.as_ref()) {
            Ok(conn) => Self {
                conn: Some(Arc::new(Mutex::new(conn))),
                memory: Arc::new(Mutex::new(HashMap::new())),
            },
            Err(e) => {
                warn!("Storage backend unavailable ({}), using memory only", e);
                Self {
                    conn: None,
                    memory: Arc::new(Mutex::new(HashMap::new())),
                }
            }
        }
    }

    /// Open an in-memory backend (for testing)
    pub fn in_memory() -> Self {
        let backend = Connection::open_in_memory().and_then(|conn| {
            conn.execute(SCHEMA, [])?;
            Ok(conn)
        });
        match backend {
            Ok(conn) => Self {
                conn: Some(Arc::new(Mutex::new(conn))),
                memory: Arc::new(Mutex::new(HashMap::new())),
            },
            Err(e) => {
                warn!("In-memory backend unavailable ({}), using map only", e);
                Self {
                    conn: None,
                    memory: Arc::new(Mutex::new(HashMap::new())),
                }
            }
        }
    }

    fn open_backend(path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        Ok(conn)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| VeriscopeError::StorageUnavailable("no durable backend".to_string()))?;
        conn.lock()
            .map_err(|_| VeriscopeError::StorageUnavailable("storage lock poisoned".to_string()))
    }

    /// Read a key from the durable backend only
    pub fn try_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| VeriscopeError::StorageUnavailable(e.to_string()))
    }

    /// Write a key to the durable backend only
    pub fn try_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map(|_| ())
        .map_err(|e| VeriscopeError::StorageUnavailable(e.to_string()))
    }

    /// Remove a key from the durable backend only
    pub fn try_remove(&self, key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(|e| VeriscopeError::StorageUnavailable(e.to_string()))
    }

    /// Read a key, serving from the in-memory map on backend failure
    pub fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Storage read failed, using memory fallback: {}", e);
                self.memory.lock().ok().and_then(|m| m.get(key).cloned())
            }
        }
    }

    /// Write a key, keeping the value in the in-memory map on backend failure
    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            warn!("Storage write failed, using memory fallback: {}", e);
            if let Ok(mut memory) = self.memory.lock() {
                memory.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Remove a key, clearing the in-memory copy on backend failure
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            warn!("Storage remove failed, using memory fallback: {}", e);
            if let Ok(mut memory) = self.memory.lock() {
                memory.remove(key);
            }
        }
    }
}
