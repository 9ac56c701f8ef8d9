// Kubesage Engine — Interaction Store
// Durable state behind the learning loop: the append-only interaction log,
// per-chunk relevance scores and the indexed documentation corpus.
// SQLite via rusqlite, one connection behind a Mutex.
//
// Module layout:
//   schema        — idempotent migrations
//   interactions  — interaction log + chunk score accumulator
//   chunks        — doc chunk table, embeddings, cosine search

use std::path::{Path, PathBuf};

use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::atoms::error::EngineResult;

mod chunks;
mod interactions;
mod schema;

pub use chunks::{bytes_to_f32_vec, f32_vec_to_bytes};

/// Default on-disk location for the engine database.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kubesage")
        .join("kubesage.db")
}

/// Thread-safe database wrapper.
pub struct InteractionStore {
    /// The SQLite connection, protected by a Mutex.
    conn: Mutex<Connection>,
}

impl InteractionStore {
    /// Open (or create) the database at `path` and initialize tables.
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("[store] Opening interaction store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        schema::run_migrations(&conn)?;

        Ok(InteractionStore { conn: Mutex::new(conn) })
    }

    /// In-memory store with the full schema. Used by tests and by callers
    /// that want a throwaway session without touching disk.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(InteractionStore { conn: Mutex::new(conn) })
    }

    pub(crate) fn conn(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}
