// Database schema and migrations for the kubesage store.
// Called once at startup by InteractionStore::open() after WAL is enabled.
// Adding a new table or column: append an idempotent CREATE TABLE IF NOT
// EXISTS or ALTER TABLE … ADD COLUMN at the end of run_migrations() — never
// modify existing SQL to keep upgrade paths clean.

use rusqlite::Connection;

use crate::atoms::error::EngineResult;

pub(crate) fn run_migrations(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS interactions (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            response TEXT NOT NULL DEFAULT '',
            chunks_json TEXT NOT NULL DEFAULT '[]',
            context_tags TEXT NOT NULL DEFAULT '[]',
            success INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_interactions_created
            ON interactions(created_at DESC);

        CREATE TABLE IF NOT EXISTS chunk_scores (
            chunk_id TEXT PRIMARY KEY,
            score REAL NOT NULL DEFAULT 1.0,
            successes INTEGER NOT NULL DEFAULT 0,
            failures INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS doc_chunks (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_doc_chunks_source
            ON doc_chunks(source);
        ",
    )?;

    Ok(())
}
