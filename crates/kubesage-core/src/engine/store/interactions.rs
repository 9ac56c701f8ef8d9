// Interaction log and chunk score accumulator.
// Interactions are append-only; scores are the one mutable surface of the
// learning loop and move by the bounded EMA rule in engine::scoring.

use rusqlite::params;

use super::InteractionStore;
use crate::atoms::constants::SCORE_BASELINE;
use crate::atoms::error::EngineResult;
use crate::atoms::types::Interaction;
use crate::engine::scoring::updated_score;

impl InteractionStore {
    // ── Interaction log ────────────────────────────────────────────────

    /// Append one interaction record. Never updates an existing row.
    pub fn record_interaction(&self, interaction: &Interaction) -> EngineResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO interactions (id, query, response, chunks_json, context_tags, success, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                interaction.id,
                interaction.query,
                interaction.response,
                serde_json::to_string(&interaction.chunks_used)?,
                serde_json::to_string(&interaction.context_tags)?,
                interaction.success as i32,
                interaction.created_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent interactions, newest first.
    pub fn recent_interactions(&self, limit: usize) -> EngineResult<Vec<Interaction>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, query, response, chunks_json, context_tags, success, created_at
             FROM interactions ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let chunks_json: String = row.get(3)?;
                let tags_json: String = row.get(4)?;
                let success: i32 = row.get(5)?;
                Ok(Interaction {
                    id: row.get(0)?,
                    query: row.get(1)?,
                    response: row.get(2)?,
                    chunks_used: serde_json::from_str(&chunks_json).unwrap_or_default(),
                    context_tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    success: success != 0,
                    created_at: row.get(6)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn interaction_count(&self) -> EngineResult<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM interactions", [], |r| r.get(0))?;
        Ok(count)
    }

    // ── Chunk scores ───────────────────────────────────────────────────

    /// Accumulated relevance score for a chunk. An id never referenced by a
    /// recorded interaction reads as the neutral baseline (1.0).
    pub fn chunk_score(&self, chunk_id: &str) -> EngineResult<f64> {
        let conn = self.conn();
        let score = conn
            .query_row(
                "SELECT score FROM chunk_scores WHERE chunk_id = ?1",
                params![chunk_id],
                |r| r.get::<_, f64>(0),
            )
            .unwrap_or(SCORE_BASELINE);
        Ok(score)
    }

    /// Move a chunk's score one EMA step toward the outcome target and bump
    /// the matching outcome counter. Creates the row at baseline first if
    /// the chunk has never been scored.
    pub fn update_chunk_score(&self, chunk_id: &str, success: bool) -> EngineResult<f64> {
        let conn = self.conn();
        let old: f64 = conn
            .query_row(
                "SELECT score FROM chunk_scores WHERE chunk_id = ?1",
                params![chunk_id],
                |r| r.get(0),
            )
            .unwrap_or(SCORE_BASELINE);

        let new = updated_score(old, success);
        let (s, f) = if success { (1, 0) } else { (0, 1) };

        conn.execute(
            "INSERT INTO chunk_scores (chunk_id, score, successes, failures, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))
             ON CONFLICT(chunk_id) DO UPDATE SET
                score = ?2,
                successes = successes + ?3,
                failures = failures + ?4,
                updated_at = datetime('now')",
            params![chunk_id, new, s, f],
        )?;

        Ok(new)
    }
}
