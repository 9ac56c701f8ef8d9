// Kubesage Engine — Retrieval scoring
//
// A lightweight online re-ranking layer over retrieval: chunks historically
// associated with successful turns accumulate score above the 1.0 baseline
// and earn a place in the composed prompt; chunks associated with failures
// sink below the inclusion threshold and are retrieved but not injected.
// No model is retrained anywhere in this loop.

use log::debug;

use crate::atoms::constants::{
    SCORE_ALPHA, SCORE_FAILURE_TARGET, SCORE_INCLUSION_THRESHOLD, SCORE_MAX, SCORE_MIN,
    SCORE_SUCCESS_TARGET,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::DocChunk;
use crate::engine::store::InteractionStore;

// ── Score update rule ──────────────────────────────────────────────────

/// Bounded exponential moving average toward an outcome target:
/// `new = old + alpha * (target - old)`, clamped to [SCORE_MIN, SCORE_MAX].
/// Repeated successes converge on SCORE_SUCCESS_TARGET, repeated failures
/// on SCORE_FAILURE_TARGET.
pub fn updated_score(old: f64, success: bool) -> f64 {
    let target = if success { SCORE_SUCCESS_TARGET } else { SCORE_FAILURE_TARGET };
    (old + SCORE_ALPHA * (target - old)).clamp(SCORE_MIN, SCORE_MAX)
}

// ── Context composition ────────────────────────────────────────────────

/// Outcome of composing prompt context from retrieved chunks.
#[derive(Debug, Default)]
pub struct ComposedContext {
    /// Concatenated content of the chunks that passed the score threshold,
    /// in retrieval order.
    pub text: String,
    /// Ids of every retrieved chunk, included or not. All of them were
    /// considered, so all of them are charged with the turn's outcome.
    pub chunks_used: Vec<String>,
    /// Ids of the chunks whose content made it into `text`.
    pub chunks_included: Vec<String>,
}

/// Concatenate the content of chunks whose accumulated score exceeds the
/// inclusion threshold, preserving retrieval order. No re-ranking happens
/// here: the retrieval port owns ordering, this layer only gates inclusion.
pub fn compose_context(
    store: &InteractionStore,
    chunks: &[DocChunk],
) -> EngineResult<ComposedContext> {
    let mut composed = ComposedContext::default();
    let mut sections: Vec<String> = Vec::new();

    for chunk in chunks {
        let id = chunk.id();
        let score = store.chunk_score(&id)?;
        composed.chunks_used.push(id.clone());

        if score > SCORE_INCLUSION_THRESHOLD {
            sections.push(format!(
                "--- {} (lines {}-{}) ---\n{}",
                chunk.metadata.source,
                chunk.metadata.start_line,
                chunk.metadata.end_line,
                chunk.content.trim_end()
            ));
            composed.chunks_included.push(id);
        } else {
            debug!("[scoring] chunk {} below threshold (score {:.3}), excluded", id, score);
        }
    }

    composed.text = sections.join("\n\n");
    Ok(composed)
}
