// Kubesage Engine — Interaction Recorder
// Closes the learning loop after each turn: persists one interaction
// record and moves every consulted chunk's score toward the turn's
// outcome. All of it is best-effort — a store failure is logged and the
// turn's response is returned regardless.

use std::sync::Arc;

use log::{debug, warn};

use crate::atoms::error::EngineError;
use crate::atoms::types::Interaction;
use crate::engine::store::InteractionStore;

pub struct InteractionRecorder {
    store: Arc<InteractionStore>,
}

impl InteractionRecorder {
    pub fn new(store: Arc<InteractionStore>) -> Self {
        InteractionRecorder { store }
    }

    /// Record one completed turn. Exactly one interaction row per call;
    /// chunk scores move once per consulted chunk. Never fails the caller.
    pub fn record_turn(
        &self,
        query: &str,
        response: &str,
        chunks_used: &[String],
        context_tags: &[String],
        success: bool,
    ) {
        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            response: response.to_string(),
            chunks_used: chunks_used.to_vec(),
            context_tags: context_tags.to_vec(),
            success,
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        if let Err(e) = self.store.record_interaction(&interaction) {
            let e = EngineError::Recording(e.to_string());
            warn!("[recorder] {} — turn response unaffected", e);
            return;
        }
        debug!(
            "[recorder] recorded interaction {} success={} chunks={}",
            &interaction.id[..8],
            success,
            chunks_used.len()
        );

        for chunk_id in chunks_used {
            match self.store.update_chunk_score(chunk_id, success) {
                Ok(score) => debug!("[recorder] {} → {:.3}", chunk_id, score),
                Err(e) => warn!("[recorder] score update failed for {}: {}", chunk_id, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_one_interaction_and_moves_scores() {
        let store = Arc::new(InteractionStore::open_in_memory().unwrap());
        let recorder = InteractionRecorder::new(store.clone());
        let chunks = vec!["a.md:0-39".to_string(), "b.md:0-39".to_string()];

        recorder.record_turn("list pods", "3 pods", &chunks, &["cli".into()], true);

        assert_eq!(store.interaction_count().unwrap(), 1);
        assert!(store.chunk_score("a.md:0-39").unwrap() > 1.0);
        assert!(store.chunk_score("b.md:0-39").unwrap() > 1.0);
    }

    #[test]
    fn failure_lowers_scores() {
        let store = Arc::new(InteractionStore::open_in_memory().unwrap());
        let recorder = InteractionRecorder::new(store.clone());

        recorder.record_turn("scale widget", "error", &["a.md:0-39".into()], &[], false);
        assert!(store.chunk_score("a.md:0-39").unwrap() < 1.0);
    }

    #[test]
    fn repeated_outcomes_accumulate() {
        let store = Arc::new(InteractionStore::open_in_memory().unwrap());
        let recorder = InteractionRecorder::new(store.clone());
        let chunks = vec!["a.md:0-39".to_string()];

        recorder.record_turn("q1", "r1", &chunks, &[], true);
        let after_one = store.chunk_score("a.md:0-39").unwrap();
        recorder.record_turn("q2", "r2", &chunks, &[], true);
        let after_two = store.chunk_score("a.md:0-39").unwrap();

        assert!(after_two > after_one);
        assert_eq!(store.interaction_count().unwrap(), 2);
    }
}
