// Kubesage Engine — Cluster Agent
// The per-turn pipeline, owned by one session:
//   query → context window → parser → dispatcher → recorder → memory.
// Runs synchronously on the calling task; the only detached work is what
// streaming handlers spawn behind their readiness signal.

use std::sync::Arc;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::atoms::constants::CONTEXT_WINDOW_TURNS;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{CompletionPort, RetrievalPort};
use crate::atoms::types::{
    ConversationTurn, ParamValue, ResourceKind, SessionContext, TaskParams, TaskResult,
};
use crate::engine::dispatcher::{normalize_resource_type, TaskDispatcher};
use crate::engine::memory::ConversationMemory;
use crate::engine::parser::QueryParser;
use crate::engine::recorder::InteractionRecorder;
use crate::engine::store::InteractionStore;

pub struct ClusterAgent {
    parser: QueryParser,
    dispatcher: TaskDispatcher,
    recorder: InteractionRecorder,
    memory: ConversationMemory,
    session: SessionContext,
}

impl ClusterAgent {
    pub fn new(
        provider: Arc<dyn CompletionPort>,
        retriever: Arc<dyn RetrievalPort>,
        store: Arc<InteractionStore>,
        dispatcher: TaskDispatcher,
        session: SessionContext,
    ) -> Self {
        ClusterAgent {
            parser: QueryParser::new(provider, retriever, store.clone()),
            recorder: InteractionRecorder::new(store),
            dispatcher,
            memory: ConversationMemory::new(),
            session,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Process one turn. Every non-cancelled turn appends exactly one
    /// conversation turn; every non-cancelled turn that touched retrieval
    /// or a handler records exactly one interaction. The greeting fast
    /// path records none — nothing was retrieved, so there is nothing for
    /// the learning loop to credit.
    pub async fn process_query(
        &mut self,
        query: &str,
        context_tags: &[String],
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        info!("[agent] turn: '{}'", &query[..query.len().min(120)]);

        let window = self.memory.context_window(CONTEXT_WINDOW_TURNS);
        let attempt = self.parser.parse_query(query, window, &self.session, cancel).await;

        let params = match attempt.outcome {
            Ok(params) => params,
            Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
            Err(e) => {
                let response = format!("I couldn't act on that: {}", e);
                self.recorder.record_turn(
                    query,
                    &response,
                    &attempt.chunks_used,
                    context_tags,
                    false,
                );
                self.append_turn(query, &response, TaskParams::default());
                return Err(e);
            }
        };

        // Conversational / help turns end here — no handler involved.
        if attempt.fast_path {
            let response = self.greeting_response();
            self.append_turn(query, &response, params);
            return Ok(TaskResult::ok(response));
        }
        if params.is_conversational() {
            let response =
                conversational_response(&params, attempt.raw_response.as_deref().unwrap_or(""));
            self.recorder.record_turn(query, &response, &attempt.chunks_used, context_tags, true);
            self.append_turn(query, &response, params);
            return Ok(TaskResult::ok(response));
        }
        if params.is_help() {
            let response = help_text();
            self.recorder.record_turn(query, &response, &attempt.chunks_used, context_tags, true);
            self.append_turn(query, &response, params);
            return Ok(TaskResult::ok(response));
        }

        match self.dispatcher.dispatch(&self.session, &params, cancel).await {
            Ok(result) => {
                self.sync_session(&params, &result);
                let response = if result.success {
                    result.output.clone()
                } else {
                    result.error.clone().unwrap_or_else(|| "operation failed".into())
                };
                self.recorder.record_turn(
                    query,
                    &response,
                    &attempt.chunks_used,
                    context_tags,
                    result.success,
                );
                self.append_turn(query, &response, params);
                Ok(result)
            }
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            Err(e) => {
                let response = e.to_string();
                self.recorder.record_turn(
                    query,
                    &response,
                    &attempt.chunks_used,
                    context_tags,
                    false,
                );
                self.append_turn(query, &response, params);
                Err(e)
            }
        }
    }

    fn append_turn(&mut self, query: &str, response: &str, params: TaskParams) {
        self.memory.append(ConversationTurn {
            query: query.to_string(),
            response: response.to_string(),
            params,
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    /// Keep the session's defaults in step with successful `use` switches.
    fn sync_session(&mut self, params: &TaskParams, result: &TaskResult) {
        if !result.success || !matches!(params.action.as_str(), "use" | "switch") {
            return;
        }
        match normalize_resource_type(&params.resource_type) {
            Some(ResourceKind::Namespace) => {
                info!("[agent] namespace switched to '{}'", params.resource_name);
                self.session.current_namespace = params.resource_name.clone();
            }
            Some(ResourceKind::Context) => {
                info!("[agent] context switched to '{}'", params.resource_name);
                self.session.current_context = params.resource_name.clone();
            }
            _ => {}
        }
    }

    fn greeting_response(&self) -> String {
        let context = if self.session.current_context.is_empty() {
            "the default context".to_string()
        } else {
            format!("context '{}'", self.session.current_context)
        };
        format!(
            "Hello! I'm kubesage. I'm working with {} in namespace '{}'. \
             Ask me to list, describe, scale or inspect cluster resources.",
            context, self.session.current_namespace
        )
    }
}

// ── Conversational formatting ──────────────────────────────────────────

/// Pull the reply out of flags.response. When the model didn't follow the
/// shape, fall back to the raw completion text rather than failing the
/// turn — the one place a downstream error is swallowed.
fn conversational_response(params: &TaskParams, raw: &str) -> String {
    match params.flags.get("response") {
        Some(ParamValue::Str(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            warn!("[agent] conversational turn without flags.response, using raw output");
            raw.trim().to_string()
        }
    }
}

fn help_text() -> String {
    "I can run cluster operations described in plain language.\n\
     Resources: pods, deployments, namespaces, contexts, events, metrics.\n\
     Examples:\n\
       - list all pods in staging\n\
       - describe deployment web\n\
       - scale deployment web to 5 replicas\n\
       - show logs for pod web-0\n\
       - forward port 8080 of pod web-0\n\
       - run `env` in pod web-0\n\
       - switch to namespace staging"
        .to_string()
}
