// Kubesage Engine — Query Parser
// Turns a free-text request into TaskParams: greeting short-circuit, then
// score-weighted retrieval over the documentation corpus, then one
// low-temperature completion call decoded strictly as JSON.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::atoms::constants::{
    GREETINGS, PARSE_MAX_TOKENS, PARSE_TEMPERATURE, RETRIEVAL_TOP_K,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{CompletionPort, RetrievalPort};
use crate::atoms::types::{
    CompletionOptions, ConversationTurn, Message, SessionContext, TaskParams,
};
use crate::engine::memory::render_window;
use crate::engine::scoring;
use crate::engine::store::InteractionStore;

// ── Parse attempt ──────────────────────────────────────────────────────

/// Everything the pipeline needs to record the turn, whatever the outcome:
/// the chunk ids considered, the raw completion text (when one was made)
/// and the parse result itself.
pub struct ParseAttempt {
    pub outcome: EngineResult<TaskParams>,
    pub raw_response: Option<String>,
    pub chunks_used: Vec<String>,
    /// True when a greeting literal resolved the turn without touching
    /// retrieval or the completion port.
    pub fast_path: bool,
}

impl ParseAttempt {
    fn failed(err: EngineError) -> Self {
        ParseAttempt { outcome: Err(err), raw_response: None, chunks_used: Vec::new(), fast_path: false }
    }
}

// ── Parser ─────────────────────────────────────────────────────────────

pub struct QueryParser {
    provider: Arc<dyn CompletionPort>,
    retriever: Arc<dyn RetrievalPort>,
    store: Arc<InteractionStore>,
}

impl QueryParser {
    pub fn new(
        provider: Arc<dyn CompletionPort>,
        retriever: Arc<dyn RetrievalPort>,
        store: Arc<InteractionStore>,
    ) -> Self {
        QueryParser { provider, retriever, store }
    }

    /// Parse one query. Retrieval failure fails fast — no completion call,
    /// no retry. Completion and decode failures are returned inside the
    /// attempt together with the chunks that were considered, so the
    /// recorder can still charge them with the outcome.
    pub async fn parse_query(
        &self,
        query: &str,
        window: &[ConversationTurn],
        session: &SessionContext,
        cancel: &CancellationToken,
    ) -> ParseAttempt {
        // 1. Greeting short-circuit: zero retrieval, zero completion.
        if is_greeting(query) {
            debug!("[parser] greeting literal, conversational fast path");
            return ParseAttempt {
                outcome: Ok(TaskParams::conversational()),
                raw_response: None,
                chunks_used: Vec::new(),
                fast_path: true,
            };
        }

        // 2. Retrieval + score-gated context composition.
        let chunks = match self.retriever.search(query, RETRIEVAL_TOP_K, cancel).await {
            Ok(chunks) => chunks,
            Err(e @ (EngineError::Cancelled | EngineError::Retrieval(_))) => {
                return ParseAttempt::failed(e);
            }
            Err(e) => return ParseAttempt::failed(EngineError::Retrieval(e.to_string())),
        };

        let composed = match scoring::compose_context(&self.store, &chunks) {
            Ok(c) => c,
            Err(e) => return ParseAttempt::failed(e),
        };
        info!(
            "[parser] retrieved {} chunk(s), {} over threshold",
            composed.chunks_used.len(),
            composed.chunks_included.len()
        );

        // 3. Prompt assembly and the completion call.
        let system = build_system_prompt(&composed.text, window, session);
        let messages = vec![Message::system(system), Message::user(query.to_string())];
        let options = CompletionOptions {
            temperature: Some(PARSE_TEMPERATURE),
            max_tokens: Some(PARSE_MAX_TOKENS),
            ..Default::default()
        };

        let raw = match self.provider.complete(&messages, &options, cancel).await {
            Ok(raw) => raw,
            Err(e) => {
                return ParseAttempt {
                    outcome: Err(e),
                    raw_response: None,
                    chunks_used: composed.chunks_used,
                    fast_path: false,
                };
            }
        };

        // 4–5. Strict decode + namespace defaulting.
        let outcome = decode_task_params(&raw)
            .map(|mut params| {
                if params.namespace.is_empty() {
                    params.namespace = session.current_namespace.clone();
                }
                params
            })
            .inspect_err(|e| warn!("[parser] decode failed: {}", e));

        ParseAttempt {
            outcome,
            raw_response: Some(raw),
            chunks_used: composed.chunks_used,
            fast_path: false,
        }
    }
}

// ── Greeting detection ─────────────────────────────────────────────────

/// Exact match against the greeting literals, case-insensitive, with
/// trailing punctuation stripped ("Hello!" counts, "hello there" doesn't).
pub fn is_greeting(query: &str) -> bool {
    let normalized = query
        .trim()
        .trim_end_matches(['!', '.', '?', ','])
        .trim()
        .to_lowercase();
    GREETINGS.contains(&normalized.as_str())
}

// ── Prompt assembly ────────────────────────────────────────────────────

fn build_system_prompt(
    doc_context: &str,
    window: &[ConversationTurn],
    session: &SessionContext,
) -> String {
    let mut prompt = String::from(
        "You translate natural-language requests about a Kubernetes cluster into \
         exactly one JSON object, with no surrounding prose, markdown or code fences.\n\
         The object has exactly these keys: \"action\", \"resourceType\", \
         \"resourceName\", \"namespace\", \"containerName\", \"command\" (array of \
         strings), \"flags\" (object). Use empty strings, empty arrays or empty \
         objects for anything the request does not specify.\n\
         Supported resource types: pod, deployment, namespace, context, events, \
         metrics, port-forward, exec.\n\
         Typical actions: list, describe, scale, delete, logs, exec, port-forward, \
         use, top, restart.\n\
         For small talk or questions about yourself, set action to \
         \"conversational\" and put your reply in flags.response. For requests to \
         explain what you can do, set action to \"help\".\n",
    );

    prompt.push_str(&format!(
        "\nCurrent context: {}\nCurrent namespace: {}\n",
        if session.current_context.is_empty() { "(default)" } else { session.current_context.as_str() },
        session.current_namespace,
    ));

    if !doc_context.is_empty() {
        prompt.push_str("\nRelevant documentation:\n");
        prompt.push_str(doc_context);
        prompt.push('\n');
    }

    if !window.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        prompt.push_str(&render_window(window));
        prompt.push('\n');
    }

    prompt
}

// ── Decoding ───────────────────────────────────────────────────────────

/// Strict JSON decode of the completion output. When the model wraps the
/// object in prose, the substring between the first `{` and the last `}`
/// is extracted first — a best-effort recovery, not a guarantee; the serde
/// pass that follows rejects shape mismatches explicitly.
pub fn decode_task_params(raw: &str) -> EngineResult<TaskParams> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::parse("empty completion output", raw));
    }

    let span = extract_json_object(trimmed)
        .ok_or_else(|| EngineError::parse("no JSON object found in completion output", raw))?;

    let params: TaskParams = serde_json::from_str(span)
        .map_err(|e| EngineError::parse(format!("completion output is not a task object: {}", e), raw))?;

    validate_shape(params, raw)
}

/// The substring between the first `{` and the last `}`, if both exist in
/// that order.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// TaskParams must carry a non-empty resource type and action after
/// defaulting. Conversational/help turns get their resource type filled
/// in; anything else missing either field is a shape mismatch.
fn validate_shape(mut params: TaskParams, raw: &str) -> EngineResult<TaskParams> {
    if params.action.is_empty() {
        return Err(EngineError::parse("decoded object has no action", raw));
    }
    if params.resource_type.is_empty() {
        if params.is_conversational() || params.is_help() {
            params.resource_type = params.action.to_lowercase();
        } else {
            return Err(EngineError::parse("decoded object has no resourceType", raw));
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_literals_match() {
        assert!(is_greeting("hello"));
        assert!(is_greeting("  Hello!  "));
        assert!(is_greeting("GOOD MORNING"));
        assert!(is_greeting("thanks."));
        assert!(!is_greeting("hello there"));
        assert!(!is_greeting("list pods"));
        assert!(!is_greeting(""));
    }

    #[test]
    fn decode_plain_object() {
        let params =
            decode_task_params(r#"{"action":"list","resourceType":"pod"}"#).unwrap();
        assert_eq!(params.action, "list");
        assert_eq!(params.resource_type, "pod");
    }

    #[test]
    fn decode_recovers_object_from_prose() {
        let raw = "Sure! Here is the task:\n```json\n{\"action\":\"describe\",\
                   \"resourceType\":\"deployment\",\"resourceName\":\"web\"}\n```\nDone.";
        let params = decode_task_params(raw).unwrap();
        assert_eq!(params.action, "describe");
        assert_eq!(params.resource_name, "web");
    }

    #[test]
    fn decode_rejects_empty_and_non_json() {
        assert!(matches!(decode_task_params(""), Err(EngineError::Parse { .. })));
        assert!(matches!(decode_task_params("   "), Err(EngineError::Parse { .. })));
        assert!(matches!(decode_task_params("not json"), Err(EngineError::Parse { .. })));
    }

    #[test]
    fn decode_error_carries_raw_response() {
        let err = decode_task_params("not json").unwrap_err();
        match err {
            EngineError::Parse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_shape_mismatch() {
        // Valid JSON, wrong shape for the wire format.
        assert!(matches!(
            decode_task_params(r#"{"action":["list"],"resourceType":"pod"}"#),
            Err(EngineError::Parse { .. })
        ));
        // Missing action entirely.
        assert!(matches!(
            decode_task_params(r#"{"resourceType":"pod"}"#),
            Err(EngineError::Parse { .. })
        ));
        // Non-conversational with no resource type.
        assert!(matches!(
            decode_task_params(r#"{"action":"list"}"#),
            Err(EngineError::Parse { .. })
        ));
    }

    #[test]
    fn decode_fills_conversational_resource_type() {
        let params = decode_task_params(
            r#"{"action":"conversational","flags":{"response":"hi!"}}"#,
        )
        .unwrap();
        assert_eq!(params.resource_type, "conversational");
    }

    #[test]
    fn extract_handles_nested_and_reversed_braces() {
        assert_eq!(
            extract_json_object("x {\"a\":{\"b\":1}} y"),
            Some("{\"a\":{\"b\":1}}")
        );
        assert_eq!(extract_json_object("} {"), None);
        assert_eq!(extract_json_object("no braces"), None);
    }

    #[test]
    fn system_prompt_carries_context_window_and_docs() {
        let session = SessionContext {
            current_context: "prod-cluster".into(),
            current_namespace: "default".into(),
        };
        let window = vec![ConversationTurn {
            query: "list pods".into(),
            response: "3 pods".into(),
            params: TaskParams::default(),
            timestamp: "2026-01-01 00:00:00".into(),
        }];
        let prompt = build_system_prompt("--- docs ---", &window, &session);
        assert!(prompt.contains("prod-cluster"));
        assert!(prompt.contains("Current namespace: default"));
        assert!(prompt.contains("--- docs ---"));
        assert!(prompt.contains("User: list pods"));
        assert!(prompt.contains("Assistant: 3 pods"));
    }
}
