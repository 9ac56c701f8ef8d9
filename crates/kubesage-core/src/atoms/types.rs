// Kubesage Engine — Core types
// These are the data structures that flow through the entire engine.
// They are independent of any specific completion or retrieval backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Typed parameter values ─────────────────────────────────────────────

/// A single value inside `TaskParams::flags` / `TaskParams::extra_params`.
///
/// The completion wire format carries untyped JSON; decoding it into this
/// tagged variant lets the validator check each flag against a per-action
/// schema instead of sniffing types at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Integer view: either an `Int` or a string that parses as one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            ParamValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

// ── Task parameters ────────────────────────────────────────────────────

/// Structured description of one cluster operation, produced by the query
/// parser. This is also the completion wire shape: a flat JSON object with
/// camelCase keys; unknown keys are ignored and missing keys default to
/// empty. After defaulting, `resource_type` and `action` must be non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskParams {
    pub resource_type: String,
    pub resource_name: String,
    pub namespace: String,
    pub action: String,
    pub container_name: String,
    pub command: Vec<String>,
    pub flags: BTreeMap<String, ParamValue>,
    pub extra_params: BTreeMap<String, ParamValue>,
}

impl TaskParams {
    /// Canned parameters for the conversational fast path and for turns the
    /// model classifies as chat rather than a cluster operation.
    pub fn conversational() -> Self {
        TaskParams {
            resource_type: "conversational".into(),
            action: "conversational".into(),
            ..Default::default()
        }
    }

    pub fn is_conversational(&self) -> bool {
        self.action.eq_ignore_ascii_case("conversational")
    }

    pub fn is_help(&self) -> bool {
        self.action.eq_ignore_ascii_case("help")
    }
}

// ── Task result ────────────────────────────────────────────────────────

/// Terminal value of one turn. Returned unmodified from the handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub suggestions: Vec<String>,
    pub affected_resources: Vec<String>,
}

impl TaskResult {
    pub fn ok(output: impl Into<String>) -> Self {
        TaskResult { success: true, output: output.into(), ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        TaskResult {
            success: false,
            output: String::new(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_affected(mut self, resources: Vec<String>) -> Self {
        self.affected_resources = resources;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

// ── Documentation chunks ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// A retrieved unit of documentation text. Read-only inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocChunk {
    /// Deterministic identifier: source path plus line range. The same
    /// corpus state always yields the same id for the same chunk.
    pub fn id(&self) -> String {
        format!(
            "{}:{}-{}",
            self.metadata.source, self.metadata.start_line, self.metadata.end_line
        )
    }
}

// ── Interactions ───────────────────────────────────────────────────────

/// A persisted record of one turn: what was asked, what came back, which
/// chunks were consulted and whether the turn succeeded. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub query: String,
    pub response: String,
    pub chunks_used: Vec<String>,
    pub context_tags: Vec<String>,
    pub success: bool,
    pub created_at: String,
}

// ── Conversation memory ────────────────────────────────────────────────

/// One query/response cycle. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
    pub params: TaskParams,
    pub timestamp: String,
}

// ── Session state ──────────────────────────────────────────────────────

/// Per-session mutable state, passed explicitly into each pipeline
/// invocation. Concurrent sessions each own one of these; nothing here is
/// process-global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub current_context: String,
    pub current_namespace: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        SessionContext {
            current_context: String::new(),
            current_namespace: crate::atoms::constants::DEFAULT_NAMESPACE.into(),
        }
    }
}

// ── Resource kinds ─────────────────────────────────────────────────────

/// The handler families the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Pod,
    Deployment,
    Namespace,
    Context,
    Events,
    Metrics,
    PortForward,
    Exec,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Namespace => "namespace",
            ResourceKind::Context => "context",
            ResourceKind::Events => "events",
            ResourceKind::Metrics => "metrics",
            ResourceKind::PortForward => "port-forward",
            ResourceKind::Exec => "exec",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Completion port messages ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message { role: Role::Assistant, content: content.into() }
    }
}

/// Sampling options forwarded to the completion port.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop: Vec<String>,
}

// ── Provider config ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Ollama,
    OpenRouter,
    Custom,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com",
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenRouter => "https://openrouter.ai/api",
            ProviderKind::Custom => "",
        }
    }
}
