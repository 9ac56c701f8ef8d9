// ── Kubesage Atoms: Error Types ────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • One variant per failure domain of the turn pipeline (retrieval,
//     completion, parse, validation, dispatch, handler, recording) plus the
//     usual infrastructure conversions wired via `#[from]`.
//   • Every variant that is "fatal to the turn" carries enough detail to
//     name the offending value (field, resource type, raw model output).
//   • No variant carries secret material (API keys) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite database failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The embedding retrieval port failed. Fatal, no fallback.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The completion port failed. Fatal to the turn.
    #[error("Completion error: {provider}: {message}")]
    Completion { provider: String, message: String },

    /// The completion output was empty or could not be decoded into task
    /// parameters. Carries the raw response for diagnostics.
    #[error("Parse error: {message} (raw response: {raw})")]
    Parse { message: String, raw: String },

    /// A precondition on the parsed parameters failed. Names the field.
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// No handler exists for the resource type / action pair.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A resource handler failed. Fatal to the turn, not to the process.
    #[error("Handler error: {resource}: {message}")]
    Handler { resource: String, message: String },

    /// The interaction store rejected a write. Recovered locally: the
    /// learning loop is best-effort and never blocks the response path.
    #[error("Recording error: {0}")]
    Recording(String),

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's cancellation token fired mid-turn.
    #[error("Cancelled")]
    Cancelled,

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a completion error with provider name and message.
    pub fn completion(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Completion { provider: provider.into(), message: message.into() }
    }

    /// Create a parse error carrying the raw completion output.
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse { message: message.into(), raw: raw.into() }
    }

    /// Create a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a handler error with resource kind and message.
    pub fn handler(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler { resource: resource.into(), message: message.into() }
    }
}

// ── Migration bridge: String → EngineError ─────────────────────────────────
// Allows `?` on helpers that produce plain string errors.

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
pub type EngineResult<T> = Result<T, EngineError>;
