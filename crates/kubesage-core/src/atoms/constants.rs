// ── Kubesage Atoms: Constants ──────────────────────────────────────────────
// Tuning knobs for the turn pipeline. Values that are part of the engine's
// observable behaviour (window size, inclusion threshold) live here so tests
// and callers reference one definition.

/// Number of recent conversation turns serialized into the parser prompt.
pub const CONTEXT_WINDOW_TURNS: usize = 5;

/// Top-k chunks requested from the retrieval port per query.
pub const RETRIEVAL_TOP_K: usize = 3;

/// Neutral relevance score assumed for a chunk never seen in an interaction.
pub const SCORE_BASELINE: f64 = 1.0;

/// A chunk's content enters the composed prompt only when its accumulated
/// score is strictly greater than this.
pub const SCORE_INCLUSION_THRESHOLD: f64 = 1.2;

// ── Score update rule (bounded exponential moving average) ─────────────────
// new = old + SCORE_ALPHA * (target - old), clamped to [SCORE_MIN, SCORE_MAX].
// One success from the 1.0 baseline lands at 1.25 — just over the inclusion
// threshold; repeated failures sink a chunk well below it.

pub const SCORE_ALPHA: f64 = 0.25;
pub const SCORE_SUCCESS_TARGET: f64 = 2.0;
pub const SCORE_FAILURE_TARGET: f64 = 0.5;
pub const SCORE_MIN: f64 = 0.25;
pub const SCORE_MAX: f64 = 3.0;

// ── Query parsing ──────────────────────────────────────────────────────────

/// Sampling temperature for the structured-parse completion call.
pub const PARSE_TEMPERATURE: f64 = 0.1;

/// Token ceiling for the structured-parse completion call.
pub const PARSE_MAX_TOKENS: u32 = 512;

/// Literal greetings that resolve to a conversational turn without touching
/// retrieval or the completion port. Matched case-insensitively after
/// trimming trailing punctuation.
pub const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
    "thanks",
    "thank you",
];

/// Namespace assumed when the session has none configured.
pub const DEFAULT_NAMESPACE: &str = "default";

// ── Documentation indexing ─────────────────────────────────────────────────

/// Lines per indexed chunk.
pub const CHUNK_LINES: usize = 40;

/// Lines of overlap between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 10;

// ── kubectl collaborator ───────────────────────────────────────────────────

/// Hard wall-clock limit for a single kubectl invocation.
pub const KUBECTL_TIMEOUT_SECS: u64 = 120;

/// Handler output larger than this is truncated before it reaches the model
/// or the terminal.
pub const MAX_HANDLER_OUTPUT: usize = 50_000;
