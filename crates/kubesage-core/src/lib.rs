// Kubesage — natural-language command interface for Kubernetes clusters.
//
// Turns a free-text request into a structured cluster operation, executes it
// through resource handlers, and feeds every interaction outcome back into a
// score-weighted retrieval layer so documentation that historically led to
// successful turns ranks higher next time.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use engine::agent::ClusterAgent;
