// ── Kubesage Atoms: Boundary Traits ────────────────────────────────────────
// The engine's external collaborators, each behind a narrow trait so the
// pipeline can be exercised with mocks and swapped backends.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::atoms::error::EngineResult;
use crate::atoms::types::{
    CompletionOptions, DocChunk, Message, ResourceKind, SessionContext, TaskParams, TaskResult,
};

// ── Completion port ────────────────────────────────────────────────────────

/// Opaque generative request/response boundary. Callers must supply at least
/// one system and one user message.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<String>;
}

// ── Embedding retrieval port ───────────────────────────────────────────────

/// Given a query and a count k, returns up to k ranked content chunks with
/// source/location metadata. An empty list is a valid non-error result.
/// Ranking semantics belong to the implementation and are deterministic for
/// a fixed corpus state.
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    async fn search(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<DocChunk>>;
}

// ── Resource handlers ──────────────────────────────────────────────────────

/// External collaborator performing the concrete cluster operation for one
/// resource kind. A returned `TaskResult` with `success == false` means the
/// operation ran and failed; an `Err` means the handler itself broke.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn execute(
        &self,
        session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult>;
}

// ── Resource validator ─────────────────────────────────────────────────────

/// Pluggable pre-dispatch checks. Either method rejecting the turn is
/// terminal: no handler is invoked.
pub trait ResourceValidator: Send + Sync {
    fn validate_resource(
        &self,
        session: &SessionContext,
        resource_type: &str,
        name: &str,
        namespace: &str,
    ) -> EngineResult<()>;

    fn validate_operation(
        &self,
        session: &SessionContext,
        kind: ResourceKind,
        params: &TaskParams,
    ) -> EngineResult<()>;
}
