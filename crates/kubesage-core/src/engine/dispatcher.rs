// Kubesage Engine — Task Dispatcher
// Routes TaskParams to the handler for its resource kind: synonym
// normalization, pluggable validation, then a single handler call whose
// TaskResult is returned unmodified. No retry, no transformation.
//
// Turn state machine: Received → Validated → Dispatched →
// Completed(success|failure). No resumable or partial states.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{ResourceHandler, ResourceValidator};
use crate::atoms::types::{ParamValue, ResourceKind, SessionContext, TaskParams, TaskResult};

// ── Turn phases ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum TurnPhase {
    Received,
    Validated,
    Dispatched,
    Completed(bool),
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Received => write!(f, "received"),
            TurnPhase::Validated => write!(f, "validated"),
            TurnPhase::Dispatched => write!(f, "dispatched"),
            TurnPhase::Completed(true) => write!(f, "completed(success)"),
            TurnPhase::Completed(false) => write!(f, "completed(failure)"),
        }
    }
}

// ── Synonym normalization ──────────────────────────────────────────────

/// Map a user- or model-supplied resource type onto a handler kind.
/// Case-insensitive; singular, plural and kubectl short names all land on
/// the same handler.
pub fn normalize_resource_type(resource_type: &str) -> Option<ResourceKind> {
    match resource_type.trim().to_lowercase().as_str() {
        "pod" | "pods" | "po" => Some(ResourceKind::Pod),
        "deployment" | "deployments" | "deploy" => Some(ResourceKind::Deployment),
        "namespace" | "namespaces" | "ns" => Some(ResourceKind::Namespace),
        "context" | "contexts" | "ctx" => Some(ResourceKind::Context),
        "event" | "events" => Some(ResourceKind::Events),
        "metric" | "metrics" | "top" => Some(ResourceKind::Metrics),
        "port-forward" | "portforward" | "pf" => Some(ResourceKind::PortForward),
        "exec" => Some(ResourceKind::Exec),
        _ => None,
    }
}

/// Fold action synonyms onto the canonical verb handlers expect, and pull
/// typed defaults out of flags into extra_params (e.g. replicas for scale).
fn normalize_params(params: &TaskParams, kind: ResourceKind) -> TaskParams {
    let mut normalized = params.clone();
    normalized.resource_type = kind.as_str().to_string();
    normalized.action = match params.action.trim().to_lowercase().as_str() {
        "get" | "show" | "list" => "list".to_string(),
        "describe" | "inspect" => "describe".to_string(),
        other => other.to_string(),
    };

    if normalized.action == "scale" {
        if let Some(n) = normalized.flags.get("replicas").and_then(|v| v.as_i64()) {
            normalized.extra_params.insert("replicas".into(), ParamValue::Int(n));
        }
    }

    normalized
}

// ── Dispatcher ─────────────────────────────────────────────────────────

pub struct TaskDispatcher {
    handlers: HashMap<ResourceKind, Box<dyn ResourceHandler>>,
    validator: Box<dyn ResourceValidator>,
}

impl TaskDispatcher {
    pub fn new(validator: Box<dyn ResourceValidator>) -> Self {
        TaskDispatcher { handlers: HashMap::new(), validator }
    }

    /// Register a handler under its own kind. The last registration for a
    /// kind wins.
    pub fn register(&mut self, handler: Box<dyn ResourceHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn has_handler(&self, kind: ResourceKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route one turn. Terminal errors: UnsupportedOperation for a
    /// resource type no handler owns, ValidationError from the pluggable
    /// validator. On success the handler's TaskResult comes back verbatim.
    pub async fn dispatch(
        &self,
        session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        debug!("[dispatcher] {} action={} type={}", TurnPhase::Received, params.action, params.resource_type);

        let kind = normalize_resource_type(&params.resource_type)
            .ok_or_else(|| EngineError::UnsupportedOperation(params.resource_type.clone()))?;

        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| EngineError::UnsupportedOperation(params.resource_type.clone()))?;

        let normalized = normalize_params(params, kind);

        self.validator.validate_resource(
            session,
            &normalized.resource_type,
            &normalized.resource_name,
            &normalized.namespace,
        )?;
        self.validator.validate_operation(session, kind, &normalized)?;
        debug!("[dispatcher] {} kind={}", TurnPhase::Validated, kind);

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        debug!("[dispatcher] {} kind={}", TurnPhase::Dispatched, kind);
        let result = handler.execute(session, &normalized, cancel).await?;

        info!(
            "[dispatcher] {} kind={} action={}",
            TurnPhase::Completed(result.success),
            kind,
            normalized.action
        );
        Ok(result)
    }
}
