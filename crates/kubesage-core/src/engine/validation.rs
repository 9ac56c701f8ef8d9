// Kubesage Engine — Resource Validation
// Pre-dispatch checks: resource and namespace names must be well-formed,
// and each action's required parameters are declared once in a fixed
// per-action schema instead of being sniffed at the point of use.

use std::sync::LazyLock;

use regex::Regex;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::ResourceValidator;
use crate::atoms::types::{ParamValue, ResourceKind, SessionContext, TaskParams};

// ── Per-action schemas ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Str,
    Int,
    Bool,
}

struct ActionSchema {
    action: &'static str,
    requires_name: bool,
    required_flags: &'static [(&'static str, ParamKind)],
}

/// One row per action with preconditions. Actions not listed here have no
/// schema-level requirements; the handler decides whether it knows them.
static ACTION_SCHEMAS: &[ActionSchema] = &[
    ActionSchema { action: "describe", requires_name: true, required_flags: &[] },
    ActionSchema { action: "delete", requires_name: true, required_flags: &[] },
    ActionSchema { action: "logs", requires_name: true, required_flags: &[] },
    ActionSchema { action: "scale", requires_name: true, required_flags: &[("replicas", ParamKind::Int)] },
    ActionSchema { action: "restart", requires_name: true, required_flags: &[] },
    ActionSchema { action: "exec", requires_name: true, required_flags: &[] },
    ActionSchema { action: "port-forward", requires_name: true, required_flags: &[("port", ParamKind::Int)] },
    ActionSchema { action: "use", requires_name: true, required_flags: &[] },
];

fn schema_for(action: &str) -> Option<&'static ActionSchema> {
    ACTION_SCHEMAS.iter().find(|s| s.action.eq_ignore_ascii_case(action))
}

fn matches_kind(value: &ParamValue, kind: ParamKind) -> bool {
    match kind {
        ParamKind::Str => value.as_str().is_some(),
        // Numeric strings from the model count as integers.
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Bool => matches!(value, ParamValue::Bool(_)),
    }
}

// ── Name syntax ────────────────────────────────────────────────────────

/// RFC 1123 label: lowercase alphanumerics and dashes, no leading/trailing
/// dash. Cluster object and namespace names follow this.
static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static regex"));

fn is_valid_name(name: &str) -> bool {
    name.len() <= 253 && DNS_LABEL.is_match(name)
}

// ── Default validator ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DefaultValidator;

impl ResourceValidator for DefaultValidator {
    fn validate_resource(
        &self,
        _session: &SessionContext,
        resource_type: &str,
        name: &str,
        namespace: &str,
    ) -> EngineResult<()> {
        if !name.is_empty() && !is_valid_name(name) {
            return Err(EngineError::validation(
                "resourceName",
                format!("'{}' is not a valid {} name", name, resource_type),
            ));
        }
        if !namespace.is_empty() && !is_valid_name(namespace) {
            return Err(EngineError::validation(
                "namespace",
                format!("'{}' is not a valid namespace name", namespace),
            ));
        }
        Ok(())
    }

    fn validate_operation(
        &self,
        _session: &SessionContext,
        kind: ResourceKind,
        params: &TaskParams,
    ) -> EngineResult<()> {
        let Some(schema) = schema_for(&params.action) else {
            return Ok(());
        };

        if schema.requires_name && params.resource_name.is_empty() {
            return Err(EngineError::validation(
                "resourceName",
                format!("action '{}' on {} requires a resource name", params.action, kind),
            ));
        }

        for (flag, required_kind) in schema.required_flags {
            match params.flags.get(*flag) {
                None => {
                    return Err(EngineError::validation(
                        *flag,
                        format!("action '{}' requires the '{}' flag", params.action, flag),
                    ));
                }
                Some(value) if !matches_kind(value, *required_kind) => {
                    return Err(EngineError::validation(
                        *flag,
                        format!("flag '{}' must be a {:?}, got '{}'", flag, required_kind, value),
                    ));
                }
                Some(_) => {}
            }
        }

        if kind == ResourceKind::Exec && params.command.is_empty() {
            return Err(EngineError::validation(
                "command",
                "exec requires a command to run inside the container",
            ));
        }

        Ok(())
    }
}
