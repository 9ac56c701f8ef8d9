// Pod handler: list, describe, delete, logs (with optional follow).

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ParamValue, ResourceKind, SessionContext, TaskParams, TaskResult};

/// Log follow is "ready" as soon as anything arrives on stdout.
static ANY_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(".").expect("static regex"));

pub struct PodHandler {
    kubectl: Arc<Kubectl>,
}

impl PodHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        PodHandler { kubectl }
    }
}

fn wants_follow(params: &TaskParams) -> bool {
    matches!(params.flags.get("follow"), Some(ParamValue::Bool(true)))
}

/// Build the kubectl argument vector for one pod operation.
pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    let mut args: Vec<String> = Vec::new();
    match params.action.as_str() {
        "list" => {
            args.extend(["get".into(), "pods".into(), "-o".into(), "wide".into()]);
        }
        "describe" => {
            args.extend(["describe".into(), "pod".into(), params.resource_name.clone()]);
        }
        "delete" => {
            args.extend(["delete".into(), "pod".into(), params.resource_name.clone()]);
        }
        "logs" => {
            args.extend(["logs".into(), params.resource_name.clone()]);
            if !params.container_name.is_empty() {
                args.push("-c".into());
                args.push(params.container_name.clone());
            }
            if let Some(tail) = params.flags.get("tail").and_then(|v| v.as_i64()) {
                args.push(format!("--tail={}", tail));
            }
            if wants_follow(params) {
                args.push("-f".into());
            }
        }
        _ => return None,
    }
    push_namespace(&mut args, &params.namespace);
    Some(args)
}

#[async_trait]
impl ResourceHandler for PodHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pod
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args = args_for(params).ok_or_else(|| unsupported_action("pod", &params.action))?;

        // Log follow outlives the turn: return once output starts flowing.
        if params.action == "logs" && wants_follow(params) {
            let first = self.kubectl.spawn_streaming(&args, &ANY_LINE, cancel).await?;
            return Ok(TaskResult::ok(format!(
                "Following logs for {} (first line: {})",
                params.resource_name, first
            ))
            .with_affected(vec![params.resource_name.clone()]));
        }

        let out = self.kubectl.run(&args, cancel).await?;
        if out.success {
            let mut result = TaskResult::ok(out.output);
            if !params.resource_name.is_empty() {
                result = result.with_affected(vec![params.resource_name.clone()]);
            }
            Ok(result)
        } else {
            Ok(TaskResult::failed(out.output)
                .with_suggestion("check that the pod name and namespace are correct"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(action: &str) -> TaskParams {
        TaskParams {
            action: action.into(),
            resource_type: "pod".into(),
            resource_name: "web-0".into(),
            namespace: "prod".into(),
            ..Default::default()
        }
    }

    #[test]
    fn list_args() {
        let mut p = params("list");
        p.resource_name.clear();
        assert_eq!(args_for(&p).unwrap(), vec!["get", "pods", "-o", "wide", "-n", "prod"]);
    }

    #[test]
    fn logs_args_with_container_and_tail() {
        let mut p = params("logs");
        p.container_name = "sidecar".into();
        p.flags.insert("tail".into(), ParamValue::Int(50));
        assert_eq!(
            args_for(&p).unwrap(),
            vec!["logs", "web-0", "-c", "sidecar", "--tail=50", "-n", "prod"]
        );
    }

    #[test]
    fn follow_flag_adds_dash_f() {
        let mut p = params("logs");
        p.flags.insert("follow".into(), ParamValue::Bool(true));
        assert!(args_for(&p).unwrap().contains(&"-f".to_string()));
    }

    #[test]
    fn unknown_action_is_none() {
        assert!(args_for(&params("fly")).is_none());
    }
}
