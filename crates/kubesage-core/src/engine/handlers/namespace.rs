// Namespace handler: list, describe, use (switches the kubeconfig default).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct NamespaceHandler {
    kubectl: Arc<Kubectl>,
}

impl NamespaceHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        NamespaceHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    match params.action.as_str() {
        "list" => Some(vec!["get".into(), "namespaces".into()]),
        "describe" => Some(vec![
            "describe".into(),
            "namespace".into(),
            params.resource_name.clone(),
        ]),
        "use" | "switch" => Some(vec![
            "config".into(),
            "set-context".into(),
            "--current".into(),
            format!("--namespace={}", params.resource_name),
        ]),
        _ => None,
    }
}

#[async_trait]
impl ResourceHandler for NamespaceHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Namespace
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args =
            args_for(params).ok_or_else(|| unsupported_action("namespace", &params.action))?;

        let out = self.kubectl.run(&args, cancel).await?;
        if !out.success {
            return Ok(TaskResult::failed(out.output));
        }

        let mut result = TaskResult::ok(out.output);
        if matches!(params.action.as_str(), "use" | "switch") {
            result = result
                .with_affected(vec![params.resource_name.clone()])
                .with_suggestion(format!(
                    "subsequent commands default to namespace '{}'",
                    params.resource_name
                ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_sets_current_context_namespace() {
        let p = TaskParams {
            action: "use".into(),
            resource_name: "staging".into(),
            ..Default::default()
        };
        assert_eq!(
            args_for(&p).unwrap(),
            vec!["config", "set-context", "--current", "--namespace=staging"]
        );
    }

    #[test]
    fn list_ignores_namespace_field() {
        let p = TaskParams { action: "list".into(), namespace: "prod".into(), ..Default::default() };
        assert_eq!(args_for(&p).unwrap(), vec!["get", "namespaces"]);
    }
}
