// Context handler: list, current, use.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct ContextHandler {
    kubectl: Arc<Kubectl>,
}

impl ContextHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        ContextHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    match params.action.as_str() {
        "list" => Some(vec!["config".into(), "get-contexts".into()]),
        "current" => Some(vec!["config".into(), "current-context".into()]),
        "use" | "switch" => {
            Some(vec!["config".into(), "use-context".into(), params.resource_name.clone()])
        }
        _ => None,
    }
}

#[async_trait]
impl ResourceHandler for ContextHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Context
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args = args_for(params).ok_or_else(|| unsupported_action("context", &params.action))?;

        let out = self.kubectl.run(&args, cancel).await?;
        if !out.success {
            return Ok(TaskResult::failed(out.output));
        }

        let mut result = TaskResult::ok(out.output);
        if matches!(params.action.as_str(), "use" | "switch") {
            result = result.with_affected(vec![params.resource_name.clone()]);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_context_args() {
        let p = TaskParams {
            action: "use".into(),
            resource_name: "prod-cluster".into(),
            ..Default::default()
        };
        assert_eq!(args_for(&p).unwrap(), vec!["config", "use-context", "prod-cluster"]);
    }

    #[test]
    fn current_context_args() {
        let p = TaskParams { action: "current".into(), ..Default::default() };
        assert_eq!(args_for(&p).unwrap(), vec!["config", "current-context"]);
    }
}
