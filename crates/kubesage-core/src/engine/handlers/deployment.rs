// Deployment handler: list, describe, scale, restart, delete.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct DeploymentHandler {
    kubectl: Arc<Kubectl>,
}

impl DeploymentHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        DeploymentHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    let mut args: Vec<String> = Vec::new();
    match params.action.as_str() {
        "list" => args.extend(["get".into(), "deployments".into(), "-o".into(), "wide".into()]),
        "describe" => {
            args.extend(["describe".into(), "deployment".into(), params.resource_name.clone()])
        }
        "delete" => {
            args.extend(["delete".into(), "deployment".into(), params.resource_name.clone()])
        }
        "scale" => {
            // The dispatcher promoted the validated count into extra_params.
            let replicas = params.extra_params.get("replicas").and_then(|v| v.as_i64())?;
            args.extend([
                "scale".into(),
                "deployment".into(),
                params.resource_name.clone(),
                format!("--replicas={}", replicas),
            ]);
        }
        "restart" => args.extend([
            "rollout".into(),
            "restart".into(),
            "deployment".into(),
            params.resource_name.clone(),
        ]),
        _ => return None,
    }
    push_namespace(&mut args, &params.namespace);
    Some(args)
}

#[async_trait]
impl ResourceHandler for DeploymentHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Deployment
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args =
            args_for(params).ok_or_else(|| unsupported_action("deployment", &params.action))?;

        let out = self.kubectl.run(&args, cancel).await?;
        if out.success {
            let mut result = TaskResult::ok(out.output);
            if !params.resource_name.is_empty() {
                result = result.with_affected(vec![params.resource_name.clone()]);
            }
            Ok(result)
        } else {
            Ok(TaskResult::failed(out.output))
        }
    }
}
