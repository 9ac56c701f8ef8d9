// Metrics handler: resource usage via `kubectl top`. Targets pods by
// default; "nodes" as the resource name switches to node metrics.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct MetricsHandler {
    kubectl: Arc<Kubectl>,
}

impl MetricsHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        MetricsHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    match params.action.as_str() {
        "list" | "top" => {
            let mut args: Vec<String> = vec!["top".into()];
            if params.resource_name.eq_ignore_ascii_case("nodes") {
                args.push("nodes".into());
            } else {
                args.push("pods".into());
                push_namespace(&mut args, &params.namespace);
            }
            Some(args)
        }
        _ => None,
    }
}

#[async_trait]
impl ResourceHandler for MetricsHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Metrics
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args = args_for(params).ok_or_else(|| unsupported_action("metrics", &params.action))?;
        let out = self.kubectl.run(&args, cancel).await?;
        if out.success {
            Ok(TaskResult::ok(out.output))
        } else {
            Ok(TaskResult::failed(out.output)
                .with_suggestion("metrics require the metrics-server addon"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_pods_by_default() {
        let p = TaskParams { action: "top".into(), namespace: "prod".into(), ..Default::default() };
        assert_eq!(args_for(&p).unwrap(), vec!["top", "pods", "-n", "prod"]);
    }

    #[test]
    fn nodes_target_switches_subject() {
        let p = TaskParams {
            action: "top".into(),
            resource_name: "nodes".into(),
            namespace: "prod".into(),
            ..Default::default()
        };
        assert_eq!(args_for(&p).unwrap(), vec!["top", "nodes"]);
    }
}
