// Port-forward handler. The kubectl process stays up for as long as the
// forward is wanted, so it runs detached; the turn returns once kubectl
// prints its "Forwarding from" readiness line.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

static READY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Forwarding from ").expect("static regex"));

pub struct PortForwardHandler {
    kubectl: Arc<Kubectl>,
}

impl PortForwardHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        PortForwardHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    if !matches!(params.action.as_str(), "port-forward" | "forward" | "start") {
        return None;
    }
    // Validated upstream: `port` is present and numeric.
    let port = params.flags.get("port").and_then(|v| v.as_i64())?;
    let local = params
        .flags
        .get("localPort")
        .and_then(|v| v.as_i64())
        .unwrap_or(port);

    let mut args = vec![
        "port-forward".into(),
        format!("pod/{}", params.resource_name),
        format!("{}:{}", local, port),
    ];
    push_namespace(&mut args, &params.namespace);
    Some(args)
}

#[async_trait]
impl ResourceHandler for PortForwardHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PortForward
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args =
            args_for(params).ok_or_else(|| unsupported_action("port-forward", &params.action))?;

        let ready_line = self.kubectl.spawn_streaming(&args, &READY, cancel).await?;
        Ok(TaskResult::ok(ready_line).with_affected(vec![params.resource_name.clone()]))
    }
}
