// Events handler: list recent cluster events, oldest first.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct EventsHandler {
    kubectl: Arc<Kubectl>,
}

impl EventsHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        EventsHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    match params.action.as_str() {
        "list" => {
            let mut args = vec![
                "get".into(),
                "events".into(),
                "--sort-by=.lastTimestamp".into(),
            ];
            push_namespace(&mut args, &params.namespace);
            Some(args)
        }
        _ => None,
    }
}

#[async_trait]
impl ResourceHandler for EventsHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Events
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args = args_for(params).ok_or_else(|| unsupported_action("events", &params.action))?;
        let out = self.kubectl.run(&args, cancel).await?;
        if out.success {
            Ok(TaskResult::ok(out.output))
        } else {
            Ok(TaskResult::failed(out.output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_sorts_by_timestamp() {
        let p = TaskParams { action: "list".into(), namespace: "prod".into(), ..Default::default() };
        assert_eq!(
            args_for(&p).unwrap(),
            vec!["get", "events", "--sort-by=.lastTimestamp", "-n", "prod"]
        );
    }
}
