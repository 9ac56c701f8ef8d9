// Exec handler: run a command inside a workload container.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{push_namespace, unsupported_action, Kubectl};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::ResourceHandler;
use crate::atoms::types::{ResourceKind, SessionContext, TaskParams, TaskResult};

pub struct ExecHandler {
    kubectl: Arc<Kubectl>,
}

impl ExecHandler {
    pub fn new(kubectl: Arc<Kubectl>) -> Self {
        ExecHandler { kubectl }
    }
}

pub(crate) fn args_for(params: &TaskParams) -> Option<Vec<String>> {
    if params.action != "exec" || params.command.is_empty() {
        return None;
    }
    let mut args = vec!["exec".into(), params.resource_name.clone()];
    if !params.container_name.is_empty() {
        args.push("-c".into());
        args.push(params.container_name.clone());
    }
    push_namespace(&mut args, &params.namespace);
    args.push("--".into());
    args.extend(params.command.iter().cloned());
    Some(args)
}

#[async_trait]
impl ResourceHandler for ExecHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Exec
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        params: &TaskParams,
        cancel: &CancellationToken,
    ) -> EngineResult<TaskResult> {
        let args = args_for(params).ok_or_else(|| unsupported_action("exec", &params.action))?;
        let out = self.kubectl.run(&args, cancel).await?;
        if out.success {
            Ok(TaskResult::ok(out.output).with_affected(vec![params.resource_name.clone()]))
        } else {
            Ok(TaskResult::failed(out.output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_args_place_command_after_separator() {
        let p = TaskParams {
            action: "exec".into(),
            resource_name: "web-0".into(),
            namespace: "prod".into(),
            container_name: "app".into(),
            command: vec!["sh".into(), "-c".into(), "env".into()],
            ..Default::default()
        };
        assert_eq!(
            args_for(&p).unwrap(),
            vec!["exec", "web-0", "-c", "app", "-n", "prod", "--", "sh", "-c", "env"]
        );
    }

    #[test]
    fn exec_without_command_is_none() {
        let p = TaskParams {
            action: "exec".into(),
            resource_name: "web-0".into(),
            ..Default::default()
        };
        assert!(args_for(&p).is_none());
    }
}
