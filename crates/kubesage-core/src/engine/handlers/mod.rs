// Kubesage Engine — Resource Handlers
// One handler per resource kind, each a thin wrapper over a kubectl
// subprocess. The interesting machinery lives in `Kubectl`: bounded
// synchronous runs for one-shot operations, and detached streaming runs
// (log follow, port-forward) that hand back a oneshot readiness signal
// and then outlive the turn.
//
// Module layout:
//   pod, deployment, namespace, context, events, metrics,
//   port_forward, exec — per-kind handlers
//   mod.rs — the Kubectl runner + registration helper

pub mod context;
pub mod deployment;
pub mod events;
pub mod exec;
pub mod metrics;
pub mod namespace;
pub mod pod;
pub mod port_forward;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::atoms::constants::{KUBECTL_TIMEOUT_SECS, MAX_HANDLER_OUTPUT};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::dispatcher::TaskDispatcher;

// ── kubectl runner ─────────────────────────────────────────────────────

/// Outcome of a one-shot kubectl invocation. A non-zero exit is an
/// operation failure, not a handler error.
#[derive(Debug)]
pub struct KubectlOutput {
    pub success: bool,
    pub output: String,
}

pub struct Kubectl {
    binary: String,
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Kubectl { binary: binary.into() }
    }

    /// Run kubectl to completion with a hard timeout. Stdout and stderr
    /// are merged the way a terminal user would see them; oversized output
    /// is truncated.
    pub async fn run(&self, args: &[String], cancel: &CancellationToken) -> EngineResult<KubectlOutput> {
        info!("[kubectl] {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::handler("kubectl", format!("failed to spawn: {}", e)))?;

        let output = tokio::select! {
            r = tokio::time::timeout(
                Duration::from_secs(KUBECTL_TIMEOUT_SECS),
                child.wait_with_output(),
            ) => match r {
                Ok(out) => out.map_err(|e| EngineError::handler("kubectl", e.to_string()))?,
                Err(_) => {
                    return Err(EngineError::handler(
                        "kubectl",
                        format!("command timed out after {}s", KUBECTL_TIMEOUT_SECS),
                    ));
                }
            },
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut merged = String::new();
        if !stdout.is_empty() {
            merged.push_str(stdout.trim_end());
        }
        if !stderr.is_empty() {
            if !merged.is_empty() {
                merged.push_str("\n--- stderr ---\n");
            }
            merged.push_str(stderr.trim_end());
        }
        if merged.len() > MAX_HANDLER_OUTPUT {
            merged.truncate(MAX_HANDLER_OUTPUT);
            merged.push_str("\n… [output truncated]");
        }

        Ok(KubectlOutput { success: output.status.success(), output: merged })
    }

    /// Spawn a long-running kubectl process (log follow, port-forward) on a
    /// detached task. Returns once the first stdout line matching
    /// `ready_pattern` arrives, the caller cancels, or the process exits
    /// early. After readiness the background task owns the child: it keeps
    /// draining output and kills the process when the caller's token fires.
    pub async fn spawn_streaming(
        &self,
        args: &[String],
        ready_pattern: &Regex,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        info!("[kubectl] streaming: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::handler("kubectl", format!("failed to spawn: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::handler("kubectl", "no stdout pipe"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::handler("kubectl", "no stderr pipe"))?;

        let (ready_tx, ready_rx) = oneshot::channel::<String>();
        let pattern = ready_pattern.clone();
        let task_cancel = cancel.child_token();

        // Stderr drains independently: it closing says nothing about the
        // forward itself.
        tokio::spawn(async move {
            let mut err_lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = err_lines.next_line().await {
                warn!("[kubectl] {}", line);
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut ready_tx = Some(ready_tx);

            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if ready_tx.is_some() && pattern.is_match(&line) {
                                if let Some(tx) = ready_tx.take() {
                                    let _ = tx.send(line.clone());
                                }
                            }
                            debug!("[kubectl] {}", line);
                        }
                        // EOF or broken pipe: the process is done either way.
                        Ok(None) | Err(_) => break,
                    },
                    _ = task_cancel.cancelled() => {
                        let _ = child.kill().await;
                        break;
                    }
                }
            }
            let _ = child.wait().await;
            debug!("[kubectl] streaming task finished");
        });

        tokio::select! {
            line = ready_rx => line.map_err(|_| {
                EngineError::handler("kubectl", "process exited before becoming ready")
            }),
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
        }
    }
}

// ── Shared helpers ─────────────────────────────────────────────────────

/// UnsupportedOperation naming the action value, for a handler that does
/// not know the requested verb.
pub(crate) fn unsupported_action(kind: &str, action: &str) -> EngineError {
    EngineError::UnsupportedOperation(format!("{} {}", kind, action))
}

/// Append `-n <namespace>` when a namespace is set.
pub(crate) fn push_namespace(args: &mut Vec<String>, namespace: &str) {
    if !namespace.is_empty() {
        args.push("-n".into());
        args.push(namespace.into());
    }
}

/// Register every default handler on a dispatcher, sharing one runner.
pub fn register_default_handlers(dispatcher: &mut TaskDispatcher, kubectl: Arc<Kubectl>) {
    dispatcher.register(Box::new(pod::PodHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(deployment::DeploymentHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(namespace::NamespaceHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(context::ContextHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(events::EventsHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(metrics::MetricsHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(port_forward::PortForwardHandler::new(kubectl.clone())));
    dispatcher.register(Box::new(exec::ExecHandler::new(kubectl)));
}
