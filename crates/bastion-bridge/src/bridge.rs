//! One worker bridge per sandboxed plugin (§4.7).

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use bastion_core::{ErrorKind, PluginId};
use bastion_permissions::Permissions;
use bastion_syscall::SyscallHandler;
use bastion_wire::{read_envelope, write_envelope, Envelope, EnvelopeKind, WireError};

use crate::error::BridgeError;
use crate::timeouts::BridgeTimeouts;

type PendingTable = DashMap<Uuid, oneshot::Sender<Result<Value, WireError>>>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Owns one sandboxed worker: the handshake, the pending hook-call table,
/// and both directions of traffic over a framed transport (§4.7).
pub struct WorkerBridge {
    plugin_id: PluginId,
    writer: Arc<AsyncMutex<BoxedWriter>>,
    pending: Arc<PendingTable>,
    hook_timeout: std::time::Duration,
    reader_task: JoinHandle<()>,
    child: AsyncMutex<Option<Child>>,
    stopped: AtomicBool,
}

impl WorkerBridge {
    /// Spawn the sandbox as a child process running `runtime_command`
    /// (e.g. `"node"`) with `entry_path` as its final argument, then perform
    /// the handshake over its stdio (§4.7 "Startup").
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the process cannot be spawned
    /// or its stdio cannot be captured, or the handshake errors documented
    /// on [`Self::connect`].
    pub async fn spawn_process(
        plugin_id: PluginId,
        runtime_command: &str,
        runtime_args: &[String],
        entry_path: &Path,
        init_payload: Value,
        syscall_handler: Arc<SyscallHandler>,
        permissions: Arc<Permissions>,
        timeouts: BridgeTimeouts,
    ) -> Result<Self, BridgeError> {
        let mut command = Command::new(runtime_command);
        command
            .args(runtime_args)
            .arg(entry_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command
            .spawn()
            .map_err(|e| BridgeError::Transport(format!("failed to spawn sandbox process: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Transport("child process has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Transport("child process has no stdout".to_string()))?;

        Self::connect_inner(
            plugin_id,
            init_payload,
            stdout,
            stdin,
            syscall_handler,
            permissions,
            timeouts,
            Some(child),
        )
        .await
    }

    /// Perform the startup handshake (§4.7 "Startup") over an already-spawned
    /// transport, then spin up the background reader loop that services
    /// both hook-call responses and inbound sys-calls for the remainder of
    /// the worker's lifetime. Use this directly for transports that are not
    /// OS processes (e.g. tests); [`Self::spawn_process`] is the production
    /// entry point.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SandboxReadyTimeout`] if `SANDBOX_READY` is
    /// not observed in time, or [`BridgeError::InitFailed`] if the `INIT`
    /// round trip fails or times out.
    pub async fn connect<R, W>(
        plugin_id: PluginId,
        init_payload: Value,
        reader: R,
        writer: W,
        syscall_handler: Arc<SyscallHandler>,
        permissions: Arc<Permissions>,
        timeouts: BridgeTimeouts,
    ) -> Result<Self, BridgeError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::connect_inner(
            plugin_id,
            init_payload,
            reader,
            writer,
            syscall_handler,
            permissions,
            timeouts,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn connect_inner<R, W>(
        plugin_id: PluginId,
        init_payload: Value,
        mut reader: R,
        writer: W,
        syscall_handler: Arc<SyscallHandler>,
        permissions: Arc<Permissions>,
        timeouts: BridgeTimeouts,
        child: Option<Child>,
    ) -> Result<Self, BridgeError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let ready = tokio::time::timeout(timeouts.sandbox_ready, read_envelope(&mut reader))
            .await
            .map_err(|_| BridgeError::SandboxReadyTimeout)??;
        if ready.kind != EnvelopeKind::SandboxReady {
            return Err(BridgeError::InitFailed(format!(
                "expected SANDBOX_READY, got {:?}",
                ready.kind
            )));
        }

        let writer: Arc<AsyncMutex<BoxedWriter>> = Arc::new(AsyncMutex::new(Box::new(writer)));

        let init_envelope = Envelope::init(init_payload);
        let init_id = init_envelope.id;
        write_envelope(&mut *writer.lock().await, &init_envelope).await?;

        let init_response = tokio::time::timeout(timeouts.sandbox_ready, read_envelope(&mut reader))
            .await
            .map_err(|_| BridgeError::InitFailed("timed out waiting for INIT response".to_string()))??;
        if init_response.id != init_id {
            return Err(BridgeError::InitFailed(
                "INIT response id did not match the request".to_string(),
            ));
        }
        if init_response.kind == EnvelopeKind::ResponseErr {
            let message = init_response
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unspecified INIT failure".to_string());
            return Err(BridgeError::InitFailed(message));
        }

        let pending: Arc<PendingTable> = Arc::new(DashMap::new());
        let reader_task = tokio::spawn(reader_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&writer),
            syscall_handler,
            permissions,
            plugin_id.clone(),
            timeouts.syscall,
        ));

        Ok(Self {
            plugin_id,
            writer,
            pending,
            hook_timeout: timeouts.hook,
            reader_task,
            child: AsyncMutex::new(child),
            stopped: AtomicBool::new(false),
        })
    }

    /// Call a hook and await its result, bounded by the configured hook
    /// timeout (§4.7 "Hook call"). `Value::Null` stands in for the
    /// sandbox-side `undefined` return.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerStopped`] if the bridge has already been
    /// shut down, [`BridgeError::HookTimeout`] if no response arrives in
    /// time, or [`BridgeError::HookFailed`] if the sandbox raised an error.
    pub async fn call_hook(&self, method: &str, payload: Value) -> Result<Value, BridgeError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BridgeError::WorkerStopped);
        }
        self.call_hook_unchecked(method, payload).await
    }

    async fn call_hook_unchecked(&self, method: &str, payload: Value) -> Result<Value, BridgeError> {
        let envelope = Envelope::hook_call(method, payload);
        let id = envelope.id;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        {
            let mut guard = self.writer.lock().await;
            if let Err(e) = write_envelope(&mut *guard, &envelope).await {
                self.pending.remove(&id);
                return Err(BridgeError::from(e));
            }
        }

        match tokio::time::timeout(self.hook_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(wire_err))) => Err(BridgeError::HookFailed(wire_err)),
            Ok(Err(_canceled)) => Err(BridgeError::WorkerStopped),
            Err(_) => {
                self.pending.remove(&id);
                Err(BridgeError::HookTimeout)
            }
        }
    }

    /// Shut down the worker (§4.7 "Shutdown"): best-effort `onUnload`, cancel
    /// every pending call with `WORKER_STOPPED`, and stop servicing the
    /// transport. Idempotent — a second call is a no-op.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        if tokio::time::timeout(self.hook_timeout, self.call_hook_unchecked("onUnload", Value::Null))
            .await
            .is_err()
        {
            warn!(plugin_id = %self.plugin_id, "onUnload hook timed out during shutdown");
        }

        let pending_ids: Vec<Uuid> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in pending_ids {
            if let Some((_, sender)) = self.pending.remove(&id) {
                let _ = sender.send(Err(WireError::new(
                    ErrorKind::WorkerStopped.as_code(),
                    "worker stopped",
                )));
            }
        }

        self.reader_task.abort();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                warn!(plugin_id = %self.plugin_id, error = %e, "failed to kill sandbox process");
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn reader_loop<R: AsyncRead + Unpin + Send>(
    mut reader: R,
    pending: Arc<PendingTable>,
    writer: Arc<AsyncMutex<BoxedWriter>>,
    syscall_handler: Arc<SyscallHandler>,
    permissions: Arc<Permissions>,
    plugin_id: PluginId,
    syscall_timeout: std::time::Duration,
) {
    loop {
        let envelope = match read_envelope(&mut reader).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(plugin_id = %plugin_id, error = %e, "worker transport closed");
                break;
            }
        };

        match envelope.kind {
            EnvelopeKind::ResponseOk | EnvelopeKind::ResponseErr => {
                if let Some((_, sender)) = pending.remove(&envelope.id) {
                    let result = if envelope.kind == EnvelopeKind::ResponseOk {
                        Ok(envelope.result.unwrap_or(Value::Null))
                    } else {
                        Err(envelope
                            .error
                            .unwrap_or_else(|| WireError::new("HOOK_ERROR", "no error payload")))
                    };
                    let _ = sender.send(result);
                }
            }
            EnvelopeKind::SysCall => {
                let method = envelope.method.clone().unwrap_or_default();
                let payload = envelope.payload.clone().unwrap_or(Value::Null);
                let request_id = envelope.id;

                let response = match tokio::time::timeout(
                    syscall_timeout,
                    syscall_handler.handle(&plugin_id, &permissions, &method, payload),
                )
                .await
                {
                    Ok(Ok(result)) => Envelope::response_ok(request_id, result),
                    Ok(Err(e)) => Envelope::response_err(request_id, WireError::new(e.code(), e.to_string())),
                    Err(_) => Envelope::response_err(
                        request_id,
                        WireError::new("SYSCALL_TIMEOUT", "syscall handler timed out"),
                    ),
                };

                let mut guard = writer.lock().await;
                if let Err(e) = write_envelope(&mut *guard, &response).await {
                    warn!(plugin_id = %plugin_id, error = %e, "failed to write syscall response");
                }
            }
            other => {
                warn!(plugin_id = %plugin_id, kind = ?other, "unexpected envelope kind from worker");
            }
        }
    }

    let remaining: Vec<Uuid> = pending.iter().map(|entry| *entry.key()).collect();
    for id in remaining {
        if let Some((_, sender)) = pending.remove(&id) {
            let _ = sender.send(Err(WireError::new(
                ErrorKind::WorkerStopped.as_code(),
                "worker transport closed",
            )));
        }
    }
}
