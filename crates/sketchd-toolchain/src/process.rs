//! Toolchain child process management

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use sketchd_core::prelude::*;
use sketchd_core::ToolchainEvent;

use super::commands::{next_request_id, CommandSender, RequestTracker, ToolchainCommand};

/// How to launch the toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpawn {
    /// Executable name (resolved on PATH) or path
    pub command: String,
    pub args: Vec<String>,
    /// Working directory, usually the sketchbook
    pub working_dir: Option<PathBuf>,
}

impl ToolchainSpawn {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Locate the executable, failing with `ToolchainNotFound` if it is not on PATH
    pub fn resolve(&self) -> Result<PathBuf> {
        let direct = Path::new(&self.command);
        if direct.components().count() > 1 && direct.is_file() {
            return Ok(direct.to_path_buf());
        }
        which::which(&self.command).map_err(|_| Error::ToolchainNotFound {
            command: self.command.clone(),
        })
    }
}

/// Manages the toolchain child process.
///
/// The `Child` is owned by a background `wait_for_exit` task so the real exit
/// code is reported as `ToolchainEvent::Exited`. This handle keeps a kill
/// channel, an exited flag for synchronous checks and a `Notify` that
/// `shutdown()` awaits.
pub struct ToolchainProcess {
    stdin_tx: mpsc::Sender<String>,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: Arc<AtomicBool>,
    exit_notify: Arc<Notify>,
}

impl ToolchainProcess {
    /// Spawn the toolchain. Stdout/stderr lines and the exit are sent to `event_tx`.
    pub fn spawn(spawn: &ToolchainSpawn, event_tx: mpsc::Sender<ToolchainEvent>) -> Result<Self> {
        let program = spawn.resolve()?;

        info!(
            "Spawning toolchain: {} {}",
            program.display(),
            spawn.args.join(" ")
        );

        let mut command = Command::new(&program);
        command
            .args(&spawn.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spawn.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolchainNotFound {
                    command: spawn.command.clone(),
                }
            } else {
                Error::ProcessSpawn {
                    reason: e.to_string(),
                }
            }
        })?;

        let process = Self::attach(child, event_tx)?;
        info!("Toolchain process started with PID: {:?}", process.pid);
        Ok(process)
    }

    /// Wire up reader/writer/wait tasks for an already spawned child
    fn attach(mut child: Child, event_tx: mpsc::Sender<ToolchainEvent>) -> Result<Self> {
        let pid = child.id();

        let stdin = child.stdin.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stdin was not piped".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stdout was not piped".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stderr was not piped".to_string(),
        })?;

        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(Self::stdin_writer(stdin, stdin_rx));
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            stdin_tx,
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Owns `child` until it exits naturally or `kill_rx` fires, then emits `Exited`
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<ToolchainEvent>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Toolchain exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for toolchain: {}", e);
                        None
                    }
                }
            }
            _ = kill_rx => {
                info!("Kill signal received, force-killing toolchain");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill toolchain: {}", e);
                }
                match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Flag before the event so has_exited() is true when callers see it
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();

        debug!("Sending ToolchainEvent::Exited {{ code: {:?} }}", code);
        let _ = event_tx.send(ToolchainEvent::Exited { code }).await;
    }

    async fn stdout_reader(stdout: tokio::process::ChildStdout, tx: mpsc::Sender<ToolchainEvent>) {
        let mut reader = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stdout: {}", line);

            if tx.send(ToolchainEvent::Stdout(line)).await.is_err() {
                debug!("stdout channel closed");
                break;
            }
        }

        info!("stdout reader finished, toolchain likely exiting");
    }

    async fn stderr_reader(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<ToolchainEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stderr: {}", line);

            if tx.send(ToolchainEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("stderr reader finished");
    }

    async fn stdin_writer(mut stdin: tokio::process::ChildStdin, mut rx: mpsc::Receiver<String>) {
        while let Some(command) = rx.recv().await {
            debug!("Sending to toolchain: {}", command);

            if let Err(e) = stdin.write_all(command.as_bytes()).await {
                error!("Failed to write to stdin: {}", e);
                break;
            }
            if let Err(e) = stdin.write_all(b"\n").await {
                error!("Failed to write newline: {}", e);
                break;
            }
            if let Err(e) = stdin.flush().await {
                error!("Failed to flush stdin: {}", e);
                break;
            }
        }

        debug!("stdin writer finished");
    }

    /// Gracefully shut down: send `shutdown`, wait up to 2s, then force kill
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.has_exited() {
            info!("Toolchain already exited, skipping shutdown request");
            return Ok(());
        }

        info!("Initiating toolchain shutdown");

        let line = format!("[{}]", ToolchainCommand::Shutdown.build(next_request_id()));
        let _ = self.stdin_tx.send(line).await;

        // Create the notified future before the final check so a wakeup between
        // the check and the await is not lost
        let notified = self.exit_notify.notified();
        if self.has_exited() {
            return Ok(());
        }

        match tokio::time::timeout(Duration::from_secs(2), notified).await {
            Ok(()) => {
                info!("Toolchain exited gracefully");
                Ok(())
            }
            Err(_) => {
                warn!("Timeout waiting for graceful exit, force killing");
                self.force_kill();
                Ok(())
            }
        }
    }

    fn force_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Create a command sender for this process
    pub fn command_sender(&self, tracker: Arc<RequestTracker>) -> CommandSender {
        CommandSender::new(self.stdin_tx.clone(), tracker)
    }
}

impl Drop for ToolchainProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("ToolchainProcess dropped while process may still be running");
            self.force_kill();
        }
        debug!("ToolchainProcess dropped");
    }
}
