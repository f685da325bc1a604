use crate::config::ServiceConfig;
use crate::error::{ProcletError, Result};
use crate::process::signal::terminate_group;
use crate::process::spawner::spawn_process;
use crate::process::types::ProcessStatus;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Update posted by the OS-facing monitor tasks and applied to the handle
/// state by a single applier task.
#[derive(Debug)]
enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    Exited { code: Option<i32> },
    WaitFailed(String),
}

#[derive(Debug)]
struct HandleState {
    status: ProcessStatus,
    stdout: String,
    stderr: String,
    exit_code: i32,
    pid: Option<u32>,
    last_error: Option<ProcletError>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

impl HandleState {
    fn new() -> Self {
        Self {
            status: ProcessStatus::NotStarted,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            pid: None,
            last_error: None,
            start_time: None,
            end_time: None,
            started_at: None,
        }
    }
}

/// A single spawned process: launch specification, accumulated output,
/// status, timing and exit information.
///
/// Handles are cheap to clone; clones share the same underlying state, so a
/// clone can be captured by a condition closure while the original keeps
/// driving the lifecycle. Each handle is single-use: one `start`, at most
/// one terminal state. A new spawn always means a new handle (the owning
/// [`crate::ProcessGroup`] creates one per attempt).
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    config: ServiceConfig,
    state: Arc<RwLock<HandleState>>,
}

impl ProcessHandle {
    /// Create a handle for the given launch specification. Nothing is
    /// spawned until [`ProcessHandle::start`] is called.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(HandleState::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HandleState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandleState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the configured command and return immediately.
    ///
    /// On spawn success the status becomes [`ProcessStatus::Started`] and
    /// background tasks begin draining stdout/stderr and watching for exit.
    /// A spawn failure (for example, command not found) is NOT an `Err`: it
    /// resolves the handle to terminal [`ProcessStatus::Failed`] with the
    /// cause retrievable through [`ProcessHandle::get_error`].
    ///
    /// Returns an error only when the launch specification is invalid or
    /// the handle has already been used.
    pub async fn start(&self) -> Result<()> {
        self.config.validate()?;

        let child = {
            let mut state = self.write();

            if state.status != ProcessStatus::NotStarted {
                return Err(ProcletError::InvalidProcessState(
                    self.config.command.clone(),
                    format!("start on a handle that is already {}", state.status),
                ));
            }

            match spawn_process(&self.config) {
                Ok(spawned) => {
                    state.pid = Some(spawned.pid);
                    state.start_time = Some(Instant::now());
                    state.started_at = Some(Utc::now());
                    state.status = ProcessStatus::Started;
                    Some(spawned.child)
                }
                Err(err) => {
                    let now = Instant::now();
                    state.start_time = Some(now);
                    state.end_time = Some(now);
                    state.started_at = Some(Utc::now());
                    state.status = ProcessStatus::Failed;
                    state.last_error = Some(err);
                    None
                }
            }
        };

        match child {
            Some(child) => {
                tracing::info!(
                    "Process '{}' started (PID: {:?})",
                    self.config.command,
                    self.get_pid()
                );
                self.spawn_monitor_tasks(child);
            }
            None => {
                tracing::warn!(
                    "Process '{}' failed to start: {:?}",
                    self.config.command,
                    self.get_error()
                );
            }
        }

        Ok(())
    }

    /// Wire the event pipeline for a freshly spawned child.
    ///
    /// Two drain tasks post output chunks, one exit task owns the `Child`
    /// and posts the exit status, and a single applier task performs every
    /// write to the shared state. The applier is the only writer of the
    /// output buffers.
    fn spawn_monitor_tasks(&self, mut child: Child) {
        let (tx, mut rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            spawn_drain_task(stdout, ProcessEvent::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_drain_task(stderr, ProcessEvent::Stderr, tx.clone());
        }

        let exit_tx = tx;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    let _ = exit_tx.send(ProcessEvent::Exited {
                        code: status.code(),
                    });
                }
                Err(e) => {
                    let _ = exit_tx.send(ProcessEvent::WaitFailed(e.to_string()));
                }
            }
        });

        let state = Arc::clone(&self.state);
        let command = self.config.command.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                apply_event(&state, &command, event);
            }
        });
    }

    /// Stop the process by signaling its entire OS process group: SIGTERM
    /// immediately followed by SIGKILL, no grace period in between.
    ///
    /// Never blocks and never fails: a delivery error (the process is
    /// already gone) is recorded in the handle's error slot, and the status
    /// resolves to [`ProcessStatus::Stopped`] unless a terminal state was
    /// already reached.
    pub fn stop(&self) {
        let pid = self.read().pid;

        if let Some(pid) = pid {
            if let Err(err) = terminate_group(pid) {
                tracing::debug!(
                    "Stop of '{}' (PID: {}) could not deliver signals: {}",
                    self.config.command,
                    pid,
                    err
                );
                let mut state = self.write();
                state.last_error = Some(ProcletError::StopError(
                    self.config.command.clone(),
                    err.to_string(),
                ));
            }
        }

        let mut state = self.write();
        if !state.status.is_terminal() {
            state.status = ProcessStatus::Stopped;
            if state.end_time.is_none() && state.start_time.is_some() {
                state.end_time = Some(Instant::now());
            }
        }
    }

    /// Poll `condition` until it holds, `timeout` accumulates, or the
    /// process leaves the `Started` state, sleeping `poll_interval` between
    /// checks.
    ///
    /// The returned value is the condition evaluated one final time after
    /// the loop exits; that last check can make the result `true` even when
    /// the loop ended on timeout, or `false` when it ended on a status
    /// change.
    ///
    /// The condition must be pure with respect to this handle and must not
    /// panic; a panic propagates to the caller unmodified.
    pub async fn wait_condition<F>(
        &self,
        mut condition: F,
        timeout: Duration,
        poll_interval: Duration,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut waited = Duration::ZERO;

        while !condition() && waited < timeout && self.get_status().is_started() {
            tokio::time::sleep(poll_interval).await;
            waited += poll_interval;
        }

        condition()
    }

    /// Elapsed run time: time since start while the process is running (a
    /// "so far" reading that keeps growing), exact span once terminated,
    /// zero if never started.
    pub fn get_duration(&self) -> Duration {
        let state = self.read();
        match (state.start_time, state.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Current lifecycle status
    pub fn get_status(&self) -> ProcessStatus {
        self.read().status
    }

    /// Accumulated standard output
    pub fn get_stdout(&self) -> String {
        self.read().stdout.clone()
    }

    /// Accumulated standard error
    pub fn get_stderr(&self) -> String {
        self.read().stderr.clone()
    }

    /// Most recent error (spawn failure, signal-delivery failure)
    pub fn get_error(&self) -> Option<ProcletError> {
        self.read().last_error.clone()
    }

    /// OS process id, present once the handle has been started
    pub fn get_pid(&self) -> Option<u32> {
        self.read().pid
    }

    /// Exit code reported by the OS; -1 until the process terminates (and
    /// for signal-killed processes, which report no code)
    pub fn get_exit_code(&self) -> i32 {
        self.read().exit_code
    }

    /// Wall-clock timestamp of the start call, for harness logs
    pub fn get_started_at(&self) -> Option<DateTime<Utc>> {
        self.read().started_at
    }

    /// The launch specification this handle was created from
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // Monotonic timestamps for group-level duration math.
    pub(crate) fn start_instant(&self) -> Option<Instant> {
        self.read().start_time
    }

    pub(crate) fn end_instant(&self) -> Option<Instant> {
        self.read().end_time
    }
}

fn spawn_drain_task<R>(
    mut reader: R,
    make_event: fn(String) -> ProcessEvent,
    sender: UnboundedSender<ProcessEvent>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if sender.send(make_event(chunk)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn apply_event(state: &Arc<RwLock<HandleState>>, command: &str, event: ProcessEvent) {
    let mut state = state.write().unwrap_or_else(PoisonError::into_inner);

    match event {
        ProcessEvent::Stdout(chunk) => state.stdout.push_str(&chunk),
        ProcessEvent::Stderr(chunk) => state.stderr.push_str(&chunk),
        ProcessEvent::Exited { code } => {
            if state.end_time.is_none() {
                state.end_time = Some(Instant::now());
            }
            if let Some(code) = code {
                state.exit_code = code;
            }
            // Already Stopped (stop() was called) stays Stopped; a
            // signal-killed exit (no code reported) also resolves to
            // Stopped; a plain exit is Finished. Terminal states are never
            // overwritten.
            if !state.status.is_terminal() {
                state.status = if code.is_none() {
                    ProcessStatus::Stopped
                } else {
                    ProcessStatus::Finished
                };
            }
            tracing::debug!(
                "Process '{}' exited (code: {:?}, status: {})",
                command,
                code,
                state.status
            );
        }
        ProcessEvent::WaitFailed(reason) => {
            if state.end_time.is_none() {
                state.end_time = Some(Instant::now());
            }
            state.last_error = Some(ProcletError::Internal(format!(
                "wait on '{}' failed: {}",
                command, reason
            )));
            if !state.status.is_terminal() {
                state.status = ProcessStatus::Stopped;
            }
        }
    }
}
