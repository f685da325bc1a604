use crate::config::ServiceConfig;
use crate::error::{ProcletError, Result};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Metadata returned when spawning a process
#[derive(Debug)]
pub struct SpawnedProcess {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,
}

/// Spawn a process from the given launch specification.
///
/// The child is created with:
/// - standard input suppressed
/// - standard output/error captured via pipes
/// - the caller's environment inherited, with `config.env` layered on top
/// - the configured working directory, if any
/// - on unix, its own OS process group, so it is detached from the
///   caller's group and the whole descendant tree can be signaled at once
pub fn spawn_process(config: &ServiceConfig) -> Result<SpawnedProcess> {
    let mut command = Command::new(&config.command);

    if !config.args.is_empty() {
        command.args(&config.args);
    }

    if let Some(ref cwd) = config.cwd {
        command.current_dir(cwd);
    }

    for (key, value) in &config.env {
        command.env(key, value);
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Fresh process group: signals aimed at the group reach descendants too,
    // and the child survives caller teardown unless explicitly targeted.
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(|e| {
        ProcletError::SpawnError(format!("'{}': {}", config.command, e))
    })?;

    let pid = child.id().ok_or_else(|| {
        ProcletError::SpawnError(format!("'{}': no PID reported", config.command))
    })?;

    tracing::debug!("Spawned process '{}' (PID: {})", config.command, pid);

    Ok(SpawnedProcess { child, pid })
}
