//! Process-group signal delivery.
//!
//! Termination always targets the OS process group rooted at the spawned
//! child (which leads its own group, see the spawner), so descendant
//! processes are reclaimed along with it.

use crate::error::{ProcletError, Result};

/// Send SIGTERM immediately followed by SIGKILL to an entire process group.
///
/// There is no grace period between the two signals: guaranteed termination
/// of the whole descendant tree takes precedence over clean shutdown. Both
/// deliveries are attempted even if the first fails; the first failure is
/// returned so the caller can record it.
#[cfg(unix)]
pub fn terminate_group(pgid: u32) -> Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(pgid as i32);

    tracing::debug!("Sending SIGTERM + SIGKILL to process group {}", pgid);

    let term = killpg(group, Signal::SIGTERM);
    let kill = killpg(group, Signal::SIGKILL);

    term.and(kill)
        .map_err(|e| ProcletError::SignalError(format!("process group {}: {}", pgid, e)))
}

#[cfg(not(unix))]
pub fn terminate_group(pgid: u32) -> Result<()> {
    Err(ProcletError::SignalError(format!(
        "process group termination is not supported on this platform (pgid {})",
        pgid
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminate_running_group() {
        use std::process::Stdio;

        let mut child = tokio::process::Command::new("/bin/sleep")
            .arg("30")
            .process_group(0)
            .stdin(Stdio::null())
            .spawn()
            .expect("Failed to spawn sleep");

        let pid = child.id().expect("Failed to get PID");

        terminate_group(pid).expect("Signal delivery failed");

        let status = child.wait().await.expect("wait failed");
        // Killed by signal: no exit code on unix.
        assert!(status.code().is_none());
    }

    #[test]
    fn test_terminate_missing_group() {
        // A PID far outside the default pid_max range: delivery must fail
        // with an error rather than panic.
        let result = terminate_group(9_999_999);
        assert!(matches!(result, Err(ProcletError::SignalError(_))));
    }
}
