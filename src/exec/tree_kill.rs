// src/exec/tree_kill.rs

//! Killing a child together with everything it spawned.
//!
//! On Unix the child is started as the leader of its own process group, so
//! signalling the group reaches grandchildren. On Windows `taskkill /T`
//! walks the tree.

use std::io;

use tokio::process::{Child, Command};
use tracing::debug;

/// Prepare `cmd` so its process tree can be killed as a unit.
pub fn configure_process_group(cmd: &mut Command) {
    #[cfg(unix)]
    cmd.process_group(0);
    #[cfg(not(unix))]
    let _ = cmd;
}

/// Kill the whole tree rooted at `child` and reap it.
pub async fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    if let Some(pid) = child.id() {
        kill_tree_by_pid(pid).await;
    }
    // Reaps the direct child; also covers platforms without group support.
    match child.kill().await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
            debug!(error = %e, "child already exited");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
async fn kill_tree_by_pid(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(windows)]
async fn kill_tree_by_pid(pid: u32) {
    use std::process::Stdio;

    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = status {
        debug!(pid, error = %e, "taskkill failed");
    }
}

#[cfg(not(any(unix, windows)))]
async fn kill_tree_by_pid(_pid: u32) {}
