use std::{path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::{debug, info};

use crate::utils::dir::AppPaths;

/// Stops every running process started from `executable`, except this one and its children.
/// Returns how many were stopped.
pub fn kill_previous_servers(executable: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't determine own pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| executable == *v)
            .is_some()
        {
            debug!("Stopping {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops a running daemon and starts a fresh one for `paths`. The daemon detaches by itself, so
/// this only has to spawn it.
pub fn restart_server(daemon: &Path, paths: &AppPaths, location: &str) -> Result<()> {
    let stopped = kill_previous_servers(daemon)?;
    info!("Stopped {stopped} previous daemons");

    let mut command = std::process::Command::new(daemon);
    command
        .arg("--dir")
        .arg(paths.dir())
        .arg("--path")
        .arg(location);

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {daemon:?}");
    // The daemonizing parent exits right away.
    command.status()?;
    Ok(())
}
