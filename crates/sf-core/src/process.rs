//! Bounded waits on external processes.
//!
//! Simulators and exported evaluators are external programs that may hang.
//! Every wait here has a deadline, after which the child is killed and reaped.
//!
//! Children are often shell wrappers. Spawning them with [`own_process_group`]
//! lets a timeout kill everything the wrapper started, not just the wrapper.

use std::io;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(2);
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    /// The deadline passed; the child has been killed.
    TimedOut,
}

/// Start the command as the leader of a new process group.
///
/// No-op on platforms without process groups.
#[cfg(unix)]
pub fn own_process_group(command: &mut Command) -> &mut Command {
    use std::os::unix::process::CommandExt;
    command.process_group(0)
}

#[cfg(not(unix))]
pub fn own_process_group(command: &mut Command) -> &mut Command {
    command
}

/// Kill `child` and, if it leads a process group, every member of that group.
pub fn kill_process_tree(child: &mut Child) {
    kill_group(child);
    // The child may exit between try_wait and kill.
    let _ = child.kill();
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(raw) = i32::try_from(child.id()) {
        // ESRCH when the child is not a group leader.
        let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// `None` waits without a deadline. On timeout the child's process group is
/// killed as well; see [`own_process_group`].
pub fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<WaitOutcome> {
    let Some(timeout) = timeout else {
        return child.wait().map(WaitOutcome::Exited);
    };

    let deadline = Instant::now() + timeout;
    let mut interval = POLL_INTERVAL;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitOutcome::Exited(status));
        }
        let now = Instant::now();
        if now >= deadline {
            kill_process_tree(child);
            child.wait()?;
            return Ok(WaitOutcome::TimedOut);
        }
        std::thread::sleep(interval.min(deadline - now));
        interval = (interval * 2).min(MAX_POLL_INTERVAL);
    }
}
