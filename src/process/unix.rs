//! Unix signal helpers for terminating child processes
//!
//! Termination is best-effort POSIX: SIGTERM first for a graceful stop, then
//! SIGKILL. The forceful signal targets the entire process group when the
//! child leads its own group, so any children it spawned are reaped with it.
//!
//! `ESRCH` (no such process) and `EPERM` are treated as success: both mean
//! the target is already gone or past our reach, which is the outcome the
//! caller wanted.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgid, Pid};
use tracing::{debug, error};

use crate::error::{Result, ShellError};

fn send(result: nix::Result<()>, pid: Pid, signal: Signal) -> Result<()> {
    match result {
        Ok(()) => {
            debug!(%pid, %signal, "signal sent");
            Ok(())
        }
        Err(Errno::ESRCH) | Err(Errno::EPERM) => {
            debug!(%pid, %signal, "process already exited");
            Ok(())
        }
        Err(e) => {
            error!(%pid, %signal, error = %e, "failed to send signal");
            Err(ShellError::Io(std::io::Error::from_raw_os_error(e as i32)))
        }
    }
}

/// Request graceful termination with SIGTERM.
pub(crate) fn terminate(pid: u32) -> Result<()> {
    let pid = Pid::from_raw(pid as i32);
    send(kill(pid, Signal::SIGTERM), pid, Signal::SIGTERM)
}

/// Forcefully terminate with SIGKILL, targeting the whole process group when
/// `pid` is its own group leader.
pub(crate) fn kill_hard(pid: u32) -> Result<()> {
    let pid = Pid::from_raw(pid as i32);
    let leads_group = getpgid(Some(pid)).map(|pgid| pgid == pid).unwrap_or(false);
    if leads_group {
        send(killpg(pid, Signal::SIGKILL), pid, Signal::SIGKILL)
    } else {
        send(kill(pid, Signal::SIGKILL), pid, Signal::SIGKILL)
    }
}
