//! Resolution of redirection targets into concrete stream handles
//!
//! A [`Redirect`] is turned into an OS-level sink exactly once, just before
//! spawn. Captured streams get an explicit OS pipe so that a merged stderr
//! (demux off) can share stdout's write end; file targets are opened for
//! binary write and truncated.

use std::fs::{File, OpenOptions};
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use std::process::Stdio;

use nix::unistd::pipe;

use crate::error::Result;
use crate::types::Redirect;

/// Parent side of one resolved output stream.
pub(crate) enum Capture {
    /// Blocking read end of the pipe feeding a captured stream. A background
    /// reader drains it into an in-memory buffer once the process starts.
    Pipe(File),
    /// File-backed target; reads reopen the file fresh each time.
    File(PathBuf),
    /// Nothing to capture (inherited, or merged into stdout).
    None,
}

/// Child-side sink for one output stream, kept in a cloneable form so a
/// merged stderr can duplicate stdout's descriptor before spawn.
enum Sink {
    Fd(OwnedFd),
    FileHandle(File),
    Inherit,
}

impl Sink {
    fn duplicate(&self) -> Result<Sink> {
        Ok(match self {
            Sink::Fd(fd) => Sink::Fd(fd.try_clone()?),
            Sink::FileHandle(file) => Sink::FileHandle(file.try_clone()?),
            Sink::Inherit => Sink::Inherit,
        })
    }

    fn into_stdio(self) -> Stdio {
        match self {
            Sink::Fd(fd) => Stdio::from(fd),
            Sink::FileHandle(file) => Stdio::from(file),
            Sink::Inherit => Stdio::inherit(),
        }
    }
}

/// Fully resolved standard streams for one spawn.
pub(crate) struct ResolvedStreams {
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
    pub stdout_capture: Capture,
    pub stderr_capture: Capture,
}

/// Resolve all three standard streams for a spawn with the given redirect
/// targets. With `demux` off, stderr shares stdout's sink and gets no
/// capture of its own.
pub(crate) fn resolve(
    stdin: &Redirect,
    stdout: &Redirect,
    stderr: &Redirect,
    demux: bool,
) -> Result<ResolvedStreams> {
    let stdin = match stdin {
        Redirect::Captured => Stdio::piped(),
        Redirect::File(path) => Stdio::from(File::open(path)?),
        Redirect::Inherit => Stdio::inherit(),
    };

    let (stdout_sink, stdout_capture) = resolve_output(stdout)?;
    let (stderr_sink, stderr_capture) = if demux {
        resolve_output(stderr)?
    } else {
        (stdout_sink.duplicate()?, Capture::None)
    };

    Ok(ResolvedStreams {
        stdin,
        stdout: stdout_sink.into_stdio(),
        stderr: stderr_sink.into_stdio(),
        stdout_capture,
        stderr_capture,
    })
}

fn resolve_output(target: &Redirect) -> Result<(Sink, Capture)> {
    match target {
        Redirect::Captured => {
            let (read_end, write_end) = pipe().map_err(std::io::Error::from)?;
            Ok((Sink::Fd(write_end), Capture::Pipe(File::from(read_end))))
        }
        Redirect::File(path) => {
            let path = std::path::absolute(path)?;
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            Ok((Sink::FileHandle(file), Capture::File(path)))
        }
        Redirect::Inherit => Ok((Sink::Inherit, Capture::None)),
    }
}
