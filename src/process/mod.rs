//! Process lifecycle management
//!
//! A [`Process`] owns a single child process: it is created unstarted,
//! started at most once, and finishes either by natural exit or by
//! [`Process::kill`]. Starting spawns one background waiter thread whose
//! only job is to reap the child and record its exit status; every liveness
//! query (`is_running`, `pid`, `exit_code`) goes straight to the OS handle,
//! never to the waiter, so there is no race between "waiter has not run yet"
//! and "OS says the process already exited".
//!
//! Captured output is drained by per-stream reader threads into in-memory
//! buffers; file-backed output is re-read from the file on every call. The
//! two modes deliberately behave differently: a pipe read drains what has
//! arrived since the last read, a file read returns the file's entire
//! current contents.

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ExitStatus};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, ShellError};
use crate::types::{Encoding, ExecResult, Redirect};

mod stream;
mod unix;

use stream::Capture;

/// Fixed interval at which `wait` and the waiter thread poll for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `kill` waits after SIGTERM before escalating to SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Outcome of a [`Process::kill`] request.
///
/// OS-level failures are reported here rather than propagated; a caller that
/// needs certainty after [`KillOutcome::Failed`] should re-check
/// [`Process::is_running`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    /// The process was signalled and its handle released.
    Killed,
    /// The handle was already released by an earlier kill.
    AlreadyFinished,
    /// The process was never started.
    NeverStarted,
    /// An OS error interrupted the kill sequence.
    Failed(String),
}

/// Configuration for one child process, fixed at construction.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    command: Vec<String>,
    stdin: Redirect,
    stdout: Redirect,
    stderr: Redirect,
    demux: bool,
    environment: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    encoding: Encoding,
}

impl ProcessConfig {
    /// Create a configuration for the given command vector (executable
    /// followed by its arguments).
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            stdin: Redirect::Captured,
            stdout: Redirect::Captured,
            stderr: Redirect::Captured,
            demux: true,
            environment: Vec::new(),
            working_dir: None,
            encoding: Encoding::default(),
        }
    }

    /// Set the stdin redirection target.
    pub fn stdin(mut self, target: Redirect) -> Self {
        self.stdin = target;
        self
    }

    /// Set the stdout redirection target.
    pub fn stdout(mut self, target: Redirect) -> Self {
        self.stdout = target;
        self
    }

    /// Set the stderr redirection target.
    pub fn stderr(mut self, target: Redirect) -> Self {
        self.stderr = target;
        self
    }

    /// Capture stderr independently of stdout (`true`, the default) or merge
    /// it into stdout's sink (`false`).
    pub fn demux(mut self, demux: bool) -> Self {
        self.demux = demux;
        self
    }

    /// Add one environment variable override on top of the inherited
    /// environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    /// Add several environment variable overrides.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the working directory the child starts in (default: inherited).
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the text encoding for the child's streams.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Build and start the process.
    pub fn spawn(self) -> Result<Process> {
        let mut process = Process::new(self);
        process.start()?;
        Ok(process)
    }

    /// Build the process, run it to completion and collect its output.
    pub fn run(self) -> Result<ExecResult> {
        let mut process = self.spawn()?;
        process.wait(None);
        let exit_code = process.exit_code().unwrap_or(-1);
        let stdout = process.read()?;
        let stderr = process.eread()?;
        Ok(ExecResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// State shared between a [`Process`] and its waiter thread.
struct Shared {
    child: Option<Child>,
    exit_status: Option<ExitStatus>,
    /// Latched error from a failed status poll. Once set the process is
    /// reported as finished with exit code -1, since the OS can no longer
    /// tell us the real status.
    poll_error: Option<String>,
}

/// Parent side of one capture stream after start.
enum OutputStream {
    Buffer {
        data: Arc<Mutex<Vec<u8>>>,
        reader: Option<thread::JoinHandle<()>>,
    },
    File(PathBuf),
    None,
}

impl OutputStream {
    /// Drain or re-read this stream. Once the process has finished the
    /// pending reader thread is joined first, so the buffer holds the full
    /// remaining output.
    ///
    /// While the process may still be writing, an incomplete trailing
    /// multibyte sequence is held back for the next read rather than
    /// reported as a decode error; a strict decode failure leaves the
    /// buffer untouched.
    fn read(&mut self, encoding: Encoding, finished: bool) -> Result<String> {
        match self {
            OutputStream::Buffer { data, reader } => {
                if finished {
                    if let Some(handle) = reader.take() {
                        let _ = handle.join();
                    }
                }
                let mut buffer = data.lock();
                let mut take_len = buffer.len();
                if !finished {
                    if let Err(e) = std::str::from_utf8(&buffer) {
                        // error_len of None marks a sequence cut short at
                        // the end of the buffer; its remainder is still in
                        // flight.
                        if e.error_len().is_none() {
                            take_len = e.valid_up_to();
                        }
                    }
                }
                if encoding == Encoding::Utf8 {
                    if let Err(e) = std::str::from_utf8(&buffer[..take_len]) {
                        return Err(ShellError::Decode {
                            encoding: "utf-8".to_string(),
                            message: e.to_string(),
                        });
                    }
                }
                let tail = buffer.split_off(take_len);
                let bytes = std::mem::replace(&mut *buffer, tail);
                drop(buffer);
                encoding.decode(bytes)
            }
            OutputStream::File(path) => encoding.decode(std::fs::read(path)?),
            OutputStream::None => Ok(String::new()),
        }
    }
}

/// One spawned child process and its stream resources.
///
/// Lifecycle: `Unstarted -> Running -> Finished`. There is no restart; run
/// the same configuration again by building a new `Process`.
pub struct Process {
    config: ProcessConfig,
    shared: Arc<Mutex<Shared>>,
    pid: Option<u32>,
    started: bool,
    waiter: Option<thread::JoinHandle<()>>,
    stdin: Option<ChildStdin>,
    stdout_stream: OutputStream,
    stderr_stream: OutputStream,
}

impl Process {
    /// Create an unstarted process from its configuration.
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared {
                child: None,
                exit_status: None,
                poll_error: None,
            })),
            pid: None,
            started: false,
            waiter: None,
            stdin: None,
            stdout_stream: OutputStream::None,
            stderr_stream: OutputStream::None,
        }
    }

    /// The program this process runs (first element of the command vector).
    pub fn program(&self) -> &str {
        self.config.command.first().map(String::as_str).unwrap_or("")
    }

    /// Arguments passed to the program.
    pub fn arguments(&self) -> &[String] {
        self.config.command.get(1..).unwrap_or(&[])
    }

    /// Start the child process and its background waiter.
    ///
    /// Valid only once per instance. Spawn failure with `NotFound` surfaces
    /// as [`ShellError::CommandNotFound`]; any other spawn failure as
    /// [`ShellError::Spawn`].
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(ShellError::AlreadyStarted);
        }
        let program = self
            .config
            .command
            .first()
            .cloned()
            .ok_or_else(|| ShellError::Spawn {
                command: String::new(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "empty command vector",
                ),
            })?;

        let streams = stream::resolve(
            &self.config.stdin,
            &self.config.stdout,
            &self.config.stderr,
            self.config.demux,
        )?;

        let mut command = std::process::Command::new(&program);
        command
            .args(&self.config.command[1..])
            .stdin(streams.stdin)
            .stdout(streams.stdout)
            .stderr(streams.stderr)
            .envs(self.config.environment.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        debug!(command = %program, "spawning process");
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShellError::CommandNotFound { command: program.clone() }
            } else {
                ShellError::Spawn {
                    command: program.clone(),
                    source: e,
                }
            }
        })?;
        // `command` still holds the pipe write ends; it drops at the end of
        // this function, leaving the child as the only writer.

        self.pid = Some(child.id());
        self.stdin = child.stdin.take();
        self.stdout_stream = spawn_capture(streams.stdout_capture, "shrun-stdout")?;
        self.stderr_stream = spawn_capture(streams.stderr_capture, "shrun-stderr")?;

        {
            let mut guard = self.shared.lock();
            guard.child = Some(child);
            guard.exit_status = None;
        }

        let shared = Arc::clone(&self.shared);
        self.waiter = Some(
            thread::Builder::new()
                .name("shrun-waiter".to_string())
                .spawn(move || waiter_loop(shared))?,
        );
        self.started = true;
        debug!(command = %program, pid = self.pid, "process started");
        Ok(())
    }

    /// Whether the OS still reports the process as running.
    ///
    /// Cheap, non-blocking point-in-time check against the live handle.
    pub fn is_running(&self) -> bool {
        let mut guard = self.shared.lock();
        if guard.exit_status.is_some() {
            return false;
        }
        match guard.child.as_mut() {
            None => false,
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    guard.exit_status = Some(status);
                    false
                }
                Err(e) => {
                    warn!(error = %e, "failed to poll child status");
                    guard.poll_error = Some(e.to_string());
                    false
                }
            },
        }
    }

    /// OS-assigned PID while the process is running.
    pub fn pid(&self) -> Option<u32> {
        if self.is_running() {
            self.pid
        } else {
            None
        }
    }

    /// Exit code once the process has finished: the natural exit code, or
    /// the negated signal number when a signal terminated it, or -1 when a
    /// failed status poll left the real status unknowable.
    pub fn exit_code(&self) -> Option<i32> {
        if self.is_running() {
            return None;
        }
        let guard = self.shared.lock();
        match guard.exit_status {
            Some(status) => Some(exit_code_of(status)),
            None if guard.poll_error.is_some() => Some(-1),
            None => None,
        }
    }

    /// Wait for the process to finish, polling every 100 ms.
    ///
    /// Without a timeout this blocks until the process stops and returns
    /// `true`. With a timeout it returns `true` as soon as the process stops,
    /// or `false` once the timeout elapses with the process still running.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        match timeout {
            None => {
                while self.is_running() {
                    thread::sleep(POLL_INTERVAL);
                }
                true
            }
            Some(limit) => {
                let start = Instant::now();
                while start.elapsed() < limit {
                    if !self.is_running() {
                        return true;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                !self.is_running()
            }
        }
    }

    /// Terminate the process and release its handle.
    ///
    /// Sends SIGTERM, waits up to 500 ms for the process to die, then
    /// escalates to SIGKILL aimed at the whole process group when the child
    /// leads its own group. Joins the waiter thread and releases the native
    /// handle on success. OS errors are reported as
    /// [`KillOutcome::Failed`], never propagated.
    pub fn kill(&mut self) -> KillOutcome {
        if !self.started {
            return KillOutcome::NeverStarted;
        }
        if self.shared.lock().child.is_none() {
            return KillOutcome::AlreadyFinished;
        }
        let Some(pid) = self.pid else {
            return KillOutcome::AlreadyFinished;
        };

        debug!(pid, "killing process");
        if let Err(e) = unix::terminate(pid) {
            return KillOutcome::Failed(e.to_string());
        }
        self.wait(Some(KILL_GRACE));
        if self.is_running() {
            if let Err(e) = unix::kill_hard(pid) {
                return KillOutcome::Failed(e.to_string());
            }
        }

        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.join();
        }

        {
            let mut guard = self.shared.lock();
            if guard.exit_status.is_none() {
                if let Some(child) = guard.child.as_mut() {
                    match child.wait() {
                        Ok(status) => guard.exit_status = Some(status),
                        Err(e) => return KillOutcome::Failed(e.to_string()),
                    }
                }
            }
            guard.child = None;
        }
        self.stdin = None;
        KillOutcome::Killed
    }

    /// Write a line to the child's standard input and flush immediately.
    ///
    /// A trailing newline is appended if missing. Fails with
    /// [`ShellError::NotRunning`] when there is no piped stdin handle
    /// (process not started, already killed, or stdin not captured).
    pub fn write(&mut self, text: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(ShellError::NotRunning)?;
        let mut line = text.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        stdin.write_all(line.as_bytes())?;
        stdin.flush()?;
        Ok(())
    }

    /// Read from the child's standard output.
    ///
    /// Pipe-backed output drains whatever has arrived since the last read
    /// (empty string when nothing new); file-backed output reopens the file
    /// and returns its entire current contents.
    pub fn read(&mut self) -> Result<String> {
        let finished = !self.is_running();
        self.stdout_stream.read(self.config.encoding, finished)
    }

    /// Read from the child's standard error, with the same semantics as
    /// [`Process::read`]. Returns an empty string unconditionally when
    /// stderr was merged into stdout (demux off).
    pub fn eread(&mut self) -> Result<String> {
        if !self.config.demux {
            return Ok(String::new());
        }
        let finished = !self.is_running();
        self.stderr_stream.read(self.config.encoding, finished)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process(pid={:?}, command={})", self.pid, self.program())
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Reap the child and record its exit status.
///
/// Polls rather than blocking so the `Process` keeps exclusive, lock-guarded
/// access to the handle for its own liveness queries. Exits as soon as the
/// status is recorded or the handle is released by `kill`.
fn waiter_loop(shared: Arc<Mutex<Shared>>) {
    loop {
        {
            let mut guard = shared.lock();
            if guard.exit_status.is_some() {
                break;
            }
            let Some(child) = guard.child.as_mut() else {
                break;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "process exited");
                    guard.exit_status = Some(status);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    // Cleanup only; never propagate from the waiter.
                    warn!(error = %e, "waiter failed to poll child");
                    guard.poll_error = Some(e.to_string());
                    break;
                }
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Attach a background reader to a captured pipe, draining it into an
/// in-memory buffer until EOF.
fn spawn_capture(capture: Capture, name: &str) -> Result<OutputStream> {
    match capture {
        Capture::Pipe(mut pipe) => {
            let data = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&data);
            let reader = thread::Builder::new().name(name.to_string()).spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!(error = %e, "output reader stopped");
                            break;
                        }
                    }
                }
            })?;
            Ok(OutputStream::Buffer {
                data,
                reader: Some(reader),
            })
        }
        Capture::File(path) => Ok(OutputStream::File(path)),
        Capture::None => Ok(OutputStream::None),
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

/// Execute a command to completion and return its exit code and captured
/// output.
///
/// # Examples
///
/// ```rust,no_run
/// let result = shrun::execute(["echo", "hello"])?;
/// assert_eq!(result.exit_code, 0);
/// assert_eq!(result.stdout, "hello\n");
/// # Ok::<(), shrun::ShellError>(())
/// ```
pub fn execute<I, S>(command: I) -> Result<ExecResult>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ProcessConfig::new(command).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProcessConfig::new(["true"]);
        assert!(config.demux);
        assert_eq!(config.stdout, Redirect::Captured);
        assert_eq!(config.encoding, Encoding::Utf8);
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn test_unstarted_process_state() {
        let process = Process::new(ProcessConfig::new(["sleep", "5"]));
        assert!(!process.is_running());
        assert_eq!(process.pid(), None);
        assert_eq!(process.exit_code(), None);
        assert_eq!(process.program(), "sleep");
        assert_eq!(process.arguments(), ["5".to_string()]);
        assert_eq!(
            process.to_string(),
            "Process(pid=None, command=sleep)"
        );
        // Debug mirrors Display so error formatting stays readable.
        assert_eq!(format!("{process:?}"), process.to_string());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut process = Process::new(ProcessConfig::new(["true"]));
        process.start().unwrap();
        match process.start() {
            Err(ShellError::AlreadyStarted) => {}
            other => panic!("Expected AlreadyStarted, got: {other:?}"),
        }
        process.wait(None);
    }

    #[test]
    fn test_kill_unstarted_process() {
        let mut process = Process::new(ProcessConfig::new(["true"]));
        assert_eq!(process.kill(), KillOutcome::NeverStarted);
    }

    #[test]
    fn test_exit_code_of_signal() {
        let mut process = ProcessConfig::new(["sleep", "30"]).spawn().unwrap();
        assert_eq!(process.kill(), KillOutcome::Killed);
        // SIGTERM (15) arrives first during the kill sequence.
        assert_eq!(process.exit_code(), Some(-15));
    }

    #[test]
    fn test_poll_failure_latches_into_exit_code() {
        let process = Process::new(ProcessConfig::new(["true"]));
        process.shared.lock().poll_error = Some("no child processes".to_string());
        assert!(!process.is_running());
        // The real status is gone, so the process reports the failure
        // sentinel rather than staying pending forever.
        assert_eq!(process.exit_code(), Some(-1));
    }

    #[test]
    fn test_wait_on_unstarted_returns_immediately() {
        let process = Process::new(ProcessConfig::new(["true"]));
        assert!(process.wait(Some(Duration::from_millis(10))));
    }
}
