//! Execute command line tools like functions.
//!
//! This crate is a thin convenience layer over the operating system's
//! process-creation facilities. It lets a caller build a command invocation,
//! launch it as a child process, stream or capture its input/output, and
//! manage its lifecycle (wait, kill, query exit status).
//!
//! ## Components
//!
//! - [`Command`]: an immutable blueprint of a command run. Arguments and
//!   options are bound by *baking*, which always produces a new `Command`.
//! - [`Process`]: one spawned child process, owning its native handle and
//!   stream resources. Created unstarted, started once, finished either by
//!   natural exit or by [`Process::kill`].
//! - [`execute`]: run-to-completion convenience returning exit code plus
//!   captured stdout/stderr.
//! - [`pushd`]: a scoped, process-wide serialized working-directory change.

pub mod command;
pub mod cwd;
pub mod error;
#[cfg(unix)]
pub mod process;
pub mod types;


pub use command::{Bake, Command, CommandOptions, KwargsSep};
pub use cwd::{cd, cwd, pushd, Pushd};
pub use error::{Result, ShellError};
#[cfg(unix)]
pub use process::{execute, KillOutcome, Process, ProcessConfig};
pub use types::{Encoding, ExecResult, Redirect};

/// Crate utilities
pub mod utils {
    use tracing::info;

    /// Initialize tracing for binaries and tests embedding this crate.
    ///
    /// Reads the filter from the environment (`RUST_LOG`), falling back to
    /// the given level.
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| crate::ShellError::Initialization(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
