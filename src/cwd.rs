//! Working-directory helpers: `cwd`, `cd` and the scoped [`pushd`]
//!
//! The current working directory is single global state per process, so all
//! scoped changes are serialized behind one process-wide reentrant lock:
//! nested [`pushd`] calls on one thread compose, while other threads block
//! until the entire nested chain has unwound.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, warn};

use crate::error::Result;

/// Global lock guarding every scoped directory change.
static CWD_LOCK: ReentrantMutex<()> = ReentrantMutex::new(());

/// Return the absolute path of the current working directory.
pub fn cwd() -> Result<PathBuf> {
    Ok(env::current_dir()?)
}

/// Change the current working directory.
///
/// With `create` set, the directory (and its parents) is created first if it
/// does not exist. This is an unscoped change; prefer [`pushd`] when the
/// previous directory must be restored.
pub fn cd(path: impl AsRef<Path>, create: bool) -> Result<()> {
    let path = path.as_ref();
    if create {
        fs::create_dir_all(path)?;
    }
    debug!(path = %path.display(), "cd ->");
    env::set_current_dir(path)?;
    Ok(())
}

/// Guard for a scoped directory change, created by [`pushd`].
///
/// Holds the process-wide directory lock for its whole lifetime and restores
/// the previously recorded working directory when dropped, on every exit
/// path including panics.
pub struct Pushd {
    previous: PathBuf,
    target: PathBuf,
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl Pushd {
    /// Directory entered by this guard.
    pub fn path(&self) -> &Path {
        &self.target
    }

    /// Directory that will be restored when this guard drops.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for Pushd {
    fn drop(&mut self) {
        debug!(path = %self.target.display(), "pushd <-");
        if let Err(e) = env::set_current_dir(&self.previous) {
            // Cleanup must never panic; the previous directory may be gone.
            warn!(
                previous = %self.previous.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}

/// Enter `path` as the current working directory until the returned guard
/// drops.
///
/// With `create` set, the target directory is created first if missing.
/// Relative paths are resolved against the current working directory at call
/// time.
///
/// # Examples
///
/// ```rust,no_run
/// let before = shrun::cwd()?;
/// {
///     let _dir = shrun::pushd("/tmp", false)?;
///     assert_eq!(shrun::cwd()?, std::path::PathBuf::from("/tmp"));
/// }
/// assert_eq!(shrun::cwd()?, before);
/// # Ok::<(), shrun::ShellError>(())
/// ```
pub fn pushd(path: impl AsRef<Path>, create: bool) -> Result<Pushd> {
    let guard = CWD_LOCK.lock();

    let previous = env::current_dir()?;
    let path = path.as_ref();
    let target = if path.is_absolute() {
        path.to_path_buf()
    } else {
        previous.join(path)
    };

    if create {
        fs::create_dir_all(&target)?;
    }

    debug!(path = %target.display(), "pushd ->");
    env::set_current_dir(&target)?;

    Ok(Pushd {
        previous,
        target,
        _guard: guard,
    })
}
