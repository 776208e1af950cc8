//! Command builder: executable resolution, argument baking and rendering
//!
//! A [`Command`] is an immutable blueprint of a command run. Arguments and
//! options are bound by *baking*: [`Command::bake`] hands out a [`Bake`]
//! builder whose [`Bake::done`] produces a brand new `Command`, combining the
//! parent's bound values with the overrides. The parent is never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, ShellError};
use crate::types::Redirect;

/// Separator placed between a rendered kwarg key and its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KwargsSep {
    /// Render as two tokens: `--key value`.
    #[default]
    Space,
    /// Render as one token: `--key=value`.
    Equals,
}

/// Recognized command options and their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Run the command in the foreground (inherit all standard streams).
    pub foreground: bool,
    /// Redirection target for the child's stdin.
    pub stdin: Redirect,
    /// Redirection target for the child's stdout.
    pub stdout: Redirect,
    /// Redirection target for the child's stderr.
    pub stderr: Redirect,
    /// Separator between a kwarg key and value.
    pub kwargs_sep: KwargsSep,
    /// Prefix put in front of kwarg keys.
    pub kwargs_prefix: String,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            foreground: false,
            stdin: Redirect::Captured,
            stdout: Redirect::Captured,
            stderr: Redirect::Captured,
            kwargs_sep: KwargsSep::Space,
            kwargs_prefix: "--".to_string(),
        }
    }
}

/// An immutable blueprint of a command run.
///
/// Construction resolves the executable name against the search path and
/// fails with [`ShellError::CommandNotFound`] if no runnable file matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    executable: PathBuf,
    search_paths: Option<Vec<PathBuf>>,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
    options: CommandOptions,
}

impl Command {
    /// Resolve `command` against the OS-provided search path.
    pub fn new(command: impl AsRef<str>) -> Result<Self> {
        let command = command.as_ref();
        let executable =
            which::which(command).map_err(|_| ShellError::CommandNotFound {
                command: command.to_string(),
            })?;
        debug!(command, executable = %executable.display(), "resolved command");
        Ok(Self {
            executable,
            search_paths: None,
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            options: CommandOptions::default(),
        })
    }

    /// Resolve `command` against an explicit ordered list of directories
    /// instead of the OS search path.
    pub fn with_search_paths(
        command: impl AsRef<str>,
        search_paths: &[PathBuf],
    ) -> Result<Self> {
        let command = command.as_ref();
        let joined = std::env::join_paths(search_paths)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let cwd = std::env::current_dir()?;
        let executable = which::which_in(command, Some(joined), cwd).map_err(|_| {
            ShellError::CommandNotFound {
                command: command.to_string(),
            }
        })?;
        debug!(command, executable = %executable.display(), "resolved command");
        Ok(Self {
            executable,
            search_paths: Some(search_paths.to_vec()),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            options: CommandOptions::default(),
        })
    }

    /// Absolute path of the resolved executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Explicit search paths this command was resolved against, if any.
    pub fn search_paths(&self) -> Option<&[PathBuf]> {
        self.search_paths.as_deref()
    }

    /// Currently bound positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Current option set.
    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    /// Start baking additional arguments and options onto this command.
    ///
    /// The returned builder holds a copy; finishing it with [`Bake::done`]
    /// yields a new `Command` and leaves `self` untouched.
    pub fn bake(&self) -> Bake {
        Bake {
            command: self.clone(),
        }
    }

    /// Render the final argument vector: executable, positional args, then
    /// each kwarg as either `--key value` (two tokens) or `--key=value`
    /// (one token) depending on the configured separator.
    ///
    /// Kwargs render in sorted key order so the vector is reproducible.
    pub fn command_list(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(1 + self.args.len() + self.kwargs.len() * 2);
        tokens.push(self.executable.display().to_string());
        tokens.extend(self.args.iter().cloned());

        let prefix = &self.options.kwargs_prefix;
        for (key, value) in &self.kwargs {
            match self.options.kwargs_sep {
                KwargsSep::Space => {
                    tokens.push(format!("{prefix}{key}"));
                    tokens.push(value.clone());
                }
                KwargsSep::Equals => tokens.push(format!("{prefix}{key}={value}")),
            }
        }
        tokens
    }

    /// Render the command line that would be executed, quoting any token
    /// containing whitespace.
    pub fn command_line(&self) -> String {
        self.command_list()
            .iter()
            .map(|token| {
                if token.contains(char::is_whitespace) {
                    format!("\"{token}\"")
                } else {
                    token.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(unix)]
impl Command {
    /// Bake nothing further, spawn the process and return it immediately.
    ///
    /// The returned [`Process`](crate::Process) is already started and may
    /// still be running; combine with [`Command::bake`] to bind transient
    /// arguments first. Honors the foreground and redirection options.
    pub fn invoke(&self) -> Result<crate::process::Process> {
        use crate::process::{Process, ProcessConfig};

        let mut config = ProcessConfig::new(self.command_list());
        config = if self.options.foreground {
            config
                .stdin(Redirect::Inherit)
                .stdout(Redirect::Inherit)
                .stderr(Redirect::Inherit)
        } else {
            config
                .stdin(self.options.stdin.clone())
                .stdout(self.options.stdout.clone())
                .stderr(self.options.stderr.clone())
        };

        let mut process = Process::new(config);
        process.start()?;
        Ok(process)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Builder returned by [`Command::bake`].
///
/// Positional args concatenate after the parent's, kwargs and options
/// shallow-merge with later values winning.
#[derive(Debug, Clone)]
pub struct Bake {
    command: Command,
}

impl Bake {
    /// Append one positional argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.args.push(arg.into());
        self
    }

    /// Append several positional arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bind a named argument, overriding any previously bound value for the
    /// same key.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.command.kwargs.insert(key.into(), value.into());
        self
    }

    /// Run the command in the foreground, inheriting all standard streams.
    pub fn foreground(mut self, foreground: bool) -> Self {
        self.command.options.foreground = foreground;
        self
    }

    /// Override the stdin redirection target.
    pub fn stdin(mut self, target: Redirect) -> Self {
        self.command.options.stdin = target;
        self
    }

    /// Override the stdout redirection target.
    pub fn stdout(mut self, target: Redirect) -> Self {
        self.command.options.stdout = target;
        self
    }

    /// Override the stderr redirection target.
    pub fn stderr(mut self, target: Redirect) -> Self {
        self.command.options.stderr = target;
        self
    }

    /// Override the kwarg key/value separator.
    pub fn kwargs_sep(mut self, sep: KwargsSep) -> Self {
        self.command.options.kwargs_sep = sep;
        self
    }

    /// Override the kwarg key prefix.
    pub fn kwargs_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command.options.kwargs_prefix = prefix.into();
        self
    }

    /// Finish baking, producing the combined command.
    pub fn done(self) -> Command {
        self.command
    }
}
