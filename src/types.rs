//! Shared data types: stream redirection targets, text encoding, run results

use std::path::PathBuf;

use crate::error::{Result, ShellError};

/// Redirection target for one of a child's standard streams.
///
/// A target is resolved into a concrete stream handle exactly once, when the
/// process starts; read/write call sites never branch on the variant again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Redirect {
    /// Capture through an OS pipe owned by the [`Process`](crate::Process).
    /// Reading drains whatever output is currently buffered.
    #[default]
    Captured,
    /// Redirect to a file opened for binary write. Reading reopens the file
    /// and returns its entire current contents.
    File(PathBuf),
    /// Inherit the parent's stream (foreground mode).
    Inherit,
}

/// Text encoding used for the child's stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Strict UTF-8; invalid bytes are reported as a decode error.
    #[default]
    Utf8,
    /// UTF-8 with invalid bytes replaced by U+FFFD.
    Utf8Lossy,
}

impl Encoding {
    /// Decode raw stream bytes into text.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| ShellError::Decode {
                encoding: "utf-8".to_string(),
                message: e.to_string(),
            }),
            Encoding::Utf8Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// Outcome of a run-to-completion execution: exit code plus captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// OS exit code (0 = success; negative = terminated by that signal).
    pub exit_code: i32,
    /// Captured standard output, decoded.
    pub stdout: String,
    /// Captured standard error, decoded. Empty when stderr was merged into
    /// stdout (demux off).
    pub stderr: String,
}

impl ExecResult {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_decode_rejects_invalid_bytes() {
        let err = Encoding::Utf8.decode(vec![0xff, 0xfe]).unwrap_err();
        assert_eq!(err.code(), "SH005");
    }

    #[test]
    fn test_lossy_decode_replaces_invalid_bytes() {
        let text = Encoding::Utf8Lossy.decode(vec![b'h', 0xff, b'i']).unwrap();
        assert_eq!(text, "h\u{fffd}i");
    }

    #[test]
    fn test_exec_result_success() {
        let result = ExecResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(result.success());
        let result = ExecResult {
            exit_code: 7,
            ..result
        };
        assert!(!result.success());
    }
}
