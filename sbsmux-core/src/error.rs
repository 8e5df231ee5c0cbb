// ============================================================================
// sbsmux-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Core Error Types
//
// This module defines the error taxonomy for sbsmux-core. Lower-level failures
// (I/O, external commands, ffprobe JSON) are ordinary variants; the four
// pipeline outcomes a job can fail with (probe, decode, encode, path conflict)
// have dedicated variants so the batch orchestrator can report them by kind.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the sbsmux core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("No processable files found")]
    NoFilesFound,

    #[error("Required dependency '{0}' not found. Is it installed and on PATH?")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Failed to parse ffprobe output: {0}")]
    JsonParseError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Output path {} is already claimed by {}", .output.display(), .claimed_by.display())]
    PathConflict { output: PathBuf, claimed_by: PathBuf },

    #[error("Still image error: {0}")]
    StillImage(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for sbsmux-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Job-level classification of a failure, as shown in a batch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Probe,
    Decode,
    Encode,
    PathConflict,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Probe => "ProbeError",
            FailureKind::Decode => "DecodeError",
            FailureKind::Encode => "EncodeError",
            FailureKind::PathConflict => "PathConflict",
            FailureKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl CoreError {
    /// Classifies this error for job reporting.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CoreError::Probe(_) | CoreError::JsonParseError(_) => FailureKind::Probe,
            CoreError::Decode(_) => FailureKind::Decode,
            CoreError::Encode(_) => FailureKind::Encode,
            CoreError::PathConflict { .. } => FailureKind::PathConflict,
            _ => FailureKind::Other,
        }
    }

    /// Re-tags a lower-level error with the pipeline stage it surfaced in.
    ///
    /// Errors that already carry a pipeline kind keep it, so a decode failure
    /// observed while the sink is draining frames is still reported as a
    /// decode failure.
    pub fn in_stage(self, stage: FailureKind) -> CoreError {
        if self.failure_kind() != FailureKind::Other {
            return self;
        }
        let message = self.to_string();
        match stage {
            FailureKind::Probe => CoreError::Probe(message),
            FailureKind::Decode => CoreError::Decode(message),
            FailureKind::Encode => CoreError::Encode(message),
            FailureKind::PathConflict | FailureKind::Other => self,
        }
    }
}

// ---- Command error helpers ----

pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}
