//! Error types for the IPC stress harness.
//!
//! Two error families, mirroring the split between general harness
//! operations (configuration, workload files, verification) and
//! low-level process control (spawn, poll, terminate, CPU accounting).

use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for harness operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input or configuration.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Workload generation or lookup failed.
    #[error("Workload error: {message}")]
    Workload { message: String },

    /// A descriptor or manifest file could not be parsed.
    #[error("Descriptor error in {file}: {reason}")]
    Descriptor { file: String, reason: String },

    /// Process control failure (wraps the process error family).
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a Workload error.
    pub fn workload(message: impl Into<String>) -> Self {
        Self::Workload {
            message: message.into(),
        }
    }

    /// Creates a Descriptor error.
    pub fn descriptor(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Descriptor {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Adds context to an error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

/// Convenience methods for Result types.
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Process Control Errors
// ==============================================================================

/// Process-specific error types for the supervisor and process primitives.
///
/// The `id` identifies the supervised participant (a role name such as
/// "cache" or a raw pid for primitives operating below the role layer).
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// The process no longer exists. For CPU-time reads this is the
    /// expected race against a just-exited process and is tolerated by
    /// callers rather than treated as fatal.
    #[error("Process not found: {id}")]
    NotFound { id: String },

    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process poll failed: {id} - {reason}")]
    PollFailed { id: String, reason: String },

    #[error("CPU time unavailable for {id}: {reason}")]
    CpuTimeUnavailable { id: String, reason: String },
}

impl ProcessError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn poll_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PollFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn cpu_time_unavailable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CpuTimeUnavailable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for the transient accounting race against an exited process.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
