//! Error type shared by the gateway, the alignment engine and the C ABI.
//!
//! Every variant is terminal for the file being processed. Nothing in this
//! crate retries; batch callers catch per file and move on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnackError {
    /// Unknown calling method, or a method the current platform cannot use
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Toolkit or alignment parameter outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Executable, shell or Snack package could not be found or loaded
    #[error("{tool} unavailable: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// The external process ran but reported failure
    #[error("{tool} failed: {reason}")]
    Invocation { tool: String, reason: String },

    /// The run reported success but left no result behind
    #[error("expected Snack output is missing: {0}")]
    OutputMissing(String),

    /// The result exists but cannot be read as per-frame numbers
    #[error("malformed Snack output in {source_name}: {reason}")]
    MalformedOutput { source_name: String, reason: String },

    /// Raw frames plus the head pad do not fit in the requested length
    #[error("{required} samples (head pad + raw frames) do not fit in data length {data_len}")]
    LengthMismatch { data_len: usize, required: usize },

    /// The run was stopped through a [`CancelToken`](crate::cancel::CancelToken)
    #[error("cancelled while running {0}")]
    Cancelled(String),

    /// Input audio could not be decoded
    #[error("audio decoding failed for '{path}': {reason}")]
    AudioDecoding { path: PathBuf, reason: String },

    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
}

impl SnackError {
    /// Whether the failure came from the external toolkit rather than from
    /// the caller's configuration or parameters.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolUnavailable { .. }
                | Self::Invocation { .. }
                | Self::OutputMissing(_)
                | Self::MalformedOutput { .. }
        )
    }

    pub(crate) fn tool_unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invocation(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invocation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type SnackResult<T> = Result<T, SnackError>;
