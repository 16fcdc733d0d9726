use std::time::Duration;

/// Convenience result type used across the crate.
pub type TextRenderResult<T> = Result<T, TextRenderError>;

/// Top-level error taxonomy for dispatch, relay, and decode failures.
#[derive(thiserror::Error, Debug)]
pub enum TextRenderError {
    /// Engine construction or the mandatory default-font load failed.
    ///
    /// Fatal for the subsystem; no retry is attempted.
    #[error("init error: {0}")]
    Init(String),

    /// Malformed command buffer.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The engine's `exec` (or a font load) raised.
    #[error("engine error: {0}")]
    EngineExec(String),

    /// The worker rejected a job. Carries the job as the worker received it.
    #[error("render error: job {job_id} failed: {message}")]
    Render {
        job_id: u64,
        message: String,
        /// Serialized job, for replay.
        text_data: String,
    },

    /// Font bytes could not be obtained or were missing when needed.
    #[error("relay error: {0}")]
    Relay(String),

    /// A bounded wait elapsed.
    #[error("timeout: {what} did not settle within {after:?}")]
    Timeout {
        /// What was being waited on.
        what: String,
        /// Configured bound.
        after: Duration,
    },

    /// Invalid caller-supplied data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing envelopes and jobs.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The other side of a channel went away (worker exited or dispatcher terminated).
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// Wrapped lower-level error from collaborators or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextRenderError {
    /// Build a [`TextRenderError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Build a [`TextRenderError::EngineExec`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineExec(msg.into())
    }

    /// Build a [`TextRenderError::Relay`] value.
    pub fn relay(msg: impl Into<String>) -> Self {
        Self::Relay(msg.into())
    }

    /// Build a [`TextRenderError::Timeout`] value.
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    /// Build a [`TextRenderError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TextRenderError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`TextRenderError::Disconnected`] value.
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::Disconnected(msg.into())
    }

    /// `true` for errors that end the subsystem rather than a single job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::Disconnected(_))
    }
}

impl From<serde_json::Error> for TextRenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

/// Why a command buffer was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Top-level opcode outside `{transform, path, stroke, fill}`.
    UnknownCommand,
    /// Sub-path opcode outside `{move, line, curve, close, quad}`.
    UnknownPathSegment,
    /// Box count or path segment count is not a non-negative integer.
    InvalidCount,
    /// A record needs more numbers than the buffer holds.
    Truncated,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnknownCommand => "unknown command opcode",
            Self::UnknownPathSegment => "unknown path segment opcode",
            Self::InvalidCount => "invalid count",
            Self::Truncated => "truncated record",
        };
        f.write_str(s)
    }
}

/// Malformed command buffer, with the cursor position and the whole buffer for diagnostics.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("decode error: {kind} at position {position} (value {value:?}, buffer length {})", .buffer.len())]
pub struct DecodeError {
    /// Failure class.
    pub kind: DecodeErrorKind,
    /// Cursor position of the offending number.
    pub position: usize,
    /// Offending number, `None` when the buffer ended.
    pub value: Option<f32>,
    /// The complete buffer being decoded.
    pub buffer: Vec<f32>,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
