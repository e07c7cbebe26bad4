use std::path::PathBuf;

/// Convenience result type used across slidereel.
pub type SlideResult<T> = Result<T, SlideError>;

/// Fatal error taxonomy. Any of these aborts the job it was raised in.
#[derive(thiserror::Error, Debug)]
pub enum SlideError {
    /// Invalid options, job ids or plan data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Directory or file access failed.
    #[error("io error at '{path}': {source}")]
    Io {
        /// Path that was being read or written.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// An external probe could not produce a usable value.
    #[error("probe error: {0}")]
    Probe(String),

    /// Nothing left to compose (empty image set or empty timeline).
    #[error("graph underflow: {0}")]
    GraphUnderflow(String),

    /// The compositor or the dimension probe failed. `output` holds whatever the
    /// external process wrote so the failure can be diagnosed.
    #[error("composition failed: {message}")]
    CompositionFailed {
        /// Short description of what went wrong.
        message: String,
        /// Captured stderr of the external process, possibly empty.
        output: String,
    },

    /// The remote resize/collage service rejected the upload or was unreachable.
    #[error("remote service error: {0}")]
    Remote(String),

    /// Configuration could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlideError {
    /// Build a [`SlideError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SlideError::Io`] value.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a [`SlideError::Probe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build a [`SlideError::GraphUnderflow`] value.
    pub fn graph_underflow(msg: impl Into<String>) -> Self {
        Self::GraphUnderflow(msg.into())
    }

    /// Build a [`SlideError::CompositionFailed`] value.
    pub fn composition(msg: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CompositionFailed {
            message: msg.into(),
            output: output.into(),
        }
    }

    /// Build a [`SlideError::Remote`] value.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Build a [`SlideError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Captured external-process output, when the error carries any.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            Self::CompositionFailed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Non-fatal conditions recorded while a job runs.
///
/// Each one means the job continued on a degraded but deterministic path.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// The audio probe failed; the duration is an estimate.
    ProbeFailed {
        /// Why the probe result was rejected.
        reason: String,
        /// Estimated duration used instead.
        fallback_secs: f64,
    },
    /// An entry had no parsable sequence number, or repeated one, and was skipped.
    MalformedName {
        /// File name of the skipped entry.
        name: String,
    },
    /// The audio is too short for the nominal schedule; durations were adjusted.
    TimingOverflow {
        /// Raw last-segment duration before adjustment (may be negative).
        raw_secs: f64,
        /// Duration actually assigned to the last segment.
        applied_secs: f64,
    },
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbeFailed {
                reason,
                fallback_secs,
            } => write!(
                f,
                "audio probe failed ({reason}); using estimated duration {fallback_secs:.3}s"
            ),
            Self::MalformedName { name } => {
                write!(f, "skipped '{name}': no usable sequence number")
            }
            Self::TimingOverflow {
                raw_secs,
                applied_secs,
            } => write!(
                f,
                "audio shorter than schedule: last segment {raw_secs:.3}s adjusted to {applied_secs:.3}s"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
