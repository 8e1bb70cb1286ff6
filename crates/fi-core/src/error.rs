//! Unified error type for ffinput.
//!
//! All crates funnel their failures into [`Error`]. Callers that need to react
//! to a particular failure class match on [`Error::kind`] instead of on the
//! variant payloads.

use std::fmt;

/// Unified error type covering all failure modes of a reader session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external metadata tool failed, timed out, or produced output that
    /// could not be understood.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The selection predicate matched none of the probed streams.
    #[error("No streams selected")]
    NoStreamsSelected,

    /// A subtitle conduit did not start with the expected container header.
    #[error("Malformed {dialect} stream {index}: {message}")]
    MalformedSubtitleFormat {
        /// Index of the probed stream the conduit belongs to.
        index: u32,
        /// Dialect that was expected (e.g. "WebVTT").
        dialect: String,
        /// Human-readable description of what was found instead.
        message: String,
    },

    /// A selected stream cannot be read (video, data, attachments).
    #[error("Unsupported stream {index}: {kind} streams cannot be read")]
    UnsupportedStream {
        /// Index of the rejected stream.
        index: u32,
        /// The stream's codec kind.
        kind: String,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration or caller-supplied data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The failure class of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Probe,
    NoStreamsSelected,
    MalformedSubtitleFormat,
    UnsupportedStream,
    Tool,
    Io,
    Validation,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Probe => "probe",
            Self::NoStreamsSelected => "no_streams_selected",
            Self::MalformedSubtitleFormat => "malformed_subtitle_format",
            Self::UnsupportedStream => "unsupported_stream",
            Self::Tool => "tool",
            Self::Io => "io",
            Self::Validation => "validation",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Probe(_) => ErrorKind::Probe,
            Error::NoStreamsSelected => ErrorKind::NoStreamsSelected,
            Error::MalformedSubtitleFormat { .. } => ErrorKind::MalformedSubtitleFormat,
            Error::UnsupportedStream { .. } => ErrorKind::UnsupportedStream,
            Error::Tool { .. } => ErrorKind::Tool,
            Error::Io { .. } => ErrorKind::Io,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error must end the whole session when it is raised while
    /// polling a subtitle conduit.
    ///
    /// Everything except a corrupt header only finishes the lane it came from.
    pub fn is_fatal_for_subtitle_lane(&self) -> bool {
        matches!(self, Error::MalformedSubtitleFormat { .. })
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Probe`].
    pub fn probe(message: impl Into<String>) -> Self {
        Error::Probe(message.into())
    }

    /// Convenience constructor for [`Error::MalformedSubtitleFormat`].
    pub fn malformed_subtitle(
        index: u32,
        dialect: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Error::MalformedSubtitleFormat {
            index,
            dialect: dialect.to_string(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::UnsupportedStream`].
    pub fn unsupported_stream(index: u32, kind: impl fmt::Display) -> Self {
        Error::UnsupportedStream {
            index,
            kind: kind.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
