//! Unified error type for marquee.
//!
//! Every crate funnels its failures into [`Error`], which carries enough context
//! for the HTTP layer to derive a status code via [`Error::http_status`].
//! Diagnostics captured from external tools travel inside the variants so they
//! can be shown to the client when nothing has been streamed yet.

use std::fmt;

/// Unified error type covering all failure modes in marquee.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "movie", "poster").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A byte range could not be satisfied for a file of the given size.
    #[error("Range not satisfiable for {size} byte file")]
    RangeNotSatisfiable {
        /// Size of the file in bytes.
        size: u64,
    },

    /// The prober exited non-zero or could not be spawned.
    #[error("ffprobe failed: {diagnostic}")]
    ProbeFailed {
        /// Text captured from the prober's diagnostic channel.
        diagnostic: String,
    },

    /// The prober's output could not be parsed.
    #[error("Could not parse video duration from ffprobe output: {output:?}")]
    ProbeParse {
        /// The raw (trimmed) output.
        output: String,
    },

    /// A playlist was requested but no usable duration could be obtained.
    #[error("Duration unavailable: {0}")]
    DurationUnavailable(String),

    /// An external tool could not be spawned or driven.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The encoder produced no output before exiting.
    #[error("FFmpeg failed to start:\n{diagnostic}")]
    EncoderStartup {
        /// Text captured from the encoder's diagnostic channel.
        diagnostic: String,
    },

    /// The encoder produced no output within the stall timeout.
    #[error("Encoder produced no output within {secs}s")]
    EncoderStalled {
        /// The stall timeout that elapsed, in seconds.
        secs: u64,
    },

    /// The encoder concurrency cap is exhausted.
    #[error("Busy: {0}")]
    Busy(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A JSON document could not be read or written.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::ProbeFailed { .. } => 500,
            Error::ProbeParse { .. } => 500,
            Error::DurationUnavailable(_) => 500,
            Error::Tool { .. } => 500,
            Error::EncoderStartup { .. } => 500,
            Error::EncoderStalled { .. } => 504,
            Error::Busy(_) => 503,
            Error::Io { .. } => 500,
            Error::Json { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable kind, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::ProbeFailed { .. } => "probe_failed",
            Error::ProbeParse { .. } => "probe_parse_error",
            Error::DurationUnavailable(_) => "duration_unavailable",
            Error::Tool { .. } => "tool_error",
            Error::EncoderStartup { .. } => "encoder_startup_failure",
            Error::EncoderStalled { .. } => "encoder_stalled",
            Error::Busy(_) => "busy",
            Error::Io { .. } => "io_error",
            Error::Json { .. } => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("movie", 9999);
        assert_eq!(err.to_string(), "movie not found: 9999");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn validation_display() {
        let err = Error::validation("movie id must be positive");
        assert_eq!(err.to_string(), "Validation error: movie id must be positive");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn probe_errors_are_server_errors() {
        let failed = Error::ProbeFailed {
            diagnostic: "No such file or directory".into(),
        };
        assert!(failed.to_string().contains("No such file or directory"));
        assert_eq!(failed.http_status(), 500);

        let parse = Error::ProbeParse {
            output: "N/A".into(),
        };
        assert!(parse.to_string().contains("N/A"));
        assert_eq!(parse.http_status(), 500);
    }

    #[test]
    fn encoder_startup_carries_diagnostic() {
        let err = Error::EncoderStartup {
            diagnostic: "Cannot load nvcuda.dll".into(),
        };
        assert_eq!(err.to_string(), "FFmpeg failed to start:\nCannot load nvcuda.dll");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn capacity_and_stall_statuses() {
        assert_eq!(Error::Busy("8 encoders running".into()).http_status(), 503);
        assert_eq!(Error::EncoderStalled { secs: 30 }.http_status(), 504);
        assert_eq!(Error::RangeNotSatisfiable { size: 10 }.http_status(), 416);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert_matches!(err, Error::Io { .. });
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn json_from_serde() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_matches!(err, Error::Json { .. });
        assert_eq!(err.code(), "json_error");
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "failed to spawn: No such file or directory");
        assert_eq!(
            err.to_string(),
            "Tool error [ffmpeg]: failed to spawn: No such file or directory"
        );
        assert_eq!(err.http_status(), 500);
    }
}
