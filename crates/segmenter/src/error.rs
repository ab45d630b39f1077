use std::io;
use std::path::PathBuf;

use pipeline_common::TemplateError;
use thiserror::Error;

/// Errors raised by an inner container writer or its output sink.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Errors produced by the segmenter.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("invalid {option} value '{value}': {reason}")]
    Config {
        option: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "specified time {:.6} is greater than the following time {:.6} (entries {} and {index})",
        secs(.previous),
        secs(.next),
        .index - 1
    )]
    NonMonotonicTimes {
        /// Position of the entry that is smaller than its predecessor.
        index: usize,
        previous: i64,
        next: i64,
    },

    #[error("no muxer found for format {format:?} and filename '{filename}'")]
    MuxerNotFound {
        format: Option<String>,
        filename: String,
    },

    #[error("format {0} not supported as segment format")]
    UnsupportedFormat(String),

    #[error("invalid segment filename template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("failure occurred when starting segment '{}': {source}", path.display())]
    SegmentStart {
        path: PathBuf,
        #[source]
        source: MuxError,
    },

    #[error("failure occurred when ending segment '{}': {source}", path.display())]
    SegmentEnd {
        path: PathBuf,
        #[source]
        source: MuxError,
    },

    #[error("segment list '{}' error: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rotate segment list '{}': {source}", path.display())]
    ManifestRotation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write packet to segment '{}': {source}", path.display())]
    PacketWrite {
        path: PathBuf,
        #[source]
        source: MuxError,
    },

    #[error("packet references unknown stream {0}")]
    UnknownStream(usize),

    #[error("segmenter aborted after a fatal error")]
    Aborted,
}

fn secs(micros: &i64) -> f64 {
    *micros as f64 / 1_000_000.0
}

impl SegmentError {
    pub(crate) fn config(
        option: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SegmentError::Config {
            option,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from option parsing or validation.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SegmentError::Config { .. } | SegmentError::NonMonotonicTimes { .. }
        )
    }
}
