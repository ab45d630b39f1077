//! Segmenting muxer
//!
//! This crate splits a timestamped packet stream into a sequence of
//! independently playable container files ("segments"). Segments are cut on
//! keyframes, either at a fixed interval or at an explicit list of cut
//! points, and can be listed in a rotating segment list.
//!
//! ## Features
//!
//! - Fixed-interval and explicit cut-point segmentation with tolerance
//! - Keyframe gating on the video stream when one is present
//! - Wrapping filename numbers (`segment_wrap`)
//! - `filename,start,end` segment list with rotation
//! - Pluggable container writers behind the [`Muxer`] trait
//!
//! ## Component Overview
//!
//! - `timespec`: duration and cut-point list parsing
//! - `config`: segment options and the parsed segmentation policy
//! - `counter`: the segment ordinal and its filename / cut-point views
//! - `topology`: the read-only stream table shared by all segments
//! - `sink`: output sink opening and interruption
//! - `muxer`, `formats`: the container writer capability and built-in formats
//! - `manifest`: the segment list writer
//! - `segment`: opening and closing single segments
//! - `engine`: the per-packet boundary decision
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

mod config;
mod counter;
mod engine;
mod error;
pub mod formats;
mod manifest;
mod muxer;
mod segment;
mod sink;
pub mod timespec;
mod topology;

#[cfg(test)]
mod test_utils;


pub use config::{CutSchedule, SegmentOptions, SegmentationPolicy, WrapMode};
pub use counter::SegmentCounter;
pub use engine::{
    SegmentCloseCallback, SegmentOpenCallback, SegmentSummary, Segmenter, SegmenterBuilder,
};
pub use error::{MuxError, SegmentError};
pub use formats::FormatRegistry;
pub use manifest::ManifestWriter;
pub use muxer::{MuxContext, Muxer, OutputFormat};
pub use segment::{ActiveSegment, SegmentRecord};
pub use sink::{FileOpener, Interruptible, IoOpener, Sink, is_interrupted};
pub use topology::StreamTopology;
