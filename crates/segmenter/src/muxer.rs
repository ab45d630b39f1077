//! The container-writer capability driven by the segmenter.
//!
//! The segmenter never looks inside a container format. It only drives the
//! three entry points of [`Muxer`] against whichever [`OutputFormat`] was
//! selected for the segments.

use std::io::Write;
use std::path::Path;

use media_types::{Packet, StreamSet};

use crate::error::MuxError;

/// Everything a muxer may touch during one call.
///
/// The stream set is borrowed from the session for the duration of the call
/// only, so a muxer cannot keep it past the end of its segment.
pub struct MuxContext<'a> {
    pub path: &'a Path,
    pub streams: &'a StreamSet,
    pub sink: &'a mut dyn Write,
}

/// Per-segment container writer state.
///
/// A fresh, default-initialised instance is created for every segment and
/// dropped when the segment ends.
pub trait Muxer: Send {
    fn write_header(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError>;

    fn write_packet(&mut self, ctx: &mut MuxContext<'_>, packet: &Packet) -> Result<(), MuxError>;

    /// Finalises the segment. Formats without a trailer keep the default no-op.
    fn write_trailer(&mut self, _ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        Ok(())
    }
}

/// Descriptor of a container format that can be used for segments.
pub trait OutputFormat: Send + Sync {
    /// Short name used to select the format explicitly.
    fn name(&self) -> &'static str;

    fn long_name(&self) -> &'static str {
        self.name()
    }

    /// Filename extensions (without dot) the format is guessed from.
    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether the format writes to an output file at all.
    fn needs_file(&self) -> bool {
        true
    }

    /// Allocates a default-initialised writer for one segment.
    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError>;
}
