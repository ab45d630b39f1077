//! Opening and closing of individual segments.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_types::Packet;
use pipeline_common::{StreamerContext, frame_filename};
use tracing::{debug, info, warn};

use crate::counter::SegmentCounter;
use crate::error::{MuxError, SegmentError};
use crate::manifest::ManifestWriter;
use crate::muxer::{MuxContext, Muxer, OutputFormat};
use crate::sink::{IoOpener, Sink};
use crate::topology::StreamTopology;

/// A finished segment as recorded in the segment list.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub path: PathBuf,
    /// Number formatted into the filename.
    pub index: u64,
    /// Seconds.
    pub start_time: f64,
    /// Seconds.
    pub end_time: f64,
    pub packets: u64,
}

/// The one segment currently being written.
///
/// Owns its writer and sink exclusively. Dropping it without
/// [`SegmentLifecycle::end`] closes the sink without a trailer.
pub struct ActiveSegment {
    path: PathBuf,
    index: u64,
    muxer: Box<dyn Muxer>,
    sink: Sink,
    start_time: f64,
    end_time: f64,
    packets: u64,
}

impl ActiveSegment {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Sets the segment's span to begin (and for now end) at `seconds`.
    pub(crate) fn begin_at(&mut self, seconds: f64) {
        self.start_time = seconds;
        self.end_time = seconds;
    }

    pub(crate) fn extend_to(&mut self, seconds: f64) {
        if seconds > self.end_time {
            self.end_time = seconds;
        }
    }

    pub(crate) fn write_packet(
        &mut self,
        topology: &StreamTopology,
        packet: &Packet,
    ) -> Result<(), MuxError> {
        let mut ctx = MuxContext {
            path: &self.path,
            streams: topology.streams(),
            sink: &mut self.sink,
        };
        self.muxer.write_packet(&mut ctx, packet)?;
        self.packets += 1;
        Ok(())
    }

    fn record(&self) -> SegmentRecord {
        SegmentRecord {
            path: self.path.clone(),
            index: self.index,
            start_time: self.start_time,
            end_time: self.end_time,
            packets: self.packets,
        }
    }
}

impl std::fmt::Debug for ActiveSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSegment")
            .field("path", &self.path)
            .field("index", &self.index)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("packets", &self.packets)
            .finish()
    }
}

/// Outcome of ending a segment.
///
/// The record is always produced. `result` carries the first failure among
/// trailer, segment list and sink close.
#[derive(Debug)]
pub struct SegmentEnd {
    pub record: SegmentRecord,
    pub result: Result<(), SegmentError>,
}

/// Opens and closes segments for one run.
pub struct SegmentLifecycle {
    template: String,
    format: Arc<dyn OutputFormat>,
    opener: Arc<dyn IoOpener>,
    topology: StreamTopology,
    context: Arc<StreamerContext>,
}

impl SegmentLifecycle {
    pub fn new(
        template: impl Into<String>,
        format: Arc<dyn OutputFormat>,
        opener: Arc<dyn IoOpener>,
        topology: StreamTopology,
        context: Arc<StreamerContext>,
    ) -> Self {
        Self {
            template: template.into(),
            format,
            opener,
            topology,
            context,
        }
    }

    pub fn topology(&self) -> &StreamTopology {
        &self.topology
    }

    pub fn format(&self) -> &dyn OutputFormat {
        self.format.as_ref()
    }

    /// Opens the next segment: filename, sink, writer, header.
    ///
    /// On failure everything acquired for the attempt is released before
    /// returning.
    pub fn start(&self, counter: &mut SegmentCounter) -> Result<ActiveSegment, SegmentError> {
        let index = counter.begin_segment();
        let filename =
            frame_filename(&self.template, index).map_err(|source| SegmentError::InvalidTemplate {
                template: self.template.clone(),
                source,
            })?;
        let path = PathBuf::from(filename);

        let start_error = |source: MuxError| SegmentError::SegmentStart {
            path: path.clone(),
            source,
        };

        let sink = self
            .opener
            .open(&path, &self.context.token)
            .map_err(|e| start_error(e.into()))?;
        let muxer = self.format.create_muxer().map_err(start_error)?;

        let mut segment = ActiveSegment {
            path: path.clone(),
            index,
            muxer,
            sink,
            start_time: 0.0,
            end_time: 0.0,
            packets: 0,
        };

        let mut ctx = MuxContext {
            path: &segment.path,
            streams: self.topology.streams(),
            sink: &mut segment.sink,
        };
        // On error `segment` drops here, closing the sink and freeing the writer.
        segment.muxer.write_header(&mut ctx).map_err(start_error)?;

        info!(
            segment = index,
            ordinal = counter.started(),
            "{} Opened segment {}",
            self.context.name,
            path.display()
        );
        Ok(segment)
    }

    /// Closes `segment`: trailer, segment list record, sink.
    ///
    /// A trailer failure does not stop the record or the close. A segment
    /// list failure is reported in preference to a trailer failure.
    pub fn end(
        &self,
        mut segment: ActiveSegment,
        manifest: Option<&mut ManifestWriter>,
        completed: u64,
    ) -> SegmentEnd {
        let mut ctx = MuxContext {
            path: &segment.path,
            streams: self.topology.streams(),
            sink: &mut segment.sink,
        };
        let trailer = segment.muxer.write_trailer(&mut ctx);
        if let Err(e) = &trailer {
            warn!(
                "{} Failed to write trailer of segment {}: {e}",
                self.context.name,
                segment.path.display()
            );
        }

        let record = segment.record();

        let listed = match manifest {
            Some(manifest) => manifest.append(&record, completed),
            None => Ok(()),
        };

        let ActiveSegment {
            path, mut sink, muxer, ..
        } = segment;
        let closed = sink.flush();
        drop(sink);
        drop(muxer);
        debug!(
            "{} Closed segment {} ({} packets, {:.3}s - {:.3}s)",
            self.context.name,
            path.display(),
            record.packets,
            record.start_time,
            record.end_time
        );

        let result = listed
            .and(trailer.map_err(|source| SegmentError::SegmentEnd {
                path: path.clone(),
                source,
            }))
            .and(closed.map_err(|e| SegmentError::SegmentEnd {
                path,
                source: e.into(),
            }));

        SegmentEnd { record, result }
    }
}

impl std::fmt::Debug for SegmentLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentLifecycle")
            .field("template", &self.template)
            .field("format", &self.format.name())
            .finish_non_exhaustive()
    }
}
