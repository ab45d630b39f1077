//! The segment boundary decision engine.
//!
//! [`Segmenter`] receives packets one at a time, decides for each one whether
//! it starts a new segment and routes it into the active segment. All work
//! happens on the caller's thread; there is no internal buffering.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use media_types::{Packet, Rational, StreamSet, compare_ts};
use pipeline_common::{StreamerContext, validate_frame_template};
use tracing::{debug, error, info, trace};

use crate::config::{SegmentOptions, SegmentationPolicy};
use crate::counter::SegmentCounter;
use crate::error::SegmentError;
use crate::formats::FormatRegistry;
use crate::manifest::ManifestWriter;
use crate::segment::{ActiveSegment, SegmentLifecycle, SegmentRecord};
use crate::sink::{FileOpener, IoOpener};
use crate::topology::StreamTopology;

/// Type alias for the segment open callback: path and filename number.
pub type SegmentOpenCallback = dyn Fn(&Path, u64) + Send + 'static;

/// Type alias for the segment close callback.
pub type SegmentCloseCallback = dyn Fn(&SegmentRecord) + Send + 'static;

/// What a completed run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSummary {
    /// Records of the completed segments, empty unless records are retained.
    pub segments: Vec<SegmentRecord>,
    pub segment_count: u64,
    pub packets: u64,
}

enum State {
    Running {
        segment: ActiveSegment,
        manifest: Option<ManifestWriter>,
    },
    /// A fatal error tore everything down.
    Failed,
}

/// Configures and starts a [`Segmenter`].
pub struct SegmenterBuilder {
    template: String,
    streams: Arc<StreamSet>,
    options: SegmentOptions,
    registry: Option<FormatRegistry>,
    opener: Option<Arc<dyn IoOpener>>,
    context: Option<Arc<StreamerContext>>,
    retain_records: bool,
    on_segment_open: Option<Box<SegmentOpenCallback>>,
    on_segment_close: Option<Box<SegmentCloseCallback>>,
}

impl SegmenterBuilder {
    pub fn options(mut self, options: SegmentOptions) -> Self {
        self.options = options;
        self
    }

    /// Formats to choose the segment format from. Defaults to
    /// [`FormatRegistry::with_defaults`].
    pub fn registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Where segment and list sinks come from. Defaults to [`FileOpener`].
    pub fn opener(mut self, opener: Arc<dyn IoOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn context(mut self, context: Arc<StreamerContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Whether to keep a [`SegmentRecord`] for every completed segment
    /// (default `true`). Long-running sessions can turn this off and collect
    /// records through [`on_segment_close`](Self::on_segment_close) instead.
    pub fn retain_records(mut self, retain: bool) -> Self {
        self.retain_records = retain;
        self
    }

    /// Sets a callback closure that will be called when a new segment is opened.
    pub fn on_segment_open<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Path, u64) + Send + 'static,
    {
        self.on_segment_open = Some(Box::new(callback));
        self
    }

    /// Sets a callback closure that will be called when a segment is closed.
    pub fn on_segment_close<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SegmentRecord) + Send + 'static,
    {
        self.on_segment_close = Some(Box::new(callback));
        self
    }

    /// Validates the configuration, opens the segment list and the first
    /// segment.
    ///
    /// Nothing is left open when this fails.
    pub fn build(self) -> Result<Segmenter, SegmentError> {
        let context = self
            .context
            .unwrap_or_else(|| Arc::new(StreamerContext::default()));
        let opener = self.opener.unwrap_or_else(|| Arc::new(FileOpener));
        let registry = self.registry.unwrap_or_else(FormatRegistry::with_defaults);

        let policy = self.options.policy()?;
        debug!("{} Segmentation policy: {:?}", context.name, policy);

        let topology = StreamTopology::new(self.streams, &context.name);

        let format_name = self.options.segment_format.as_deref();
        let format = registry.guess(format_name, &self.template).ok_or_else(|| {
            SegmentError::MuxerNotFound {
                format: format_name.map(str::to_string),
                filename: self.template.clone(),
            }
        })?;
        if !format.needs_file() {
            return Err(SegmentError::UnsupportedFormat(format.name().to_string()));
        }

        validate_frame_template(&self.template).map_err(|source| {
            SegmentError::InvalidTemplate {
                template: self.template.clone(),
                source,
            }
        })?;
        if self.options.segment_list.is_some() && self.template.contains(',') {
            return Err(SegmentError::config(
                "segment_list",
                &self.template,
                "segment filenames listed in a segment list must not contain ','",
            ));
        }

        let mut manifest = self
            .options
            .segment_list
            .as_ref()
            .map(|path| {
                ManifestWriter::open(
                    path,
                    self.options.segment_list_size,
                    opener.clone(),
                    context.token.clone(),
                )
            })
            .transpose()?;

        let lifecycle = SegmentLifecycle::new(
            self.template,
            format,
            opener,
            topology,
            context.clone(),
        );
        let mut counter = SegmentCounter::new(policy.wrap_limit, policy.wrap_mode);

        let segment = match lifecycle.start(&mut counter) {
            Ok(segment) => segment,
            Err(e) => {
                if let Some(manifest) = manifest.take() {
                    let _ = manifest.close();
                }
                return Err(e);
            }
        };
        if let Some(callback) = &self.on_segment_open {
            callback(segment.path(), segment.index());
        }

        info!(
            format = lifecycle.format().name(),
            "{} Segmenter started, writing {} segments",
            context.name,
            lifecycle.format().long_name()
        );

        Ok(Segmenter {
            policy,
            counter,
            lifecycle,
            state: State::Running { segment, manifest },
            completed: Vec::new(),
            completed_count: 0,
            retain_records: self.retain_records,
            packets: 0,
            context,
            on_segment_open: self.on_segment_open,
            on_segment_close: self.on_segment_close,
        })
    }
}

/// Splits a packet stream into consecutive segments.
///
/// Created through [`Segmenter::builder`], fed with [`write_packet`] and
/// closed exactly once with [`finish`]. Dropping a segmenter without
/// finishing it closes the current segment without a trailer.
///
/// [`write_packet`]: Segmenter::write_packet
/// [`finish`]: Segmenter::finish
pub struct Segmenter {
    policy: SegmentationPolicy,
    counter: SegmentCounter,
    lifecycle: SegmentLifecycle,
    state: State,
    completed: Vec<SegmentRecord>,
    completed_count: u64,
    retain_records: bool,
    packets: u64,
    context: Arc<StreamerContext>,
    on_segment_open: Option<Box<SegmentOpenCallback>>,
    on_segment_close: Option<Box<SegmentCloseCallback>>,
}

impl Segmenter {
    /// Starts configuring a segmenter writing `template` (a frame-number
    /// pattern such as `out%03d.flv`) for the given streams.
    pub fn builder(template: impl Into<String>, streams: Arc<StreamSet>) -> SegmenterBuilder {
        SegmenterBuilder {
            template: template.into(),
            streams,
            options: SegmentOptions::default(),
            registry: None,
            opener: None,
            context: None,
            retain_records: true,
            on_segment_open: None,
            on_segment_close: None,
        }
    }

    /// Shorthand for a file-backed segmenter with the built-in formats.
    pub fn new(
        template: impl Into<String>,
        streams: Arc<StreamSet>,
        options: SegmentOptions,
    ) -> Result<Self, SegmentError> {
        Self::builder(template, streams).options(options).build()
    }

    pub fn policy(&self) -> &SegmentationPolicy {
        &self.policy
    }

    /// Timestamp in microseconds at which the current segment is due to end.
    pub fn target(&self) -> i64 {
        self.policy.target(&self.counter)
    }

    /// Number of segments started so far, the current one included.
    pub fn segments_started(&self) -> u64 {
        self.counter.started()
    }

    /// Records of the segments finished so far, if records are retained.
    pub fn completed(&self) -> &[SegmentRecord] {
        &self.completed
    }

    /// Number of segments finished so far.
    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    /// The segment currently being written.
    pub fn current(&self) -> Option<&ActiveSegment> {
        match &self.state {
            State::Running { segment, .. } => Some(segment),
            State::Failed => None,
        }
    }

    /// Routes one packet, starting a new segment first when the packet
    /// qualifies as a cut.
    ///
    /// Any failure other than [`SegmentError::UnknownStream`] is fatal: the
    /// active segment and the segment list are closed as they are and every
    /// later call returns [`SegmentError::Aborted`].
    pub fn write_packet(&mut self, packet: &Packet) -> Result<(), SegmentError> {
        if self.is_failed() {
            return Err(SegmentError::Aborted);
        }

        let topology = self.lifecycle.topology();
        let stream = topology
            .stream(packet.stream_index)
            .ok_or(SegmentError::UnknownStream(packet.stream_index))?;
        let time_base = stream.time_base;
        let may_cut = topology.may_cut(stream);

        let result = self.route_packet(packet, time_base, may_cut);
        if let Err(e) = &result {
            error!("{} Segmenting aborted: {e}", self.context.name);
            self.state = State::Failed;
        }
        result
    }

    fn route_packet(
        &mut self,
        packet: &Packet,
        time_base: Rational,
        may_cut: bool,
    ) -> Result<(), SegmentError> {
        let threshold = self.policy.threshold(&self.counter);
        let is_cut = may_cut
            && packet.is_keyframe
            && packet.pts.is_some_and(|pts| {
                compare_ts(pts, time_base, threshold, Rational::MICROS) != Ordering::Less
            });

        if is_cut {
            self.cut(packet, time_base)?;
        }

        let State::Running { segment, .. } = &mut self.state else {
            return Err(SegmentError::Aborted);
        };
        if !is_cut && let Some(pts) = packet.pts {
            segment.extend_to(time_base.seconds(pts.saturating_add(packet.duration)));
        }

        trace!(
            stream = packet.stream_index,
            pts = packet.pts,
            keyframe = packet.is_keyframe,
            "Writing packet to {}",
            segment.path().display()
        );
        segment
            .write_packet(self.lifecycle.topology(), packet)
            .map_err(|source| SegmentError::PacketWrite {
                path: segment.path().to_path_buf(),
                source,
            })?;
        self.packets += 1;
        Ok(())
    }

    /// Ends the current segment and starts the next one at `packet`.
    ///
    /// The new segment's span already covers the cutting packet, so a segment
    /// holding a single packet still ends at `pts + duration`.
    fn cut(&mut self, packet: &Packet, time_base: Rational) -> Result<(), SegmentError> {
        let pts = packet.pts.unwrap_or_default();
        let pts_time = time_base.seconds(pts);
        info!(
            "{} Next segment starts with packet stream:{} pts:{} pts_time:{:.6}",
            self.context.name, packet.stream_index, pts, pts_time
        );

        // Anything that fails below leaves the state `Failed` with every
        // resource of the old and new segment released.
        let State::Running {
            segment,
            mut manifest,
        } = std::mem::replace(&mut self.state, State::Failed)
        else {
            return Err(SegmentError::Aborted);
        };

        self.end_segment(segment, manifest.as_mut())?;

        let mut next = self.lifecycle.start(&mut self.counter)?;
        next.begin_at(pts_time);
        next.extend_to(time_base.seconds(pts.saturating_add(packet.duration)));
        if let Some(callback) = &self.on_segment_open {
            callback(next.path(), next.index());
        }

        self.state = State::Running {
            segment: next,
            manifest,
        };
        Ok(())
    }

    fn end_segment(
        &mut self,
        segment: ActiveSegment,
        manifest: Option<&mut ManifestWriter>,
    ) -> Result<(), SegmentError> {
        self.completed_count += 1;
        let end = self.lifecycle.end(segment, manifest, self.completed_count);
        if let Some(callback) = &self.on_segment_close {
            callback(&end.record);
        }
        if self.retain_records {
            self.completed.push(end.record);
        }
        end.result
    }

    /// Closes the last segment and the segment list.
    ///
    /// Runs once: it consumes the segmenter. After a fatal error it only
    /// reports [`SegmentError::Aborted`].
    pub fn finish(mut self) -> Result<SegmentSummary, SegmentError> {
        let State::Running {
            segment,
            mut manifest,
        } = std::mem::replace(&mut self.state, State::Failed)
        else {
            return Err(SegmentError::Aborted);
        };

        let ended = self.end_segment(segment, manifest.as_mut());

        let closed = match manifest {
            Some(manifest) => {
                let path = manifest.path().to_path_buf();
                manifest
                    .close()
                    .map_err(|source| SegmentError::Manifest { path, source })
            }
            None => Ok(()),
        };

        ended.and(closed)?;

        info!(
            segments = self.completed_count,
            packets = self.packets,
            "{} Segmenter finished",
            self.context.name
        );
        Ok(SegmentSummary {
            segments: self.completed,
            segment_count: self.completed_count,
            packets: self.packets,
        })
    }
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("policy", &self.policy)
            .field("counter", &self.counter)
            .field("lifecycle", &self.lifecycle)
            .field("current", &self.current())
            .field("completed", &self.completed_count)
            .field("packets", &self.packets)
            .finish_non_exhaustive()
    }
}
