use std::sync::Arc;

use media_types::{MediaType, StreamInfo, StreamSet};
use tracing::{info, warn};

/// Read-only view of the host's streams shared by every segment writer.
///
/// The stream set is owned by the host and only ever borrowed by the
/// per-segment writers, one call at a time, so no segment can outlive or
/// free it.
#[derive(Debug, Clone)]
pub struct StreamTopology {
    streams: Arc<StreamSet>,
    video_streams: usize,
}

impl StreamTopology {
    pub fn new(streams: Arc<StreamSet>, session: &str) -> Self {
        let video_streams = streams.count(MediaType::Video);
        if video_streams > 1 {
            warn!(
                video_streams,
                "{} More than a single video stream present, expect issues decoding it",
                session
            );
        }
        info!(
            streams = streams.len(),
            video_streams, "{} Stream topology attached", session
        );
        Self {
            streams,
            video_streams,
        }
    }

    #[inline]
    pub fn streams(&self) -> &StreamSet {
        &self.streams
    }

    #[inline]
    pub fn stream(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.get(index)
    }

    #[inline]
    pub fn has_video(&self) -> bool {
        self.video_streams > 0
    }

    pub fn video_streams(&self) -> usize {
        self.video_streams
    }

    /// Whether packets of `stream` may end a segment.
    ///
    /// With video present only video packets qualify, so every segment starts
    /// on a video keyframe. With several video streams any of them may
    /// trigger the cut.
    pub fn may_cut(&self, stream: &StreamInfo) -> bool {
        !self.has_video() || stream.is_video()
    }
}
