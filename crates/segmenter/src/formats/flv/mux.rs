use std::io::Write;

use media_types::{MediaType, Packet, Rational, rescale};
use tracing::trace;

use super::{
    TAG_HEADER_SIZE, TAG_TYPE_AUDIO, TAG_TYPE_VIDEO, encode_header_bytes, encode_tag_header_bytes,
};
use crate::error::MuxError;
use crate::muxer::{MuxContext, Muxer};

/// AVC end-of-sequence: keyframe, AVCPacketType 2, zero composition time.
const AVC_END_OF_SEQUENCE: [u8; 5] = [0x17, 0x02, 0x00, 0x00, 0x00];

/// Writes one FLV file. Holds at most one audio and one video stream.
#[derive(Debug, Default)]
pub struct FlvMuxer {
    video: Option<usize>,
    audio: Option<usize>,
    is_avc: bool,
    last_video_ts: u32,
    tags_written: u64,
}

impl FlvMuxer {
    fn write_tag(
        &mut self,
        sink: &mut dyn Write,
        tag_type: u8,
        timestamp_ms: u32,
        body: &[u8],
    ) -> Result<(), MuxError> {
        let data_size = u32::try_from(body.len())
            .map_err(|_| MuxError::InvalidData(format!("tag body of {} bytes", body.len())))?;
        let header = encode_tag_header_bytes(tag_type, data_size, timestamp_ms)?;

        sink.write_all(&header)?;
        sink.write_all(body)?;
        sink.write_all(&(TAG_HEADER_SIZE as u32 + data_size).to_be_bytes())?;

        self.tags_written += 1;
        Ok(())
    }

    fn tag_type_for(&self, stream_index: usize) -> Option<u8> {
        if self.video == Some(stream_index) {
            Some(TAG_TYPE_VIDEO)
        } else if self.audio == Some(stream_index) {
            Some(TAG_TYPE_AUDIO)
        } else {
            None
        }
    }
}

/// FLV timestamps are 32-bit milliseconds and wrap around.
fn flv_timestamp(ts: i64, time_base: Rational) -> u32 {
    let ms = rescale(ts, time_base, Rational::MILLIS).max(0);
    (ms as u64 & 0xFFFF_FFFF) as u32
}

impl Muxer for FlvMuxer {
    fn write_header(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        for stream in ctx.streams {
            let slot = match stream.media_type {
                MediaType::Video => &mut self.video,
                MediaType::Audio => &mut self.audio,
                other => {
                    return Err(MuxError::Unsupported(format!(
                        "FLV cannot carry {other} stream {}",
                        stream.index
                    )));
                }
            };
            if slot.is_some() {
                return Err(MuxError::Unsupported(format!(
                    "FLV carries a single {} stream",
                    stream.media_type
                )));
            }
            *slot = Some(stream.index);
        }

        if self.video.is_none() && self.audio.is_none() {
            return Err(MuxError::InvalidData(
                "FLV needs an audio or video stream".to_string(),
            ));
        }

        self.is_avc = self
            .video
            .and_then(|i| ctx.streams.get(i))
            .is_some_and(|s| s.codec == "h264");

        ctx.sink
            .write_all(&encode_header_bytes(self.audio.is_some(), self.video.is_some()))?;

        // Sequence headers first, video before audio.
        for index in [self.video, self.audio].into_iter().flatten() {
            let Some(stream) = ctx.streams.get(index) else {
                continue;
            };
            if stream.extradata.is_empty() {
                continue;
            }
            let tag_type = if stream.is_video() {
                TAG_TYPE_VIDEO
            } else {
                TAG_TYPE_AUDIO
            };
            let extradata = stream.extradata.clone();
            self.write_tag(ctx.sink, tag_type, 0, &extradata)?;
        }

        trace!(path = %ctx.path.display(), "FLV header written");
        Ok(())
    }

    fn write_packet(&mut self, ctx: &mut MuxContext<'_>, packet: &Packet) -> Result<(), MuxError> {
        let tag_type = self.tag_type_for(packet.stream_index).ok_or_else(|| {
            MuxError::InvalidData(format!(
                "packet for stream {} which is not muxed",
                packet.stream_index
            ))
        })?;
        let time_base = ctx
            .streams
            .get(packet.stream_index)
            .map(|s| s.time_base)
            .unwrap_or(Rational::MILLIS);

        let ts = packet.dts.or(packet.pts).unwrap_or(0);
        let timestamp_ms = flv_timestamp(ts, time_base);
        if tag_type == TAG_TYPE_VIDEO {
            self.last_video_ts = timestamp_ms;
        }

        self.write_tag(ctx.sink, tag_type, timestamp_ms, &packet.data)
    }

    fn write_trailer(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        if self.is_avc {
            let ts = self.last_video_ts;
            self.write_tag(ctx.sink, TAG_TYPE_VIDEO, ts, &AVC_END_OF_SEQUENCE)?;
        }
        trace!(
            path = %ctx.path.display(),
            tags = self.tags_written,
            "FLV trailer written"
        );
        Ok(())
    }
}
