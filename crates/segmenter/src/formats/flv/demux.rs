use std::collections::VecDeque;
use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use media_types::{MediaType, Packet, Rational, StreamInfo, StreamSet};
use tracing::{debug, trace, warn};

use super::{
    FLV_HEADER_SIZE, FLV_SIGNATURE, TAG_HEADER_SIZE, TAG_TYPE_AUDIO, TAG_TYPE_SCRIPT,
    TAG_TYPE_VIDEO, TagHeader, parse_tag_header_bytes,
};

/// Upper bound on the tags inspected before the stream layout is fixed.
const PROBE_TAGS: usize = 64;
const MAX_DATA_OFFSET: u32 = 64 * 1024;

const SOUND_FORMAT_AAC: u8 = 10;
const CODEC_ID_AVC: u8 = 7;
const CODEC_ID_HEVC: u8 = 12;
const FRAME_TYPE_KEY: u8 = 1;
const ENHANCED_SEQUENCE_START: u8 = 0;
const ENHANCED_CODED_FRAMES: u8 = 1;
const ENHANCED_SEQUENCE_END: u8 = 2;
const AVC_END_OF_SEQUENCE: u8 = 2;

/// Reads an FLV file as a [`StreamSet`] and a sequence of [`Packet`]s.
///
/// Streams are ordered video first, then audio. All timestamps are in
/// milliseconds. Script data tags are skipped and the first sequence header
/// of each stream becomes its extradata instead of a packet.
#[derive(Debug)]
pub struct FlvDemuxer<R> {
    reader: R,
    streams: StreamSet,
    video: Option<usize>,
    audio: Option<usize>,
    pending: VecDeque<Packet>,
    eof: bool,
}

#[derive(Debug)]
struct RawTag {
    header: TagHeader,
    body: Bytes,
}

#[derive(Debug, Default)]
struct VideoFields {
    frame_type: u8,
    is_sequence_header: bool,
    is_sequence_end: bool,
    composition_time: i32,
}

impl<R: Read> FlvDemuxer<R> {
    /// Parses the file header and probes the first tags to find the streams.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let (has_audio, has_video) = read_file_header(&mut reader)?;
        debug!(has_audio, has_video, "FLV header parsed");

        let mut demuxer = Self {
            reader,
            streams: StreamSet::new(),
            video: None,
            audio: None,
            pending: VecDeque::new(),
            eof: false,
        };

        let mut probed = Vec::new();
        let mut first_video: Option<usize> = None;
        let mut first_audio: Option<usize> = None;
        let mut video_frame_seen = false;
        let mut audio_frame_seen = false;
        while probed.len() < PROBE_TAGS {
            let Some(tag) = demuxer.read_tag()? else {
                break;
            };
            match tag.header.tag_type {
                TAG_TYPE_VIDEO => {
                    first_video.get_or_insert(probed.len());
                    video_frame_seen |= !parse_video_fields(&tag.body).is_sequence_header;
                }
                TAG_TYPE_AUDIO => {
                    first_audio.get_or_insert(probed.len());
                    audio_frame_seen |= !is_audio_sequence_header(&tag.body);
                }
                _ => {}
            }
            probed.push(tag);
            if (video_frame_seen || !has_video) && (audio_frame_seen || !has_audio) {
                break;
            }
        }

        if has_video || first_video.is_some() {
            let codec = first_video
                .map(|i| video_codec_name(&probed[i].body))
                .unwrap_or("unknown");
            let info = StreamInfo::new(0, MediaType::Video, Rational::MILLIS).with_codec(codec);
            demuxer.video = Some(demuxer.streams.push(info));
        }
        if has_audio || first_audio.is_some() {
            let codec = first_audio
                .map(|i| audio_codec_name(&probed[i].body))
                .unwrap_or("unknown");
            let info = StreamInfo::new(0, MediaType::Audio, Rational::MILLIS).with_codec(codec);
            demuxer.audio = Some(demuxer.streams.push(info));
        }

        for tag in probed {
            demuxer.take_extradata_or_queue(tag);
        }

        for stream in &demuxer.streams {
            debug!(
                "Stream #{}: {} ({}), extradata {} bytes",
                stream.index,
                stream.media_type,
                stream.codec,
                stream.extradata.len()
            );
        }
        Ok(demuxer)
    }

    pub fn streams(&self) -> &StreamSet {
        &self.streams
    }

    /// Returns the next packet, or `None` at the end of the file.
    pub fn read_packet(&mut self) -> io::Result<Option<Packet>> {
        loop {
            if let Some(packet) = self.pending.pop_front() {
                return Ok(Some(packet));
            }
            let Some(tag) = self.read_tag()? else {
                return Ok(None);
            };
            if let Some(packet) = self.tag_to_packet(tag) {
                return Ok(Some(packet));
            }
        }
    }

    fn take_extradata_or_queue(&mut self, tag: RawTag) {
        let stream = match tag.header.tag_type {
            TAG_TYPE_VIDEO if parse_video_fields(&tag.body).is_sequence_header => self.video,
            TAG_TYPE_AUDIO if is_audio_sequence_header(&tag.body) => self.audio,
            _ => None,
        };
        if let Some(index) = stream
            && let Some(info) = self.streams.get_mut(index)
            && info.extradata.is_empty()
        {
            info.extradata = tag.body;
            return;
        }
        if let Some(packet) = self.tag_to_packet(tag) {
            self.pending.push_back(packet);
        }
    }

    fn tag_to_packet(&self, tag: RawTag) -> Option<Packet> {
        if tag.header.is_filtered {
            warn!("Skipping encrypted FLV tag");
            return None;
        }
        if tag.body.is_empty() {
            return None;
        }

        let dts = tag.header.timestamp_ms as i64;
        match tag.header.tag_type {
            TAG_TYPE_VIDEO => {
                let index = self.video?;
                let fields = parse_video_fields(&tag.body);
                if fields.is_sequence_end {
                    // Muxers write their own end-of-sequence marker when a segment closes.
                    debug!("Dropping video end-of-sequence tag at {dts} ms");
                    return None;
                }
                let mut packet = Packet::new(index, tag.body)
                    .keyframe(fields.frame_type == FRAME_TYPE_KEY && !fields.is_sequence_header);
                packet.dts = Some(dts);
                packet.pts = Some(dts + fields.composition_time as i64);
                Some(packet)
            }
            TAG_TYPE_AUDIO => {
                let index = self.audio?;
                Some(Packet::new(index, tag.body).with_ts(dts).keyframe(true))
            }
            TAG_TYPE_SCRIPT => {
                trace!("Skipping script data tag");
                None
            }
            other => {
                debug!("Skipping unknown FLV tag type {other}");
                None
            }
        }
    }

    fn read_tag(&mut self) -> io::Result<Option<RawTag>> {
        if self.eof {
            return Ok(None);
        }

        let mut header_bytes = [0u8; TAG_HEADER_SIZE];
        match self.reader.read_exact(&mut header_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.eof = true;
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let header = parse_tag_header_bytes(header_bytes);

        let mut body = vec![0u8; header.data_size as usize];
        match self.reader.read_exact(&mut body) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(
                    "Truncated FLV tag: expected {} body bytes, stopping",
                    header.data_size
                );
                self.eof = true;
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        match self.reader.read_u32::<BigEndian>() {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => self.eof = true,
            Err(e) => return Err(e),
        }

        Ok(Some(RawTag {
            header,
            body: Bytes::from(body),
        }))
    }
}

/// Validates the file header, skips to the first tag and returns the
/// `(has_audio, has_video)` flags.
fn read_file_header<R: Read>(reader: &mut R) -> io::Result<(bool, bool)> {
    let signature = reader.read_u24::<BigEndian>()?;
    if signature != FLV_SIGNATURE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Invalid FLV signature",
        ));
    }

    let version = reader.read_u8()?;
    if version != 0x01 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unsupported FLV version: {version}"),
        ));
    }

    let flags = reader.read_u8()?;
    let has_audio = (flags & 0b0000_0100) != 0;
    let has_video = (flags & 0b0000_0001) != 0;

    let data_offset = reader.read_u32::<BigEndian>()?;
    if !(FLV_HEADER_SIZE as u32..=MAX_DATA_OFFSET).contains(&data_offset) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid FLV DataOffset: {data_offset}"),
        ));
    }
    let extra = (data_offset as u64) - FLV_HEADER_SIZE as u64;
    io::copy(&mut reader.by_ref().take(extra), &mut io::sink())?;

    // PreviousTagSize0
    reader.read_u32::<BigEndian>()?;
    Ok((has_audio, has_video))
}

fn parse_video_fields(body: &[u8]) -> VideoFields {
    let Some(&first) = body.first() else {
        return VideoFields::default();
    };

    if first & 0x80 != 0 {
        let packet_type = first & 0x0F;
        let fourcc = body.get(1..5).unwrap_or_default();
        let has_cts = packet_type == ENHANCED_CODED_FRAMES && matches!(fourcc, b"avc1" | b"hvc1");
        VideoFields {
            frame_type: (first >> 4) & 0x07,
            is_sequence_header: packet_type == ENHANCED_SEQUENCE_START,
            is_sequence_end: packet_type == ENHANCED_SEQUENCE_END,
            composition_time: if has_cts { read_si24(body, 5) } else { 0 },
        }
    } else {
        let codec_id = first & 0x0F;
        let has_packet_type = matches!(codec_id, CODEC_ID_AVC | CODEC_ID_HEVC);
        VideoFields {
            frame_type: first >> 4,
            is_sequence_header: has_packet_type && body.get(1) == Some(&0),
            is_sequence_end: has_packet_type && body.get(1) == Some(&AVC_END_OF_SEQUENCE),
            composition_time: if has_packet_type { read_si24(body, 2) } else { 0 },
        }
    }
}

fn read_si24(body: &[u8], offset: usize) -> i32 {
    body.get(offset..offset + 3)
        .and_then(|mut b| b.read_i24::<BigEndian>().ok())
        .unwrap_or(0)
}

fn is_audio_sequence_header(body: &[u8]) -> bool {
    body.len() >= 2 && body[0] >> 4 == SOUND_FORMAT_AAC && body[1] == 0
}

fn video_codec_name(body: &[u8]) -> &'static str {
    let Some(&first) = body.first() else {
        return "unknown";
    };
    if first & 0x80 != 0 {
        return match body.get(1..5) {
            Some(b"avc1") => "h264",
            Some(b"hvc1") => "hevc",
            Some(b"av01") => "av1",
            Some(b"vp09") => "vp9",
            _ => "unknown",
        };
    }
    match first & 0x0F {
        2 => "flv1",
        3 => "flashsv",
        4 => "vp6f",
        5 => "vp6a",
        6 => "flashsv2",
        CODEC_ID_AVC => "h264",
        CODEC_ID_HEVC => "hevc",
        _ => "unknown",
    }
}

fn audio_codec_name(body: &[u8]) -> &'static str {
    match body.first().map(|b| b >> 4) {
        Some(0 | 3) => "pcm",
        Some(1) => "adpcm_swf",
        Some(2 | 14) => "mp3",
        Some(4..=6) => "nellymoser",
        Some(7) => "pcm_alaw",
        Some(8) => "pcm_mulaw",
        Some(SOUND_FORMAT_AAC) => "aac",
        Some(11) => "speex",
        _ => "unknown",
    }
}
