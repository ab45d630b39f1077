//! FLV segments.
//!
//! Packets carry complete FLV tag bodies: the audio/video tag header bytes
//! followed by the codec payload. A stream's extradata is the body of its
//! sequence header tag. This lets a demuxed FLV be re-segmented without
//! touching the payloads.

mod demux;
mod mux;

use std::io;

pub use demux::FlvDemuxer;
pub use mux::FlvMuxer;

use crate::error::MuxError;
use crate::muxer::{Muxer, OutputFormat};

pub const FLV_SIGNATURE: u32 = 0x464C56;
pub const FLV_HEADER_SIZE: usize = 9;
pub const PREV_TAG_SIZE_FIELD_SIZE: usize = 4;
pub const TAG_HEADER_SIZE: usize = 11;
pub const MAX_TAG_DATA_SIZE: u32 = 0xFF_FFFF;

pub const TAG_TYPE_AUDIO: u8 = 8;
pub const TAG_TYPE_VIDEO: u8 = 9;
pub const TAG_TYPE_SCRIPT: u8 = 18;

const FLAG_VIDEO: u8 = 0x01;
const FLAG_AUDIO: u8 = 0x04;

/// The FLV container.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlvFormat;

impl OutputFormat for FlvFormat {
    fn name(&self) -> &'static str {
        "flv"
    }

    fn long_name(&self) -> &'static str {
        "FLV (Flash Video)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["flv"]
    }

    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError> {
        Ok(Box::new(FlvMuxer::default()))
    }
}

/// The 9-byte file header followed by PreviousTagSize0.
pub fn encode_header_bytes(
    has_audio: bool,
    has_video: bool,
) -> [u8; FLV_HEADER_SIZE + PREV_TAG_SIZE_FIELD_SIZE] {
    let mut out = [0u8; FLV_HEADER_SIZE + PREV_TAG_SIZE_FIELD_SIZE];
    out[..3].copy_from_slice(&FLV_SIGNATURE.to_be_bytes()[1..]);
    out[3] = 0x01;

    let mut flags = 0u8;
    if has_video {
        flags |= FLAG_VIDEO;
    }
    if has_audio {
        flags |= FLAG_AUDIO;
    }
    out[4] = flags;

    out[5..9].copy_from_slice(&(FLV_HEADER_SIZE as u32).to_be_bytes());
    // PreviousTagSize0 stays zero.
    out
}

pub fn encode_tag_header_bytes(
    tag_type: u8,
    data_size: u32,
    timestamp_ms: u32,
) -> io::Result<[u8; TAG_HEADER_SIZE]> {
    if data_size > MAX_TAG_DATA_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("FLV tag data size ({data_size}) exceeds 24-bit limit ({MAX_TAG_DATA_SIZE})"),
        ));
    }

    let mut out = [0u8; TAG_HEADER_SIZE];
    out[0] = tag_type & 0x1F;

    out[1] = (data_size >> 16) as u8;
    out[2] = (data_size >> 8) as u8;
    out[3] = data_size as u8;

    // Lower 24 bits, then the extended byte.
    out[4] = (timestamp_ms >> 16) as u8;
    out[5] = (timestamp_ms >> 8) as u8;
    out[6] = timestamp_ms as u8;
    out[7] = (timestamp_ms >> 24) as u8;

    // StreamID is always 0.
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub tag_type: u8,
    pub is_filtered: bool,
    pub data_size: u32,
    pub timestamp_ms: u32,
}

pub fn parse_tag_header_bytes(bytes: [u8; TAG_HEADER_SIZE]) -> TagHeader {
    let data_size = ((bytes[1] as u32) << 16) | ((bytes[2] as u32) << 8) | (bytes[3] as u32);
    let timestamp_ms = ((bytes[7] as u32) << 24)
        | ((bytes[4] as u32) << 16)
        | ((bytes[5] as u32) << 8)
        | (bytes[6] as u32);

    TagHeader {
        tag_type: bytes[0] & 0x1F,
        is_filtered: (bytes[0] & 0x20) != 0,
        data_size,
        timestamp_ms,
    }
}
