use std::fmt;
use std::io::Write;

use media_types::Packet;

use crate::error::MuxError;
use crate::muxer::{MuxContext, Muxer, OutputFormat};

/// A text listing of every packet with a CRC-32 of its payload.
///
/// Useful to compare segment contents without decoding them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCrcFormat;

impl OutputFormat for FrameCrcFormat {
    fn name(&self) -> &'static str {
        "framecrc"
    }

    fn long_name(&self) -> &'static str {
        "framecrc testing"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["crc"]
    }

    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError> {
        Ok(Box::new(FrameCrcMuxer))
    }
}

struct FrameCrcMuxer;

struct Ts(Option<i64>);

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ts) => fmt::Display::fmt(&ts, f),
            None => f.pad("N/A"),
        }
    }
}

impl Muxer for FrameCrcMuxer {
    fn write_header(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        for stream in ctx.streams {
            writeln!(ctx.sink, "#tb {}: {}", stream.index, stream.time_base)?;
        }
        Ok(())
    }

    fn write_packet(&mut self, ctx: &mut MuxContext<'_>, packet: &Packet) -> Result<(), MuxError> {
        let crc = zlib_rs::crc32::crc32(0, &packet.data);
        writeln!(
            ctx.sink,
            "{}, {:>10}, {:>10}, {:>8}, {:>8}, 0x{:08x}",
            packet.stream_index,
            Ts(packet.dts),
            Ts(packet.pts),
            packet.duration,
            packet.data.len(),
            crc
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use media_types::{MediaType, Rational, StreamInfo, StreamSet};

    use super::*;

    #[test]
    fn test_listing() {
        let streams: StreamSet = [
            StreamInfo::new(0, MediaType::Video, Rational::MILLIS),
            StreamInfo::new(0, MediaType::Audio, Rational::new(1, 44_100)),
        ]
        .into_iter()
        .collect();
        let mut buf: Vec<u8> = Vec::new();
        let mut muxer = FrameCrcMuxer;
        {
            let mut ctx = MuxContext {
                path: Path::new("a.crc"),
                streams: &streams,
                sink: &mut buf,
            };
            muxer.write_header(&mut ctx).unwrap();
            muxer
                .write_packet(
                    &mut ctx,
                    &Packet::new(0, &b"abc"[..]).with_ts(40).with_duration(40),
                )
                .unwrap();
            muxer
                .write_packet(&mut ctx, &Packet::new(1, &b""[..]))
                .unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#tb 0: 1/1000");
        assert_eq!(lines[1], "#tb 1: 1/44100");
        assert_eq!(
            lines[2],
            "0,         40,         40,       40,        3, 0x352441c2"
        );
        assert_eq!(
            lines[3],
            "1,        N/A,        N/A,        0,        0, 0x00000000"
        );
    }
}
