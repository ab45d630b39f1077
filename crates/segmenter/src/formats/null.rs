use media_types::Packet;

use crate::error::MuxError;
use crate::muxer::{MuxContext, Muxer, OutputFormat};

/// Discards everything. Writes no file, so it cannot back a segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFormat;

impl OutputFormat for NullFormat {
    fn name(&self) -> &'static str {
        "null"
    }

    fn long_name(&self) -> &'static str {
        "raw null video"
    }

    fn needs_file(&self) -> bool {
        false
    }

    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError> {
        Ok(Box::new(NullMuxer))
    }
}

struct NullMuxer;

impl Muxer for NullMuxer {
    fn write_header(&mut self, _ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        Ok(())
    }

    fn write_packet(&mut self, _ctx: &mut MuxContext<'_>, _packet: &Packet) -> Result<(), MuxError> {
        Ok(())
    }
}
