use media_types::Packet;

use crate::error::MuxError;
use crate::muxer::{MuxContext, Muxer, OutputFormat};

/// Raw packet payloads, concatenated. No header, no trailer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFormat;

impl OutputFormat for DataFormat {
    fn name(&self) -> &'static str {
        "data"
    }

    fn long_name(&self) -> &'static str {
        "raw packet data"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["bin", "raw"]
    }

    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError> {
        Ok(Box::new(DataMuxer))
    }
}

struct DataMuxer;

impl Muxer for DataMuxer {
    fn write_header(&mut self, _ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        Ok(())
    }

    fn write_packet(&mut self, ctx: &mut MuxContext<'_>, packet: &Packet) -> Result<(), MuxError> {
        ctx.sink.write_all(&packet.data)?;
        Ok(())
    }
}
