//! In-memory sinks and failure-injecting formats for tests.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use media_types::{MediaType, Packet, Rational, StreamInfo, StreamSet};
use pipeline_common::CancellationToken;

use crate::error::MuxError;
use crate::muxer::{MuxContext, Muxer, OutputFormat};
use crate::segment::SegmentRecord;
use crate::sink::{Interruptible, IoOpener, Sink};

#[derive(Default)]
struct MemoryFs {
    files: HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>,
    failing: HashSet<PathBuf>,
    opened: Vec<PathBuf>,
}

/// An [`IoOpener`] backed by shared in-memory buffers.
///
/// Tracks how many sinks are currently open so tests can check that every
/// sink is released.
#[derive(Clone, Default)]
pub struct MemoryOpener {
    fs: Arc<Mutex<MemoryFs>>,
    live: Arc<AtomicUsize>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later open of `path` fail.
    pub fn fail_opens_of(&self, path: impl Into<PathBuf>) {
        self.fs.lock().unwrap().failing.insert(path.into());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        let fs = self.fs.lock().unwrap();
        fs.files.get(path).map(|b| b.lock().unwrap().clone())
    }

    pub fn text(&self, path: &str) -> String {
        self.contents(Path::new(path))
            .map(|b| String::from_utf8(b).unwrap())
            .unwrap_or_default()
    }

    /// Paths in the order they were opened.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.fs.lock().unwrap().opened.clone()
    }

    pub fn open_sinks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl IoOpener for MemoryOpener {
    fn open(&self, path: &Path, interrupt: &CancellationToken) -> io::Result<Sink> {
        let mut fs = self.fs.lock().unwrap();
        if fs.failing.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot open {}", path.display()),
            ));
        }
        let buffer = Arc::new(Mutex::new(Vec::new()));
        fs.files.insert(path.to_path_buf(), buffer.clone());
        fs.opened.push(path.to_path_buf());
        self.live.fetch_add(1, Ordering::SeqCst);

        let sink = MemorySink {
            buffer,
            live: self.live.clone(),
        };
        Ok(Box::new(Interruptible::new(sink, interrupt.clone())))
    }
}

struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    live: Arc<AtomicUsize>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A raw-data format whose writers fail on demand.
///
/// Writers are numbered in creation order, one per segment.
#[derive(Clone, Default)]
pub struct ScriptedFormat {
    created: Arc<AtomicUsize>,
    fail_header_on: Option<usize>,
    fail_packet_on: Option<usize>,
    fail_trailer: bool,
}

impl ScriptedFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`-th writer (0-based) fails to write its header.
    pub fn fail_header_on(mut self, n: usize) -> Self {
        self.fail_header_on = Some(n);
        self
    }

    /// The `n`-th writer (0-based) rejects every packet.
    pub fn fail_packet_on(mut self, n: usize) -> Self {
        self.fail_packet_on = Some(n);
        self
    }

    pub fn fail_trailer(mut self) -> Self {
        self.fail_trailer = true;
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl OutputFormat for ScriptedFormat {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["test"]
    }

    fn create_muxer(&self) -> Result<Box<dyn Muxer>, MuxError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedMuxer {
            fail_header: self.fail_header_on == Some(n),
            fail_packet: self.fail_packet_on == Some(n),
            fail_trailer: self.fail_trailer,
        }))
    }
}

struct ScriptedMuxer {
    fail_header: bool,
    fail_packet: bool,
    fail_trailer: bool,
}

impl Muxer for ScriptedMuxer {
    fn write_header(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        if self.fail_header {
            return Err(MuxError::InvalidData("scripted header failure".to_string()));
        }
        ctx.sink.write_all(b"H")?;
        Ok(())
    }

    fn write_packet(&mut self, ctx: &mut MuxContext<'_>, packet: &Packet) -> Result<(), MuxError> {
        if self.fail_packet {
            return Err(MuxError::InvalidData("scripted packet failure".to_string()));
        }
        ctx.sink.write_all(&packet.data)?;
        Ok(())
    }

    fn write_trailer(&mut self, ctx: &mut MuxContext<'_>) -> Result<(), MuxError> {
        if self.fail_trailer {
            return Err(MuxError::InvalidData("scripted trailer failure".to_string()));
        }
        ctx.sink.write_all(b"T")?;
        Ok(())
    }
}

pub fn record(path: &str, start_time: f64, end_time: f64) -> SegmentRecord {
    SegmentRecord {
        path: PathBuf::from(path),
        index: 0,
        start_time,
        end_time,
        packets: 0,
    }
}

/// One video stream (stream 0) and one audio stream (stream 1), both in
/// milliseconds.
pub fn av_streams() -> Arc<StreamSet> {
    Arc::new(
        [
            StreamInfo::new(0, MediaType::Video, Rational::MILLIS).with_codec("h264"),
            StreamInfo::new(0, MediaType::Audio, Rational::MILLIS).with_codec("aac"),
        ]
        .into_iter()
        .collect(),
    )
}

pub fn audio_only_streams() -> Arc<StreamSet> {
    Arc::new(
        [StreamInfo::new(0, MediaType::Audio, Rational::MILLIS).with_codec("aac")]
            .into_iter()
            .collect(),
    )
}

pub fn video_packet(ms: i64, keyframe: bool) -> Packet {
    Packet::new(0, vec![if keyframe { b'K' } else { b'P' }])
        .with_ts(ms)
        .with_duration(40)
        .keyframe(keyframe)
}

pub fn audio_packet(stream: usize, ms: i64) -> Packet {
    Packet::new(stream, &b"a"[..])
        .with_ts(ms)
        .with_duration(20)
        .keyframe(true)
}
