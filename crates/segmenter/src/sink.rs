//! Byte sinks for segment files and the manifest.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use pipeline_common::CancellationToken;
use tracing::debug;

/// An open output sink. Closing is flushing and dropping it.
pub type Sink = Box<dyn Write + Send>;

/// Opens output sinks for writing.
///
/// Sinks are always opened fresh: an existing file is truncated. Every sink
/// must observe `interrupt` and fail further I/O once it is cancelled.
pub trait IoOpener: Send + Sync {
    fn open(&self, path: &Path, interrupt: &CancellationToken) -> io::Result<Sink>;
}

/// Opens buffered files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl IoOpener for FileOpener {
    fn open(&self, path: &Path, interrupt: &CancellationToken) -> io::Result<Sink> {
        if interrupt.is_cancelled() {
            return Err(interrupted());
        }
        debug!("Creating writer for path: {}", path.display());
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(Interruptible::new(
            BufWriter::with_capacity(1024 * 1024, file),
            interrupt.clone(),
        )))
    }
}

/// Writer adapter that refuses I/O once its token is cancelled.
#[derive(Debug)]
pub struct Interruptible<W> {
    inner: W,
    token: CancellationToken,
}

impl<W: Write> Interruptible<W> {
    pub fn new(inner: W, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for Interruptible<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(interrupted());
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.token.is_cancelled() {
            return Err(interrupted());
        }
        self.inner.flush()
    }
}

// Not `ErrorKind::Interrupted`: `write_all` would retry that forever.
const INTERRUPTED: &str = "operation interrupted";

fn interrupted() -> io::Error {
    io::Error::other(INTERRUPTED)
}

/// Whether an I/O error was raised because the session was interrupted.
pub fn is_interrupted(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Other && err.to_string() == INTERRUPTED
}
