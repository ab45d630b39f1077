//! The segment list written alongside the segments.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline_common::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SegmentError;
use crate::segment::SegmentRecord;
use crate::sink::{IoOpener, Sink};

/// Appends one `filename,start,end` line per completed segment.
///
/// With a non-zero `list_size` the file is truncated before every
/// `list_size`-th record, so each rotated file starts with the record that
/// caused the rotation.
pub struct ManifestWriter {
    path: PathBuf,
    list_size: u32,
    opener: Arc<dyn IoOpener>,
    token: CancellationToken,
    sink: Option<Sink>,
}

impl ManifestWriter {
    /// Creates (or truncates) the list file.
    pub fn open(
        path: impl Into<PathBuf>,
        list_size: u32,
        opener: Arc<dyn IoOpener>,
        token: CancellationToken,
    ) -> Result<Self, SegmentError> {
        let path = path.into();
        let sink = opener
            .open(&path, &token)
            .map_err(|source| SegmentError::Manifest {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), list_size, "Segment list opened");
        Ok(Self {
            path,
            list_size,
            opener,
            token,
            sink: Some(sink),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the record of the `completed`-th finished segment (1-based).
    pub fn append(&mut self, record: &SegmentRecord, completed: u64) -> Result<(), SegmentError> {
        if self.list_size > 0 && completed % self.list_size as u64 == 0 {
            self.rotate()?;
        }

        let path = &self.path;
        let sink = self.sink.as_mut().ok_or_else(|| SegmentError::Manifest {
            path: path.clone(),
            source: io::Error::other("segment list is closed"),
        })?;
        write_record(sink, record).map_err(|source| SegmentError::Manifest {
            path: path.clone(),
            source,
        })
    }

    fn rotate(&mut self) -> Result<(), SegmentError> {
        if let Some(mut old) = self.sink.take()
            && let Err(e) = old.flush()
        {
            warn!(path = %self.path.display(), "Failed to flush segment list before rotation: {e}");
        }

        let sink = self
            .opener
            .open(&self.path, &self.token)
            .map_err(|source| SegmentError::ManifestRotation {
                path: self.path.clone(),
                source,
            })?;
        self.sink = Some(sink);
        info!(path = %self.path.display(), "Segment list rotated");
        Ok(())
    }

    /// Flushes and closes the list file.
    pub fn close(mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(mut sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

fn write_record(sink: &mut Sink, record: &SegmentRecord) -> io::Result<()> {
    writeln!(
        sink,
        "{},{:.6},{:.6}",
        record.path.display(),
        record.start_time,
        record.end_time
    )?;
    sink.flush()
}

impl std::fmt::Debug for ManifestWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestWriter")
            .field("path", &self.path)
            .field("list_size", &self.list_size)
            .field("open", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FileOpener;
    use crate::test_utils::{MemoryOpener, record};

    fn manifest_lines(opener: &MemoryOpener, path: &str) -> Vec<String> {
        opener
            .contents(Path::new(path))
            .map(|b| String::from_utf8(b).unwrap())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_record_format() {
        let opener = MemoryOpener::new();
        let mut manifest =
            ManifestWriter::open("list.csv", 0, Arc::new(opener.clone()), CancellationToken::new())
                .unwrap();
        manifest.append(&record("seg0.flv", 0.0, 2.04), 1).unwrap();
        manifest.append(&record("seg1.flv", 2.04, 4.5), 2).unwrap();

        assert_eq!(
            manifest_lines(&opener, "list.csv"),
            vec!["seg0.flv,0.000000,2.040000", "seg1.flv,2.040000,4.500000"]
        );
        manifest.close().unwrap();
    }

    #[test]
    fn test_rotation_every_two_records() {
        let opener = MemoryOpener::new();
        let mut manifest =
            ManifestWriter::open("list.csv", 2, Arc::new(opener.clone()), CancellationToken::new())
                .unwrap();

        manifest.append(&record("s1", 0.0, 1.0), 1).unwrap();
        assert_eq!(manifest_lines(&opener, "list.csv").len(), 1);

        manifest.append(&record("s2", 1.0, 2.0), 2).unwrap();
        assert_eq!(manifest_lines(&opener, "list.csv"), vec!["s2,1.000000,2.000000"]);

        manifest.append(&record("s3", 2.0, 3.0), 3).unwrap();
        manifest.append(&record("s4", 3.0, 4.0), 4).unwrap();
        manifest.append(&record("s5", 4.0, 5.0), 5).unwrap();
        assert_eq!(
            manifest_lines(&opener, "list.csv"),
            vec!["s4,3.000000,4.000000", "s5,4.000000,5.000000"]
        );
    }

    #[test]
    fn test_rotation_failure_leaves_record_unwritten() {
        let opener = MemoryOpener::new();
        let mut manifest =
            ManifestWriter::open("list.csv", 1, Arc::new(opener.clone()), CancellationToken::new())
                .unwrap();
        opener.fail_opens_of("list.csv");

        let err = manifest.append(&record("s1", 0.0, 1.0), 1).unwrap_err();
        assert!(matches!(err, SegmentError::ManifestRotation { .. }));
        assert!(manifest_lines(&opener, "list.csv").is_empty());
    }

    #[test]
    fn test_open_truncates_existing_list() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("list.csv");
        std::fs::write(&path, "stale,0,0\n")?;

        let mut manifest =
            ManifestWriter::open(&path, 0, Arc::new(FileOpener), CancellationToken::new())?;
        manifest.append(&record("a.flv", 0.0, 0.0), 1)?;
        manifest.close()?;

        assert_eq!(std::fs::read_to_string(&path)?, "a.flv,0.000000,0.000000\n");
        Ok(())
    }
}
