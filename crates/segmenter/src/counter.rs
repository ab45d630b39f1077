use crate::config::WrapMode;

/// Ordinal of segments started so far, with the derived views used for
/// filename numbering and cut-point lookup.
///
/// The raw count never wraps. `segment_wrap` only affects the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCounter {
    started: u64,
    wrap: u32,
    mode: WrapMode,
}

impl SegmentCounter {
    pub fn new(wrap: u32, mode: WrapMode) -> Self {
        Self {
            started: 0,
            wrap,
            mode,
        }
    }

    /// Number of segments started so far.
    #[inline]
    pub fn started(&self) -> u64 {
        self.started
    }

    /// Records the start of a new segment and returns the number to format
    /// into its filename.
    pub fn begin_segment(&mut self) -> u64 {
        let index = self.wrapped(self.started);
        self.started += 1;
        index
    }

    /// Index into the cut-point list of the target ending the current segment.
    ///
    /// `None` before the first segment has started.
    pub fn cut_point_index(&self) -> Option<usize> {
        let current = self.started.checked_sub(1)?;
        let index = match self.mode {
            WrapMode::Coupled => self.wrapped(current),
            WrapMode::FilenameOnly => current,
        };
        usize::try_from(index).ok()
    }

    #[inline]
    fn wrapped(&self, n: u64) -> u64 {
        if self.wrap > 0 {
            n % self.wrap as u64
        } else {
            n
        }
    }
}
