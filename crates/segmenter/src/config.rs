//! Segmenter options and the immutable policy derived from them.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::counter::SegmentCounter;
use crate::error::SegmentError;
use crate::timespec::{parse_duration, parse_time_list};

pub const DEFAULT_SEGMENT_TIME: &str = "2";
pub const DEFAULT_SEGMENT_DELTA: &str = "0";

/// How `segment_wrap` applies to the cut-point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// The wrapped index drives both filenames and the cut-point lookup:
    /// once the index wraps, the next target is the first cut point again.
    #[default]
    Coupled,
    /// Only filenames wrap; cut points are looked up with the raw segment count.
    FilenameOnly,
}

impl std::str::FromStr for WrapMode {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "coupled" => Ok(WrapMode::Coupled),
            "filename_only" => Ok(WrapMode::FilenameOnly),
            other => Err(SegmentError::config(
                "segment_wrap_mode",
                other,
                "expected 'coupled' or 'filename_only'",
            )),
        }
    }
}

/// User-facing segmenter options, keyed like the option table of the
/// segment muxer. Duration values stay unparsed until [`Self::policy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Inner container format; inferred from the filename template when unset.
    pub segment_format: Option<String>,
    /// Fixed segment duration.
    pub segment_time: String,
    /// Explicit ascending cut points; overrides `segment_time`.
    pub segment_times: Option<String>,
    /// Tolerance applied when matching a keyframe against the target.
    pub segment_delta: String,
    /// Manifest path. No manifest when unset.
    pub segment_list: Option<PathBuf>,
    /// Rotate the manifest every this many completed segments (0 = never).
    pub segment_list_size: u32,
    /// Modulus for the segment index (0 = unbounded).
    pub segment_wrap: u32,
    pub segment_wrap_mode: WrapMode,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            segment_format: None,
            segment_time: DEFAULT_SEGMENT_TIME.to_string(),
            segment_times: None,
            segment_delta: DEFAULT_SEGMENT_DELTA.to_string(),
            segment_list: None,
            segment_list_size: 0,
            segment_wrap: 0,
            segment_wrap_mode: WrapMode::default(),
        }
    }
}

impl SegmentOptions {
    /// Applies a single option by key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SegmentError> {
        debug!(key, value, "Setting segment option");
        match key {
            "segment_format" => self.segment_format = Some(value.to_string()),
            "segment_time" => self.segment_time = value.to_string(),
            "segment_times" => self.segment_times = Some(value.to_string()),
            "segment_delta" => self.segment_delta = value.to_string(),
            "segment_list" => self.segment_list = Some(PathBuf::from(value)),
            "segment_list_size" => {
                self.segment_list_size = parse_count("segment_list_size", value)?
            }
            "segment_wrap" => self.segment_wrap = parse_count("segment_wrap", value)?,
            "segment_wrap_mode" => self.segment_wrap_mode = value.parse()?,
            _ => {
                return Err(SegmentError::Config {
                    option: "segment option",
                    value: key.to_string(),
                    reason: "unknown option".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Applies a list of `key=value` strings in order.
    pub fn from_params<I, S>(params: I) -> Result<Self, SegmentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for param in params {
            let param = param.as_ref();
            let (key, value) = param.split_once('=').ok_or_else(|| {
                SegmentError::config("segment option", param, "expected key=value")
            })?;
            options.set(key.trim(), value.trim())?;
        }
        Ok(options)
    }

    /// Parses the duration options into an immutable policy.
    pub fn policy(&self) -> Result<SegmentationPolicy, SegmentError> {
        let cut_points = self
            .segment_times
            .as_deref()
            .map(|times| parse_time_list("segment_times", times))
            .transpose()?;

        let interval = parse_duration("segment_time", &self.segment_time)?;
        if interval < 0 {
            return Err(SegmentError::config(
                "segment_time",
                &self.segment_time,
                "duration must not be negative",
            ));
        }

        let tolerance = parse_duration("segment_delta", &self.segment_delta)?;
        if tolerance < 0 {
            return Err(SegmentError::config(
                "segment_delta",
                &self.segment_delta,
                "delta must not be negative",
            ));
        }

        let schedule = match cut_points {
            Some(points) => CutSchedule::CutPoints(points),
            None => {
                if interval == 0 {
                    warn!("segment_time is 0, every keyframe will start a new segment");
                }
                CutSchedule::Interval(interval)
            }
        };

        Ok(SegmentationPolicy {
            schedule,
            tolerance,
            wrap_limit: self.segment_wrap,
            wrap_mode: self.segment_wrap_mode,
        })
    }
}

fn parse_count(option: &'static str, value: &str) -> Result<u32, SegmentError> {
    value
        .trim()
        .parse()
        .map_err(|_| SegmentError::config(option, value, "expected a non-negative integer"))
}

/// When segments should end, in microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutSchedule {
    /// Segment `n` ends at `interval * n`.
    Interval(i64),
    /// Explicit, non-decreasing absolute cut points.
    CutPoints(Vec<i64>),
}

/// Parsed segmentation settings, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationPolicy {
    pub schedule: CutSchedule,
    /// Slack subtracted from the target when testing a keyframe, in microseconds.
    pub tolerance: i64,
    pub wrap_limit: u32,
    pub wrap_mode: WrapMode,
}

impl SegmentationPolicy {
    /// Timestamp (microseconds) at which the current segment should end.
    ///
    /// `i64::MAX` once an explicit cut-point list is exhausted.
    pub fn target(&self, counter: &SegmentCounter) -> i64 {
        match &self.schedule {
            CutSchedule::Interval(interval) => {
                interval.saturating_mul(counter.started().min(i64::MAX as u64) as i64)
            }
            CutSchedule::CutPoints(points) => counter
                .cut_point_index()
                .and_then(|i| points.get(i).copied())
                .unwrap_or(i64::MAX),
        }
    }

    /// Earliest keyframe timestamp (microseconds) that ends the current segment.
    pub fn threshold(&self, counter: &SegmentCounter) -> i64 {
        self.target(counter).saturating_sub(self.tolerance)
    }
}
