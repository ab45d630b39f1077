//! Shared media domain types.
//!
//! Streams, packets and the rational time bases their timestamps are
//! expressed in. These types are produced by demuxers, consumed by muxers and
//! inspected by the segmenter, so they carry no container-specific details
//! beyond the opaque codec configuration in [`StreamInfo::extradata`].

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;

/// A rational number used as a timestamp unit (`num / den` seconds per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// Microsecond resolution, the common unit for parsed durations and cut points.
    pub const MICROS: Rational = Rational::new(1, 1_000_000);

    /// Millisecond resolution (FLV timestamps).
    pub const MILLIS: Rational = Rational::new(1, 1000);

    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Converts a timestamp in this time base to seconds.
    #[inline]
    pub fn seconds(self, ts: i64) -> f64 {
        ts as f64 * self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Compares two timestamps expressed in different time bases without loss of precision.
pub fn compare_ts(a: i64, tb_a: Rational, b: i64, tb_b: Rational) -> Ordering {
    // a * tb_a.num / tb_a.den  vs  b * tb_b.num / tb_b.den
    let lhs = a as i128 * tb_a.num as i128 * tb_b.den as i128;
    let rhs = b as i128 * tb_b.num as i128 * tb_a.den as i128;
    // A negative denominator product flips the inequality.
    if (tb_a.den as i128 * tb_b.den as i128) < 0 {
        rhs.cmp(&lhs)
    } else {
        lhs.cmp(&rhs)
    }
}

/// Rescales `value` from one time base to another, rounding to nearest
/// (halfway cases away from zero). Saturates at the `i64` range.
pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    let num = value as i128 * from.num as i128 * to.den as i128;
    let den = from.den as i128 * to.num as i128;
    if den == 0 {
        return if num < 0 { i64::MIN } else { i64::MAX };
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Kind of media carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Data,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Subtitle => "subtitle",
            MediaType::Data => "data",
        };
        f.write_str(name)
    }
}

/// Description of one logical media stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: usize,
    pub media_type: MediaType,
    pub time_base: Rational,
    /// Short codec name (`h264`, `aac`, ...). Informational.
    pub codec: String,
    /// Codec configuration record as understood by the container the stream
    /// was demuxed from. Empty when the codec needs none.
    pub extradata: Bytes,
}

impl StreamInfo {
    pub fn new(index: usize, media_type: MediaType, time_base: Rational) -> Self {
        Self {
            index,
            media_type,
            time_base,
            codec: String::new(),
            extradata: Bytes::new(),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_extradata(mut self, extradata: impl Into<Bytes>) -> Self {
        self.extradata = extradata.into();
        self
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }
}

/// The ordered set of streams of one media session.
///
/// Stream `i` lives at position `i`; the set is built once by the demuxer or
/// host and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSet {
    streams: Vec<StreamInfo>,
}

impl StreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stream, assigning it the next index.
    pub fn push(&mut self, mut stream: StreamInfo) -> usize {
        let index = self.streams.len();
        stream.index = index;
        self.streams.push(stream);
        index
    }

    pub fn get(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut StreamInfo> {
        self.streams.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StreamInfo> {
        self.streams.iter()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Number of streams of the given media type.
    pub fn count(&self, media_type: MediaType) -> usize {
        self.streams
            .iter()
            .filter(|s| s.media_type == media_type)
            .count()
    }
}

impl FromIterator<StreamInfo> for StreamSet {
    fn from_iter<I: IntoIterator<Item = StreamInfo>>(iter: I) -> Self {
        let mut set = StreamSet::new();
        for stream in iter {
            set.push(stream);
        }
        set
    }
}

impl<'a> IntoIterator for &'a StreamSet {
    type Item = &'a StreamInfo;
    type IntoIter = std::slice::Iter<'a, StreamInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.iter()
    }
}

/// One encoded media packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub stream_index: usize,
    /// Presentation timestamp in the stream's time base, if known.
    pub pts: Option<i64>,
    /// Decoding timestamp in the stream's time base, if known.
    pub dts: Option<i64>,
    /// Duration in the stream's time base, 0 when unknown.
    pub duration: i64,
    /// Random-access point (keyframe / sync sample).
    pub is_keyframe: bool,
    pub data: Bytes,
}

impl Packet {
    pub fn new(stream_index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            stream_index,
            pts: None,
            dts: None,
            duration: 0,
            is_keyframe: false,
            data: data.into(),
        }
    }

    /// Sets both pts and dts.
    pub fn with_ts(mut self, ts: i64) -> Self {
        self.pts = Some(ts);
        self.dts = Some(ts);
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_ts_across_time_bases() {
        // 2000ms == 2_000_000us
        assert_eq!(
            compare_ts(2000, Rational::MILLIS, 2_000_000, Rational::MICROS),
            Ordering::Equal
        );
        assert_eq!(
            compare_ts(1999, Rational::MILLIS, 2_000_000, Rational::MICROS),
            Ordering::Less
        );
        // 90kHz: 180_001 ticks is just past 2s
        assert_eq!(
            compare_ts(180_001, Rational::new(1, 90_000), 2_000_000, Rational::MICROS),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_ts_does_not_overflow() {
        assert_eq!(
            compare_ts(i64::MAX, Rational::new(1, 90_000), i64::MAX, Rational::MICROS),
            Ordering::Greater
        );
    }

    #[test]
    fn test_rescale_rounds_to_nearest() {
        assert_eq!(rescale(1, Rational::new(1, 90_000), Rational::MILLIS), 0);
        assert_eq!(rescale(45, Rational::new(1, 90_000), Rational::MILLIS), 1);
        assert_eq!(rescale(-45, Rational::new(1, 90_000), Rational::MILLIS), -1);
        assert_eq!(rescale(3, Rational::MILLIS, Rational::MICROS), 3000);
    }

    #[test]
    fn test_stream_set_assigns_indices() {
        let set: StreamSet = [
            StreamInfo::new(9, MediaType::Video, Rational::MILLIS),
            StreamInfo::new(9, MediaType::Audio, Rational::MILLIS),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).map(|s| s.index), Some(1));
        assert_eq!(set.count(MediaType::Video), 1);
    }

    #[test]
    fn test_seconds() {
        assert_eq!(Rational::MILLIS.seconds(1500), 1.5);
        assert_eq!(Rational::new(1, 90_000).to_string(), "1/90000");
    }
}
