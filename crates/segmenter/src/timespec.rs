//! Duration and time-list parsing.
//!
//! Accepted duration syntax (all results in microseconds):
//!
//! - `[-][HH:]MM:SS[.m...]` - hours are unbounded, minutes and seconds must be below 60
//! - `[-]S+[.m...]` - plain seconds
//! - either form may carry a `s`, `ms` or `us` unit suffix (plain seconds only)
//!
//! Fractional digits beyond microsecond precision are ignored.

use crate::error::SegmentError;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Parses one duration string into microseconds.
///
/// `option` names the setting being parsed and only appears in errors.
pub fn parse_duration(option: &'static str, input: &str) -> Result<i64, SegmentError> {
    let err = |reason: &str| SegmentError::config(option, input, reason);

    let text = input.trim();
    if text.is_empty() {
        return Err(err("empty duration"));
    }

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (body, unit_divisor) = split_unit(body);

    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (body, None),
    };

    let whole_seconds = if int_part.contains(':') {
        if unit_divisor.is_some() {
            return Err(err("unit suffix not allowed with HH:MM:SS syntax"));
        }
        parse_clock(int_part).ok_or_else(|| err("expected [HH:]MM:SS"))?
    } else {
        parse_digits(int_part).ok_or_else(|| err("expected a number of seconds"))?
    };

    let fraction = match frac_part {
        Some(frac) => parse_fraction(frac).ok_or_else(|| err("malformed fractional part"))?,
        None => 0,
    };

    let micros = whole_seconds
        .checked_mul(MICROS_PER_SECOND)
        .and_then(|m| m.checked_add(fraction))
        .ok_or_else(|| err("duration out of range"))?;

    let micros = match unit_divisor {
        Some(divisor) => micros / divisor,
        None => micros,
    };

    Ok(if negative { -micros } else { micros })
}

/// Parses a comma separated list of durations into an ordered list of
/// microsecond cut points. Entries must be non-decreasing.
pub fn parse_time_list(option: &'static str, input: &str) -> Result<Vec<i64>, SegmentError> {
    let mut times = Vec::new();
    for (index, entry) in input.split(',').enumerate() {
        let t = parse_duration(option, entry)?;
        if let Some(&previous) = times.last()
            && previous > t
        {
            return Err(SegmentError::NonMonotonicTimes {
                index,
                previous,
                next: t,
            });
        }
        times.push(t);
    }
    Ok(times)
}

/// Strips an optional unit suffix, returning the divisor that turns
/// "value read as seconds" into the intended microseconds.
fn split_unit(body: &str) -> (&str, Option<i64>) {
    if let Some(rest) = body.strip_suffix("ms") {
        (rest, Some(1000))
    } else if let Some(rest) = body.strip_suffix("us") {
        (rest, Some(MICROS_PER_SECOND))
    } else if let Some(rest) = body.strip_suffix('s') {
        (rest, Some(1))
    } else {
        (body, None)
    }
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_clock(s: &str) -> Option<i64> {
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, parse_digits(m)?, parse_digits(s)?),
        [h, m, s] => (parse_digits(h)?, parse_digits(m)?, parse_digits(s)?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

fn parse_fraction(frac: &str) -> Option<i64> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut micros = 0;
    let mut scale = 100_000;
    for b in frac.bytes().take(6) {
        micros += (b - b'0') as i64 * scale;
        scale /= 10;
    }
    Some(micros)
}
