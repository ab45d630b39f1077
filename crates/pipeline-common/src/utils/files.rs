use std::fmt::Write;

use thiserror::Error;

/// Errors produced while expanding a frame-number filename template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template has no %d number placeholder")]
    MissingPlaceholder,

    #[error("template has more than one number placeholder (second at byte {0})")]
    DuplicatePlaceholder(usize),

    #[error("unsupported placeholder '%{0}' at byte {1}")]
    InvalidPlaceholder(char, usize),

    #[error("template ends with a dangling '%'")]
    DanglingPercent,

    #[error("number width {0} exceeds the maximum of 64")]
    WidthTooLarge(usize),
}

/// Largest zero-padding width accepted in a `%0Nd` placeholder.
const MAX_FRAME_WIDTH: usize = 64;

/// Expand a frame-number template, like image sequence naming in FFmpeg.
///
/// Supported placeholders:
/// - `%d` - The number
/// - `%0Nd` / `%Nd` - The number zero-padded to `N` digits
/// - `%%` - Literal percent sign
///
/// Exactly one number placeholder must be present. Any other `%` sequence is
/// rejected rather than passed through, so a typo cannot silently produce
/// colliding filenames.
pub fn frame_filename(template: &str, number: u64) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len() + 8);
    let mut chars = template.char_indices().peekable();
    let mut found = false;

    while let Some((pos, c)) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        let mut width = 0usize;
        loop {
            match chars.next() {
                Some((_, '%')) if width == 0 => {
                    result.push('%');
                    break;
                }
                Some((_, d)) if d.is_ascii_digit() => {
                    width = width
                        .saturating_mul(10)
                        .saturating_add(d as usize - '0' as usize);
                }
                Some((_, 'd')) => {
                    if width > MAX_FRAME_WIDTH {
                        return Err(TemplateError::WidthTooLarge(width));
                    }
                    if found {
                        return Err(TemplateError::DuplicatePlaceholder(pos));
                    }
                    found = true;
                    // Writing to a String cannot fail.
                    let _ = write!(result, "{number:0width$}");
                    break;
                }
                Some((at, other)) => return Err(TemplateError::InvalidPlaceholder(other, at)),
                None => return Err(TemplateError::DanglingPercent),
            }
        }
    }

    if found {
        Ok(result)
    } else {
        Err(TemplateError::MissingPlaceholder)
    }
}

/// Check a template once up front so later expansions cannot fail.
pub fn validate_frame_template(template: &str) -> Result<(), TemplateError> {
    frame_filename(template, 0).map(|_| ())
}
