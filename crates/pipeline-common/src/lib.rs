//! # Pipeline Common
//!
//! Shared plumbing for the segmenting pipeline crates: the per-session
//! context and its interrupt token, and the frame-number filename templates
//! used to name output segments.
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod cancellation;
mod context;
mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cancellation::CancellationToken;
pub use context::StreamerContext;
pub use utils::{TemplateError, frame_filename, validate_frame_template};
