mod files;

pub use files::{TemplateError, frame_filename, validate_frame_template};
