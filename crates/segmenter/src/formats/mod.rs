//! Built-in segment formats and format lookup.

mod data;
pub mod flv;
mod framecrc;
mod null;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::muxer::OutputFormat;

pub use data::DataFormat;
pub use flv::FlvFormat;
pub use framecrc::FrameCrcFormat;
pub use null::NullFormat;

/// The set of output formats available to a segmenter.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn OutputFormat>>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FlvFormat);
        registry.register(FrameCrcFormat);
        registry.register(DataFormat);
        registry.register(NullFormat);
        registry
    }

    /// Adds a format. Later registrations take precedence on lookup.
    pub fn register<F: OutputFormat + 'static>(&mut self, format: F) -> &mut Self {
        self.formats.push(Arc::new(format));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.iter().map(|f| f.name())
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn OutputFormat>> {
        self.formats
            .iter()
            .rev()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Picks the format named `format`, or else the one matching the
    /// extension of `filename`.
    pub fn guess(&self, format: Option<&str>, filename: &str) -> Option<Arc<dyn OutputFormat>> {
        if let Some(name) = format {
            return self.find(name);
        }

        let extension = Path::new(filename).extension()?.to_str()?;
        let found = self
            .formats
            .iter()
            .rev()
            .find(|f| {
                f.extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(extension))
            })
            .cloned();
        debug!(
            extension,
            format = found.as_ref().map(|f| f.name()),
            "Guessed segment format from filename"
        );
        found
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.formats.iter().map(|format| (format.name(), format.long_name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_by_name_and_extension() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.guess(Some("flv"), "x.crc").unwrap().name(), "flv");
        assert_eq!(registry.guess(None, "seg%03d.FLV").unwrap().name(), "flv");
        assert_eq!(registry.guess(None, "seg%d.crc").unwrap().name(), "framecrc");
        assert_eq!(registry.guess(None, "seg%d.bin").unwrap().name(), "data");
        assert!(registry.guess(None, "seg%d.mkv").is_none());
        assert!(registry.guess(None, "seg%d").is_none());
        assert!(registry.guess(Some("matroska"), "seg%d.flv").is_none());
    }

    #[test]
    fn test_debug_lists_long_names() {
        let mut registry = FormatRegistry::new();
        registry.register(FlvFormat).register(DataFormat);
        assert_eq!(
            format!("{registry:?}"),
            r#"{"flv": "FLV (Flash Video)", "data": "raw packet data"}"#
        );
    }

    #[test]
    fn test_null_needs_no_file() {
        let registry = FormatRegistry::with_defaults();
        assert!(!registry.find("null").unwrap().needs_file());
        assert!(registry.find("flv").unwrap().needs_file());
    }
}
