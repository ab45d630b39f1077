//! Session context shared by the components of one segmenting run.

use crate::cancellation::CancellationToken;

/// Shared context for a media session.
///
/// Carries the session name used as a log prefix and the token that
/// interrupts any blocking I/O performed on behalf of the session.
#[derive(Debug, Clone)]
pub struct StreamerContext {
    /// Name of the stream/file being processed
    pub name: String,
    /// The cancellation token
    pub token: CancellationToken,
}

impl StreamerContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            name: "DefaultStreamer".to_string(),
            token,
        }
    }

    pub fn with_name(name: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            name: name.into(),
            ..Self::new(token)
        }
    }
}

impl Default for StreamerContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
