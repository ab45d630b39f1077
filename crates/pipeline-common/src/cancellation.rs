//! Cooperative cancellation used as the interrupt callback of output sinks.

pub use tokio_util::sync::CancellationToken;
