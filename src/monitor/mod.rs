//! Runtime error monitoring.
//!
//! Errors observed while the client runs are buffered in an
//! [`ErrorCollector`] and forwarded to the backend by an [`ErrorReporter`].

pub mod collector;
pub mod reporter;

pub use collector::{ErrorCollector, ErrorKind, ErrorRecord};
pub use reporter::{ErrorBatch, ErrorReporter};
