//! Canonical error and result types for the crate.
//!
//! [`TransportError`] is returned by the lifecycle and send operations of an
//! [`HciTransport`](crate::HciTransport). Framing problems on the receive path
//! never appear here: the reassembler absorbs them.

use thiserror::Error;

use crate::{config::ConfigError, driver::DriverError};

/// Top-level error type exposed by `h4frame`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `init` rejected the supplied configuration.
    #[error("invalid transport configuration: {0}")]
    Config(#[from] ConfigError),
    /// The operation requires a successful `init` first.
    #[error("transport not initialised")]
    NotInitialised,
    /// The operation is not allowed while the link is open.
    #[error("transport already open")]
    AlreadyOpen,
    /// The operation requires an open transport.
    #[error("transport not open")]
    NotOpen,
    /// A write is still in flight; wait for the packet-sent notification.
    #[error("a write is already in flight")]
    WriteInProgress,
    /// The serial driver reported a failure.
    #[error("serial driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Canonical result alias used by `h4frame` public APIs.
pub type Result<T> = std::result::Result<T, TransportError>;
