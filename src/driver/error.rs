//! Errors reported by serial drivers.

use thiserror::Error;

/// Failures surfaced by a [`SerialDriver`](super::SerialDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver returned a non-zero status code.
    #[error("driver returned status {0}")]
    Status(i32),
    /// An operation was attempted before `init`.
    #[error("driver not initialised")]
    NotInitialised,
    /// The underlying device is closed and cannot be reopened.
    #[error("serial device closed")]
    Closed,
    /// The driver cannot perform this operation.
    #[error("operation not supported by this driver: {0}")]
    Unsupported(&'static str),
    /// No async runtime is available to service the device.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
    /// The completion queue is full; a driver issued more than one read and
    /// one write at a time.
    #[error("completion queue full")]
    CompletionOverflow,
    /// The transport stopped listening for completions.
    #[error("completion receiver dropped")]
    TransportGone,
}
