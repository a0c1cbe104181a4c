//! The block-oriented serial driver seam.
//!
//! A [`SerialDriver`] services "read exactly N bytes" and "write exactly this
//! frame" requests and reports each completion as a [`Completion`] through
//! the [`CompletionSender`] it received in [`SerialDriver::init`]. The
//! completion queue is a bounded single-consumer channel, so completions reach
//! the transport in the order the driver produced them even when the driver
//! runs on another thread or task.
//!
//! Drivers must keep at most one read and one write outstanding and must
//! complete reads in request order. A driver that never completes a read
//! simply stalls the link: this layer has no timeouts.

mod error;
mod stream;

use bytes::Bytes;
use tokio::sync::mpsc;

pub use error::DriverError;
pub use stream::StreamDriver;

use crate::config::{FlowControl, UartTransportConfig};

/// Depth of the completion queue: one read plus one write in flight.
pub const COMPLETION_QUEUE_DEPTH: usize = 2;

/// Line settings handed to the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UartConfig {
    /// Baud rate to open the line with.
    pub baud_rate: u32,
    /// Flow control mode.
    pub flow_control: FlowControl,
    /// Platform device identifier.
    pub device_name: Option<String>,
}

impl From<&UartTransportConfig> for UartConfig {
    fn from(config: &UartTransportConfig) -> Self {
        Self {
            baud_rate: config.baud_rate_init,
            flow_control: config.flow_control,
            device_name: config.device_name.clone(),
        }
    }
}

/// A finished driver operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// A requested read finished with exactly the requested bytes.
    BlockReceived(Bytes),
    /// The outstanding write finished.
    BlockSent,
}

/// Driver-side handle of the completion queue.
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: mpsc::Sender<Completion>,
}

impl CompletionSender {
    /// Report a finished read without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::CompletionOverflow`] if the queue is full or
    /// [`DriverError::TransportGone`] if the transport has been dropped.
    pub fn block_received(&self, block: Bytes) -> Result<(), DriverError> {
        self.try_complete(Completion::BlockReceived(block))
    }

    /// Report a finished write without waiting.
    ///
    /// # Errors
    ///
    /// See [`block_received`](Self::block_received).
    pub fn block_sent(&self) -> Result<(), DriverError> { self.try_complete(Completion::BlockSent) }

    /// Report a completion without waiting.
    ///
    /// # Errors
    ///
    /// See [`block_received`](Self::block_received).
    pub fn try_complete(&self, completion: Completion) -> Result<(), DriverError> {
        self.tx.try_send(completion).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DriverError::CompletionOverflow,
            mpsc::error::TrySendError::Closed(_) => DriverError::TransportGone,
        })
    }

    /// Report a completion, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TransportGone`] if the transport has been
    /// dropped.
    pub async fn complete(&self, completion: Completion) -> Result<(), DriverError> {
        self.tx
            .send(completion)
            .await
            .map_err(|_| DriverError::TransportGone)
    }
}

/// Create a completion queue of [`COMPLETION_QUEUE_DEPTH`].
#[must_use]
pub fn completion_channel() -> (CompletionSender, mpsc::Receiver<Completion>) {
    let (tx, rx) = mpsc::channel(COMPLETION_QUEUE_DEPTH);
    (CompletionSender { tx }, rx)
}

/// Asynchronous block-oriented serial driver.
///
/// `receive_block` and `send_block` only issue requests; the outcome arrives
/// later as a [`Completion`].
pub trait SerialDriver: Send {
    /// Apply line settings and bind the completion queue.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the settings cannot be applied.
    fn init(&mut self, config: &UartConfig, completions: CompletionSender)
    -> Result<(), DriverError>;

    /// Open the device.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the device cannot be opened.
    fn open(&mut self) -> Result<(), DriverError>;

    /// Close the device.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the device cannot be closed cleanly.
    fn close(&mut self) -> Result<(), DriverError>;

    /// Change the line speed.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] if the rate cannot be applied.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DriverError>;

    /// Request a read of exactly `len` bytes.
    fn receive_block(&mut self, len: usize);

    /// Request a write of `frame`.
    fn send_block(&mut self, frame: Bytes);
}
