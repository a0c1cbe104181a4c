//! In-memory stand-in for a serial driver.

use bytes::Bytes;
use h4frame::{
    Completion,
    CompletionSender,
    DriverError,
    H4Transport,
    SerialDriver,
    UartConfig,
};

/// Serial driver that records requests instead of touching hardware.
///
/// Completions can be delivered two ways: injected into the completion queue
/// with [`complete_read`](Self::complete_read) and
/// [`complete_write`](Self::complete_write) (then dispatched by the
/// transport), or handed straight to the transport by the test.
#[derive(Debug, Default)]
pub struct MockDriver {
    config: Option<UartConfig>,
    completions: Option<CompletionSender>,
    open: bool,
    open_status: Option<i32>,
    close_status: Option<i32>,
    baud_status: Option<i32>,
    read_requests: Vec<usize>,
    sent_frames: Vec<Bytes>,
    baud_rates: Vec<u32>,
}

impl MockDriver {
    /// Driver whose `open` fails with `status`.
    #[must_use]
    pub fn failing_open(status: i32) -> Self {
        Self {
            open_status: Some(status),
            ..Self::default()
        }
    }

    /// Driver whose `close` fails with `status`.
    #[must_use]
    pub fn failing_close(status: i32) -> Self {
        Self {
            close_status: Some(status),
            ..Self::default()
        }
    }

    /// Driver whose `set_baud_rate` fails with `status`.
    #[must_use]
    pub fn failing_baud_rate(status: i32) -> Self {
        Self {
            baud_status: Some(status),
            ..Self::default()
        }
    }

    /// Line settings received in `init`.
    #[must_use]
    pub fn config(&self) -> Option<&UartConfig> { self.config.as_ref() }

    /// Whether the device is open.
    #[must_use]
    pub fn is_open(&self) -> bool { self.open }

    /// Every read length requested so far, oldest first.
    #[must_use]
    pub fn read_requests(&self) -> &[usize] { &self.read_requests }

    /// The most recent read request.
    #[must_use]
    pub fn last_read_request(&self) -> Option<usize> { self.read_requests.last().copied() }

    /// Every frame handed to `send_block`, oldest first.
    #[must_use]
    pub fn sent_frames(&self) -> &[Bytes] { &self.sent_frames }

    /// Every baud rate successfully applied.
    #[must_use]
    pub fn baud_rates(&self) -> &[u32] { &self.baud_rates }

    /// Queue a read completion carrying `block`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotInitialised`] before `init`, or the queue's
    /// own error.
    pub fn complete_read(&self, block: &[u8]) -> Result<(), DriverError> {
        self.sender()?
            .try_complete(Completion::BlockReceived(Bytes::copy_from_slice(block)))
    }

    /// Queue a write completion.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotInitialised`] before `init`, or the queue's
    /// own error.
    pub fn complete_write(&self) -> Result<(), DriverError> { self.sender()?.block_sent() }

    fn sender(&self) -> Result<&CompletionSender, DriverError> {
        self.completions.as_ref().ok_or(DriverError::NotInitialised)
    }
}

impl SerialDriver for MockDriver {
    fn init(
        &mut self,
        config: &UartConfig,
        completions: CompletionSender,
    ) -> Result<(), DriverError> {
        self.config = Some(config.clone());
        self.completions = Some(completions);
        Ok(())
    }

    fn open(&mut self) -> Result<(), DriverError> {
        if let Some(status) = self.open_status {
            return Err(DriverError::Status(status));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(status) = self.close_status {
            return Err(DriverError::Status(status));
        }
        self.open = false;
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), DriverError> {
        if let Some(status) = self.baud_status {
            return Err(DriverError::Status(status));
        }
        self.baud_rates.push(baud_rate);
        Ok(())
    }

    fn receive_block(&mut self, len: usize) { self.read_requests.push(len); }

    fn send_block(&mut self, frame: Bytes) { self.sent_frames.push(frame); }
}

/// Push controller bytes through `transport`, completing each outstanding
/// read with exactly the number of bytes it asked for.
///
/// Stops once the input is used up or the next request cannot be satisfied
/// from what is left. An empty input completes a pending zero-length read.
/// Returns the number of reads completed.
pub fn feed_stream(transport: &mut H4Transport<MockDriver>, bytes: &[u8]) -> usize {
    let mut remaining = bytes;
    let mut completed = 0;
    while let Some(pending) = transport.driver().last_read_request() {
        if !transport.is_open() || pending > remaining.len() {
            break;
        }
        let (chunk, rest) = remaining.split_at(pending);
        transport.on_block_received(chunk);
        completed += 1;
        remaining = rest;
        if remaining.is_empty() {
            break;
        }
    }
    completed
}
