//! The HCI transport capability and its H4 implementation.
//!
//! [`HciTransport`] is the interface an HCI stack drives: lifecycle, packet
//! handler registration, flow-controlled sending and line speed changes.
//! [`H4Transport`] implements it over any [`SerialDriver`], binding the
//! receive-side [`Reassembler`] and the send-side [`WriteGate`] to the
//! driver's completion queue.
//!
//! The transport never blocks. Each driver completion is fed to
//! [`H4Transport::dispatch`], either by awaiting [`H4Transport::run`] or by
//! polling [`H4Transport::drain_completions`]. After every received block the
//! transport immediately requests the next chunk, so the receive path never
//! waits on the caller.

use tokio::sync::mpsc;

use crate::{
    buffer::{BufferLimits, OutgoingPacket},
    config::{ConfigError, TransportConfig},
    driver::{Completion, SerialDriver, UartConfig, completion_channel},
    error::{Result, TransportError},
    handler::{DiscardHandler, PacketHandler, ReceivedPacket},
    metrics,
    packet::{PacketType, TRANSPORT_PACKET_SENT},
    reassembler::{BlockOutcome, Reassembler},
    write_gate::WriteGate,
};

/// Interface between an HCI stack and a physical transport.
///
/// Implementations are selected when the transport is constructed; the H4
/// serial framing in [`H4Transport`] is one such implementation.
pub trait HciTransport {
    /// Short transport name.
    fn name(&self) -> &'static str;

    /// Validate `config` and bind the driver to it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AlreadyOpen`] while the link is open,
    /// [`TransportError::Config`] when `config` is absent or of the wrong
    /// kind, or [`TransportError::Driver`] if the driver rejects it.
    fn init(&mut self, config: Option<&TransportConfig>) -> Result<()>;

    /// Open the link and start reading.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotInitialised`] before `init`,
    /// [`TransportError::AlreadyOpen`] if the link is already open, or the
    /// driver's failure.
    fn open(&mut self) -> Result<()>;

    /// Close the link.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure.
    fn close(&mut self) -> Result<()>;

    /// Replace the handler receiving packets and transport notifications.
    fn register_packet_handler(&mut self, handler: Box<dyn PacketHandler>);

    /// Whether a packet of `packet_type` may be sent now.
    ///
    /// Advisory only: a caller that ignores it is refused by
    /// [`send_packet`](Self::send_packet).
    fn can_send_packet_now(&self, packet_type: PacketType) -> bool;

    /// Start sending `packet`. Completion is signalled through the packet
    /// handler.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] or
    /// [`TransportError::WriteInProgress`].
    fn send_packet(&mut self, packet: OutgoingPacket) -> Result<()>;

    /// Change the line speed.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkState {
    Uninitialised,
    Closed,
    Open,
}

/// H4 framing over a block-oriented serial driver.
pub struct H4Transport<D> {
    driver: D,
    uart_config: Option<UartConfig>,
    reassembler: Reassembler,
    write_gate: WriteGate,
    handler: Box<dyn PacketHandler>,
    completions: Option<mpsc::Receiver<Completion>>,
    link: LinkState,
}

impl<D: SerialDriver> H4Transport<D> {
    /// Transport over `driver` with default buffer limits.
    #[must_use]
    pub fn new(driver: D) -> Self { Self::with_limits(driver, BufferLimits::default()) }

    /// Transport over `driver` with explicit receive buffer limits.
    #[must_use]
    pub fn with_limits(driver: D, limits: BufferLimits) -> Self {
        Self {
            driver,
            uart_config: None,
            reassembler: Reassembler::new(limits),
            write_gate: WriteGate::default(),
            handler: Box::new(DiscardHandler),
            completions: None,
            link: LinkState::Uninitialised,
        }
    }

    /// The underlying driver.
    #[must_use]
    pub fn driver(&self) -> &D { &self.driver }

    /// The underlying driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D { &mut self.driver }

    /// The receive state machine.
    #[must_use]
    pub fn reassembler(&self) -> &Reassembler { &self.reassembler }

    /// Line settings derived from the last accepted configuration.
    #[must_use]
    pub fn uart_config(&self) -> Option<&UartConfig> { self.uart_config.as_ref() }

    /// Whether the link is open.
    #[must_use]
    pub fn is_open(&self) -> bool { self.link == LinkState::Open }

    /// Convenience wrapper building an [`OutgoingPacket`] from `payload`.
    ///
    /// # Errors
    ///
    /// See [`HciTransport::send_packet`].
    pub fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        self.send_packet(OutgoingPacket::from_payload(packet_type, payload))
    }

    /// Route a driver completion to the matching handler.
    pub fn dispatch(&mut self, completion: Completion) {
        match completion {
            Completion::BlockReceived(block) => self.on_block_received(&block),
            Completion::BlockSent => self.on_block_sent(),
        }
    }

    /// Dispatch every completion already queued, without waiting. Returns the
    /// number dispatched.
    pub fn drain_completions(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(completion) = self.completions.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.dispatch(completion);
            dispatched += 1;
        }
        dispatched
    }

    /// Wait for the next driver completion. Returns `None` before `init` or
    /// once every driver-side sender is gone.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions.as_mut()?.recv().await
    }

    /// Dispatch completions until the completion queue closes.
    pub async fn run(&mut self) {
        while let Some(completion) = self.next_completion().await {
            self.dispatch(completion);
        }
        tracing::debug!("completion queue closed");
    }

    /// Handle a finished read of the pending chunk.
    ///
    /// The block must be exactly as long as the pending request. A block of
    /// any other size breaks the driver contract; the partial packet is then
    /// dropped and reading restarts at a type byte.
    pub fn on_block_received(&mut self, block: &[u8]) {
        if !self.is_open() {
            tracing::debug!(len = block.len(), "ignoring block received while closed");
            return;
        }

        let expected = self.reassembler.bytes_pending();
        let filled = match self.reassembler.read_window() {
            Some(window) if window.len() == block.len() => {
                window.copy_from_slice(block);
                true
            }
            _ => false,
        };
        if !filled {
            tracing::warn!(
                expected,
                received = block.len(),
                "driver completed a read of the wrong size; resynchronising"
            );
            self.reassembler.reset();
            self.trigger_next_read();
            return;
        }

        match self.reassembler.on_block_received(&mut *self.handler) {
            BlockOutcome::Delivered(packet_type) => {
                tracing::debug!(%packet_type, "packet delivered");
            }
            BlockOutcome::Pending | BlockOutcome::Discarded(_) => {}
        }
        self.trigger_next_read();
    }

    /// Handle the driver's write completion: open the write gate and tell
    /// the handler it may send again.
    pub fn on_block_sent(&mut self) {
        if !self.write_gate.release() {
            tracing::debug!("write completion with no write in flight");
        }
        let mut event = [TRANSPORT_PACKET_SENT, 0];
        self.handler
            .handle_packet(ReceivedPacket::new(PacketType::Event, &mut event, 0));
    }

    fn trigger_next_read(&mut self) { self.driver.receive_block(self.reassembler.bytes_pending()); }
}

impl<D: SerialDriver> HciTransport for H4Transport<D> {
    fn name(&self) -> &'static str { "H4" }

    fn init(&mut self, config: Option<&TransportConfig>) -> Result<()> {
        // Running driver tasks hold the current completion sender.
        if self.is_open() {
            tracing::error!("h4 transport init refused: link is open");
            return Err(TransportError::AlreadyOpen);
        }
        let uart = match config {
            Some(TransportConfig::Uart(uart)) => uart,
            Some(other) => {
                let error = ConfigError::NotUart { kind: other.kind() };
                tracing::error!(%error, "h4 transport init failed");
                return Err(error.into());
            }
            None => {
                tracing::error!(error = %ConfigError::Missing, "h4 transport init failed");
                return Err(ConfigError::Missing.into());
            }
        };

        let uart_config = UartConfig::from(uart);
        let (sender, receiver) = completion_channel();
        self.driver.init(&uart_config, sender)?;

        tracing::info!(
            baud_rate = uart_config.baud_rate,
            flow_control = ?uart_config.flow_control,
            device = uart_config.device_name.as_deref().unwrap_or("<unnamed>"),
            "h4 transport initialised"
        );
        self.uart_config = Some(uart_config);
        self.completions = Some(receiver);
        if self.link == LinkState::Uninitialised {
            self.link = LinkState::Closed;
        }
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.link == LinkState::Uninitialised {
            return Err(TransportError::NotInitialised);
        }
        if self.is_open() {
            return Err(TransportError::AlreadyOpen);
        }
        if let Err(error) = self.driver.open() {
            tracing::error!(%error, "serial driver failed to open");
            return Err(error.into());
        }

        self.reassembler.reset();
        self.link = LinkState::Open;
        self.trigger_next_read();
        tracing::info!("h4 transport open");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.driver.close()?;
        if self.link == LinkState::Open {
            self.link = LinkState::Closed;
        }
        tracing::info!("h4 transport closed");
        Ok(())
    }

    fn register_packet_handler(&mut self, handler: Box<dyn PacketHandler>) {
        self.handler = handler;
    }

    fn can_send_packet_now(&self, _packet_type: PacketType) -> bool { self.write_gate.can_send() }

    fn send_packet(&mut self, packet: OutgoingPacket) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        if !self.write_gate.try_acquire() {
            tracing::warn!(
                packet_type = %packet.packet_type(),
                "send refused: a write is already in flight"
            );
            return Err(TransportError::WriteInProgress);
        }

        let packet_type = packet.packet_type();
        let frame = packet.into_frame();
        tracing::debug!(%packet_type, len = frame.len(), "sending packet");
        metrics::inc_packets(metrics::Direction::Outbound, packet_type);
        self.driver.send_block(frame);
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        tracing::info!(baud_rate, "changing baud rate");
        self.driver.set_baud_rate(baud_rate)?;
        Ok(())
    }
}

impl<D> std::fmt::Debug for H4Transport<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("H4Transport")
            .field("link", &self.link)
            .field("reassembler", &self.reassembler)
            .field("write_gate", &self.write_gate)
            .finish_non_exhaustive()
    }
}
