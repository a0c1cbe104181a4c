//! Incremental H4 packet reassembly.
//!
//! [`Reassembler`] consumes exactly the number of bytes it last asked for,
//! decides the next chunk size from header fields already read, and hands a
//! complete packet to the registered [`PacketHandler`]. It never performs I/O
//! itself: the transport copies each completed driver read into
//! [`Reassembler::read_window`] and then calls
//! [`Reassembler::on_block_received`].
//!
//! Malformed input never stalls the reader. An unknown type byte or an
//! oversized length field discards the packet and restarts at the next byte,
//! which is treated as a fresh type tag. Length-prefixed framing has no
//! delimiter, so trailing bytes of a discarded packet may be misread as a new
//! packet until the stream lines up again.

mod error;

pub use error::FramingError;

use crate::{
    buffer::{BufferLimits, PacketBuffer},
    handler::{PacketHandler, ReceivedPacket},
    metrics,
    packet::PacketType,
};

/// Which part of a packet the next read will fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    /// Waiting for the one-byte type tag.
    AwaitingType,
    /// Waiting for the 2-byte event header.
    AwaitingEventHeader,
    /// Waiting for the 4-byte ACL header.
    AwaitingAclHeader,
    /// Waiting for the 3-byte SCO header.
    AwaitingScoHeader,
    /// Waiting for the payload of a packet of the given type.
    AwaitingPayload(PacketType),
}

impl ReadState {
    fn awaiting_header(packet_type: PacketType) -> Option<Self> {
        match packet_type {
            PacketType::Event => Some(Self::AwaitingEventHeader),
            PacketType::AclData => Some(Self::AwaitingAclHeader),
            PacketType::ScoData => Some(Self::AwaitingScoHeader),
            PacketType::Command => None,
        }
    }
}

/// Result of processing one completed read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// More bytes are needed for the current packet.
    Pending,
    /// A complete packet was handed to the handler.
    Delivered(PacketType),
    /// The partial packet was discarded and the reader reset.
    Discarded(FramingError),
}

/// The H4 receive state machine and its packet buffer.
#[derive(Debug)]
pub struct Reassembler {
    state: ReadState,
    bytes_pending: usize,
    read_cursor: usize,
    buffer: PacketBuffer,
}

impl Reassembler {
    /// Create a reassembler waiting for a type byte.
    #[must_use]
    pub fn new(limits: BufferLimits) -> Self {
        Self {
            state: ReadState::AwaitingType,
            bytes_pending: 1,
            read_cursor: 0,
            buffer: PacketBuffer::new(limits),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReadState { self.state }

    /// Size of the next read the driver must complete.
    #[must_use]
    pub fn bytes_pending(&self) -> usize { self.bytes_pending }

    /// Bytes of the current packet read so far, type byte included.
    #[must_use]
    pub fn read_cursor(&self) -> usize { self.read_cursor }

    /// The underlying receive buffer.
    #[must_use]
    pub fn buffer(&self) -> &PacketBuffer { &self.buffer }

    /// The slice the next driver read must fill, exactly
    /// [`bytes_pending`](Self::bytes_pending) bytes long.
    ///
    /// Capacity checks on every header keep the window inside the buffer, so
    /// `None` signals a broken invariant rather than bad input.
    pub fn read_window(&mut self) -> Option<&mut [u8]> {
        self.buffer.window_mut(self.read_cursor, self.bytes_pending)
    }

    /// Return to waiting for a type byte. Buffer contents are left in place
    /// and overwritten by the next packet.
    pub fn reset(&mut self) {
        self.state = ReadState::AwaitingType;
        self.read_cursor = 0;
        self.bytes_pending = 1;
    }

    /// Account for a completed read of [`bytes_pending`](Self::bytes_pending)
    /// bytes and advance the state machine.
    ///
    /// A completed packet is lent to `handler` before the reader resets.
    pub fn on_block_received(&mut self, handler: &mut dyn PacketHandler) -> BlockOutcome {
        self.read_cursor += self.bytes_pending;

        let result = match self.state {
            ReadState::AwaitingType => self.accept_type(),
            ReadState::AwaitingEventHeader => self.accept_header(PacketType::Event),
            ReadState::AwaitingAclHeader => self.accept_header(PacketType::AclData),
            ReadState::AwaitingScoHeader => self.accept_header(PacketType::ScoData),
            ReadState::AwaitingPayload(packet_type) => {
                self.deliver(packet_type, handler);
                self.reset();
                return BlockOutcome::Delivered(packet_type);
            }
        };

        match result {
            Ok(()) => BlockOutcome::Pending,
            Err(error) => {
                tracing::error!(%error, kind = error.kind(), "discarding packet");
                metrics::inc_framing_errors(error.kind());
                self.reset();
                BlockOutcome::Discarded(error)
            }
        }
    }

    fn accept_type(&mut self) -> Result<(), FramingError> {
        let tag = self.buffer.packet()[0];
        let next = PacketType::from_received(tag)
            .and_then(|packet_type| Some((packet_type, ReadState::awaiting_header(packet_type)?)));
        let Some((packet_type, state)) = next else {
            return Err(FramingError::UnknownPacketType { tag });
        };

        self.bytes_pending = packet_type.header_layout().header_len;
        self.state = state;
        Ok(())
    }

    fn accept_header(&mut self, packet_type: PacketType) -> Result<(), FramingError> {
        let layout = packet_type.header_layout();
        let header = &self.buffer.packet()[1..=layout.header_len];
        let payload_len = layout.payload_len(header).unwrap_or_default();

        let available = self.buffer.body_capacity() - layout.header_len;
        if payload_len > available {
            return Err(FramingError::PayloadTooLarge {
                packet_type,
                payload_len,
                available,
            });
        }

        self.bytes_pending = payload_len;
        self.state = ReadState::AwaitingPayload(packet_type);
        Ok(())
    }

    fn deliver(&mut self, packet_type: PacketType, handler: &mut dyn PacketHandler) {
        let Some((region, start)) = self.buffer.delivery_region(self.read_cursor) else {
            tracing::warn!(
                read_cursor = self.read_cursor,
                "packet extends past receive buffer; dropping"
            );
            return;
        };
        tracing::trace!(%packet_type, len = region.len() - start, "packet reassembled");
        metrics::inc_packets(metrics::Direction::Inbound, packet_type);
        handler.handle_packet(ReceivedPacket::new(packet_type, region, start));
    }
}

impl Default for Reassembler {
    fn default() -> Self { Self::new(BufferLimits::default()) }
}

#[cfg(test)]
mod tests;
