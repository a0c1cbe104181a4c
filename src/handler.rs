//! Upward dispatch of received packets and transport notifications.
//!
//! The transport hands every reassembled packet, and the synthetic
//! "packet sent" event, to a single registered [`PacketHandler`]. Packets are
//! lent for the duration of the call only: the bytes live in the transport's
//! receive buffer and are overwritten by the next packet.

use crate::buffer::BufferError;
use crate::packet::PacketType;

/// A packet lent to a [`PacketHandler`].
///
/// [`ReceivedPacket::bytes`] starts at the first header byte (the type tag is
/// reported separately). Any reserved room in front of the packet can be
/// claimed with [`ReceivedPacket::prepend`].
#[derive(Debug)]
pub struct ReceivedPacket<'a> {
    packet_type: PacketType,
    region: &'a mut [u8],
    start: usize,
}

impl<'a> ReceivedPacket<'a> {
    /// Wrap `region[start..]` as a packet, leaving `region[..start]` as
    /// prepend room.
    pub(crate) fn new(packet_type: PacketType, region: &'a mut [u8], start: usize) -> Self {
        debug_assert!(start <= region.len());
        Self {
            packet_type,
            region,
            start,
        }
    }

    /// Packet type tag.
    #[must_use]
    pub fn packet_type(&self) -> PacketType { self.packet_type }

    /// Header and payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] { &self.region[self.start..] }

    /// Number of header and payload bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.region.len() - self.start }

    /// Whether the packet carries no bytes after the type tag.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Bytes of reserved room available in front of the packet.
    #[must_use]
    pub fn headroom(&self) -> usize { self.start }

    /// Write `header` directly in front of the packet and return the
    /// contiguous header plus packet bytes, without copying the packet.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::PrefixTooLong`] when `header` exceeds the
    /// reserved room.
    pub fn prepend(&mut self, header: &[u8]) -> Result<&[u8], BufferError> {
        let Some(begin) = self.start.checked_sub(header.len()) else {
            return Err(BufferError::PrefixTooLong {
                needed: header.len(),
                available: self.start,
            });
        };
        self.region[begin..self.start].copy_from_slice(header);
        Ok(&self.region[begin..])
    }
}

/// Receiver of packets and notifications coming up from the transport.
pub trait PacketHandler: Send {
    /// Handle one packet. The packet must not be retained past this call.
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>);
}

impl<H: PacketHandler + ?Sized> PacketHandler for Box<H> {
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>) { (**self).handle_packet(packet); }
}

/// Handler that drops everything; the transport's default until a real
/// handler is registered.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardHandler;

impl PacketHandler for DiscardHandler {
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>) {
        tracing::trace!(
            packet_type = %packet.packet_type(),
            len = packet.len(),
            "no packet handler registered; dropping packet"
        );
    }
}

/// Adapter turning a closure over `(type, bytes)` into a [`PacketHandler`].
#[derive(Clone, Debug)]
pub struct FnHandler<F>(F);

impl<F> PacketHandler for FnHandler<F>
where
    F: FnMut(PacketType, &[u8]) + Send,
{
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>) {
        (self.0)(packet.packet_type(), packet.bytes());
    }
}

/// Build a [`PacketHandler`] from a closure.
///
/// # Examples
///
/// ```
/// use h4frame::{PacketType, handler_fn};
///
/// let handler = handler_fn(|packet_type: PacketType, bytes: &[u8]| {
///     println!("{packet_type}: {} bytes", bytes.len());
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(PacketType, &[u8]) + Send,
{
    FnHandler(f)
}
