//! Packet storage for both directions of the link.
//!
//! [`PacketBuffer`] is the single receive buffer owned by the reassembler. It
//! holds a reserved prefix ahead of the type byte so an upper layer can
//! prepend its own short header to a delivered packet without copying.
//! [`OutgoingPacket`] is the send-side counterpart: a builder that owns one
//! reserved byte for the type tag and only lets callers append payload after
//! it.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{byte_order::write_hci_u16, packet::PacketType};

/// Default room reserved before the type byte of received packets.
pub const DEFAULT_PREFIX_RESERVE: usize = 14;

/// Default largest ACL payload accepted from the controller.
pub const DEFAULT_ACL_PAYLOAD_MAX: usize = 1021;

/// Largest SCO payload expressible by the one-byte length field.
pub const DEFAULT_SCO_PAYLOAD_MAX: usize = 255;

/// Largest event payload expressible by the one-byte length field.
pub const EVENT_PAYLOAD_MAX: usize = 255;

/// Errors raised while building or extending packets.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The payload does not fit the packet type's length field.
    #[error("{packet_type} payload of {len} bytes exceeds the {max} byte length field")]
    PayloadTooLong {
        /// Packet type being built.
        packet_type: PacketType,
        /// Attempted payload length.
        len: usize,
        /// Largest expressible payload length.
        max: usize,
    },
    /// The leading header field does not fit before the length field.
    #[error("{packet_type} header field {value:#06x} does not fit in {width} byte(s)")]
    HeaderFieldOverflow {
        /// Packet type being built.
        packet_type: PacketType,
        /// Rejected field value.
        value: u16,
        /// Bytes available for the field.
        width: usize,
    },
    /// Not enough reserved room in front of a packet for the requested prefix.
    #[error("prefix of {needed} bytes exceeds the {available} reserved bytes")]
    PrefixTooLong {
        /// Requested prefix length.
        needed: usize,
        /// Reserved bytes available.
        available: usize,
    },
}

/// Sizing of the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferLimits {
    /// Bytes reserved before the type byte. Never read or interpreted by the
    /// reassembler.
    pub prefix_reserve: usize,
    /// Largest ACL payload accepted.
    pub acl_payload_max: usize,
    /// Largest SCO payload accepted.
    pub sco_payload_max: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            prefix_reserve: DEFAULT_PREFIX_RESERVE,
            acl_payload_max: DEFAULT_ACL_PAYLOAD_MAX,
            sco_payload_max: DEFAULT_SCO_PAYLOAD_MAX,
        }
    }
}

impl BufferLimits {
    /// Bytes available after the type byte: the largest header plus payload
    /// among the receivable packet types.
    ///
    /// # Examples
    ///
    /// ```
    /// use h4frame::BufferLimits;
    ///
    /// assert_eq!(BufferLimits::default().body_capacity(), 4 + 1021);
    /// ```
    #[must_use]
    pub fn body_capacity(&self) -> usize {
        let event = PacketType::Event.header_layout().header_len + EVENT_PAYLOAD_MAX;
        let acl = PacketType::AclData.header_layout().header_len + self.acl_payload_max;
        let sco = PacketType::ScoData.header_layout().header_len + self.sco_payload_max;
        event.max(acl).max(sco)
    }
}

/// Fixed-capacity receive buffer with a reserved prefix region.
///
/// Layout: `[prefix_reserve bytes][type byte][body_capacity bytes]`. Offsets
/// accepted by the accessors are relative to the type byte.
#[derive(Debug)]
pub struct PacketBuffer {
    storage: Box<[u8]>,
    prefix_reserve: usize,
}

impl PacketBuffer {
    /// Allocate a buffer sized for `limits`.
    #[must_use]
    pub fn new(limits: BufferLimits) -> Self {
        let len = limits.prefix_reserve + 1 + limits.body_capacity();
        Self {
            storage: vec![0; len].into_boxed_slice(),
            prefix_reserve: limits.prefix_reserve,
        }
    }

    /// Bytes reserved ahead of the type byte.
    #[must_use]
    pub fn prefix_reserve(&self) -> usize { self.prefix_reserve }

    /// Bytes available from the type byte onwards.
    #[must_use]
    pub fn capacity(&self) -> usize { self.storage.len() - self.prefix_reserve }

    /// Bytes available after the type byte.
    #[must_use]
    pub fn body_capacity(&self) -> usize { self.capacity() - 1 }

    /// The packet region, starting at the type byte.
    #[must_use]
    pub fn packet(&self) -> &[u8] { &self.storage[self.prefix_reserve..] }

    /// Mutable window of `len` bytes starting `start` bytes after the type
    /// byte position, or `None` if it would run past the end of the buffer.
    pub fn window_mut(&mut self, start: usize, len: usize) -> Option<&mut [u8]> {
        let begin = self.prefix_reserve.checked_add(start)?;
        let end = begin.checked_add(len)?;
        self.storage.get_mut(begin..end)
    }

    /// Split the buffer into the writable region up to `end` (relative to the
    /// type byte) and the offset at which the packet body begins.
    ///
    /// Used to hand a delivered packet upward together with its prefix room.
    pub(crate) fn delivery_region(&mut self, end: usize) -> Option<(&mut [u8], usize)> {
        let limit = self.prefix_reserve.checked_add(end)?;
        let region = self.storage.get_mut(..limit)?;
        Some((region, self.prefix_reserve + 1))
    }
}

/// Outbound packet builder.
///
/// The first byte of the underlying storage is reserved for the H4 type tag
/// and is filled in by [`OutgoingPacket::into_frame`]. Callers only ever
/// append bytes after it.
///
/// # Examples
///
/// ```
/// use h4frame::{OutgoingPacket, PacketType};
///
/// let mut packet = OutgoingPacket::new(PacketType::Command);
/// packet.extend_from_slice(&[0x03, 0x0c, 0x00]);
/// assert_eq!(packet.payload(), &[0x03, 0x0c, 0x00]);
/// assert_eq!(&packet.into_frame()[..], &[0x01, 0x03, 0x0c, 0x00]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingPacket {
    packet_type: PacketType,
    frame: BytesMut,
}

impl OutgoingPacket {
    /// Start an empty packet of the given type.
    #[must_use]
    pub fn new(packet_type: PacketType) -> Self { Self::with_capacity(packet_type, 0) }

    /// Start an empty packet with room for `capacity` payload bytes.
    #[must_use]
    pub fn with_capacity(packet_type: PacketType, capacity: usize) -> Self {
        let mut frame = BytesMut::with_capacity(capacity + 1);
        frame.put_u8(packet_type.tag());
        Self { packet_type, frame }
    }

    /// Build a packet whose payload is `payload`, already carrying its HCI
    /// header.
    #[must_use]
    pub fn from_payload(packet_type: PacketType, payload: &[u8]) -> Self {
        let mut packet = Self::with_capacity(packet_type, payload.len());
        packet.extend_from_slice(payload);
        packet
    }

    /// Build a packet from its leading header field and parameters, writing
    /// the length field for the type's header layout.
    ///
    /// The leading field is the opcode for commands, the handle plus flags
    /// for ACL and SCO data, and the event code for events (one byte).
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::PayloadTooLong`] if `params` exceeds the length
    /// field, or [`BufferError::HeaderFieldOverflow`] if an event code does
    /// not fit in one byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use h4frame::{OutgoingPacket, PacketType};
    ///
    /// let reset = OutgoingPacket::with_header(PacketType::Command, 0x0c03, &[])?;
    /// assert_eq!(&reset.into_frame()[..], &[0x01, 0x03, 0x0c, 0x00]);
    /// # Ok::<(), h4frame::BufferError>(())
    /// ```
    pub fn with_header(
        packet_type: PacketType,
        leading: u16,
        params: &[u8],
    ) -> Result<Self, BufferError> {
        let layout = packet_type.header_layout();
        if params.len() > layout.max_payload_len() {
            return Err(BufferError::PayloadTooLong {
                packet_type,
                len: params.len(),
                max: layout.max_payload_len(),
            });
        }

        let mut packet = Self::with_capacity(packet_type, layout.header_len + params.len());
        let leading_bytes = write_hci_u16(leading);
        if layout.length_offset == 1 {
            let Ok(code) = u8::try_from(leading) else {
                return Err(BufferError::HeaderFieldOverflow {
                    packet_type,
                    value: leading,
                    width: 1,
                });
            };
            packet.frame.put_u8(code);
        } else {
            packet.frame.put_slice(&leading_bytes);
        }

        // The length checks above make both conversions lossless.
        if layout.length_width == 2 {
            packet.frame.put_u16_le(u16::try_from(params.len()).unwrap_or(u16::MAX));
        } else {
            packet.frame.put_u8(u8::try_from(params.len()).unwrap_or(u8::MAX));
        }
        packet.frame.put_slice(params);
        Ok(packet)
    }

    /// Packet type stored in the reserved tag byte.
    #[must_use]
    pub fn packet_type(&self) -> PacketType { self.packet_type }

    /// Append bytes after the reserved tag.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) { self.frame.put_slice(bytes); }

    /// Append a single byte after the reserved tag.
    pub fn push(&mut self, byte: u8) { self.frame.put_u8(byte); }

    /// Payload bytes appended so far, excluding the type tag.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.frame[1..] }

    /// Payload length, excluding the type tag.
    #[must_use]
    pub fn len(&self) -> usize { self.frame.len() - 1 }

    /// Whether no payload has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Write the type tag into the reserved byte and freeze the frame.
    #[must_use]
    pub fn into_frame(mut self) -> Bytes {
        self.frame[0] = self.packet_type.tag();
        self.frame.freeze()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{BufferError, BufferLimits, OutgoingPacket, PacketBuffer};
    use crate::packet::PacketType;

    #[test]
    fn default_capacity_is_driven_by_acl() {
        let buffer = PacketBuffer::new(BufferLimits::default());
        assert_eq!(buffer.prefix_reserve(), 14);
        assert_eq!(buffer.body_capacity(), 1025);
        assert_eq!(buffer.capacity(), 1026);
    }

    #[test]
    fn small_acl_limit_falls_back_to_event_size() {
        let limits = BufferLimits {
            prefix_reserve: 0,
            acl_payload_max: 16,
            sco_payload_max: 32,
        };
        assert_eq!(limits.body_capacity(), 2 + 255);
    }

    #[test]
    fn windows_past_the_end_are_refused() {
        let mut buffer = PacketBuffer::new(BufferLimits::default());
        let capacity = buffer.capacity();
        assert!(buffer.window_mut(0, capacity).is_some());
        assert!(buffer.window_mut(1, capacity).is_none());
        assert!(buffer.window_mut(usize::MAX, 1).is_none());
    }

    #[rstest]
    #[case::acl(PacketType::AclData, 0x2001, &[0xaa, 0xbb], &[0x02, 0x01, 0x20, 0x02, 0x00, 0xaa, 0xbb][..])]
    #[case::sco(PacketType::ScoData, 0x0003, &[0x11], &[0x03, 0x03, 0x00, 0x01, 0x11][..])]
    #[case::event(PacketType::Event, 0x0e, &[0x01], &[0x04, 0x0e, 0x01, 0x01][..])]
    fn header_builder_writes_length_fields(
        #[case] packet_type: PacketType,
        #[case] leading: u16,
        #[case] params: &[u8],
        #[case] expected: &[u8],
    ) {
        let packet = OutgoingPacket::with_header(packet_type, leading, params).expect("valid packet");
        assert_eq!(&packet.into_frame()[..], expected);
    }

    #[test]
    fn oversized_command_parameters_are_rejected() {
        let params = vec![0u8; 256];
        let err = OutgoingPacket::with_header(PacketType::Command, 0x0c03, &params)
            .expect_err("too long");
        assert_eq!(
            err,
            BufferError::PayloadTooLong {
                packet_type: PacketType::Command,
                len: 256,
                max: 255,
            }
        );
    }

    #[test]
    fn event_code_must_fit_one_byte() {
        let err = OutgoingPacket::with_header(PacketType::Event, 0x0100, &[])
            .expect_err("code too wide");
        assert!(matches!(err, BufferError::HeaderFieldOverflow { width: 1, .. }));
    }

    #[test]
    fn builder_only_exposes_payload() {
        let mut packet = OutgoingPacket::with_capacity(PacketType::AclData, 3);
        assert!(packet.is_empty());
        packet.push(0x01);
        packet.extend_from_slice(&[0x02, 0x03]);
        assert_eq!(packet.len(), 3);
        assert_eq!(packet.payload(), &[0x01, 0x02, 0x03]);
        assert_eq!(&packet.into_frame()[..], &[0x02, 0x01, 0x02, 0x03]);
    }
}
