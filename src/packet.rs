//! HCI packet type tags and their H4 header layouts.
//!
//! On an H4 link each packet starts with a one-byte type tag. The tag selects
//! a fixed-size header whose trailing field carries the payload length.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::byte_order::read_length_field;

/// Event code of the synthetic notification emitted once an outbound packet
/// has left the transport.
///
/// The value lies in the vendor-reserved event range so it never collides
/// with a real controller event.
pub const TRANSPORT_PACKET_SENT: u8 = 0x6e;

/// The H4 packet type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    /// Host to controller command.
    Command = 0x01,
    /// Asynchronous connection-oriented data.
    AclData = 0x02,
    /// Synchronous connection-oriented (audio) data.
    ScoData = 0x03,
    /// Controller to host event.
    Event = 0x04,
}

impl PacketType {
    /// Map a type byte read from the controller onto a receivable packet type.
    ///
    /// Only events, ACL data and SCO data flow from controller to host, so
    /// every other value (including [`PacketType::Command`]) yields `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use h4frame::PacketType;
    ///
    /// assert_eq!(PacketType::from_received(0x04), Some(PacketType::Event));
    /// assert_eq!(PacketType::from_received(0x01), None);
    /// assert_eq!(PacketType::from_received(0xff), None);
    /// ```
    #[must_use]
    pub const fn from_received(tag: u8) -> Option<Self> {
        match tag {
            0x02 => Some(Self::AclData),
            0x03 => Some(Self::ScoData),
            0x04 => Some(Self::Event),
            _ => None,
        }
    }

    /// The on-wire tag value.
    #[must_use]
    pub const fn tag(self) -> u8 { self as u8 }

    /// Header layout following the type byte.
    #[must_use]
    pub const fn header_layout(self) -> HeaderLayout {
        match self {
            Self::Command | Self::ScoData => HeaderLayout {
                header_len: 3,
                length_offset: 2,
                length_width: 1,
            },
            Self::AclData => HeaderLayout {
                header_len: 4,
                length_offset: 2,
                length_width: 2,
            },
            Self::Event => HeaderLayout {
                header_len: 2,
                length_offset: 1,
                length_width: 1,
            },
        }
    }

    /// Short lowercase name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::AclData => "acl",
            Self::ScoData => "sco",
            Self::Event => "event",
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self { value.tag() }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Fixed header shape for one packet type.
///
/// `length_offset` and `length_width` locate the little-endian payload length
/// field inside the header. The length field always ends the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Header size in bytes, excluding the type byte.
    pub header_len: usize,
    /// Offset of the payload length field within the header.
    pub length_offset: usize,
    /// Width of the payload length field in bytes.
    pub length_width: usize,
}

impl HeaderLayout {
    /// Decode the payload length from a complete header.
    ///
    /// Returns `None` when `header` is shorter than the layout requires.
    ///
    /// # Examples
    ///
    /// ```
    /// use h4frame::PacketType;
    ///
    /// let acl = PacketType::AclData.header_layout();
    /// assert_eq!(acl.payload_len(&[0x01, 0x20, 0x10, 0x00]), Some(16));
    /// ```
    #[must_use]
    pub fn payload_len(&self, header: &[u8]) -> Option<usize> {
        if header.len() < self.header_len {
            return None;
        }
        read_length_field(header, self.length_offset, self.length_width)
    }

    /// Largest payload length the length field can express.
    #[must_use]
    pub const fn max_payload_len(&self) -> usize {
        if self.length_width == 2 {
            u16::MAX as usize
        } else {
            u8::MAX as usize
        }
    }
}
