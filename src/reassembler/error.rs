//! Framing errors detected while reassembling packets.
//!
//! These never reach the packet handler. The reassembler logs them, resets,
//! and resumes reading at the next byte as a fresh type tag.

use thiserror::Error;

use crate::packet::PacketType;

/// Reasons a partially read packet is discarded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The byte read in type position is not a receivable packet type.
    #[error("invalid packet type {tag:#04x}")]
    UnknownPacketType {
        /// Offending byte.
        tag: u8,
    },
    /// The header announces more bytes than the buffer can hold.
    #[error("invalid {packet_type} payload length {payload_len}: only space for {available}")]
    PayloadTooLarge {
        /// Packet type whose header was read.
        packet_type: PacketType,
        /// Payload length announced by the header.
        payload_len: usize,
        /// Payload bytes the buffer can hold after this header.
        available: usize,
    },
}

impl FramingError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownPacketType { .. } => "unknown_type",
            Self::PayloadTooLarge { .. } => "payload_too_large",
        }
    }
}
