//! Metric helpers for `h4frame`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::packet::PacketType;

/// Name of the counter tracking packets moved across the link.
pub const PACKETS_TOTAL: &str = "h4frame_packets_total";
/// Name of the counter tracking packets discarded by the reassembler.
pub const FRAMING_ERRORS_TOTAL: &str = "h4frame_framing_errors_total";
/// Name of the gauge reflecting whether a write is in flight.
pub const WRITE_BUSY: &str = "h4frame_write_busy";

/// Direction of packet flow.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Controller to host.
    Inbound,
    /// Host to controller.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a packet delivered upward or handed to the driver.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_packets(direction: Direction, packet_type: PacketType) {
    #[cfg(feature = "metrics")]
    counter!(
        PACKETS_TOTAL,
        "direction" => direction.as_str(),
        "type" => packet_type.as_str()
    )
    .increment(1);
}

/// Record a discarded packet, labelled by the framing error kind.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_framing_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(FRAMING_ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Publish the write gate state.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn set_write_busy(busy: bool) {
    #[cfg(feature = "metrics")]
    gauge!(WRITE_BUSY).set(if busy { 1.0 } else { 0.0 });
}
