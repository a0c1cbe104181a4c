//! A packet handler that records what it receives.

use std::sync::{Arc, Mutex, PoisonError};

use h4frame::{PacketHandler, PacketType, ReceivedPacket, TRANSPORT_PACKET_SENT};

/// Shared log of delivered packets.
///
/// Clones share the same log, so a test can keep one clone while the
/// transport owns another.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    packets: Arc<Mutex<Vec<(PacketType, Vec<u8>)>>>,
}

impl RecordingHandler {
    /// Every packet delivered so far, oldest first.
    #[must_use]
    pub fn packets(&self) -> Vec<(PacketType, Vec<u8>)> {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Delivered packets other than packet-sent notifications.
    #[must_use]
    pub fn received(&self) -> Vec<(PacketType, Vec<u8>)> {
        self.packets()
            .into_iter()
            .filter(|packet| !is_sent_notification(packet))
            .collect()
    }

    /// Number of packet-sent notifications delivered.
    #[must_use]
    pub fn sent_notifications(&self) -> usize {
        self.packets()
            .iter()
            .filter(|packet| is_sent_notification(packet))
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn is_sent_notification((packet_type, bytes): &(PacketType, Vec<u8>)) -> bool {
    *packet_type == PacketType::Event && bytes.as_slice() == [TRANSPORT_PACKET_SENT, 0]
}

impl PacketHandler for RecordingHandler {
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>) {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((packet.packet_type(), packet.bytes().to_vec()));
    }
}
