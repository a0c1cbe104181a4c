//! Unit tests for the H4 reassembly state machine.

use rstest::{fixture, rstest};
use tracing_test::traced_test;

use super::{BlockOutcome, FramingError, ReadState, Reassembler};
use crate::{
    buffer::BufferLimits,
    handler::{PacketHandler, ReceivedPacket},
    packet::PacketType,
};

/// Captures every packet lent to it, with the headroom it was offered.
#[derive(Debug, Default)]
struct Captured {
    packets: Vec<(PacketType, Vec<u8>)>,
    headroom: Vec<usize>,
}

impl PacketHandler for Captured {
    fn handle_packet(&mut self, packet: ReceivedPacket<'_>) {
        self.headroom.push(packet.headroom());
        self.packets
            .push((packet.packet_type(), packet.bytes().to_vec()));
    }
}

#[fixture]
fn reassembler() -> Reassembler { Reassembler::default() }

/// Feed `bytes` in exactly the chunk sizes the reassembler requests. Stops
/// once the input is used up or the next request cannot be satisfied. An
/// empty input satisfies a pending zero-length read.
fn feed(reassembler: &mut Reassembler, handler: &mut Captured, bytes: &[u8]) -> Vec<BlockOutcome> {
    let mut remaining = bytes;
    let mut outcomes = Vec::new();
    loop {
        let pending = reassembler.bytes_pending();
        if pending > remaining.len() {
            break;
        }
        let (chunk, rest) = remaining.split_at(pending);
        reassembler
            .read_window()
            .expect("window inside buffer")
            .copy_from_slice(chunk);
        outcomes.push(reassembler.on_block_received(handler));
        remaining = rest;
        if remaining.is_empty() {
            break;
        }
    }
    outcomes
}

#[rstest]
fn event_packet_is_delivered(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0x04, 0x01, 0x02, 0xaa, 0xbb]);

    assert_eq!(
        handler.packets,
        vec![(PacketType::Event, vec![0x01, 0x02, 0xaa, 0xbb])]
    );
    assert_eq!(reassembler.state(), ReadState::AwaitingType);
}

#[rstest]
fn acl_packet_uses_little_endian_length(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    let outcomes = feed(
        &mut reassembler,
        &mut handler,
        &[0x02, 0x01, 0x00, 0x02, 0x00, 0xaa, 0xbb],
    );

    assert_eq!(
        outcomes,
        vec![
            BlockOutcome::Pending,
            BlockOutcome::Pending,
            BlockOutcome::Delivered(PacketType::AclData),
        ]
    );
    assert_eq!(
        handler.packets,
        vec![(
            PacketType::AclData,
            vec![0x01, 0x00, 0x02, 0x00, 0xaa, 0xbb]
        )]
    );
}

#[rstest]
fn sco_packet_is_delivered(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0x03, 0x06, 0x00, 0x01, 0x7f]);
    assert_eq!(
        handler.packets,
        vec![(PacketType::ScoData, vec![0x06, 0x00, 0x01, 0x7f])]
    );
}

#[rstest]
fn requests_follow_the_header_fields(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    assert_eq!(reassembler.bytes_pending(), 1);

    feed(&mut reassembler, &mut handler, &[0x02]);
    assert_eq!(reassembler.state(), ReadState::AwaitingAclHeader);
    assert_eq!(reassembler.bytes_pending(), 4);

    feed(&mut reassembler, &mut handler, &[0x01, 0x20, 0x10, 0x01]);
    assert_eq!(
        reassembler.state(),
        ReadState::AwaitingPayload(PacketType::AclData)
    );
    assert_eq!(reassembler.bytes_pending(), 0x0110);
    assert_eq!(reassembler.read_cursor(), 5);
}

#[rstest]
#[case::invalid(0xff)]
#[case::zero(0x00)]
#[case::command_is_host_only(0x01)]
fn unknown_type_byte_is_dropped(mut reassembler: Reassembler, #[case] tag: u8) {
    let mut handler = Captured::default();
    let outcomes = feed(&mut reassembler, &mut handler, &[tag]);

    assert_eq!(
        outcomes,
        vec![BlockOutcome::Discarded(FramingError::UnknownPacketType { tag })]
    );
    assert!(handler.packets.is_empty());
    assert_eq!(reassembler.state(), ReadState::AwaitingType);
    assert_eq!(reassembler.bytes_pending(), 1);
    assert_eq!(reassembler.read_cursor(), 0);
}

#[rstest]
fn stream_recovers_after_invalid_type(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0xff]);
    assert!(handler.packets.is_empty());

    feed(&mut reassembler, &mut handler, &[0x04, 0x00, 0x00]);
    feed(&mut reassembler, &mut handler, &[]);
    assert_eq!(handler.packets, vec![(PacketType::Event, vec![0x00, 0x00])]);
}

#[rstest]
fn empty_payload_needs_a_zero_length_read(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0x04, 0x13, 0x00]);
    assert_eq!(
        reassembler.state(),
        ReadState::AwaitingPayload(PacketType::Event)
    );
    assert_eq!(reassembler.bytes_pending(), 0);
    assert!(handler.packets.is_empty());

    assert_eq!(
        reassembler.on_block_received(&mut handler),
        BlockOutcome::Delivered(PacketType::Event)
    );
    assert_eq!(handler.packets, vec![(PacketType::Event, vec![0x13, 0x00])]);
}

#[rstest]
fn every_event_length_is_delivered(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    for len in 0..=u8::MAX {
        let mut wire = vec![0x04, 0x3e, len];
        wire.extend((0..len).map(|i| i ^ 0x5a));
        feed(&mut reassembler, &mut handler, &wire);
        if len == 0 {
            feed(&mut reassembler, &mut handler, &[]);
        }

        let (packet_type, bytes) = handler.packets.pop().expect("event delivered");
        assert_eq!(packet_type, PacketType::Event);
        assert_eq!(bytes.len(), 2 + usize::from(len));
        assert_eq!(&bytes[..], &wire[1..]);
        assert!(handler.packets.is_empty());
    }
}

#[rstest]
fn acl_filling_the_buffer_is_accepted(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    let payload_len: u16 = 1021;
    let mut wire = vec![0x02, 0x01, 0x00];
    wire.extend_from_slice(&payload_len.to_le_bytes());
    wire.extend(std::iter::repeat_n(0xee, usize::from(payload_len)));

    feed(&mut reassembler, &mut handler, &wire);
    assert_eq!(handler.packets.len(), 1);
    assert_eq!(handler.packets[0].1.len(), 4 + 1021);
}

#[rstest]
fn oversized_acl_is_discarded_and_next_byte_is_a_type(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    let outcomes = feed(&mut reassembler, &mut handler, &[0x02, 0x01, 0x00, 0xfe, 0x03]);

    assert_eq!(
        outcomes.last(),
        Some(&BlockOutcome::Discarded(FramingError::PayloadTooLarge {
            packet_type: PacketType::AclData,
            payload_len: 0x03fe,
            available: 1021,
        }))
    );
    assert_eq!(reassembler.state(), ReadState::AwaitingType);
    assert_eq!(reassembler.bytes_pending(), 1);

    feed(&mut reassembler, &mut handler, &[0x04, 0x0e, 0x01, 0x00]);
    assert_eq!(handler.packets, vec![(PacketType::Event, vec![0x0e, 0x01, 0x00])]);
}

#[test]
fn sco_length_is_bounded_by_buffer_capacity() {
    let limits = BufferLimits {
        prefix_reserve: 0,
        acl_payload_max: 0,
        sco_payload_max: 0,
    };
    // The event size sets the floor: 2 + 255 bytes after the type byte.
    assert_eq!(limits.body_capacity(), 257);
    let mut reassembler = Reassembler::new(limits);
    let mut handler = Captured::default();

    // 3 + 254 fits exactly.
    let mut wire = vec![0x03, 0x01, 0x00, 0xfe];
    wire.extend(std::iter::repeat_n(0x10, 254));
    feed(&mut reassembler, &mut handler, &wire);
    assert_eq!(handler.packets.len(), 1);

    // 3 + 255 is one byte too many.
    let outcomes = feed(&mut reassembler, &mut handler, &[0x03, 0x01, 0x00, 0xff]);
    assert_eq!(
        outcomes.last(),
        Some(&BlockOutcome::Discarded(FramingError::PayloadTooLarge {
            packet_type: PacketType::ScoData,
            payload_len: 255,
            available: 254,
        }))
    );
    assert_eq!(handler.packets.len(), 1);
}

#[rstest]
fn reset_is_idempotent(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0x02, 0x01, 0x00]);

    reassembler.reset();
    let once = (
        reassembler.state(),
        reassembler.bytes_pending(),
        reassembler.read_cursor(),
    );
    reassembler.reset();
    let twice = (
        reassembler.state(),
        reassembler.bytes_pending(),
        reassembler.read_cursor(),
    );

    assert_eq!(once, (ReadState::AwaitingType, 1, 0));
    assert_eq!(once, twice);
}

#[rstest]
fn delivered_packets_offer_the_prefix_reserve(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0x04, 0x05, 0x00]);
    feed(&mut reassembler, &mut handler, &[]);
    // Reserved prefix plus the consumed type byte.
    assert_eq!(handler.headroom, vec![14 + 1]);
}

#[rstest]
#[traced_test]
fn framing_errors_are_logged(mut reassembler: Reassembler) {
    let mut handler = Captured::default();
    feed(&mut reassembler, &mut handler, &[0xff]);
    assert!(logs_contain("invalid packet type 0xff"));
}
