//! Property-based tests using proptest
//!
//! These tests validate framing invariants across randomly generated packet
//! types, sizes and payloads.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use proptest::prelude::*;
use std::net::SocketAddr;
use udt_protocol::config::MAX_PACKET_SIZE;
use udt_protocol::core::header::{
    decode_control_word, encode_control_word, CONTROL_BIT_MASK, MAX_MESSAGE_NUMBER, WORD_SIZE,
};
use udt_protocol::core::{
    is_control_datagram, ControlPacket, ControlType, DataPacket, FramedPacket, MessageInfo,
    PacketPosition, ReceivedPacket, SequenceNumber, USE_MAX_SIZE,
};
use udt_protocol::error::ProtocolError;

const MAX_CONTROL_PAYLOAD: usize = MAX_PACKET_SIZE - WORD_SIZE;

fn sender() -> SocketAddr {
    "127.0.0.1:4000".parse().unwrap()
}

fn control_type() -> impl Strategy<Value = ControlType> {
    prop::sample::select(ControlType::ALL.to_vec())
}

fn position() -> impl Strategy<Value = PacketPosition> {
    prop::sample::select(vec![
        PacketPosition::Only,
        PacketPosition::First,
        PacketPosition::Middle,
        PacketPosition::Last,
    ])
}

fn received(datagram: &[u8]) -> (BytesMut, i64) {
    (BytesMut::from(datagram), datagram.len() as i64)
}

// Property: created control packets survive a trip through the receive path
// with their type and a zeroed payload of the requested size
proptest! {
    #[test]
    fn prop_control_roundtrip(t in control_type(), size in 0usize..=MAX_CONTROL_PAYLOAD) {
        let mut packet = ControlPacket::create_with_size(t, size as i64).unwrap();
        prop_assert_eq!(packet.payload_capacity(), size);
        packet.set_payload_size(size).unwrap();

        let datagram = packet.into_datagram();
        let (buffer, len) = received(&datagram);
        let parsed = ControlPacket::from_received(buffer, len, sender()).unwrap();

        prop_assert_eq!(parsed.control_type(), t);
        prop_assert_eq!(parsed.payload_size(), size);
        prop_assert!(parsed.payload().iter().all(|&b| b == 0));
    }
}

// Property: the control bit is set on every created control packet and no
// subtype value can reach it
proptest! {
    #[test]
    fn prop_control_bit_always_set(t in control_type(), raw in any::<u16>()) {
        let packet = ControlPacket::create_with_size(t, 0).unwrap();
        prop_assert!(is_control_datagram(packet.data()));

        let word = encode_control_word(raw);
        prop_assert_eq!(word & CONTROL_BIT_MASK, CONTROL_BIT_MASK);
        prop_assert_eq!(decode_control_word(word).unwrap(), raw);
    }
}

// Property: a buffer whose first byte lacks the control bit never parses as a
// control packet
proptest! {
    #[test]
    fn prop_cleared_bit_rejected(mut bytes in prop::collection::vec(any::<u8>(), 4..64)) {
        bytes[0] &= !1;
        let (buffer, len) = received(&bytes);
        let result = ControlPacket::from_received(buffer, len, sender());
        prop_assert!(matches!(result, Err(ProtocolError::ProtocolViolation(_))));
    }
}

// Property: the sentinel size and the default factory agree
proptest! {
    #[test]
    fn prop_sentinel_matches_default(t in control_type()) {
        let sentinel = ControlPacket::create_with_size(t, USE_MAX_SIZE).unwrap();
        let default = ControlPacket::create(t).unwrap();
        prop_assert_eq!(sentinel.payload_capacity(), default.payload_capacity());
        prop_assert_eq!(sentinel.total_headers_size(), default.total_headers_size());
    }
}

// Property: negative sizes other than the sentinel are refused
proptest! {
    #[test]
    fn prop_negative_sizes_rejected(size in i64::MIN..-1) {
        let result = ControlPacket::create_with_size(ControlType::Ack, size);
        prop_assert!(matches!(result, Err(ProtocolError::InvalidSize(_))));
    }
}

// Property: writing into one packet never shows up in another
proptest! {
    #[test]
    fn prop_no_cross_packet_aliasing(payload in prop::collection::vec(any::<u8>(), 1..128)) {
        let mut first = ControlPacket::create_with_size(ControlType::Ack, 128).unwrap();
        let second = ControlPacket::create_with_size(ControlType::Ack, 128).unwrap();
        let before = second.data().to_vec();

        first.write(&payload).unwrap();

        prop_assert_eq!(second.data(), &before[..]);
        prop_assert_eq!(first.payload(), &payload[..]);
    }
}

// Property: data headers round-trip sequence numbers and message fields
proptest! {
    #[test]
    fn prop_data_roundtrip(
        seq in 0..=SequenceNumber::MAX,
        reliable in any::<bool>(),
        number in 0..=MAX_MESSAGE_NUMBER,
        pos in position(),
        part in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let seq = SequenceNumber::new(seq).unwrap();
        let info = MessageInfo::new(number, pos, part).unwrap();
        let mut packet = DataPacket::create_message(seq, reliable, info, payload.len() as i64).unwrap();
        packet.write(&payload).unwrap();

        let datagram = packet.into_datagram();
        prop_assert!(!is_control_datagram(&datagram));

        let (buffer, len) = received(&datagram);
        let parsed = DataPacket::from_received(buffer, len, sender()).unwrap();
        prop_assert_eq!(parsed.sequence_number(), seq);
        prop_assert_eq!(parsed.is_reliable(), reliable);
        prop_assert_eq!(parsed.message(), Some(&info));
        prop_assert_eq!(parsed.payload(), &payload[..]);
    }
}

// Property: arbitrary bytes never panic the demultiplexer, and whatever parses
// keeps its bytes intact
proptest! {
    #[test]
    fn prop_demux_total(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let (buffer, len) = received(&bytes);
        if let Ok(packet) = ReceivedPacket::from_datagram(buffer, len, sender()) {
            prop_assert_eq!(packet.is_control(), is_control_datagram(&bytes));
            prop_assert_eq!(packet.base().data(), &bytes[..]);
        }
    }
}
