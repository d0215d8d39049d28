#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use std::net::{Ipv4Addr, SocketAddr};
use udt_protocol::core::ReceivedPacket;

fuzz_target!(|data: &[u8]| {
    // Received datagrams must parse or fail cleanly, never panic
    let sender = SocketAddr::from((Ipv4Addr::LOCALHOST, 9000));
    if let Ok(mut packet) = ReceivedPacket::from_datagram(BytesMut::from(data), data.len() as i64, sender) {
        let payload = packet.base().payload().len();
        let bytes = match packet {
            ReceivedPacket::Control(ref mut p) => p.read_without_copy(payload).map(<[u8]>::len),
            ReceivedPacket::Data(ref mut p) => p.read_without_copy(payload).map(<[u8]>::len),
        };
        assert_eq!(bytes.ok(), Some(payload));
    }
});
