//! Packets sent over a real UDP socket on the loopback interface

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tokio::net::UdpSocket;
use udt_protocol::core::{
    ControlPacket, ControlType, DataPacket, MessageInfo, PacketPosition, ReceivedPacket,
    SequenceNumber,
};
use udt_protocol::utils::DatagramPool;

async fn socket_pair() -> (UdpSocket, UdpSocket) {
    let a = UdpSocket::bind("127.0.0.1:0").await.expect("bind a");
    let b = UdpSocket::bind("127.0.0.1:0").await.expect("bind b");
    (a, b)
}

async fn receive(socket: &UdpSocket, pool: &DatagramPool) -> ReceivedPacket {
    let mut buffer = pool.acquire();
    buffer.resize(pool.buffer_size(), 0);

    let (len, from) = socket.recv_from(&mut buffer[..]).await.expect("recv");
    buffer.truncate(len);
    ReceivedPacket::from_datagram(buffer, len as i64, from).expect("parse")
}

#[tokio::test]
async fn control_packet_over_udp() {
    let (a, b) = socket_pair().await;
    let pool = DatagramPool::new(4);

    let mut packet = ControlPacket::create_with_size(ControlType::LightAck, 4).unwrap();
    packet.write_u32(0xDEAD_BEEF).unwrap();
    let datagram = packet.into_datagram();
    a.send_to(&datagram, b.local_addr().unwrap()).await.unwrap();

    match receive(&b, &pool).await {
        ReceivedPacket::Control(mut ack) => {
            assert_eq!(ack.control_type(), ControlType::LightAck);
            assert_eq!(ack.sender(), Some(a.local_addr().unwrap()));
            assert_eq!(ack.read_u32().unwrap(), 0xDEAD_BEEF);
            pool.recycle(ack.into_buffer());
        }
        ReceivedPacket::Data(_) => panic!("control packet parsed as data"),
    }
    assert_eq!(pool.available(), 4);
}

#[tokio::test]
async fn message_parts_over_udp() {
    let (a, b) = socket_pair().await;
    let pool = DatagramPool::new(4);
    let parts: [&[u8]; 3] = [b"first ", b"middle ", b"last"];
    let positions = [
        PacketPosition::First,
        PacketPosition::Middle,
        PacketPosition::Last,
    ];

    for (i, (part, position)) in parts.iter().zip(positions).enumerate() {
        let seq = SequenceNumber::new(100 + i as u32).unwrap();
        let info = MessageInfo::new(7, position, i as u32).unwrap();
        let mut packet = DataPacket::create_message(seq, true, info, part.len() as i64).unwrap();
        packet.write(part).unwrap();
        a.send_to(&packet.into_datagram(), b.local_addr().unwrap())
            .await
            .unwrap();
    }

    let mut message = Vec::new();
    for i in 0..parts.len() {
        match receive(&b, &pool).await {
            ReceivedPacket::Data(packet) => {
                let info = *packet.message().expect("message fields");
                assert_eq!(packet.sequence_number().value(), 100 + i as u32);
                assert_eq!(info.number(), 7);
                assert_eq!(info.part_number(), i as u32);
                assert_eq!(info.position(), positions[i]);
                message.extend_from_slice(packet.payload());
                pool.recycle(packet.into_buffer());
            }
            ReceivedPacket::Control(_) => panic!("data packet parsed as control"),
        }
    }
    assert_eq!(message, b"first middle last");
}
