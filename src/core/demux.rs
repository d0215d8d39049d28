//! # Datagram Demultiplexing
//!
//! Classifies a received datagram by the control bit in its first byte and
//! hands it to the matching packet parser.
//!
//! Parse failures are returned to the caller, which is expected to drop the
//! datagram. Every failure is logged and counted so a misbehaving peer shows up
//! in the metrics instead of disappearing silently.

use bytes::BytesMut;
use std::net::SocketAddr;
use tracing::{debug, warn};

use super::base_packet::{BasePacket, FramedPacket};
use super::control_packet::ControlPacket;
use super::data_packet::DataPacket;
use super::header::CONTROL_BIT_MASK;
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// Whether the datagram starts with a control header.
///
/// Empty datagrams are neither control nor data and return `false`.
#[inline]
pub fn is_control_datagram(bytes: &[u8]) -> bool {
    bytes
        .first()
        .is_some_and(|first| u32::from(*first) & CONTROL_BIT_MASK != 0)
}

/// A parsed datagram, tagged by packet family
#[derive(Debug)]
pub enum ReceivedPacket {
    Control(ControlPacket),
    Data(DataPacket),
}

impl ReceivedPacket {
    /// Parse `size` received bytes of `buffer` from `sender`.
    pub fn from_datagram(buffer: BytesMut, size: i64, sender: SocketAddr) -> Result<Self> {
        let metrics = global_metrics();
        metrics.datagram_received(u64::try_from(size).unwrap_or(0));

        let control = buffer
            .get(..usize::try_from(size).unwrap_or(0))
            .is_some_and(is_control_datagram);

        let parsed = if control {
            ControlPacket::from_received(buffer, size, sender).map(Self::Control)
        } else {
            DataPacket::from_received(buffer, size, sender).map(Self::Data)
        };

        if let Err(ref err) = parsed {
            metrics.datagram_dropped();
            if matches!(err, ProtocolError::ProtocolViolation(_)) {
                metrics.protocol_violation();
            }
            if err.is_malformed_input() {
                warn!(%sender, size, control, error = %err, "Dropping malformed datagram");
            } else {
                debug!(%sender, size, control, error = %err, "Dropping datagram");
            }
        }

        parsed
    }

    pub fn is_control(&self) -> bool {
        matches!(self, ReceivedPacket::Control(_))
    }

    pub fn sender(&self) -> Option<SocketAddr> {
        self.base().sender()
    }

    pub fn base(&self) -> &BasePacket {
        match self {
            ReceivedPacket::Control(packet) => packet.base(),
            ReceivedPacket::Data(packet) => packet.base(),
        }
    }

    /// Give the datagram storage back, e.g. to a receive pool.
    pub fn into_buffer(self) -> BytesMut {
        match self {
            ReceivedPacket::Control(packet) => packet.into_buffer(),
            ReceivedPacket::Data(packet) => packet.into_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::control_packet::ControlType;
    use crate::core::data_packet::SequenceNumber;

    fn addr() -> SocketAddr {
        "10.0.0.7:9000".parse().unwrap()
    }

    fn datagram(bytes: bytes::Bytes) -> (BytesMut, i64) {
        let len = bytes.len() as i64;
        (BytesMut::from(&bytes[..]), len)
    }

    #[test]
    fn test_is_control_datagram() {
        assert!(is_control_datagram(&[0x01, 0x00, 0x05, 0x00]));
        assert!(!is_control_datagram(&[0x08, 0x00, 0x00, 0x00]));
        assert!(!is_control_datagram(&[]));
    }

    #[test]
    fn test_dispatch_control() {
        let packet = ControlPacket::create_with_size(ControlType::Ack2, 0).unwrap();
        let (buffer, size) = datagram(packet.into_datagram());

        match ReceivedPacket::from_datagram(buffer, size, addr()).unwrap() {
            ReceivedPacket::Control(control) => {
                assert_eq!(control.control_type(), ControlType::Ack2);
                assert_eq!(control.sender(), Some(addr()));
            }
            other => panic!("expected control packet, got {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_data() {
        let seq = SequenceNumber::new(42).unwrap();
        let mut packet = DataPacket::create_with_size(seq, false, 3).unwrap();
        packet.write(b"abc").unwrap();
        let (buffer, size) = datagram(packet.into_datagram());

        let received = ReceivedPacket::from_datagram(buffer, size, addr()).unwrap();
        assert!(!received.is_control());
        assert_eq!(received.base().payload(), b"abc");
        match received {
            ReceivedPacket::Data(data) => assert_eq!(data.sequence_number(), seq),
            other => panic!("expected data packet, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_datagram_is_dropped() {
        let result = ReceivedPacket::from_datagram(BytesMut::new(), 0, addr());
        assert!(matches!(result, Err(ProtocolError::InvalidArgument(_))));
    }

    #[test]
    fn test_truncated_datagram_counts_violation() {
        let before = global_metrics().snapshot().protocol_violations;
        let result = ReceivedPacket::from_datagram(BytesMut::from(&[0x00, 0x01][..]), 2, addr());
        assert!(matches!(result, Err(ProtocolError::ProtocolViolation(_))));
        assert!(global_metrics().snapshot().protocol_violations > before);
    }

    #[test]
    fn test_into_buffer_returns_storage() {
        let packet = ControlPacket::create_with_size(ControlType::Nak, 8).unwrap();
        let (buffer, size) = datagram(packet.into_datagram());
        let received = ReceivedPacket::from_datagram(buffer, size, addr()).unwrap();
        assert_eq!(received.into_buffer().len(), 12);
    }
}
