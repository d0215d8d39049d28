//! # Control Packets
//!
//! Connection and session management packets. A control packet is a
//! [`BasePacket`] with one header word reserved in front of the payload holding
//! the control bit and the [`ControlType`].
//!
//! ## Wire Format
//! ```text
//! [ControlWord(4, LE: bit 0 = 1, bits 16..32 = type)] [Payload(N)]
//! ```
//!
//! ## Example
//! ```rust
//! use udt_protocol::core::control_packet::{ControlPacket, ControlType};
//! use udt_protocol::core::FramedPacket;
//!
//! let mut ack = ControlPacket::create_with_size(ControlType::Ack, 8).unwrap();
//! ack.write_u32(42).unwrap();
//! assert_eq!(ack.data().len(), ack.total_headers_size() + 4);
//! ```

use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use tracing::trace;

use super::base_packet::{BasePacket, FramedPacket, OpenMode, USE_MAX_SIZE};
use super::header::{decode_control_word, encode_control_word, read_word, write_word, WORD_SIZE};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// Control packet subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ControlType {
    Ack = 0,
    Ack2 = 1,
    LightAck = 2,
    Nak = 3,
    TimeoutNak = 4,
    Handshake = 5,
    HandshakeAck = 6,
    ProbeTail = 7,
    HandshakeRequest = 8,
}

impl ControlType {
    /// Every subtype, in wire order
    pub const ALL: [ControlType; 9] = [
        ControlType::Ack,
        ControlType::Ack2,
        ControlType::LightAck,
        ControlType::Nak,
        ControlType::TimeoutNak,
        ControlType::Handshake,
        ControlType::HandshakeAck,
        ControlType::ProbeTail,
        ControlType::HandshakeRequest,
    ];

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for ControlType {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self> {
        Self::from_u16(value).ok_or_else(|| {
            ProtocolError::ProtocolViolation(format!("Unknown control packet type: {value}"))
        })
    }
}

/// A control packet: base packet plus the control word
#[derive(Debug)]
pub struct ControlPacket {
    base: BasePacket,
    control_type: ControlType,
}

impl ControlPacket {
    /// Header bytes reserved for the control word
    pub const LOCAL_HEADER_SIZE: usize = WORD_SIZE;

    /// Create a control packet with the maximum payload capacity.
    pub fn create(control_type: ControlType) -> Result<Self> {
        Self::build(control_type, BasePacket::allocate(USE_MAX_SIZE)?)
    }

    /// Create a control packet with room for `size` payload bytes.
    ///
    /// [`USE_MAX_SIZE`] behaves exactly like [`create`](Self::create).
    pub fn create_with_size(control_type: ControlType, size: i64) -> Result<Self> {
        if size == USE_MAX_SIZE {
            return Self::create(control_type);
        }
        if size < 0 {
            return Err(ProtocolError::InvalidSize(size));
        }
        let total = size.saturating_add(Self::LOCAL_HEADER_SIZE as i64);
        Self::build(control_type, BasePacket::allocate(total)?)
    }

    fn build(control_type: ControlType, mut base: BasePacket) -> Result<Self> {
        base.adjust_payload_start_and_capacity(Self::LOCAL_HEADER_SIZE, false)?;
        base.open(OpenMode::ReadWrite)?;

        let mut packet = Self { base, control_type };
        packet.write_type();

        global_metrics().control_created();
        trace!(
            control_type = ?control_type,
            capacity = packet.base.payload_capacity(),
            "Control packet created"
        );
        Ok(packet)
    }

    /// Parse a received datagram as a control packet.
    ///
    /// The datagram must carry the control bit and a known subtype; anything
    /// else is a [`ProtocolError::ProtocolViolation`] and is never reinterpreted.
    pub fn from_received(buffer: BytesMut, size: i64, sender: SocketAddr) -> Result<Self> {
        let mut base = BasePacket::wrap_received(buffer, size, sender)?;
        debug_assert_eq!(base.payload_size(), base.payload_capacity());

        if base.payload_size() < Self::LOCAL_HEADER_SIZE {
            return Err(ProtocolError::ProtocolViolation(format!(
                "{}: {} < {}",
                constants::ERR_TRUNCATED_HEADER,
                base.payload_size(),
                Self::LOCAL_HEADER_SIZE
            )));
        }

        let has_payload = base.payload_size() > 0;
        base.adjust_payload_start_and_capacity(Self::LOCAL_HEADER_SIZE, has_payload)?;
        let control_type = Self::read_type(&base)?;
        base.open(OpenMode::ReadOnly)?;

        global_metrics().control_parsed();
        trace!(control_type = ?control_type, %sender, "Control packet parsed");
        Ok(Self { base, control_type })
    }

    pub fn control_type(&self) -> ControlType {
        self.control_type
    }

    /// Change the subtype, re-encoding the header in place.
    pub fn set_type(&mut self, control_type: ControlType) {
        self.control_type = control_type;
        self.write_type();
    }

    pub fn into_datagram(self) -> Bytes {
        self.base.into_datagram()
    }

    pub fn into_buffer(self) -> BytesMut {
        self.base.into_buffer()
    }

    fn write_type(&mut self) {
        let word = encode_control_word(self.control_type.as_u16());
        write_word(self.base.header_mut(Self::LOCAL_HEADER_SIZE), 0, word);
    }

    fn read_type(base: &BasePacket) -> Result<ControlType> {
        let word = read_word(base.header(Self::LOCAL_HEADER_SIZE), 0).ok_or_else(|| {
            ProtocolError::ProtocolViolation(constants::ERR_TRUNCATED_HEADER.to_string())
        })?;
        ControlType::try_from(decode_control_word(word)?)
    }
}

impl FramedPacket for ControlPacket {
    fn base(&self) -> &BasePacket {
        &self.base
    }

    fn local_header_size(&self) -> usize {
        Self::LOCAL_HEADER_SIZE
    }

    fn total_headers_size(&self) -> usize {
        self.base.total_headers_size() + Self::LOCAL_HEADER_SIZE
    }
}

impl Deref for ControlPacket {
    type Target = BasePacket;

    fn deref(&self) -> &BasePacket {
        &self.base
    }
}

impl DerefMut for ControlPacket {
    fn deref_mut(&mut self) -> &mut BasePacket {
        &mut self.base
    }
}
