//! # Data Packets
//!
//! Application payload packets. The header carries the framing fields the
//! reliability layer needs (sequence number, reliable flag, message position)
//! but no policy: acknowledgement, retransmission and reassembly live above
//! this crate.
//!
//! ## Wire Format
//! ```text
//! [SeqWord(4)] [MessageWord(4)]? [MessagePartWord(4)]? [Payload(N)]
//! ```
//! The message words are present only when the message flag of the first
//! word is set. See [`header`](super::header) for the bit layout.

use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use tracing::trace;

use super::base_packet::{BasePacket, FramedPacket, OpenMode, USE_MAX_SIZE};
use super::header::{
    decode_message_word, encode_message_word, read_word, write_word, DataWord,
    MAX_MESSAGE_NUMBER, MAX_SEQUENCE_NUMBER, WORD_SIZE,
};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// 29-bit packet sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    pub const MAX: u32 = MAX_SEQUENCE_NUMBER;

    pub fn new(value: u32) -> Result<Self> {
        if value > Self::MAX {
            return Err(ProtocolError::InvalidArgument(format!(
                "{}: {value}",
                constants::ERR_SEQUENCE_NUMBER_RANGE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Where a packet sits within a multi-packet message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketPosition {
    Only = 0b00,
    Last = 0b01,
    First = 0b10,
    Middle = 0b11,
}

impl PacketPosition {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => PacketPosition::Only,
            0b01 => PacketPosition::Last,
            0b10 => PacketPosition::First,
            _ => PacketPosition::Middle,
        }
    }
}

/// Message fields carried by packets with the message flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageInfo {
    number: u32,
    position: PacketPosition,
    part_number: u32,
}

impl MessageInfo {
    pub fn new(number: u32, position: PacketPosition, part_number: u32) -> Result<Self> {
        if number > MAX_MESSAGE_NUMBER {
            return Err(ProtocolError::InvalidArgument(format!(
                "{}: {number}",
                constants::ERR_MESSAGE_NUMBER_RANGE
            )));
        }
        Ok(Self {
            number,
            position,
            part_number,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn position(&self) -> PacketPosition {
        self.position
    }

    pub fn part_number(&self) -> u32 {
        self.part_number
    }
}

/// A data packet: base packet plus the sequence word and optional message words
#[derive(Debug)]
pub struct DataPacket {
    base: BasePacket,
    sequence_number: SequenceNumber,
    reliable: bool,
    message: Option<MessageInfo>,
}

impl DataPacket {
    /// Header bytes of a packet without message fields
    pub const BASE_HEADER_SIZE: usize = WORD_SIZE;

    /// Header bytes of a packet carrying message fields
    pub const MESSAGE_HEADER_SIZE: usize = 3 * WORD_SIZE;

    fn header_size_for(message: Option<&MessageInfo>) -> usize {
        match message {
            Some(_) => Self::MESSAGE_HEADER_SIZE,
            None => Self::BASE_HEADER_SIZE,
        }
    }

    /// Create a data packet with the maximum payload capacity.
    pub fn create(sequence_number: SequenceNumber, reliable: bool) -> Result<Self> {
        Self::create_with_size(sequence_number, reliable, USE_MAX_SIZE)
    }

    /// Create a data packet with room for `size` payload bytes
    /// ([`USE_MAX_SIZE`] for the maximum).
    pub fn create_with_size(
        sequence_number: SequenceNumber,
        reliable: bool,
        size: i64,
    ) -> Result<Self> {
        Self::build(sequence_number, reliable, None, size)
    }

    /// Create one part of a multi-packet message.
    pub fn create_message(
        sequence_number: SequenceNumber,
        reliable: bool,
        message: MessageInfo,
        size: i64,
    ) -> Result<Self> {
        Self::build(sequence_number, reliable, Some(message), size)
    }

    fn build(
        sequence_number: SequenceNumber,
        reliable: bool,
        message: Option<MessageInfo>,
        size: i64,
    ) -> Result<Self> {
        let header_size = Self::header_size_for(message.as_ref());
        let mut base = match size {
            USE_MAX_SIZE => BasePacket::allocate(USE_MAX_SIZE)?,
            _ if size < 0 => return Err(ProtocolError::InvalidSize(size)),
            _ => BasePacket::allocate(size.saturating_add(header_size as i64))?,
        };
        base.adjust_payload_start_and_capacity(header_size, false)?;
        base.open(OpenMode::ReadWrite)?;

        let mut packet = Self {
            base,
            sequence_number,
            reliable,
            message,
        };
        packet.write_header();

        global_metrics().data_created();
        trace!(
            sequence_number = sequence_number.value(),
            reliable,
            capacity = packet.base.payload_capacity(),
            "Data packet created"
        );
        Ok(packet)
    }

    /// Parse a received datagram as a data packet.
    ///
    /// A set control bit or a header cut short is a
    /// [`ProtocolError::ProtocolViolation`].
    pub fn from_received(buffer: BytesMut, size: i64, sender: SocketAddr) -> Result<Self> {
        let mut base = BasePacket::wrap_received(buffer, size, sender)?;
        let (word, message) = Self::read_header(base.unreserved())?;

        let header_size = Self::header_size_for(message.as_ref());
        let has_payload = base.payload_size() > 0;
        base.adjust_payload_start_and_capacity(header_size, has_payload)?;
        base.open(OpenMode::ReadOnly)?;

        global_metrics().data_parsed();
        trace!(
            sequence_number = word.sequence_number,
            %sender,
            "Data packet parsed"
        );
        Ok(Self {
            base,
            sequence_number: SequenceNumber(word.sequence_number),
            reliable: word.reliable,
            message,
        })
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    pub fn is_reliable(&self) -> bool {
        self.reliable
    }

    pub fn is_part_of_message(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<&MessageInfo> {
        self.message.as_ref()
    }

    /// Change the sequence number, re-encoding the header in place.
    ///
    /// Used when a packet is re-sent under a new number without reallocating.
    pub fn set_sequence_number(&mut self, sequence_number: SequenceNumber) {
        self.sequence_number = sequence_number;
        self.write_header();
    }

    pub fn into_datagram(self) -> Bytes {
        self.base.into_datagram()
    }

    pub fn into_buffer(self) -> BytesMut {
        self.base.into_buffer()
    }

    fn write_header(&mut self) {
        let word = DataWord {
            sequence_number: self.sequence_number.value(),
            reliable: self.reliable,
            message: self.message.is_some(),
        };
        let header_size = Self::header_size_for(self.message.as_ref());
        let message = self.message;
        let header = self.base.header_mut(header_size);

        write_word(header, 0, word.encode());
        if let Some(message) = message {
            let position = u32::from(message.position as u8);
            write_word(header, WORD_SIZE, encode_message_word(message.number, position));
            write_word(header, 2 * WORD_SIZE, message.part_number);
        }
    }

    fn read_header(bytes: &[u8]) -> Result<(DataWord, Option<MessageInfo>)> {
        let truncated = || {
            ProtocolError::ProtocolViolation(format!(
                "{}: {} bytes",
                constants::ERR_TRUNCATED_HEADER,
                bytes.len()
            ))
        };

        let word = DataWord::decode(read_word(bytes, 0).ok_or_else(truncated)?)?;
        if !word.message {
            return Ok((word, None));
        }

        let message_word = read_word(bytes, WORD_SIZE).ok_or_else(truncated)?;
        let part_number = read_word(bytes, 2 * WORD_SIZE).ok_or_else(truncated)?;
        let (number, position_bits) = decode_message_word(message_word);
        let message = MessageInfo {
            number,
            position: PacketPosition::from_bits(position_bits),
            part_number,
        };
        Ok((word, Some(message)))
    }
}

impl FramedPacket for DataPacket {
    fn base(&self) -> &BasePacket {
        &self.base
    }

    fn local_header_size(&self) -> usize {
        Self::header_size_for(self.message.as_ref())
    }

    fn total_headers_size(&self) -> usize {
        self.base.total_headers_size() + self.local_header_size()
    }
}

impl Deref for DataPacket {
    type Target = BasePacket;

    fn deref(&self) -> &BasePacket {
        &self.base
    }
}

impl DerefMut for DataPacket {
    fn deref_mut(&mut self) -> &mut BasePacket {
        &mut self.base
    }
}
