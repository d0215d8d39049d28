//! # Header Words
//!
//! Encoding and decoding of the fixed-width header words that open every
//! datagram. Words are little-endian `u32`s read from and written to the buffer
//! at a known offset; nothing reinterprets buffer memory in place.
//!
//! ## Control word
//! ```text
//! bit 0         control flag (always 1)
//! bits 1..16    reserved, must be zero
//! bits 16..32   control packet subtype
//! ```
//!
//! ## Data words
//! ```text
//! word 0: bit 0 control flag (always 0) | bit 1 reliable | bit 2 message | bits 3..32 sequence number
//! word 1: bits 0..2 packet position | bits 2..32 message number      (message flag only)
//! word 2: message part number                                         (message flag only)
//! ```
//!
//! Bit 0 of the first word is bit 0 of the first byte on the wire, so a
//! receiver can demultiplex control and data datagrams by looking at one byte.

use crate::error::{constants, ProtocolError, Result};
use std::mem::size_of;

/// Width of every header word in bytes
pub const WORD_SIZE: usize = size_of::<u32>();

/// Flag marking a control packet
pub const CONTROL_BIT_MASK: u32 = 1;

/// Bits between the control flag and the subtype
pub const CONTROL_RESERVED_MASK: u32 = 0xFFFE;

/// Shift placing the control subtype above the flag bits
pub const CONTROL_TYPE_SHIFT: u32 = 8 * size_of::<u16>() as u32;

/// Flag marking a data packet that must be delivered reliably
pub const RELIABILITY_BIT_MASK: u32 = 1 << 1;

/// Flag marking a data packet that is part of a multi-packet message
pub const MESSAGE_BIT_MASK: u32 = 1 << 2;

/// Shift placing the sequence number above the data flag bits
pub const SEQUENCE_NUMBER_SHIFT: u32 = 3;

/// Largest sequence number representable in a data header
pub const MAX_SEQUENCE_NUMBER: u32 = u32::MAX >> SEQUENCE_NUMBER_SHIFT;

/// Bits of the message word holding the packet position
pub const PACKET_POSITION_MASK: u32 = 0b11;

/// Shift placing the message number above the packet position
pub const MESSAGE_NUMBER_SHIFT: u32 = 2;

/// Largest message number representable in a data header
pub const MAX_MESSAGE_NUMBER: u32 = u32::MAX >> MESSAGE_NUMBER_SHIFT;

/// Pack a control subtype into a control word.
#[inline]
pub fn encode_control_word(raw_type: u16) -> u32 {
    CONTROL_BIT_MASK | (u32::from(raw_type) << CONTROL_TYPE_SHIFT)
}

/// Recover the control subtype from a control word.
///
/// Fails with [`ProtocolError::ProtocolViolation`] when the control bit is
/// clear or a reserved bit is set.
#[inline]
pub fn decode_control_word(word: u32) -> Result<u16> {
    if word & CONTROL_BIT_MASK == 0 {
        return Err(ProtocolError::ProtocolViolation(
            constants::ERR_MISSING_CONTROL_BIT.to_string(),
        ));
    }
    if word & CONTROL_RESERVED_MASK != 0 {
        return Err(ProtocolError::ProtocolViolation(format!(
            "{}: {word:#010x}",
            constants::ERR_RESERVED_BITS
        )));
    }
    Ok((word >> CONTROL_TYPE_SHIFT) as u16)
}

/// Fields carried by the first word of a data header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWord {
    pub sequence_number: u32,
    pub reliable: bool,
    pub message: bool,
}

impl DataWord {
    /// Pack into a data word. Sequence numbers are masked to 29 bits.
    #[inline]
    pub fn encode(self) -> u32 {
        let mut word = (self.sequence_number & MAX_SEQUENCE_NUMBER) << SEQUENCE_NUMBER_SHIFT;
        if self.reliable {
            word |= RELIABILITY_BIT_MASK;
        }
        if self.message {
            word |= MESSAGE_BIT_MASK;
        }
        word
    }

    /// Unpack a data word.
    ///
    /// Fails with [`ProtocolError::ProtocolViolation`] when the control bit is set.
    #[inline]
    pub fn decode(word: u32) -> Result<Self> {
        if word & CONTROL_BIT_MASK != 0 {
            return Err(ProtocolError::ProtocolViolation(
                constants::ERR_UNEXPECTED_CONTROL_BIT.to_string(),
            ));
        }
        Ok(Self {
            sequence_number: word >> SEQUENCE_NUMBER_SHIFT,
            reliable: word & RELIABILITY_BIT_MASK != 0,
            message: word & MESSAGE_BIT_MASK != 0,
        })
    }
}

/// Pack a message number and a 2-bit packet position into a message word.
#[inline]
pub fn encode_message_word(message_number: u32, position_bits: u32) -> u32 {
    ((message_number & MAX_MESSAGE_NUMBER) << MESSAGE_NUMBER_SHIFT)
        | (position_bits & PACKET_POSITION_MASK)
}

/// Split a message word into message number and packet position bits.
#[inline]
pub fn decode_message_word(word: u32) -> (u32, u32) {
    (word >> MESSAGE_NUMBER_SHIFT, word & PACKET_POSITION_MASK)
}

/// Read the little-endian word at `offset`, or `None` if the slice is too short.
#[inline]
pub fn read_word(bytes: &[u8], offset: usize) -> Option<u32> {
    let src = bytes.get(offset..offset.checked_add(WORD_SIZE)?)?;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(src);
    Some(u32::from_le_bytes(word))
}

/// Write `word` little-endian at `offset`. The caller guarantees the room.
#[inline]
pub fn write_word(bytes: &mut [u8], offset: usize, word: u32) {
    bytes[offset..offset + WORD_SIZE].copy_from_slice(&word.to_le_bytes());
}
