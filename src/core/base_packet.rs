//! # Base Packet
//!
//! A contiguous, exclusively owned byte buffer viewed as a header region
//! followed by a payload region.
//!
//! ```text
//! 0                 payload_start                 payload_start + payload_capacity
//! +-----------------+------------------+------------+
//! | headers         | used payload     | free       |
//! +-----------------+------------------+------------+
//!                   |<- payload_size ->|
//! ```
//!
//! Specializations ([`ControlPacket`](super::control_packet::ControlPacket),
//! [`DataPacket`](super::data_packet::DataPacket)) embed a `BasePacket` and
//! reserve their header bytes at construction time through
//! `adjust_payload_start_and_capacity`. The cursor API only ever reaches the
//! payload region; headers are written through the specialization's typed
//! accessors.
//!
//! The packet is move-only. There is no `Clone`, so a buffer never has two owners.

use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use tracing::{debug, error};

use crate::config::{MAX_PACKET_SIZE, UDP_IPV4_HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// Size argument requesting a packet of [`MAX_PACKET_SIZE`] bytes
pub const USE_MAX_SIZE: i64 = -1;

/// Lifecycle of a packet: `Unopened -> ReadWrite | ReadOnly -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Unopened,
    /// Freshly constructed for sending
    ReadWrite,
    /// Built from a received datagram
    ReadOnly,
    Closed,
}

impl OpenMode {
    pub fn is_readable(self) -> bool {
        matches!(self, OpenMode::ReadWrite | OpenMode::ReadOnly)
    }

    pub fn is_writable(self) -> bool {
        self == OpenMode::ReadWrite
    }
}

/// Behaviour shared by every framed packet type.
///
/// Header sizes accumulate across layers: a specialization reports the base's
/// headers plus its own.
pub trait FramedPacket {
    /// The embedded base packet
    fn base(&self) -> &BasePacket;

    /// Header bytes reserved by this layer alone
    fn local_header_size(&self) -> usize;

    /// Header bytes reserved by this layer and every layer beneath it
    fn total_headers_size(&self) -> usize;

    /// Headers plus used payload, ready for a single datagram send
    fn data(&self) -> &[u8] {
        self.base().data()
    }

    /// Address the datagram came from, `None` for packets built locally
    fn sender(&self) -> Option<SocketAddr> {
        self.base().sender()
    }
}

/// Owned packet buffer with a header region and a payload cursor
#[derive(Debug, Default)]
pub struct BasePacket {
    buffer: BytesMut,
    payload_start: usize,
    payload_capacity: usize,
    payload_size: usize,
    pos: usize,
    mode: OpenMode,
    sender: Option<SocketAddr>,
}

impl BasePacket {
    /// Create an empty packet open for writing.
    ///
    /// `size` is the payload budget in bytes; [`USE_MAX_SIZE`] requests
    /// [`MAX_PACKET_SIZE`]. Other negative sizes fail with
    /// [`ProtocolError::InvalidSize`].
    pub fn create(size: i64) -> Result<Self> {
        let mut packet = Self::allocate(size)?;
        packet.open(OpenMode::ReadWrite)?;
        Ok(packet)
    }

    /// Take ownership of a received datagram without copying it.
    ///
    /// `size` must equal the number of bytes in `buffer`; received buffers are
    /// always fully populated.
    pub fn from_received(buffer: BytesMut, size: i64, sender: SocketAddr) -> Result<Self> {
        let mut packet = Self::wrap_received(buffer, size, sender)?;
        packet.open(OpenMode::ReadOnly)?;
        Ok(packet)
    }

    /// Allocate a zeroed, unopened packet of `size` bytes.
    pub(crate) fn allocate(size: i64) -> Result<Self> {
        let packet_size = match size {
            USE_MAX_SIZE => MAX_PACKET_SIZE,
            _ => usize::try_from(size).map_err(|_| ProtocolError::InvalidSize(size))?,
        };
        if packet_size > MAX_PACKET_SIZE {
            return Err(ProtocolError::OversizedPacket(packet_size));
        }

        Ok(Self {
            buffer: BytesMut::zeroed(packet_size),
            payload_capacity: packet_size,
            ..Self::default()
        })
    }

    /// Wrap a received buffer as an unopened packet whose payload is the whole buffer.
    pub(crate) fn wrap_received(buffer: BytesMut, size: i64, sender: SocketAddr) -> Result<Self> {
        if buffer.is_empty() {
            return Err(ProtocolError::InvalidArgument(
                constants::ERR_EMPTY_BUFFER.to_string(),
            ));
        }
        let size = usize::try_from(size).map_err(|_| ProtocolError::InvalidSize(size))?;
        if size != buffer.len() {
            return Err(ProtocolError::InvalidArgument(format!(
                "{}: declared {size}, buffer holds {}",
                constants::ERR_SIZE_MISMATCH,
                buffer.len()
            )));
        }

        Ok(Self {
            buffer,
            payload_capacity: size,
            payload_size: size,
            sender: Some(sender),
            ..Self::default()
        })
    }

    /// Move the header/payload boundary forward by `header_size` bytes.
    ///
    /// Only constructors call this, once per header layer, before the packet is
    /// opened. With `has_payload` the received payload shrinks by the same amount.
    pub(crate) fn adjust_payload_start_and_capacity(
        &mut self,
        header_size: usize,
        has_payload: bool,
    ) -> Result<()> {
        debug_assert_eq!(self.mode, OpenMode::Unopened);
        debug_assert_eq!(self.pos, 0);

        if header_size > self.payload_capacity {
            return Err(ProtocolError::BufferOverrun {
                requested: header_size,
                available: self.payload_capacity,
            });
        }

        self.payload_start += header_size;
        self.payload_capacity -= header_size;
        if has_payload {
            self.payload_size = self.payload_size.saturating_sub(header_size);
        }
        Ok(())
    }

    pub(crate) fn open(&mut self, mode: OpenMode) -> Result<()> {
        if self.mode != OpenMode::Unopened {
            return Err(ProtocolError::InvalidState(format!(
                "cannot open packet in {mode:?}, already {:?}",
                self.mode
            )));
        }
        self.mode = mode;
        Ok(())
    }

    /// Close the packet. Cursor operations fail afterwards; the bytes stay readable
    /// through [`data`](Self::data).
    pub fn close(&mut self) {
        self.mode = OpenMode::Closed;
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The `len` header bytes immediately preceding the payload region.
    pub(crate) fn header(&self, len: usize) -> &[u8] {
        &self.buffer[self.payload_start - len..self.payload_start]
    }

    pub(crate) fn header_mut(&mut self, len: usize) -> &mut [u8] {
        let start = self.payload_start;
        &mut self.buffer[start - len..start]
    }

    /// Bytes received so far that still lie ahead of the header region.
    ///
    /// Used by specializations to peek at variable-length headers before
    /// reserving them.
    pub(crate) fn unreserved(&self) -> &[u8] {
        &self.buffer[self.payload_start..self.payload_start + self.payload_size]
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    /// Offset of the first payload byte within the buffer
    pub fn payload_start(&self) -> usize {
        self.payload_start
    }

    pub fn sender(&self) -> Option<SocketAddr> {
        self.sender
    }

    /// Cursor position relative to the start of the payload
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn bytes_left_to_read(&self) -> usize {
        self.payload_size.saturating_sub(self.pos)
    }

    pub fn bytes_available_for_write(&self) -> usize {
        self.payload_capacity - self.pos
    }

    /// Headers plus used payload
    pub fn data_size(&self) -> usize {
        self.payload_start + self.payload_size
    }

    /// Size on the wire including IPv4 and UDP headers
    pub fn wire_size(&self) -> usize {
        self.data_size() + UDP_IPV4_HEADER_SIZE
    }

    /// Headers plus used payload, ready for a single datagram send
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.data_size()]
    }

    /// The used part of the payload region
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.payload_start..self.payload_start + self.payload_size]
    }

    /// Finish the packet and hand the framed bytes to the socket layer.
    pub fn into_datagram(self) -> Bytes {
        let len = self.data_size();
        global_metrics().datagram_framed(len as u64);
        let mut buffer = self.buffer;
        buffer.truncate(len);
        buffer.freeze()
    }

    /// Give the underlying storage back, e.g. for recycling into a pool.
    pub fn into_buffer(self) -> BytesMut {
        self.buffer
    }

    /// Move the cursor. Positions past the payload capacity are refused.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        self.ensure_readable()?;
        if pos > self.payload_capacity {
            return Err(ProtocolError::BufferOverrun {
                requested: pos,
                available: self.payload_capacity,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Rewind the cursor to the start of the payload.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Declare how much of the payload is in use.
    pub fn set_payload_size(&mut self, size: usize) -> Result<()> {
        self.ensure_writable()?;
        if size > self.payload_capacity {
            return Err(self.overrun(size, self.payload_capacity));
        }
        self.payload_size = size;
        self.pos = self.pos.min(size);
        Ok(())
    }

    /// Copy `data` into the payload at the cursor.
    ///
    /// Writes that do not fit are refused as a whole; nothing is written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.ensure_writable()?;
        let available = self.bytes_available_for_write();
        if data.len() > available {
            return Err(self.overrun(data.len(), available));
        }

        let start = self.payload_start + self.pos;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        self.pos += data.len();
        self.payload_size = self.payload_size.max(self.pos);
        Ok(data.len())
    }

    /// Copy up to `out.len()` payload bytes from the cursor, returning the count.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let n = self.peek(out)?;
        self.pos += n;
        Ok(n)
    }

    /// Copy up to `out.len()` payload bytes without moving the cursor.
    pub fn peek(&self, out: &mut [u8]) -> Result<usize> {
        self.ensure_readable()?;
        let n = out.len().min(self.bytes_left_to_read());
        let start = self.payload_start + self.pos;
        out[..n].copy_from_slice(&self.buffer[start..start + n]);
        Ok(n)
    }

    /// Fill `out` completely or fail without moving the cursor.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        self.ensure_readable()?;
        let left = self.bytes_left_to_read();
        if out.len() > left {
            return Err(self.short_read(out.len(), left));
        }
        self.read(out).map(|_| ())
    }

    /// Borrow up to `max` payload bytes at the cursor and advance past them.
    pub fn read_without_copy(&mut self, max: usize) -> Result<&[u8]> {
        self.ensure_readable()?;
        let n = max.min(self.bytes_left_to_read());
        let start = self.payload_start + self.pos;
        self.pos += n;
        Ok(&self.buffer[start..start + n])
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_array(value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_array(value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_array(value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_array(value.to_le_bytes())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_array().map(u8::from_le_bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn peek_u32(&self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        if self.peek(&mut bytes)? < bytes.len() {
            return Err(self.short_read(bytes.len(), self.bytes_left_to_read()));
        }
        Ok(u32::from_le_bytes(bytes))
    }

    /// Write a `u32` length prefix followed by the UTF-8 bytes of `value`.
    pub fn write_string(&mut self, value: &str) -> Result<usize> {
        self.ensure_writable()?;
        let len = u32::try_from(value.len())
            .map_err(|_| ProtocolError::OversizedPacket(value.len()))?;
        let needed = 4 + value.len();
        let available = self.bytes_available_for_write();
        if needed > available {
            return Err(self.overrun(needed, available));
        }
        self.write_u32(len)?;
        self.write(value.as_bytes())?;
        Ok(needed)
    }

    /// Read a string written by [`write_string`](Self::write_string).
    ///
    /// The cursor is left untouched on failure. On a received packet a length
    /// prefix running past the payload is a [`ProtocolError::ProtocolViolation`].
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_u32()? as usize;
        let left = self.bytes_left_to_read();
        if len > left {
            self.pos = start;
            return Err(self.short_read(len, left));
        }

        let decoded = std::str::from_utf8(self.read_without_copy(len)?).map(str::to_owned);
        match decoded {
            Ok(s) => Ok(s),
            Err(_) => {
                self.pos = start;
                Err(ProtocolError::ProtocolViolation(
                    constants::ERR_INVALID_UTF8.to_string(),
                ))
            }
        }
    }

    fn write_array<const N: usize>(&mut self, bytes: [u8; N]) -> Result<()> {
        self.write(&bytes).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState(
                constants::ERR_NOT_WRITABLE.to_string(),
            ))
        }
    }

    fn ensure_readable(&self) -> Result<()> {
        if self.mode.is_readable() {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState(
                constants::ERR_NOT_READABLE.to_string(),
            ))
        }
    }

    /// A read running past the used payload.
    ///
    /// Received bytes come from the peer, so there it is malformed input.
    /// On a locally built packet it is cursor misuse.
    fn short_read(&self, requested: usize, available: usize) -> ProtocolError {
        if self.mode != OpenMode::ReadOnly {
            return self.overrun(requested, available);
        }
        debug!(
            requested,
            available,
            pos = self.pos,
            sender = ?self.sender,
            "Received payload shorter than its contents claim"
        );
        ProtocolError::ProtocolViolation(format!(
            "{}: {requested} bytes requested, {available} available",
            constants::ERR_SHORT_PAYLOAD
        ))
    }

    /// Cursor misuse is a bug in the calling layer: report it loudly and refuse.
    fn overrun(&self, requested: usize, available: usize) -> ProtocolError {
        global_metrics().buffer_overrun();
        error!(
            requested,
            available,
            pos = self.pos,
            capacity = self.payload_capacity,
            "Payload cursor overrun refused"
        );
        ProtocolError::BufferOverrun {
            requested,
            available,
        }
    }
}

impl FramedPacket for BasePacket {
    fn base(&self) -> &BasePacket {
        self
    }

    fn local_header_size(&self) -> usize {
        0
    }

    fn total_headers_size(&self) -> usize {
        0
    }
}
