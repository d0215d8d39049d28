//! # Core Packet Framing
//!
//! Owned datagram buffers split into a header region and a payload region,
//! plus the two packet families carried over UDP.
//!
//! ## Components
//! - **BasePacket**: buffer, payload cursor and capacity bookkeeping
//! - **ControlPacket**: control flag and subtype header word
//! - **DataPacket**: sequence number, reliability flag and message fields
//! - **Demux**: routes a received datagram to the right parser
//!
//! ## Wire Format
//! ```text
//! control: [ControlWord(4)] [Payload(N)]
//! data:    [SeqWord(4)] [MessageWord(4) PartWord(4)]? [Payload(N)]
//! ```
//!
//! ## Safety
//! - Packet size bounded by [`MAX_PACKET_SIZE`](crate::config::MAX_PACKET_SIZE)
//! - Received size validated against the buffer before any header is read
//! - Payload cursor can never reach the header region

pub mod base_packet;
pub mod control_packet;
pub mod data_packet;
pub mod demux;
pub mod header;

pub use base_packet::{BasePacket, FramedPacket, OpenMode, USE_MAX_SIZE};
pub use control_packet::{ControlPacket, ControlType};
pub use data_packet::{DataPacket, MessageInfo, PacketPosition, SequenceNumber};
pub use demux::{is_control_datagram, ReceivedPacket};
