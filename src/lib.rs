//! # udt-protocol
//!
//! Packet framing core for a reliable transport running over UDP.
//!
//! Every datagram is one packet: a short fixed header followed by payload.
//! This crate builds outgoing packets, parses received datagrams into typed
//! packets, and keeps the buffer bookkeeping honest. Reliability policy
//! (acknowledgement, retransmission, congestion control) lives in the layers
//! above.
//!
//! ## Modules
//! - [`core`]: base packet buffer, control and data packets, demultiplexing
//! - [`config`]: wire constants and runtime configuration
//! - [`error`]: error type shared by every operation
//! - [`utils`]: receive buffer pool, metrics and logging setup
//!
//! ## Example
//! ```rust
//! use udt_protocol::core::{ControlPacket, ControlType, ReceivedPacket};
//! use bytes::BytesMut;
//!
//! let mut packet = ControlPacket::create_with_size(ControlType::Ack, 4).unwrap();
//! packet.write_u32(1024).unwrap();
//! let datagram = packet.into_datagram();
//!
//! let sender = "127.0.0.1:9000".parse().unwrap();
//! let size = datagram.len() as i64;
//! match ReceivedPacket::from_datagram(BytesMut::from(&datagram[..]), size, sender).unwrap() {
//!     ReceivedPacket::Control(mut ack) => {
//!         assert_eq!(ack.control_type(), ControlType::Ack);
//!         assert_eq!(ack.read_u32().unwrap(), 1024);
//!     }
//!     ReceivedPacket::Data(_) => unreachable!(),
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use config::NetworkConfig;
pub use error::{ProtocolError, Result};
