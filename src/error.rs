//! # Error Types
//!
//! Error handling for the packet framing core.
//!
//! Every failure in this crate is reported to the immediate caller; nothing here
//! retries or recovers from malformed input on its own. The socket-receive loop
//! decides whether to drop a datagram, the packet builder decides whether to
//! abort construction.
//!
//! ## Error Categories
//! - **Caller errors**: null/empty buffers, negative sizes, oversized requests
//! - **Protocol violations**: received bytes that fail header validation
//! - **Cursor errors**: reads or writes beyond the payload region
//! - **Configuration and I/O**: config loading and logging setup
//!
//! ## Example Usage
//! ```rust
//! use udt_protocol::core::control_packet::ControlPacket;
//! use udt_protocol::error::ProtocolError;
//! use bytes::BytesMut;
//!
//! let addr = "127.0.0.1:40102".parse().unwrap();
//! match ControlPacket::from_received(BytesMut::new(), 0, addr) {
//!     Err(ProtocolError::InvalidArgument(_)) => {} // dropped datagram
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Caller errors
    pub const ERR_EMPTY_BUFFER: &str = "Received buffer is empty";
    pub const ERR_SIZE_MISMATCH: &str = "Declared size does not match received buffer length";
    pub const ERR_SEQUENCE_NUMBER_RANGE: &str = "Sequence number exceeds 29 bits";
    pub const ERR_MESSAGE_NUMBER_RANGE: &str = "Message number exceeds 30 bits";

    /// Protocol validation errors
    pub const ERR_MISSING_CONTROL_BIT: &str = "Control bit not set on control packet";
    pub const ERR_UNEXPECTED_CONTROL_BIT: &str = "Control bit set on data packet";
    pub const ERR_TRUNCATED_HEADER: &str = "Datagram shorter than its packet header";
    pub const ERR_SHORT_PAYLOAD: &str = "Received payload shorter than its encoded length";
    pub const ERR_RESERVED_BITS: &str = "Reserved control header bits are set";

    /// Lifecycle errors
    pub const ERR_NOT_WRITABLE: &str = "Packet is not open for writing";
    pub const ERR_NOT_READABLE: &str = "Packet is not open for reading";
    pub const ERR_INVALID_UTF8: &str = "String payload is not valid UTF-8";
}

/// ProtocolError is the primary error type for all packet operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid size: {0}")]
    InvalidSize(i64),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Buffer overrun: {requested} bytes requested, {available} available")]
    BufferOverrun { requested: usize, available: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether the error came from untrusted input rather than a local programming error.
    ///
    /// Inbound errors drop a single datagram; everything else aborts the operation
    /// that produced it.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidArgument(_)
                | ProtocolError::InvalidSize(_)
                | ProtocolError::ProtocolViolation(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
