//! # Datagram Pool
//!
//! Pool of receive buffers sized for one datagram, so the receive loop does not
//! allocate per packet.
//!
//! A buffer leaves the pool through [`DatagramPool::acquire`], is filled by the
//! socket, travels through the packet parser as the packet's storage and comes
//! back with [`DatagramPool::recycle`] once the packet is consumed.
//!
//! ## Usage
//! ```rust,no_run
//! use udt_protocol::utils::buffer_pool::DatagramPool;
//!
//! let pool = DatagramPool::new(64);
//! let mut buffer = pool.acquire();
//! buffer.resize(pool.buffer_size(), 0);
//! // socket.recv(&mut buffer[..]) ...
//! pool.recycle(buffer);
//! ```

use bytes::BytesMut;
use std::sync::{Arc, Mutex};
use tracing::trace;

use crate::config::{TransportConfig, MAX_PACKET_SIZE};

/// Thread-safe pool of datagram receive buffers
#[derive(Debug, Clone)]
pub struct DatagramPool {
    pool: Arc<Mutex<Vec<BytesMut>>>,
    buffer_size: usize,
    max_pooled: usize,
}

impl DatagramPool {
    /// Create a pool holding `pool_size` buffers of [`MAX_PACKET_SIZE`] bytes
    pub fn new(pool_size: usize) -> Self {
        Self::with_buffer_size(pool_size, MAX_PACKET_SIZE)
    }

    /// Create a pool from the transport settings
    pub fn with_config(config: &TransportConfig) -> Self {
        Self::with_buffer_size(config.recv_pool_size, config.recv_buffer_size)
    }

    fn with_buffer_size(pool_size: usize, buffer_size: usize) -> Self {
        let pool = (0..pool_size)
            .map(|_| BytesMut::with_capacity(buffer_size))
            .collect();

        Self {
            pool: Arc::new(Mutex::new(pool)),
            buffer_size,
            max_pooled: pool_size,
        }
    }

    /// Capacity of every buffer handed out
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Take an empty buffer from the pool, allocating if the pool is drained
    pub fn acquire(&self) -> BytesMut {
        let pooled = self.pool.lock().ok().and_then(|mut pool| pool.pop());
        pooled.unwrap_or_else(|| {
            trace!(buffer_size = self.buffer_size, "Datagram pool drained, allocating");
            BytesMut::with_capacity(self.buffer_size)
        })
    }

    /// Return a buffer to the pool.
    ///
    /// The buffer is cleared. Buffers that lost their capacity (split or frozen
    /// elsewhere) and buffers beyond the pool size are dropped.
    pub fn recycle(&self, mut buffer: BytesMut) {
        buffer.clear();
        if buffer.capacity() < self.buffer_size {
            return;
        }
        if let Ok(mut pool) = self.pool.lock() {
            if pool.len() < self.max_pooled {
                pool.push(buffer);
            }
        }
    }

    /// Get the current number of available buffers in the pool
    pub fn available(&self) -> usize {
        self.pool.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for DatagramPool {
    fn default() -> Self {
        Self::with_config(&TransportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_basic() {
        let pool = DatagramPool::new(4);
        assert_eq!(pool.available(), 4);

        let buffer = pool.acquire();
        assert_eq!(pool.available(), 3);
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= MAX_PACKET_SIZE);

        pool.recycle(buffer);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn test_recycled_buffer_is_cleared() {
        let pool = DatagramPool::new(1);
        let mut buffer = pool.acquire();
        buffer.extend_from_slice(b"stale");
        pool.recycle(buffer);

        let buffer = pool.acquire();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drained_pool_allocates() {
        let pool = DatagramPool::new(1);
        let _first = pool.acquire();
        let second = pool.acquire();
        assert_eq!(pool.available(), 0);
        assert!(second.capacity() >= MAX_PACKET_SIZE);
    }

    #[test]
    fn test_surplus_and_shrunk_buffers_dropped() {
        let pool = DatagramPool::new(1);
        pool.recycle(BytesMut::with_capacity(MAX_PACKET_SIZE));
        assert_eq!(pool.available(), 1);

        let pool = DatagramPool::new(2);
        let _taken = pool.acquire();
        pool.recycle(BytesMut::with_capacity(16));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_with_config() {
        let config = TransportConfig {
            recv_buffer_size: 2048,
            recv_pool_size: 3,
        };
        let pool = DatagramPool::with_config(&config);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.buffer_size(), 2048);
    }

    #[test]
    fn test_clones_share_storage() {
        let pool = DatagramPool::new(2);
        let clone = pool.clone();
        let _buffer = clone.acquire();
        assert_eq!(pool.available(), 1);
    }
}
