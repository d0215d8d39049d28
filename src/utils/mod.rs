//! # Utility Modules
//!
//! Supporting pieces around the packet core.
//!
//! ## Components
//! - **Buffer Pool**: reusable receive buffers sized for one datagram
//! - **Logging**: structured logging setup from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: thread-safe packet counters

pub mod buffer_pool;
pub mod logging;
pub mod metrics;

pub use buffer_pool::DatagramPool;
pub use metrics::{global_metrics, PacketMetrics};
