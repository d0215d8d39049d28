//! Observability and Metrics
//!
//! Counters for packet construction, parsing and dropped datagrams.
//!
//! Uses atomic counters so any number of send and receive workers can record
//! without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Packet counters shared by every worker in the process
#[derive(Debug)]
pub struct PacketMetrics {
    /// Control packets built for sending
    pub control_created: AtomicU64,
    /// Control packets parsed from datagrams
    pub control_parsed: AtomicU64,
    /// Data packets built for sending
    pub data_created: AtomicU64,
    /// Data packets parsed from datagrams
    pub data_parsed: AtomicU64,
    /// Datagrams handed over for sending
    pub datagrams_framed: AtomicU64,
    /// Bytes handed over for sending
    pub bytes_framed: AtomicU64,
    /// Datagrams offered to the demultiplexer
    pub datagrams_received: AtomicU64,
    /// Bytes offered to the demultiplexer
    pub bytes_received: AtomicU64,
    /// Datagrams that failed to parse
    pub datagrams_dropped: AtomicU64,
    /// Datagrams rejected for malformed headers
    pub protocol_violations: AtomicU64,
    /// Refused cursor operations
    pub buffer_overruns: AtomicU64,
    start_time: Instant,
}

impl PacketMetrics {
    pub fn new() -> Self {
        Self {
            control_created: AtomicU64::new(0),
            control_parsed: AtomicU64::new(0),
            data_created: AtomicU64::new(0),
            data_parsed: AtomicU64::new(0),
            datagrams_framed: AtomicU64::new(0),
            bytes_framed: AtomicU64::new(0),
            datagrams_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            datagrams_dropped: AtomicU64::new(0),
            protocol_violations: AtomicU64::new(0),
            buffer_overruns: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn control_created(&self) {
        self.control_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn control_parsed(&self) {
        self.control_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_created(&self) {
        self.data_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_parsed(&self) {
        self.data_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished packet leaving for the socket layer
    pub fn datagram_framed(&self, byte_count: u64) {
        self.datagrams_framed.fetch_add(1, Ordering::Relaxed);
        self.bytes_framed.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a datagram arriving from the socket layer
    pub fn datagram_received(&self, byte_count: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn datagram_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_overrun(&self) {
        self.buffer_overruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            control_created: self.control_created.load(Ordering::Relaxed),
            control_parsed: self.control_parsed.load(Ordering::Relaxed),
            data_created: self.data_created.load(Ordering::Relaxed),
            data_parsed: self.data_parsed.load(Ordering::Relaxed),
            datagrams_framed: self.datagrams_framed.load(Ordering::Relaxed),
            bytes_framed: self.bytes_framed.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            buffer_overruns: self.buffer_overruns.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            control_created = snapshot.control_created,
            control_parsed = snapshot.control_parsed,
            data_created = snapshot.data_created,
            data_parsed = snapshot.data_parsed,
            datagrams_framed = snapshot.datagrams_framed,
            bytes_framed = snapshot.bytes_framed,
            datagrams_received = snapshot.datagrams_received,
            bytes_received = snapshot.bytes_received,
            datagrams_dropped = snapshot.datagrams_dropped,
            protocol_violations = snapshot.protocol_violations,
            buffer_overruns = snapshot.buffer_overruns,
            uptime_seconds = snapshot.uptime_seconds,
            "Packet metrics snapshot"
        );
    }
}

impl Default for PacketMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub control_created: u64,
    pub control_parsed: u64,
    pub data_created: u64,
    pub data_parsed: u64,
    pub datagrams_framed: u64,
    pub bytes_framed: u64,
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub datagrams_dropped: u64,
    pub protocol_violations: u64,
    pub buffer_overruns: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<PacketMetrics> =
    once_cell::sync::Lazy::new(PacketMetrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static PacketMetrics {
    &METRICS
}
