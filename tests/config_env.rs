//! Environment overrides for `NetworkConfig`
//!
//! Kept in its own test binary with a single test: the process environment is
//! shared by every thread of the harness.

#![allow(clippy::expect_used)]

use std::env;
use tracing::Level;
use udt_protocol::config::{NetworkConfig, MAX_PACKET_SIZE};
use udt_protocol::error::ProtocolError;

const BUFFER_SIZE: &str = "UDT_PROTOCOL_RECV_BUFFER_SIZE";
const POOL_SIZE: &str = "UDT_PROTOCOL_RECV_POOL_SIZE";
const LOG_LEVEL: &str = "UDT_PROTOCOL_LOG_LEVEL";

fn clear() {
    for key in [BUFFER_SIZE, POOL_SIZE, LOG_LEVEL] {
        env::remove_var(key);
    }
}

#[test]
fn test_from_env_overrides() {
    clear();
    let defaults = NetworkConfig::from_env().expect("defaults");
    assert_eq!(defaults.transport.recv_buffer_size, MAX_PACKET_SIZE);
    assert_eq!(defaults.logging.log_level, Level::INFO);

    // Every variable applied
    env::set_var(BUFFER_SIZE, "2048");
    env::set_var(POOL_SIZE, "12");
    env::set_var(LOG_LEVEL, "debug");
    let config = NetworkConfig::from_env().expect("overrides");
    assert_eq!(config.transport.recv_buffer_size, 2048);
    assert_eq!(config.transport.recv_pool_size, 12);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.validate().is_empty());

    // Unparsable sizes keep the defaults
    env::set_var(BUFFER_SIZE, "large");
    env::set_var(POOL_SIZE, "-3");
    env::remove_var(LOG_LEVEL);
    let config = NetworkConfig::from_env().expect("ignored sizes");
    assert_eq!(
        config.transport.recv_buffer_size,
        defaults.transport.recv_buffer_size
    );
    assert_eq!(
        config.transport.recv_pool_size,
        defaults.transport.recv_pool_size
    );

    // A bad level is an error, not a silent default
    env::set_var(LOG_LEVEL, "chatty");
    assert!(matches!(
        NetworkConfig::from_env(),
        Err(ProtocolError::ConfigError(_))
    ));

    clear();
}
