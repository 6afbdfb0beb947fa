//! Transport layer for the forwarder.
//!
//! Receives query datagrams from clients and sends back whatever the
//! resolver builds for them. Only UDP is served.

pub mod udp;

/// Largest datagram read or forwarded. There is no EDNS0 buffer-size
/// extension, so this is the classic UDP message limit.
pub const MAX_DNS_PACKET_SIZE: usize = 512;
