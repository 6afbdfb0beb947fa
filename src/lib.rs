//! Fanout - a multi-question DNS forwarder.
//!
//! Decodes query datagrams, forwards each question to an upstream resolver
//! and merges the answers into a single reply. The transports and the codec
//! are exposed for benchmarking and testing.

pub mod dns;
pub mod error;
pub mod forwarder;
pub mod proxy;
pub mod resolver;
pub mod stats;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
