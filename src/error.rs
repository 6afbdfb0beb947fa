//! Error types shared by the codec, the forwarder and the resolver.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("message truncated at offset {offset}")]
    TruncatedMessage { offset: usize },

    #[error("malformed name at offset {offset}")]
    MalformedName { offset: usize },

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl Error {
    /// Whether this error means an inbound datagram cannot be decoded and
    /// must be dropped without a reply.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::TruncatedMessage { .. } | Error::MalformedName { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_malformed_covers_decode_errors_only() {
        assert!(Error::TruncatedMessage { offset: 3 }.is_malformed());
        assert!(Error::MalformedName { offset: 12 }.is_malformed());
        assert!(!Error::UpstreamUnavailable("timeout".to_string()).is_malformed());
        assert!(!Error::InvalidName("empty label".to_string()).is_malformed());
    }
}
