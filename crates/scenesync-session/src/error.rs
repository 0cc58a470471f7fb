//! Session-layer error types.

use thiserror::Error;

/// Errors a [`crate::transport::Transport`] implementation may report back
/// to the dispatcher. Transient failures are logged and otherwise ignored --
/// the frame will be retried on a later tick or the peer's presence will
/// time out naturally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination peer is not currently reachable.
    #[error("peer {0} unreachable")]
    PeerUnreachable(u32),

    /// The underlying channel is closed.
    #[error("transport closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_the_offending_peer() {
        assert_eq!(TransportError::PeerUnreachable(3).to_string(), "peer 3 unreachable");
    }
}
