//! Error types for the causal engine and session layer.
//!
//! Most failure modes here are not exceptional: a malformed frame, a denied
//! op, or a dropped duplicate are expected traffic and are recorded in
//! [`crate::stats::Stats`] rather than propagated as `Err`. This module
//! covers the smaller set of failures that are genuinely fatal to a
//! session -- a version mismatch on join, or a host transport that never
//! came up -- and need to reach the application as a session-state
//! transition.

use thiserror::Error;

/// Fatal session-lifecycle errors.
///
/// These surface to the application via a session-state callback; on any of
/// these the session transitions to `Disconnected` and refuses further
/// submits until the application issues a new host/join.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The joining peer's protocol version does not match the host's.
    #[error("protocol version mismatch: local {local:#010x}, remote {remote:#010x}")]
    ProtocolVersionMismatch {
        /// This site's protocol version.
        local: u32,
        /// The version the peer advertised.
        remote: u32,
    },

    /// Hosting a session failed to bring up the transport.
    #[error("failed to host session: {0}")]
    HostTransportFailure(String),

    /// Joining a session failed to reach the host.
    #[error("failed to join session: {0}")]
    JoinTransportFailure(String),

    /// An operation was submitted or ingested while disconnected.
    #[error("session is disconnected")]
    Disconnected,

    /// The session is already full (`max_users` reached).
    #[error("session full: {max_users} users already joined")]
    SessionFull {
        /// The session's configured capacity.
        max_users: u32,
    },
}

impl SessionError {
    /// Whether this error leaves the session in a `Disconnected` state
    /// requiring a fresh host/join, as opposed to one that rejects a single
    /// request but leaves an existing session intact.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProtocolVersionMismatch { .. }
                | Self::HostTransportFailure(_)
                | Self::JoinTransportFailure(_)
                | Self::Disconnected
        )
    }
}
