//! The transport boundary the dispatcher pulls frames through.
//!
//! The actual socket implementation is an external collaborator: a
//! production transport might run QUIC, WebRTC data channels, or raw UDP on
//! background I/O threads, but none of that belongs in this crate. All the
//! dispatcher needs is a non-blocking queue of fully-formed frames in each
//! direction, split into a reliable and an unreliable channel so that
//! loss-tolerant traffic (cursor/camera presence) never backs up behind
//! guaranteed delivery (operations, chat, session control).

use scenesync_core::ids::ParticipantId;
use scenesync_proto::Frame;

use crate::error::TransportError;

/// Non-blocking frame transport used by [`crate::dispatcher::Dispatcher`].
///
/// Implementations must never block the calling thread: `try_recv` returns
/// `None` rather than waiting, and the send methods either enqueue
/// immediately or report an error -- there is no retry inside this crate,
/// since resending a delivered-but-unacknowledged op risks double-apply
/// (see [`scenesync_core::causal::CausalEngine::timeout_sweep`]).
pub trait Transport {
    /// Send `frame` to `peer` over the reliable channel (operations, chat,
    /// session control).
    ///
    /// # Errors
    ///
    /// [`TransportError`] if `peer` is not currently reachable.
    fn send_reliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError>;

    /// Send `frame` to `peer` over the unreliable channel (presence/cursor
    /// updates, where loss is acceptable).
    ///
    /// # Errors
    ///
    /// [`TransportError`] if `peer` is not currently reachable.
    fn send_unreliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError>;

    /// Send `frame` to every currently known peer over the reliable channel.
    fn broadcast_reliable(&mut self, frame: Frame);

    /// Send `frame` to every currently known peer over the unreliable
    /// channel.
    fn broadcast_unreliable(&mut self, frame: Frame);

    /// Pull the next inbound frame, if one is queued. Never blocks.
    fn try_recv(&mut self) -> Option<(ParticipantId, Frame)>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;

    use super::{Transport, TransportError};
    use scenesync_core::ids::ParticipantId;
    use scenesync_proto::Frame;

    /// An in-memory transport double: `inbound` is drained by `try_recv`,
    /// everything sent is recorded in `sent` for assertions.
    #[derive(Default)]
    pub struct LoopbackTransport {
        pub inbound: VecDeque<(ParticipantId, Frame)>,
        pub sent: Vec<(Option<ParticipantId>, Frame)>,
        pub unreachable: Vec<ParticipantId>,
    }

    impl Transport for LoopbackTransport {
        fn send_reliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError> {
            if self.unreachable.contains(&peer) {
                return Err(TransportError::PeerUnreachable(peer));
            }
            self.sent.push((Some(peer), frame));
            Ok(())
        }

        fn send_unreliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError> {
            self.send_reliable(peer, frame)
        }

        fn broadcast_reliable(&mut self, frame: Frame) {
            self.sent.push((None, frame));
        }

        fn broadcast_unreliable(&mut self, frame: Frame) {
            self.broadcast_reliable(frame);
        }

        fn try_recv(&mut self) -> Option<(ParticipantId, Frame)> {
            self.inbound.pop_front()
        }
    }
}
