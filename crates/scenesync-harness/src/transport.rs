//! A [`Transport`] that queues frames in memory instead of touching a real
//! socket, so [`crate::cluster::Cluster`] can route them deterministically
//! between sites on a single thread.

use std::collections::VecDeque;

use scenesync_core::ids::ParticipantId;
use scenesync_proto::Frame;
use scenesync_session::{Transport, TransportError};

/// One outbound frame queued by a site this tick, not yet routed by the
/// cluster.
#[derive(Debug, Clone)]
pub enum Outgoing {
    /// Addressed to one peer over the reliable channel.
    Direct {
        /// Destination participant.
        peer: ParticipantId,
        /// The frame.
        frame: Frame,
    },
    /// Addressed to one peer over the unreliable channel (may be dropped by
    /// the cluster's loss simulation).
    DirectUnreliable {
        /// Destination participant.
        peer: ParticipantId,
        /// The frame.
        frame: Frame,
    },
    /// Addressed to every other site over the reliable channel.
    Broadcast(Frame),
    /// Addressed to every other site over the unreliable channel (subject
    /// to loss simulation).
    BroadcastUnreliable(Frame),
}

/// In-memory transport for one simulated site.
///
/// `unreachable` lets a test mark specific peers as unreachable, the way a
/// production transport would after a dropped connection; [`Cluster::step`]
/// otherwise routes every queued frame between all sites.
#[derive(Debug, Default)]
pub struct SiteTransport {
    outbox: VecDeque<Outgoing>,
    inbound: VecDeque<(ParticipantId, Frame)>,
    unreachable: Vec<ParticipantId>,
}

impl SiteTransport {
    /// A transport with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `peer` unreachable: subsequent `send_reliable`/`send_unreliable`
    /// calls targeting it fail instead of queuing.
    pub fn mark_unreachable(&mut self, peer: ParticipantId) {
        self.unreachable.push(peer);
    }

    /// Clear a previously marked-unreachable peer.
    pub fn mark_reachable(&mut self, peer: ParticipantId) {
        self.unreachable.retain(|&p| p != peer);
    }

    /// Drain this tick's queued outbound frames for the cluster to route.
    pub(crate) fn drain_outbox(&mut self) -> Vec<Outgoing> {
        self.outbox.drain(..).collect()
    }

    /// Deliver a routed frame into this site's inbound queue, as if it had
    /// just arrived over the wire from `sender`.
    pub fn deliver(&mut self, sender: ParticipantId, frame: Frame) {
        self.inbound.push_back((sender, frame));
    }
}

impl Transport for SiteTransport {
    fn send_reliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError> {
        if self.unreachable.contains(&peer) {
            return Err(TransportError::PeerUnreachable(peer));
        }
        self.outbox.push_back(Outgoing::Direct { peer, frame });
        Ok(())
    }

    fn send_unreliable(&mut self, peer: ParticipantId, frame: Frame) -> Result<(), TransportError> {
        if self.unreachable.contains(&peer) {
            return Err(TransportError::PeerUnreachable(peer));
        }
        self.outbox.push_back(Outgoing::DirectUnreliable { peer, frame });
        Ok(())
    }

    fn broadcast_reliable(&mut self, frame: Frame) {
        self.outbox.push_back(Outgoing::Broadcast(frame));
    }

    fn broadcast_unreliable(&mut self, frame: Frame) {
        self.outbox.push_back(Outgoing::BroadcastUnreliable(frame));
    }

    fn try_recv(&mut self) -> Option<(ParticipantId, Frame)> {
        self.inbound.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use scenesync_proto::{payloads::session::Heartbeat, Message};

    use super::*;

    #[test]
    fn send_to_unreachable_peer_fails() {
        let mut transport = SiteTransport::new();
        transport.mark_unreachable(3);
        let frame = Message::Heartbeat(Heartbeat { user_id: 1 }).into_frame(1, 1, 0).expect("encodes");
        assert!(transport.send_reliable(3, frame).is_err());
    }

    #[test]
    fn broadcast_queues_for_draining() {
        let mut transport = SiteTransport::new();
        let frame = Message::Heartbeat(Heartbeat { user_id: 1 }).into_frame(1, 1, 0).expect("encodes");
        transport.broadcast_reliable(frame);
        assert_eq!(transport.drain_outbox().len(), 1);
    }

    #[test]
    fn delivered_frame_is_recv_able() {
        let mut transport = SiteTransport::new();
        let frame = Message::Heartbeat(Heartbeat { user_id: 1 }).into_frame(1, 1, 0).expect("encodes");
        transport.deliver(1, frame);
        assert!(transport.try_recv().is_some());
    }
}
