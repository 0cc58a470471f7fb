//! Multi-site simulation: wires a [`Dispatcher`] plus an [`InMemoryStore`]
//! per simulated site to an in-memory router that plays the role a real
//! network would, including optional loss on the unreliable channel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scenesync_core::ids::ParticipantId;
use scenesync_proto::payloads::session::UserJoin;
use scenesync_proto::{Message, PROTOCOL_VERSION};
use scenesync_session::Dispatcher;

use crate::store::InMemoryStore;
use crate::transport::{Outgoing, SiteTransport};

/// One participant's full local state: the dispatch loop, its scene
/// snapshot, and its transport mailbox.
pub struct Site {
    /// The per-site dispatch loop.
    pub dispatcher: Dispatcher,
    /// The site's local scene graph.
    pub store: InMemoryStore,
    /// The site's in-memory transport.
    pub transport: SiteTransport,
}

/// A closed set of sites whose transports are wired together by
/// [`Cluster::step`], with a seeded RNG driving unreliable-channel loss.
///
/// Site 0 always hosts; every other site is created already joined (the
/// simulation drives the same `UserJoin` wire flow a real client would, it
/// just skips the out-of-band step of discovering the host's address).
pub struct Cluster {
    sites: Vec<Site>,
    rng: ChaCha8Rng,
    unreliable_drop_rate: f64,
}

impl Cluster {
    /// Build a cluster of `usernames.len()` sites, host first, everyone
    /// else joining in order, all at `now_ms`.
    #[must_use]
    pub fn bootstrap(seed: u64, usernames: &[&str], now_ms: u64) -> Self {
        let mut cluster = Self { sites: Vec::new(), rng: ChaCha8Rng::seed_from_u64(seed), unreliable_drop_rate: 0.0 };
        for (index, username) in usernames.iter().enumerate() {
            let participant_id = index as ParticipantId;
            let mut dispatcher = Dispatcher::new(participant_id);
            if index == 0 {
                dispatcher.host("session".to_string(), (*username).to_string(), now_ms);
            } else {
                dispatcher.note_joined((*username).to_string(), now_ms);
            }
            cluster.sites.push(Site { dispatcher, store: InMemoryStore::new(), transport: SiteTransport::new() });
        }

        for (index, username) in usernames.iter().enumerate().skip(1) {
            let join = Message::UserJoin(UserJoin { username: (*username).to_string(), protocol_version: PROTOCOL_VERSION });
            let frame = join.into_frame(index as u32, 1, now_ms).expect("join always encodes");
            cluster.sites[0].transport.deliver(index as ParticipantId, frame);
        }
        // One step to let the host process every join and fan the resulting
        // presence/session-info frames back out; a second lets joiners
        // observe each other's presence before any test scenario begins.
        cluster.step(now_ms);
        cluster.step(now_ms);
        cluster
    }

    /// Probability (0.0-1.0) that an unreliable-channel frame is dropped in
    /// transit, applied independently per recipient.
    pub fn set_unreliable_drop_rate(&mut self, rate: f64) {
        self.unreliable_drop_rate = rate.clamp(0.0, 1.0);
    }

    /// Number of sites in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether the cluster has no sites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Borrow site `index`.
    #[must_use]
    pub fn site(&self, index: usize) -> &Site {
        &self.sites[index]
    }

    /// Mutably borrow site `index`, e.g. to call `dispatcher.submit`.
    pub fn site_mut(&mut self, index: usize) -> &mut Site {
        &mut self.sites[index]
    }

    /// Tick every site once, then route everything each site queued this
    /// tick to its destination(s). Mirrors a lockstep network round: every
    /// site sees the same wall-clock `now_ms` for this round.
    pub fn step(&mut self, now_ms: u64) {
        for site in &mut self.sites {
            site.dispatcher.tick(&mut site.transport, &mut site.store, now_ms);
        }

        let mut routed = Vec::new();
        for (sender_index, site) in self.sites.iter_mut().enumerate() {
            let sender_id = site.dispatcher.self_id();
            for outgoing in site.transport.drain_outbox() {
                routed.push((sender_index, sender_id, outgoing));
            }
        }

        for (sender_index, sender_id, outgoing) in routed {
            match outgoing {
                Outgoing::Direct { peer, frame } => self.deliver_to_peer(sender_id, peer, frame),
                Outgoing::DirectUnreliable { peer, frame } => {
                    if self.drop_roll() {
                        tracing::debug!(sender_id, peer, "dropped unreliable direct frame");
                    } else {
                        self.deliver_to_peer(sender_id, peer, frame);
                    }
                },
                Outgoing::Broadcast(frame) => self.deliver_to_others(sender_index, sender_id, &frame),
                Outgoing::BroadcastUnreliable(frame) => {
                    self.deliver_to_others_lossy(sender_index, sender_id, &frame);
                },
            }
        }
    }

    /// Run `rounds` consecutive steps, `delta_ms` apart.
    pub fn run(&mut self, rounds: usize, start_ms: u64, delta_ms: u64) {
        let mut now_ms = start_ms;
        for _ in 0..rounds {
            self.step(now_ms);
            now_ms = now_ms.saturating_add(delta_ms);
        }
    }

    fn drop_roll(&mut self) -> bool {
        self.unreliable_drop_rate > 0.0 && self.rng.gen_bool(self.unreliable_drop_rate)
    }

    fn deliver_to_peer(&mut self, sender_id: ParticipantId, peer: ParticipantId, frame: scenesync_proto::Frame) {
        if let Some(target) = self.sites.iter_mut().find(|site| site.dispatcher.self_id() == peer) {
            target.transport.deliver(sender_id, frame);
        }
    }

    fn deliver_to_others(&mut self, sender_index: usize, sender_id: ParticipantId, frame: &scenesync_proto::Frame) {
        for (index, site) in self.sites.iter_mut().enumerate() {
            if index != sender_index {
                site.transport.deliver(sender_id, frame.clone());
            }
        }
    }

    fn deliver_to_others_lossy(&mut self, sender_index: usize, sender_id: ParticipantId, frame: &scenesync_proto::Frame) {
        let drop_rate = self.unreliable_drop_rate;
        for (index, site) in self.sites.iter_mut().enumerate() {
            if index == sender_index {
                continue;
            }
            if drop_rate > 0.0 && self.rng.gen_bool(drop_rate) {
                tracing::debug!(sender_id, recipient = site.dispatcher.self_id(), "dropped unreliable broadcast frame");
                continue;
            }
            site.transport.deliver(sender_id, frame.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use scenesync_proto::fixed_point::Vec3;
    use scenesync_proto::payloads::op::OpBody;
    use scenesync_proto::OpKind;

    use super::*;

    #[test]
    fn bootstrap_joins_every_site_into_the_host_presence() {
        let cluster = Cluster::bootstrap(1, &["ada", "bea"], 0);
        assert_eq!(cluster.site(0).dispatcher.presence().len(), 2);
        assert_eq!(cluster.site(1).dispatcher.presence().len(), 2);
    }

    #[test]
    fn submitted_move_converges_across_sites() {
        let mut cluster = Cluster::bootstrap(2, &["ada", "bea"], 0);

        let create = OpBody::CreateObject { name: "Cube".to_string(), parent_id: 0 };
        {
            let site = cluster.site_mut(0);
            site.dispatcher.submit(OpKind::CreateObject, 1, create, 0, &mut site.transport, &mut site.store);
        }
        cluster.step(10);

        let mv = OpBody::Vector { old: Vec3::zero(), new: Vec3::new(1.0, 2.0, 0.0) };
        {
            let site = cluster.site_mut(0);
            site.dispatcher.submit(OpKind::Move, 1, mv, 10, &mut site.transport, &mut site.store);
        }
        cluster.step(20);

        assert_eq!(cluster.site(0).store.get(1).expect("exists").position, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(cluster.site(1).store.get(1).expect("exists").position, Vec3::new(1.0, 2.0, 0.0));
    }
}
