//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on a [`ClusterSnapshot`] rather than live `Site`
//! state, so a check can compare sites against each other without holding
//! borrows into the cluster.

use scenesync_core::ids::{ParticipantId, MAX_USERS};
use scenesync_core::Stats;

use crate::cluster::Cluster;
use crate::store::InMemoryStore;

/// One site's observable state at the moment the snapshot was taken.
#[derive(Debug, Clone)]
pub struct SiteSnapshot {
    /// This site's participant id.
    pub participant_id: ParticipantId,
    /// Dense vector-clock entries.
    pub vector_clock: [u32; MAX_USERS],
    /// The site's scene graph.
    pub store: InMemoryStore,
    /// Ops awaiting confirmed delivery.
    pub pending_local_len: usize,
    /// Ops buffered pending a causal predecessor.
    pub receive_buffer_len: usize,
    /// Ops retained in the late-joiner replay ring.
    pub history_len: usize,
    /// Drop/eviction counters.
    pub stats: Stats,
}

/// A point-in-time view across every site in a [`Cluster`].
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    /// Per-site snapshots, in cluster order.
    pub sites: Vec<SiteSnapshot>,
}

impl ClusterSnapshot {
    /// Capture the current state of every site in `cluster`.
    #[must_use]
    pub fn capture(cluster: &Cluster) -> Self {
        let sites = (0..cluster.len())
            .map(|index| {
                let site = cluster.site(index);
                SiteSnapshot {
                    participant_id: site.dispatcher.self_id(),
                    vector_clock: site.dispatcher.causal().vector_clock().entries(),
                    store: site.store.clone(),
                    pending_local_len: site.dispatcher.causal().pending_local_len(),
                    receive_buffer_len: site.dispatcher.causal().receive_buffer_len(),
                    history_len: site.dispatcher.history().len(),
                    stats: *site.dispatcher.causal().stats(),
                }
            })
            .collect();
        Self { sites }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cluster_snapshot_has_no_sites() {
        let cluster = Cluster::bootstrap(0, &[], 0);
        let snapshot = ClusterSnapshot::capture(&cluster);
        assert!(snapshot.sites.is_empty());
    }
}
