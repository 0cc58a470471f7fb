//! Standard invariant checks.
//!
//! These capture behavioral properties that must hold at every step of a
//! simulation, not the shape of any one scenario.

use scenesync_core::causal::{PENDING_LOCAL_CAPACITY, RECEIVE_BUFFER_CAPACITY};
use scenesync_session::HISTORY_CAPACITY;

use super::{ClusterSnapshot, Invariant, InvariantResult, Violation};

/// `PendingLocal.len <= 256` at every site, at every step.
pub struct BoundedPendingLocal;

impl Invariant for BoundedPendingLocal {
    fn name(&self) -> &'static str {
        "bounded_pending_local"
    }

    fn check(&self, state: &ClusterSnapshot) -> InvariantResult {
        for site in &state.sites {
            if site.pending_local_len > PENDING_LOCAL_CAPACITY {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "site {}: pending_local_len {} exceeds capacity {}",
                        site.participant_id, site.pending_local_len, PENDING_LOCAL_CAPACITY
                    ),
                });
            }
        }
        Ok(())
    }
}

/// `ReceiveBuffer.len <= 256` at every site, at every step.
pub struct BoundedReceiveBuffer;

impl Invariant for BoundedReceiveBuffer {
    fn name(&self) -> &'static str {
        "bounded_receive_buffer"
    }

    fn check(&self, state: &ClusterSnapshot) -> InvariantResult {
        for site in &state.sites {
            if site.receive_buffer_len > RECEIVE_BUFFER_CAPACITY {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "site {}: receive_buffer_len {} exceeds capacity {}",
                        site.participant_id, site.receive_buffer_len, RECEIVE_BUFFER_CAPACITY
                    ),
                });
            }
        }
        Ok(())
    }
}

/// `history.len <= 1024` at every site, at every step.
pub struct BoundedHistory;

impl Invariant for BoundedHistory {
    fn name(&self) -> &'static str {
        "bounded_history"
    }

    fn check(&self, state: &ClusterSnapshot) -> InvariantResult {
        for site in &state.sites {
            if site.history_len > HISTORY_CAPACITY {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "site {}: history_len {} exceeds capacity {}",
                        site.participant_id, site.history_len, HISTORY_CAPACITY
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Any two sites with identical vector clocks (the same causal knowledge)
/// must have bitwise-identical scene stores.
pub struct ConvergenceWhenClocksMatch;

impl Invariant for ConvergenceWhenClocksMatch {
    fn name(&self) -> &'static str {
        "convergence_when_clocks_match"
    }

    fn check(&self, state: &ClusterSnapshot) -> InvariantResult {
        for (i, a) in state.sites.iter().enumerate() {
            for b in &state.sites[i + 1..] {
                if a.vector_clock == b.vector_clock && a.store != b.store {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "sites {} and {} share vector clock {:?} but diverge: {:?} vs {:?}",
                            a.participant_id, b.participant_id, a.vector_clock, a.store, b.store
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
