//! Vector-clock bookkeeping, sequence assignment, and causal-order delivery.

use std::collections::VecDeque;

use scenesync_proto::payloads::op::OpBody;
use scenesync_proto::OpKind;

use crate::conflict::ConflictOracle;
use crate::ids::{ObjectId, ParticipantId, Sequence};
use crate::operation::{OpStatus, Operation};
use crate::stats::Stats;
use crate::store::{ApplyOutcome, EditorStore};
use crate::transform::{RenameCounters, Transformer};
use crate::vector_clock::VectorClock;

/// Maximum number of not-yet-confirmed-delivered local ops tracked at once.
pub const PENDING_LOCAL_CAPACITY: usize = 256;

/// Maximum number of causally-not-yet-ready inbound ops buffered at once.
pub const RECEIVE_BUFFER_CAPACITY: usize = 256;

/// Result of [`CausalEngine::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Applied immediately (or after unblocking from the receive buffer).
    Applied,
    /// Buffered pending a causal predecessor.
    Buffered,
    /// Already applied; silently dropped.
    Duplicate,
    /// Ready and rebased, but the store rejected it at apply time.
    Rejected,
}

/// Owns this site's view of causal order: its own next sequence, its vector
/// clock, the pending-local list awaiting confirmation, and the
/// receive buffer of causally-blocked inbound ops.
///
/// Permission enforcement ([`crate::permission::PermissionGate`]) is
/// layered on top of this engine by the dispatcher, not inside it: the op
/// flow decodes and checks capability before ever reaching `submit` or
/// `ingest`, so this type only ever sees already-authorized ops.
pub struct CausalEngine {
    self_id: ParticipantId,
    vc_local: VectorClock,
    seq_local: Sequence,
    pending_local: VecDeque<Operation>,
    receive_buffer: VecDeque<Operation>,
    renames: RenameCounters,
    stats: Stats,
}

impl CausalEngine {
    /// A fresh engine for `self_id`, the participant id this site was
    /// assigned at join.
    #[must_use]
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            vc_local: VectorClock::zero(),
            seq_local: 0,
            pending_local: VecDeque::new(),
            receive_buffer: VecDeque::new(),
            renames: RenameCounters::new(),
            stats: Stats::new(),
        }
    }

    /// This site's current vector clock.
    #[must_use]
    pub const fn vector_clock(&self) -> &VectorClock {
        &self.vc_local
    }

    /// Read-only view of the drop/eviction counters.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Mutable access to the drop/eviction counters, for the dispatcher to
    /// record failures it observes before an op ever reaches this engine
    /// (codec rejects, permission denials).
    pub const fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    /// Number of ops awaiting confirmed delivery.
    #[must_use]
    pub fn pending_local_len(&self) -> usize {
        self.pending_local.len()
    }

    /// Number of inbound ops buffered awaiting a causal predecessor.
    #[must_use]
    pub fn receive_buffer_len(&self) -> usize {
        self.receive_buffer.len()
    }

    /// Stamp, optimistically apply, and track a locally-authored op.
    ///
    /// The returned [`Operation`] is ready for the wire codec; the caller
    /// (the dispatcher) is responsible for broadcasting it.
    pub fn submit(
        &mut self,
        kind: OpKind,
        object_id: ObjectId,
        body: OpBody,
        timestamp_ms: u64,
        store: &mut impl EditorStore,
    ) -> Operation {
        self.seq_local += 1;
        let sequence = self.seq_local;
        let op = Operation {
            origin: self.self_id,
            sequence,
            context: self.vc_local.snapshot(),
            timestamp_ms,
            kind,
            object_id,
            body,
            status: OpStatus::Pending,
        };

        store.apply(&op);
        self.push_pending(op.clone());
        self.vc_local.advance(self.self_id, sequence);
        op
    }

    fn push_pending(&mut self, op: Operation) {
        self.pending_local.push_back(op);
        if self.pending_local.len() > PENDING_LOCAL_CAPACITY {
            self.pending_local.pop_front();
            self.stats.pending_evictions += 1;
        }
    }

    /// Ingest an already permission-checked inbound op.
    ///
    /// Returns the op back alongside the outcome, stamped with its final
    /// [`OpStatus`] (`Applied` or `Superseded`) when it reached the store --
    /// the caller (the dispatcher) needs that stamped copy to record an
    /// accurate entry in its own history ring rather than the pre-ingest
    /// `Pending` one.
    pub fn ingest(&mut self, op: Operation, store: &mut impl EditorStore) -> (IngestOutcome, Operation) {
        if op.sequence <= self.vc_local.get(op.origin) {
            self.stats.dedup_drops += 1;
            return (IngestOutcome::Duplicate, op);
        }

        if !self.vc_local.is_ready_for(&op.context) {
            let buffered = op.clone();
            self.receive_buffer.push_back(op);
            if self.receive_buffer.len() > RECEIVE_BUFFER_CAPACITY {
                self.receive_buffer.pop_front();
                self.stats.buffer_evictions += 1;
            }
            return (IngestOutcome::Buffered, buffered);
        }

        let (outcome, op) = self.deliver(op, store);
        self.drain_ready(store);
        (outcome, op)
    }

    fn deliver(&mut self, mut op: Operation, store: &mut impl EditorStore) -> (IngestOutcome, Operation) {
        let outcome = match store.apply(&op) {
            ApplyOutcome::Applied => {
                self.vc_local.advance(op.origin, op.sequence);
                op.status = OpStatus::Applied;
                IngestOutcome::Applied
            },
            ApplyOutcome::Rejected => {
                self.stats.apply_failed += 1;
                op.status = OpStatus::Superseded;
                IngestOutcome::Rejected
            },
        };
        // Rebase after applying remote's raw effect, not before: a
        // composed pending op (e.g. two concurrent moves) must be
        // re-applied on top of remote's value to end up in the store, or
        // the remote's unmodified value would be left standing.
        self.rebase_pending(&op, store);
        (outcome, op)
    }

    /// Rebase every still-pending local op against an incoming `remote` op,
    /// re-applying whichever ones come out of the transform changed so the
    /// store reflects the composed effect rather than just `remote`'s raw
    /// value. Harmless when a rebased op turns out identical to what's
    /// already in the store: re-applying is idempotent for every op kind
    /// the store models.
    fn rebase_pending(&mut self, remote: &Operation, store: &mut impl EditorStore) {
        let previously_pending = std::mem::take(&mut self.pending_local);
        for local in previously_pending {
            if ConflictOracle::conflicts(&local, remote) {
                if let Some(rebased) = Transformer::transform(&local, remote, &mut self.renames) {
                    Self::reapply_rebased(&rebased, store);
                    self.pending_local.push_back(rebased);
                }
            } else {
                self.pending_local.push_back(local);
            }
        }
    }

    /// Fold a rebased pending op's effect back into the store.
    ///
    /// `CreateObject` is special-cased: the object already exists locally
    /// under this id from the original optimistic create, so a collision
    /// rename can't be replayed as a second create (the store would just
    /// reject it as a duplicate id). Re-expressed as a `Rename` against the
    /// already-created object, it lands the way a visible rename should.
    fn reapply_rebased(rebased: &Operation, store: &mut impl EditorStore) {
        if rebased.kind == OpKind::CreateObject {
            if let OpBody::CreateObject { name, .. } = &rebased.body {
                let rename = Operation {
                    kind: OpKind::Rename,
                    body: OpBody::Opaque(bytes::Bytes::copy_from_slice(name.as_bytes())),
                    ..rebased.clone()
                };
                store.apply(&rename);
            }
        } else {
            store.apply(rebased);
        }
    }

    fn drain_ready(&mut self, store: &mut impl EditorStore) {
        loop {
            let Some(index) = self.receive_buffer.iter().position(|op| self.vc_local.is_ready_for(&op.context)) else {
                break;
            };
            let Some(op) = self.receive_buffer.remove(index) else { break };
            let _ = self.deliver(op, store);
        }
    }

    /// Drop pending-local entries older than `operation_timeout_ms`, under
    /// the assumption that the transport has either delivered them
    /// everywhere or they no longer matter. Never retransmitted: resending
    /// here would risk double-applying on a site that already has the op.
    pub fn timeout_sweep(&mut self, now_ms: u64, operation_timeout_ms: u64) {
        self.pending_local.retain(|op| now_ms.saturating_sub(op.timestamp_ms) <= operation_timeout_ms);
    }
}

#[cfg(test)]
mod tests {
    use scenesync_proto::fixed_point::Vec3;

    use super::*;
    use crate::store::test_support::FakeStore;

    fn move_body(old: Vec3, new: Vec3) -> OpBody {
        OpBody::Vector { old, new }
    }

    #[test]
    fn submit_advances_local_vector_clock() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore::default();
        let op = engine.submit(OpKind::Move, 7, move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)), 100, &mut store);
        assert_eq!(op.sequence, 1);
        assert_eq!(engine.vector_clock().get(0), 1);
        assert_eq!(engine.pending_local_len(), 1);
    }

    #[test]
    fn ingest_out_of_order_buffers_then_applies_on_gap_fill() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore::default();

        let mut context_a1 = VectorClock::zero();
        // op (origin=1, seq=2) claims context {1: 1} (its own predecessor).
        context_a1.advance(1, 1);
        let seq2 = Operation {
            origin: 1,
            sequence: 2,
            context: context_a1,
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)),
            status: OpStatus::Pending,
        };
        assert_eq!(engine.ingest(seq2.clone(), &mut store).0, IngestOutcome::Buffered);
        assert_eq!(engine.receive_buffer_len(), 1);

        let seq1 = Operation {
            origin: 1,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: move_body(Vec3::zero(), Vec3::new(0.0, 1.0, 0.0)),
            status: OpStatus::Pending,
        };
        let (outcome, delivered) = engine.ingest(seq1, &mut store);
        assert_eq!(outcome, IngestOutcome::Applied);
        assert_eq!(delivered.status, OpStatus::Applied);
        assert_eq!(engine.vector_clock().get(1), 2);
        assert_eq!(engine.receive_buffer_len(), 0);
    }

    #[test]
    fn duplicate_ingest_is_dropped_and_counted() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore::default();
        let op = Operation {
            origin: 1,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)),
            status: OpStatus::Pending,
        };
        assert_eq!(engine.ingest(op.clone(), &mut store).0, IngestOutcome::Applied);
        assert_eq!(engine.ingest(op, &mut store).0, IngestOutcome::Duplicate);
        assert_eq!(engine.stats().dedup_drops, 1);
    }

    #[test]
    fn apply_rejection_does_not_advance_vector_clock() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore { rejects_next: true, ..FakeStore::default() };
        let op = Operation {
            origin: 1,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)),
            status: OpStatus::Pending,
        };
        let (outcome, rejected) = engine.ingest(op, &mut store);
        assert_eq!(outcome, IngestOutcome::Rejected);
        assert_eq!(rejected.status, OpStatus::Superseded);
        assert_eq!(engine.vector_clock().get(1), 0);
        assert_eq!(engine.stats().apply_failed, 1);
    }

    #[test]
    fn pending_local_evicts_oldest_past_capacity() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore::default();
        for _ in 0..=PENDING_LOCAL_CAPACITY {
            engine.submit(OpKind::Move, 7, move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)), 0, &mut store);
        }
        assert_eq!(engine.pending_local_len(), PENDING_LOCAL_CAPACITY);
        assert_eq!(engine.stats().pending_evictions, 1);
    }

    #[test]
    fn timeout_sweep_drops_stale_pending_ops_without_retransmission() {
        let mut engine = CausalEngine::new(0);
        let mut store = FakeStore::default();
        engine.submit(OpKind::Move, 7, move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)), 0, &mut store);
        engine.timeout_sweep(60_000, 30_000);
        assert_eq!(engine.pending_local_len(), 0);
    }

    #[test]
    fn concurrent_moves_compose_via_rebase_on_receive() {
        let mut site_a = CausalEngine::new(0);
        let mut store_a = FakeStore::default();
        let local = site_a.submit(OpKind::Move, 7, move_body(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)), 0, &mut store_a);

        let remote = Operation {
            origin: 1,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: move_body(Vec3::zero(), Vec3::new(0.0, 2.0, 0.0)),
            status: OpStatus::Pending,
        };
        assert_eq!(site_a.ingest(remote, &mut store_a).0, IngestOutcome::Applied);

        let rebased = site_a.pending_local.front().expect("local move still pending");
        let OpBody::Vector { old, new } = rebased.body else { panic!("expected vector body") };
        assert_eq!(old, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(new, Vec3::new(1.0, 2.0, 0.0));
        let _ = local;
    }
}
