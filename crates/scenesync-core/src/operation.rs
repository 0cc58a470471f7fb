//! The in-memory operation record the causal engine reasons about.
//!
//! This is distinct from [`scenesync_proto::Operation`], which is the wire
//! view (header + body bytes). This one adds the identity and bookkeeping
//! fields -- origin, sequence, context vector, status -- that only make
//! sense once an op is inside a site's causal engine.

use scenesync_proto::payloads::op::OpBody;
use scenesync_proto::OpKind;

use crate::ids::{ObjectId, ParticipantId, Sequence};
use crate::vector_clock::VectorClock;

/// Lifecycle state of an [`Operation`] at this site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    /// Submitted or ingested, not yet known to be delivered everywhere.
    Pending,
    /// Applied to the store and retired from pending tracking.
    Applied,
    /// Eliminated by a transform (lost a conflict) or rejected by the
    /// store; never re-broadcast.
    Superseded,
}

/// A scene mutation, identified by `(origin, sequence)`, carrying the
/// causal context it was submitted under and its current lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Participant that authored this op.
    pub origin: ParticipantId,
    /// This op's sequence number in `origin`'s stream.
    pub sequence: Sequence,
    /// Snapshot of `origin`'s vector clock at submission time.
    pub context: VectorClock,
    /// Wall-clock milliseconds at submission, used only for tie-breaks.
    pub timestamp_ms: u64,
    /// Kind of mutation.
    pub kind: OpKind,
    /// Target object id (parent id, for `CreateObject`).
    pub object_id: ObjectId,
    /// Kind-dependent payload.
    pub body: OpBody,
    /// Current lifecycle state.
    pub status: OpStatus,
}

impl Operation {
    /// The `(origin, sequence)` pair that uniquely identifies this op
    /// within the session.
    #[must_use]
    pub const fn identity(&self) -> (ParticipantId, Sequence) {
        (self.origin, self.sequence)
    }

    /// Whether this op targets a real object (as opposed to `CreateObject`,
    /// where `object_id` names the parent instead).
    #[must_use]
    pub fn targets_object(&self, object_id: ObjectId) -> bool {
        !matches!(self.kind, OpKind::CreateObject) && self.object_id == object_id
    }

    /// For a `HierarchyChange` op, the requested new parent id. `HierarchyChange`
    /// carries this in the first 4 little-endian bytes of its opaque wire
    /// body, since the wire codec treats the kind as a passthrough blob but
    /// the conflict and cycle-safety rules both need to read it.
    #[must_use]
    pub fn hierarchy_new_parent(&self) -> Option<ObjectId> {
        match (&self.kind, &self.body) {
            (OpKind::HierarchyChange, OpBody::Opaque(body)) if body.len() >= 4 => {
                Some(u32::from_le_bytes([body[0], body[1], body[2], body[3]]))
            },
            _ => None,
        }
    }
}
