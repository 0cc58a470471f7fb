//! Rebasing a pending local operation against a concurrent remote one.

use std::collections::HashMap;

use scenesync_proto::payloads::op::OpBody;
use scenesync_proto::OpKind;

use crate::ids::ObjectId;
use crate::operation::Operation;

/// Per-site counters used to pick the next " (k)" suffix for a `CreateObject`
/// name collision, keyed by the colliding `(name, parent_id)` pair.
#[derive(Debug, Default)]
pub struct RenameCounters {
    next: HashMap<(String, ObjectId), u32>,
}

impl RenameCounters {
    /// A fresh counter table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next collision suffix for `(name, parent_id)`.
    pub fn next_suffix(&mut self, name: &str, parent_id: ObjectId) -> u32 {
        let counter = self.next.entry((name.to_string(), parent_id)).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// Produces the rebased form of a `local` op in light of a causally-prior,
/// conflicting `remote` op. Call only when
/// [`crate::conflict::ConflictOracle::conflicts`] says the pair conflicts --
/// non-conflicting pairs need no transform.
pub struct Transformer;

impl Transformer {
    /// Rebase `local` against `remote`. Returns `None` if `local` is
    /// superseded and should be dropped from the pending list without
    /// re-emission; otherwise returns the (possibly rewritten) local op.
    #[must_use]
    pub fn transform(local: &Operation, remote: &Operation, renames: &mut RenameCounters) -> Option<Operation> {
        match (local.kind, remote.kind) {
            (OpKind::Move | OpKind::Rotate | OpKind::Scale, OpKind::Move | OpKind::Rotate | OpKind::Scale)
                if local.kind == remote.kind =>
            {
                Some(Self::compose_vector(local, remote))
            },
            (OpKind::SetProperty, OpKind::SetProperty) => Self::resolve_set_property(local, remote),
            (OpKind::CreateObject, OpKind::CreateObject) => Some(Self::rename_collision(local, renames)),
            (OpKind::DeleteObject, other) if other != OpKind::DeleteObject => Some(local.clone()),
            (other, OpKind::DeleteObject) if other != OpKind::DeleteObject => Some(local.clone()),
            (OpKind::DeleteObject, OpKind::DeleteObject) => Self::earlier_wins(local, remote),
            (OpKind::HierarchyChange, OpKind::HierarchyChange) => Self::earlier_wins(local, remote),
            _ => Self::earlier_wins(local, remote),
        }
    }

    fn compose_vector(local: &Operation, remote: &Operation) -> Operation {
        let OpBody::Vector { old: local_old, new: local_new } = local.body else {
            return local.clone();
        };
        let OpBody::Vector { new: remote_new, .. } = remote.body else {
            return local.clone();
        };
        let delta = local_new.sub(local_old);
        let mut rebased = local.clone();
        rebased.body = OpBody::Vector { old: remote_new, new: remote_new.add(delta) };
        rebased
    }

    fn resolve_set_property(local: &Operation, remote: &Operation) -> Option<Operation> {
        let remote_wins = local.timestamp_ms < remote.timestamp_ms
            || (local.timestamp_ms == remote.timestamp_ms && local.origin > remote.origin);
        (!remote_wins).then(|| local.clone())
    }

    fn rename_collision(local: &Operation, renames: &mut RenameCounters) -> Operation {
        let OpBody::CreateObject { name, parent_id } = &local.body else {
            return local.clone();
        };
        let suffix = renames.next_suffix(name, *parent_id);
        let mut rebased = local.clone();
        rebased.body = OpBody::CreateObject { name: format!("{name} ({suffix})"), parent_id: *parent_id };
        rebased
    }

    fn earlier_wins(local: &Operation, remote: &Operation) -> Option<Operation> {
        let local_wins = local.timestamp_ms < remote.timestamp_ms
            || (local.timestamp_ms == remote.timestamp_ms && local.origin < remote.origin);
        local_wins.then(|| local.clone())
    }
}

#[cfg(test)]
mod tests {
    use scenesync_proto::fixed_point::Vec3;

    use super::*;
    use crate::operation::OpStatus;
    use crate::vector_clock::VectorClock;

    fn move_op(origin: u32, old: Vec3, new: Vec3) -> Operation {
        Operation {
            origin,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind: OpKind::Move,
            object_id: 7,
            body: OpBody::Vector { old, new },
            status: OpStatus::Pending,
        }
    }

    #[test]
    fn move_composition_preserves_relative_delta() {
        let local = move_op(0, Vec3::zero(), Vec3::new(1.0, 0.0, 0.0));
        let remote = move_op(1, Vec3::zero(), Vec3::new(0.0, 2.0, 0.0));
        let mut renames = RenameCounters::new();
        let rebased = Transformer::transform(&local, &remote, &mut renames).expect("vector ops never supersede");
        let OpBody::Vector { old, new } = rebased.body else { panic!("expected vector body") };
        assert_eq!(old, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(new, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn set_property_later_timestamp_wins() {
        let mut local = move_op(0, Vec3::zero(), Vec3::zero());
        local.kind = OpKind::SetProperty;
        local.body = OpBody::SetProperty { property_hash: 1, value: bytes::Bytes::from_static(b"a") };
        local.timestamp_ms = 10;

        let mut remote = local.clone();
        remote.origin = 1;
        remote.body = OpBody::SetProperty { property_hash: 1, value: bytes::Bytes::from_static(b"b") };
        remote.timestamp_ms = 20;

        let mut renames = RenameCounters::new();
        assert_eq!(Transformer::transform(&local, &remote, &mut renames), None);
    }

    #[test]
    fn set_property_earlier_remote_keeps_local_unchanged() {
        let mut local = move_op(0, Vec3::zero(), Vec3::zero());
        local.kind = OpKind::SetProperty;
        local.body = OpBody::SetProperty { property_hash: 1, value: bytes::Bytes::from_static(b"a") };
        local.timestamp_ms = 20;

        let mut remote = local.clone();
        remote.origin = 1;
        remote.timestamp_ms = 10;

        let mut renames = RenameCounters::new();
        let rebased = Transformer::transform(&local, &remote, &mut renames).expect("local should win");
        assert_eq!(rebased, local);
    }

    #[test]
    fn create_object_collision_gets_numbered_suffix() {
        let mut local = move_op(0, Vec3::zero(), Vec3::zero());
        local.kind = OpKind::CreateObject;
        local.object_id = 0;
        local.body = OpBody::CreateObject { name: "Cube".to_string(), parent_id: 1 };

        let remote = local.clone();
        let mut renames = RenameCounters::new();
        let rebased = Transformer::transform(&local, &remote, &mut renames).expect("renames never supersede");
        let OpBody::CreateObject { name, .. } = rebased.body else { panic!("expected CreateObject body") };
        assert_eq!(name, "Cube (1)");
    }

    #[test]
    fn delete_vs_move_passes_local_through_unchanged() {
        let mut delete = move_op(0, Vec3::zero(), Vec3::zero());
        delete.kind = OpKind::DeleteObject;
        delete.body = OpBody::Opaque(bytes::Bytes::new());
        let mover = move_op(1, Vec3::zero(), Vec3::new(1.0, 0.0, 0.0));

        let mut renames = RenameCounters::new();
        let rebased = Transformer::transform(&delete, &mover, &mut renames).expect("delete side passes through");
        assert_eq!(rebased.kind, OpKind::DeleteObject);
    }

    #[test]
    fn delete_vs_delete_earlier_timestamp_wins() {
        let mut earlier = move_op(0, Vec3::zero(), Vec3::zero());
        earlier.kind = OpKind::DeleteObject;
        earlier.body = OpBody::Opaque(bytes::Bytes::new());
        earlier.timestamp_ms = 1;

        let mut later = earlier.clone();
        later.origin = 1;
        later.timestamp_ms = 2;

        let mut renames = RenameCounters::new();
        assert!(Transformer::transform(&earlier, &later, &mut renames).is_some());
        assert_eq!(Transformer::transform(&later, &earlier, &mut renames), None);
    }
}
