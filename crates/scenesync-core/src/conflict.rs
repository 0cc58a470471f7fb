//! Pairwise conflict detection between two operations.

use scenesync_proto::payloads::op::OpBody;
use scenesync_proto::OpKind;

use crate::operation::Operation;

/// Pure predicate over two operations: would applying both, in either
/// order, produce a different result, and so does one need to be
/// transformed against the other?
///
/// Rules are evaluated in order; the first match decides the outcome.
pub struct ConflictOracle;

impl ConflictOracle {
    /// Whether `a` and `b` conflict.
    #[must_use]
    pub fn conflicts(a: &Operation, b: &Operation) -> bool {
        let a_targets_object = !matches!(a.kind, OpKind::CreateObject);
        let b_targets_object = !matches!(b.kind, OpKind::CreateObject);

        // Rule 1: both target a real object and the ids differ -> no conflict,
        // regardless of kind.
        if a_targets_object && b_targets_object && a.object_id != b.object_id {
            return false;
        }

        // Rule 2: same kind, same object -> conflict.
        if a.kind == b.kind && a_targets_object && b_targets_object && a.object_id == b.object_id {
            return true;
        }

        // Rule 3: either is DeleteObject targeting the shared object -> conflict.
        let shared_object = a_targets_object && b_targets_object && a.object_id == b.object_id;
        if shared_object && (matches!(a.kind, OpKind::DeleteObject) || matches!(b.kind, OpKind::DeleteObject)) {
            return true;
        }

        // Rule 4: two CreateObject with identical name and parent -> conflict.
        if let (
            OpBody::CreateObject { name: a_name, parent_id: a_parent },
            OpBody::CreateObject { name: b_name, parent_id: b_parent },
        ) = (&a.body, &b.body)
        {
            if a_name == b_name && a_parent == b_parent {
                return true;
            }
        }

        // Rule 5: two SetProperty on same object with same property hash -> conflict.
        if let (
            OpBody::SetProperty { property_hash: a_hash, .. },
            OpBody::SetProperty { property_hash: b_hash, .. },
        ) = (&a.body, &b.body)
        {
            if shared_object && a_hash == b_hash {
                return true;
            }
        }

        // Rule 6: two HierarchyChange on the same object conflict; so does a
        // pair that would form a two-node reparent cycle.
        if matches!(a.kind, OpKind::HierarchyChange) && matches!(b.kind, OpKind::HierarchyChange) {
            if shared_object {
                return true;
            }
            if let (Some(a_new_parent), Some(b_new_parent)) = (a.hierarchy_new_parent(), b.hierarchy_new_parent()) {
                if a_new_parent == b.object_id && b_new_parent == a.object_id {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use scenesync_proto::fixed_point::Vec3;

    use super::*;
    use crate::operation::OpStatus;
    use crate::vector_clock::VectorClock;

    fn op(kind: OpKind, object_id: u32, body: OpBody) -> Operation {
        Operation {
            origin: 0,
            sequence: 1,
            context: VectorClock::zero(),
            timestamp_ms: 0,
            kind,
            object_id,
            body,
            status: OpStatus::Pending,
        }
    }

    fn move_op(object_id: u32) -> Operation {
        op(OpKind::Move, object_id, OpBody::Vector { old: Vec3::zero(), new: Vec3::new(1.0, 0.0, 0.0) })
    }

    #[test]
    fn different_objects_never_conflict() {
        assert!(!ConflictOracle::conflicts(&move_op(1), &move_op(2)));
    }

    #[test]
    fn same_kind_same_object_conflicts() {
        assert!(ConflictOracle::conflicts(&move_op(7), &move_op(7)));
    }

    #[test]
    fn delete_against_anything_on_shared_object_conflicts() {
        let delete = op(OpKind::DeleteObject, 7, OpBody::Opaque(bytes::Bytes::new()));
        assert!(ConflictOracle::conflicts(&delete, &move_op(7)));
    }

    #[test]
    fn create_object_collision_by_name_and_parent_conflicts() {
        let a = op(OpKind::CreateObject, 0, OpBody::CreateObject { name: "Cube".to_string(), parent_id: 1 });
        let b = op(OpKind::CreateObject, 0, OpBody::CreateObject { name: "Cube".to_string(), parent_id: 1 });
        assert!(ConflictOracle::conflicts(&a, &b));
    }

    #[test]
    fn create_object_different_parent_does_not_conflict() {
        let a = op(OpKind::CreateObject, 0, OpBody::CreateObject { name: "Cube".to_string(), parent_id: 1 });
        let b = op(OpKind::CreateObject, 0, OpBody::CreateObject { name: "Cube".to_string(), parent_id: 2 });
        assert!(!ConflictOracle::conflicts(&a, &b));
    }

    #[test]
    fn set_property_same_hash_conflicts() {
        let a = op(OpKind::SetProperty, 7, OpBody::SetProperty { property_hash: 42, value: bytes::Bytes::new() });
        let b = op(OpKind::SetProperty, 7, OpBody::SetProperty { property_hash: 42, value: bytes::Bytes::new() });
        assert!(ConflictOracle::conflicts(&a, &b));
    }

    #[test]
    fn set_property_different_hash_does_not_conflict() {
        let a = op(OpKind::SetProperty, 7, OpBody::SetProperty { property_hash: 1, value: bytes::Bytes::new() });
        let b = op(OpKind::SetProperty, 7, OpBody::SetProperty { property_hash: 2, value: bytes::Bytes::new() });
        assert!(!ConflictOracle::conflicts(&a, &b));
    }

    #[test]
    fn hierarchy_change_cycle_conflicts() {
        let a = op(OpKind::HierarchyChange, 1, OpBody::Opaque(bytes::Bytes::copy_from_slice(&2u32.to_le_bytes())));
        let b = op(OpKind::HierarchyChange, 2, OpBody::Opaque(bytes::Bytes::copy_from_slice(&1u32.to_le_bytes())));
        assert!(ConflictOracle::conflicts(&a, &b));
    }

    #[test]
    fn unrelated_kinds_on_same_object_do_not_conflict() {
        let rename = op(OpKind::Rename, 7, OpBody::Opaque(bytes::Bytes::new()));
        let scale = op(OpKind::Scale, 7, OpBody::Vector { old: Vec3::zero(), new: Vec3::zero() });
        assert!(!ConflictOracle::conflicts(&rename, &scale));
    }
}
