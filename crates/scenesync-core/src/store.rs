//! The scene-object store interface the causal engine mutates.
//!
//! The actual scene graph, renderer, and save format are external
//! collaborators; this crate only needs apply/revert/query against a
//! closed interface.

use crate::ids::ObjectId;
use crate::operation::Operation;

/// Outcome of applying an operation to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The op's effect was applied.
    Applied,
    /// The store rejected the op (e.g. target object no longer exists).
    /// The caller marks the op `Superseded` and does not advance the
    /// vector clock for it.
    Rejected,
}

/// Interface the causal engine uses to mutate and query scene state.
///
/// Implementations own the actual scene graph; this crate never reaches
/// into it directly, so that the engine is testable against an in-memory
/// double without pulling in rendering or persistence.
pub trait EditorStore {
    /// Apply `op`'s effect. Deterministic: the same op against the same
    /// store state produces the same outcome at every site, which is the
    /// property convergence relies on for apply-failure cases.
    fn apply(&mut self, op: &Operation) -> ApplyOutcome;

    /// Whether `object_id` currently exists in the store.
    fn exists(&self, object_id: ObjectId) -> bool;

    /// The current parent of `object_id`, if it exists and has one.
    fn parent_of(&self, object_id: ObjectId) -> Option<ObjectId>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::{ApplyOutcome, EditorStore};
    use crate::ids::ObjectId;
    use crate::operation::Operation;
    use scenesync_proto::OpKind;

    /// A minimal in-memory store for unit tests: tracks only existence and
    /// parent links, enough to exercise hierarchy cycle checks and
    /// delete/apply-failure paths.
    #[derive(Debug, Default)]
    pub struct FakeStore {
        pub parents: HashMap<ObjectId, ObjectId>,
        pub rejects_next: bool,
    }

    impl EditorStore for FakeStore {
        fn apply(&mut self, op: &Operation) -> ApplyOutcome {
            if self.rejects_next {
                self.rejects_next = false;
                return ApplyOutcome::Rejected;
            }
            match op.kind {
                OpKind::CreateObject => {
                    self.parents.insert(op.object_id, op.object_id);
                },
                OpKind::DeleteObject => {
                    self.parents.remove(&op.object_id);
                },
                OpKind::HierarchyChange => {
                    if let Some(new_parent) = op.hierarchy_new_parent() {
                        self.parents.insert(op.object_id, new_parent);
                    }
                },
                _ => {},
            }
            ApplyOutcome::Applied
        }

        fn exists(&self, object_id: ObjectId) -> bool {
            self.parents.contains_key(&object_id)
        }

        fn parent_of(&self, object_id: ObjectId) -> Option<ObjectId> {
            self.parents.get(&object_id).copied()
        }
    }
}
