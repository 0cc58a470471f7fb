//! Cycle-safety check for `HierarchyChange` reparenting.
//!
//! The scene is modeled as `id -> parent_id` rather than owning pointers, so
//! nothing prevents constructing a cycle at the data-structure level; this
//! module is the runtime check that rejects one before apply.

use crate::ids::ObjectId;
use crate::store::EditorStore;

/// Whether reparenting `subtree_root` under `proposed_parent` would create a
/// cycle, by walking `proposed_parent`'s ancestor chain looking for
/// `subtree_root`.
#[must_use]
pub fn would_create_cycle(store: &impl EditorStore, subtree_root: ObjectId, proposed_parent: ObjectId) -> bool {
    if subtree_root == proposed_parent {
        return true;
    }
    let mut current = proposed_parent;
    let mut steps = 0usize;
    // Bounded by object count in practice; this guard exists so a corrupt
    // parent chain (already cyclic through some other bug) can't hang here.
    const MAX_WALK: usize = 4096;
    while let Some(parent) = store.parent_of(current) {
        if parent == subtree_root {
            return true;
        }
        if parent == current || steps >= MAX_WALK {
            return false;
        }
        current = parent;
        steps += 1;
    }
    false
}
