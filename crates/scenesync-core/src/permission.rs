//! Role-to-capability matrix and ingest-time enforcement.

use scenesync_proto::{OpKind, RoleTag};

/// Capability flags a role may hold. `PermissionGate::can_apply` checks one
/// of these against an op's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Create, delete, or modify scene objects, materials, and scripts.
    pub edit_objects: bool,
    /// Manage session users: change roles, kick.
    pub manage_users: bool,
    /// Change session-wide settings.
    pub manage_settings: bool,
}

impl Capabilities {
    const NONE: Self = Self { edit_objects: false, manage_users: false, manage_settings: false };
    const EDITOR: Self = Self { edit_objects: true, manage_users: false, manage_settings: false };
    const ADMIN: Self = Self { edit_objects: true, manage_users: true, manage_settings: true };

    /// Capability set for `role`.
    #[must_use]
    pub const fn for_role(role: RoleTag) -> Self {
        match role {
            RoleTag::Admin => Self::ADMIN,
            RoleTag::Editor => Self::EDITOR,
            RoleTag::Viewer => Self::NONE,
        }
    }
}

/// Evaluates whether a role may apply a given op kind.
///
/// Checked at every ingest point -- both local submit and remote receive --
/// so that a role change takes effect immediately without retroactively
/// invalidating ops already applied before the change.
pub struct PermissionGate;

impl PermissionGate {
    /// Whether `role` may apply an op of `kind`.
    #[must_use]
    pub const fn can_apply(role: RoleTag, kind: OpKind) -> bool {
        Self::required_capability(kind, Capabilities::for_role(role))
    }

    const fn required_capability(kind: OpKind, caps: Capabilities) -> bool {
        match kind {
            OpKind::CreateObject
            | OpKind::DeleteObject
            | OpKind::Move
            | OpKind::Rotate
            | OpKind::Scale
            | OpKind::Rename
            | OpKind::SetProperty
            | OpKind::AssignMaterial
            | OpKind::HierarchyChange
            | OpKind::AddComponent
            | OpKind::RemoveComponent
            | OpKind::EditScript
            | OpKind::Terrain
            | OpKind::Light
            | OpKind::Camera
            | OpKind::Animation
            | OpKind::Physics => caps.edit_objects,
        }
    }
}
