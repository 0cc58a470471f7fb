//! Wire tag for a user's role.

/// Role tag carried in presence and permission-change payloads.
///
/// Capability semantics live in `scenesync_core::permission`; this crate
/// only knows the closed set of wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RoleTag {
    /// Full capability set, including role management.
    Admin = 0,
    /// Can create/delete/modify objects, materials, scripts; not users or
    /// settings.
    Editor = 1,
    /// No mutating capability.
    Viewer = 2,
}

impl RoleTag {
    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte into a `RoleTag`, or `None` if outside `0..=2`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Admin),
            1 => Some(Self::Editor),
            2 => Some(Self::Viewer),
            _ => None,
        }
    }
}
