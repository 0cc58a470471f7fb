//! The closed set of scene-operation kinds.

use crate::errors::DecodeError;

/// Kind of scene mutation an `Operation` performs.
///
/// Matched exhaustively everywhere a kind-dependent decision is made
/// (codec body shape, conflict rules, transform rules, permission
/// capability) -- a new variant fails to compile at every one of those
/// sites rather than silently falling through a default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    /// Create a new object under a parent.
    CreateObject = 0x00,
    /// Delete an object.
    DeleteObject = 0x01,
    /// Translate an object.
    Move = 0x02,
    /// Rotate an object.
    Rotate = 0x03,
    /// Scale an object.
    Scale = 0x04,
    /// Rename an object.
    Rename = 0x05,
    /// Set an arbitrary property.
    SetProperty = 0x06,
    /// Assign a material.
    AssignMaterial = 0x07,
    /// Reparent an object (or otherwise restructure the hierarchy).
    HierarchyChange = 0x08,
    /// Attach a component.
    AddComponent = 0x09,
    /// Detach a component.
    RemoveComponent = 0x0A,
    /// Edit an attached script.
    EditScript = 0x0B,
    /// Terrain sculpt/paint.
    Terrain = 0x0C,
    /// Light parameter edit.
    Light = 0x0D,
    /// Camera parameter edit.
    Camera = 0x0E,
    /// Animation clip/keyframe edit.
    Animation = 0x0F,
    /// Physics parameter edit.
    Physics = 0x10,
}

impl OpKind {
    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte into an `OpKind`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnknownOpKind` for any byte outside the closed
    /// set above.
    pub const fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x00 => Ok(Self::CreateObject),
            0x01 => Ok(Self::DeleteObject),
            0x02 => Ok(Self::Move),
            0x03 => Ok(Self::Rotate),
            0x04 => Ok(Self::Scale),
            0x05 => Ok(Self::Rename),
            0x06 => Ok(Self::SetProperty),
            0x07 => Ok(Self::AssignMaterial),
            0x08 => Ok(Self::HierarchyChange),
            0x09 => Ok(Self::AddComponent),
            0x0A => Ok(Self::RemoveComponent),
            0x0B => Ok(Self::EditScript),
            0x0C => Ok(Self::Terrain),
            0x0D => Ok(Self::Light),
            0x0E => Ok(Self::Camera),
            0x0F => Ok(Self::Animation),
            0x10 => Ok(Self::Physics),
            other => Err(DecodeError::UnknownOpKind(other)),
        }
    }

    /// Whether this kind carries a fixed-point vector body (Move/Rotate/Scale).
    #[must_use]
    pub const fn is_vector_kind(self) -> bool {
        matches!(self, Self::Move | Self::Rotate | Self::Scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OpKind; 17] = [
        OpKind::CreateObject,
        OpKind::DeleteObject,
        OpKind::Move,
        OpKind::Rotate,
        OpKind::Scale,
        OpKind::Rename,
        OpKind::SetProperty,
        OpKind::AssignMaterial,
        OpKind::HierarchyChange,
        OpKind::AddComponent,
        OpKind::RemoveComponent,
        OpKind::EditScript,
        OpKind::Terrain,
        OpKind::Light,
        OpKind::Camera,
        OpKind::Animation,
        OpKind::Physics,
    ];

    #[test]
    fn round_trips_every_variant() {
        for kind in ALL {
            assert_eq!(OpKind::from_u8(kind.to_u8()), Ok(kind));
        }
    }

    #[test]
    fn rejects_unknown_byte() {
        assert_eq!(OpKind::from_u8(0x7F), Err(DecodeError::UnknownOpKind(0x7F)));
    }
}
