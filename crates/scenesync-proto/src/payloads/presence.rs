//! Presence payloads: full user record broadcast and per-user selection.

use bytes::BufMut;

use crate::{errors::DecodeError, role::RoleTag};

/// Maximum number of objects a single selection can name.
pub const MAX_SELECTION: usize = 32;

fn put_f32(dst: &mut impl BufMut, v: f32) {
    dst.put_slice(&v.to_le_bytes());
}

fn take_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Full user record, broadcast whenever presence changes (msg type `0x04`).
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceUpdate {
    /// Participant id.
    pub user_id: u32,
    /// Current role.
    pub role: RoleTag,
    /// Whether the user is currently considered live.
    pub active: bool,
    /// Epoch milliseconds of the last heartbeat or op from this user.
    pub last_seen_ms: u64,
    /// World-space cursor position.
    pub cursor: [f32; 3],
    /// Camera eye position.
    pub camera_pos: [f32; 3],
    /// Camera orientation, Euler angles in radians.
    pub camera_rot: [f32; 3],
    /// Currently selected object ids, bounded by [`MAX_SELECTION`].
    pub selected_object_ids: Vec<u32>,
}

impl PresenceUpdate {
    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FieldTooLong`] if `selected_object_ids` exceeds
    /// [`MAX_SELECTION`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        if self.selected_object_ids.len() > MAX_SELECTION {
            return Err(DecodeError::FieldTooLong {
                field: "PresenceUpdate.selected_object_ids",
                actual: self.selected_object_ids.len(),
                max: MAX_SELECTION,
            });
        }
        dst.put_u32_le(self.user_id);
        dst.put_u8(self.role.to_u8());
        dst.put_u8(u8::from(self.active));
        dst.put_u64_le(self.last_seen_ms);
        for v in self.cursor {
            put_f32(dst, v);
        }
        for v in self.camera_pos {
            put_f32(dst, v);
        }
        for v in self.camera_rot {
            put_f32(dst, v);
        }
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u8(self.selected_object_ids.len() as u8);
        for id in &self.selected_object_ids {
            dst.put_u32_le(*id);
        }
        Ok(())
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if the fixed or variable portion
    /// doesn't fit, [`DecodeError::FieldTooLong`] if the role byte or
    /// selection count is out of range.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        const FIXED_LEN: usize = 4 + 1 + 1 + 8 + 4 * 9 + 1;
        if bytes.len() < FIXED_LEN {
            return Err(DecodeError::PayloadTooShort {
                what: "PresenceUpdate",
                expected: FIXED_LEN,
                actual: bytes.len(),
            });
        }
        let user_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let role = RoleTag::from_u8(bytes[4])
            .ok_or(DecodeError::FieldTooLong { field: "PresenceUpdate.role", actual: bytes[4] as usize, max: 2 })?;
        let active = bytes[5] != 0;
        let last_seen_ms = u64::from_le_bytes(bytes[6..14].try_into().unwrap_or_default());

        let mut floats = [0f32; 9];
        for (i, slot) in floats.iter_mut().enumerate() {
            let off = 14 + i * 4;
            *slot = take_f32(&bytes[off..off + 4]);
        }
        let cursor = [floats[0], floats[1], floats[2]];
        let camera_pos = [floats[3], floats[4], floats[5]];
        let camera_rot = [floats[6], floats[7], floats[8]];

        let count_offset = 14 + 9 * 4;
        let count = bytes[count_offset] as usize;
        if count > MAX_SELECTION {
            return Err(DecodeError::FieldTooLong {
                field: "PresenceUpdate.selected_object_ids",
                actual: count,
                max: MAX_SELECTION,
            });
        }
        let ids_offset = count_offset + 1;
        let needed = ids_offset + count * 4;
        if bytes.len() < needed {
            return Err(DecodeError::PayloadTooShort {
                what: "PresenceUpdate.selected_object_ids",
                expected: needed,
                actual: bytes.len(),
            });
        }
        let mut selected_object_ids = Vec::with_capacity(count);
        for i in 0..count {
            let off = ids_offset + i * 4;
            selected_object_ids.push(u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap_or_default()));
        }

        Ok(Self { user_id, role, active, last_seen_ms, cursor, camera_pos, camera_rot, selected_object_ids })
    }
}

/// A user's current object selection (msg type `0x05`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionUpdate {
    /// Selecting user's id.
    pub user_id: u32,
    /// Selected object ids, bounded by [`MAX_SELECTION`].
    pub object_ids: Vec<u32>,
}

impl SelectionUpdate {
    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FieldTooLong`] if `object_ids` exceeds
    /// [`MAX_SELECTION`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        if self.object_ids.len() > MAX_SELECTION {
            return Err(DecodeError::FieldTooLong {
                field: "SelectionUpdate.object_ids",
                actual: self.object_ids.len(),
                max: MAX_SELECTION,
            });
        }
        dst.put_u32_le(self.user_id);
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32_le(self.object_ids.len() as u32);
        for id in &self.object_ids {
            dst.put_u32_le(*id);
        }
        Ok(())
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] or [`DecodeError::FieldTooLong`] if
    /// `count` exceeds [`MAX_SELECTION`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 8 {
            return Err(DecodeError::PayloadTooShort { what: "SelectionUpdate", expected: 8, actual: bytes.len() });
        }
        let user_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if count > MAX_SELECTION {
            return Err(DecodeError::FieldTooLong { field: "SelectionUpdate.object_ids", actual: count, max: MAX_SELECTION });
        }
        let rest = &bytes[8..];
        let needed = count * 4;
        if rest.len() < needed {
            return Err(DecodeError::PayloadTooShort { what: "SelectionUpdate.object_ids", expected: needed, actual: rest.len() });
        }
        let mut object_ids = Vec::with_capacity(count);
        for i in 0..count {
            let off = i * 4;
            object_ids.push(u32::from_le_bytes(rest[off..off + 4].try_into().unwrap_or_default()));
        }
        Ok(Self { user_id, object_ids })
    }
}
