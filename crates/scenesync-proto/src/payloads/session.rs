//! Session lifecycle payloads: join, leave, heartbeat, sync, session info,
//! permission change.

use bytes::BufMut;

use crate::{errors::DecodeError, role::RoleTag};

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 31;

/// Maximum session name length.
pub const MAX_SESSION_NAME_LEN: usize = 63;

fn encode_bounded_string(dst: &mut impl BufMut, field: &'static str, s: &str, max: usize) -> Result<(), DecodeError> {
    let bytes = s.as_bytes();
    if bytes.len() > max {
        return Err(DecodeError::FieldTooLong { field, actual: bytes.len(), max });
    }
    #[allow(clippy::cast_possible_truncation)]
    dst.put_u8(bytes.len() as u8);
    dst.put_slice(bytes);
    Ok(())
}

fn decode_bounded_string<'a>(
    bytes: &'a [u8],
    field: &'static str,
    max: usize,
) -> Result<(String, &'a [u8]), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::PayloadTooShort { what: field, expected: 1, actual: 0 });
    }
    let len = bytes[0] as usize;
    if len > max {
        return Err(DecodeError::FieldTooLong { field, actual: len, max });
    }
    let rest = &bytes[1..];
    if rest.len() < len {
        return Err(DecodeError::PayloadTooShort { what: field, expected: len, actual: rest.len() });
    }
    Ok((String::from_utf8_lossy(&rest[..len]).into_owned(), &rest[len..]))
}

/// A participant joining the session (msg type `0x01`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserJoin {
    /// Requested display name.
    pub username: String,
    /// Caller's protocol version, `major << 16 | minor`.
    pub protocol_version: u32,
}

impl UserJoin {
    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FieldTooLong`] if `username` exceeds
    /// [`MAX_USERNAME_LEN`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        encode_bounded_string(dst, "UserJoin.username", &self.username, MAX_USERNAME_LEN)?;
        dst.put_u32_le(self.protocol_version);
        Ok(())
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] or [`DecodeError::FieldTooLong`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (username, rest) = decode_bounded_string(bytes, "UserJoin.username", MAX_USERNAME_LEN)?;
        if rest.len() < 4 {
            return Err(DecodeError::PayloadTooShort { what: "UserJoin.protocol_version", expected: 4, actual: rest.len() });
        }
        let protocol_version = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
        Ok(Self { username, protocol_version })
    }
}

/// A participant leaving the session (msg type `0x02`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserLeave {
    /// Departing user's id.
    pub user_id: u32,
}

impl UserLeave {
    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.user_id);
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if fewer than 4 bytes remain.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 4 {
            return Err(DecodeError::PayloadTooShort { what: "UserLeave", expected: 4, actual: bytes.len() });
        }
        Ok(Self { user_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) })
    }
}

/// Liveness ping (msg type `0x07`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Sending user's id.
    pub user_id: u32,
}

impl Heartbeat {
    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.user_id);
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if fewer than 4 bytes remain.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 4 {
            return Err(DecodeError::PayloadTooShort { what: "Heartbeat", expected: 4, actual: bytes.len() });
        }
        Ok(Self { user_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) })
    }
}

/// Late-joiner snapshot request (msg type `0x08`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    /// Requesting user's id.
    pub user_id: u32,
}

impl SyncRequest {
    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.user_id);
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if fewer than 4 bytes remain.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 4 {
            return Err(DecodeError::PayloadTooShort { what: "SyncRequest", expected: 4, actual: bytes.len() });
        }
        Ok(Self { user_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) })
    }
}

/// Session metadata broadcast (msg type `0x09`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session display name.
    pub name: String,
    /// Hash of name XOR start time.
    pub session_id: u64,
    /// The hosting user's id.
    pub host_user_id: u32,
    /// Maximum concurrent participants.
    pub max_users: u32,
    /// Session creation time in epoch milliseconds.
    pub created_ms: u64,
}

impl SessionInfo {
    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FieldTooLong`] if `name` exceeds
    /// [`MAX_SESSION_NAME_LEN`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        encode_bounded_string(dst, "SessionInfo.name", &self.name, MAX_SESSION_NAME_LEN)?;
        dst.put_u64_le(self.session_id);
        dst.put_u32_le(self.host_user_id);
        dst.put_u32_le(self.max_users);
        dst.put_u64_le(self.created_ms);
        Ok(())
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] or [`DecodeError::FieldTooLong`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (name, rest) = decode_bounded_string(bytes, "SessionInfo.name", MAX_SESSION_NAME_LEN)?;
        if rest.len() < 20 {
            return Err(DecodeError::PayloadTooShort { what: "SessionInfo", expected: 20, actual: rest.len() });
        }
        let session_id = u64::from_le_bytes(rest[0..8].try_into().unwrap_or_default());
        let host_user_id = u32::from_le_bytes(rest[8..12].try_into().unwrap_or_default());
        let max_users = u32::from_le_bytes(rest[12..16].try_into().unwrap_or_default());
        let created_ms = u64::from_le_bytes(rest[16..24].try_into().unwrap_or_default());
        Ok(Self { name, session_id, host_user_id, max_users, created_ms })
    }
}

/// Role change for a user (msg type `0x0A`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionChange {
    /// Affected user's id.
    pub user_id: u32,
    /// The role being assigned.
    pub new_role: RoleTag,
}

impl PermissionChange {
    /// Encode into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.user_id);
        dst.put_u8(self.new_role.to_u8());
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] if fewer than 5 bytes remain, or
    /// [`DecodeError::FieldTooLong`] if the role byte is unrecognized.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 5 {
            return Err(DecodeError::PayloadTooShort { what: "PermissionChange", expected: 5, actual: bytes.len() });
        }
        let user_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let new_role = RoleTag::from_u8(bytes[4])
            .ok_or(DecodeError::FieldTooLong { field: "PermissionChange.new_role", actual: bytes[4] as usize, max: 2 })?;
        Ok(Self { user_id, new_role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_join_round_trips() {
        let msg = UserJoin { username: "ada".to_string(), protocol_version: 1 << 16 };
        let mut buf = Vec::new();
        msg.encode(&mut buf).expect("should encode");
        assert_eq!(UserJoin::decode(&buf).expect("should decode"), msg);
    }

    #[test]
    fn user_join_rejects_oversized_username() {
        let msg = UserJoin { username: "x".repeat(32), protocol_version: 0 };
        let mut buf = Vec::new();
        assert!(matches!(msg.encode(&mut buf), Err(DecodeError::FieldTooLong { .. })));
    }

    #[test]
    fn session_info_round_trips() {
        let msg = SessionInfo {
            name: "Loft Scene".to_string(),
            session_id: 0x1122_3344_5566_7788,
            host_user_id: 3,
            max_users: 32,
            created_ms: 1_700_000_000_000,
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf).expect("should encode");
        assert_eq!(SessionInfo::decode(&buf).expect("should decode"), msg);
    }

    #[test]
    fn permission_change_round_trips() {
        let msg = PermissionChange { user_id: 5, new_role: RoleTag::Editor };
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        assert_eq!(PermissionChange::decode(&buf).expect("should decode"), msg);
    }
}
