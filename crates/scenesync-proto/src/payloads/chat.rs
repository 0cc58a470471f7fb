//! Chat payload (msg type `0x06`).

use bytes::BufMut;

use crate::errors::DecodeError;

/// Maximum chat username length.
pub const MAX_USERNAME_LEN: usize = 31;

/// Maximum chat message length.
pub const MAX_MESSAGE_LEN: usize = 255;

/// A chat line, either user-authored or a system notice (e.g. "X
/// disconnected (timeout)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Authoring user's id (ignored by readers when `flag_system` is set).
    pub user_id: u32,
    /// Display name at time of sending.
    pub username: String,
    /// Message text.
    pub message: String,
    /// Epoch milliseconds.
    pub timestamp_ms: u64,
    /// True for host-generated system notices.
    pub flag_system: bool,
}

impl ChatMessage {
    /// Encode into `dst`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FieldTooLong`] if `username` exceeds
    /// [`MAX_USERNAME_LEN`] or `message` exceeds [`MAX_MESSAGE_LEN`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), DecodeError> {
        let username_bytes = self.username.as_bytes();
        if username_bytes.len() > MAX_USERNAME_LEN {
            return Err(DecodeError::FieldTooLong {
                field: "ChatMessage.username",
                actual: username_bytes.len(),
                max: MAX_USERNAME_LEN,
            });
        }
        let message_bytes = self.message.as_bytes();
        if message_bytes.len() > MAX_MESSAGE_LEN {
            return Err(DecodeError::FieldTooLong {
                field: "ChatMessage.message",
                actual: message_bytes.len(),
                max: MAX_MESSAGE_LEN,
            });
        }

        dst.put_u32_le(self.user_id);
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u8(username_bytes.len() as u8);
        dst.put_slice(username_bytes);
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u8(message_bytes.len() as u8);
        dst.put_slice(message_bytes);
        dst.put_u64_le(self.timestamp_ms);
        dst.put_u8(u8::from(self.flag_system));
        Ok(())
    }

    /// Decode from `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::PayloadTooShort`] or [`DecodeError::FieldTooLong`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 5 {
            return Err(DecodeError::PayloadTooShort { what: "ChatMessage", expected: 5, actual: bytes.len() });
        }
        let user_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let username_len = bytes[4] as usize;
        if username_len > MAX_USERNAME_LEN {
            return Err(DecodeError::FieldTooLong {
                field: "ChatMessage.username",
                actual: username_len,
                max: MAX_USERNAME_LEN,
            });
        }
        let rest = &bytes[5..];
        if rest.len() < username_len + 1 {
            return Err(DecodeError::PayloadTooShort {
                what: "ChatMessage.username",
                expected: username_len + 1,
                actual: rest.len(),
            });
        }
        let username = String::from_utf8_lossy(&rest[..username_len]).into_owned();
        let rest = &rest[username_len..];

        let message_len = rest[0] as usize;
        if message_len > MAX_MESSAGE_LEN {
            return Err(DecodeError::FieldTooLong {
                field: "ChatMessage.message",
                actual: message_len,
                max: MAX_MESSAGE_LEN,
            });
        }
        let rest = &rest[1..];
        if rest.len() < message_len + 9 {
            return Err(DecodeError::PayloadTooShort {
                what: "ChatMessage.message",
                expected: message_len + 9,
                actual: rest.len(),
            });
        }
        let message = String::from_utf8_lossy(&rest[..message_len]).into_owned();
        let rest = &rest[message_len..];
        let timestamp_ms = u64::from_le_bytes(rest[0..8].try_into().unwrap_or_default());
        let flag_system = rest[8] != 0;

        Ok(Self { user_id, username, message, timestamp_ms, flag_system })
    }
}
