//! Message type tags carried in the frame header.

use crate::errors::DecodeError;

/// The closed set of wire message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgType {
    /// A participant is joining the session.
    UserJoin = 0x01,
    /// A participant has left the session.
    UserLeave = 0x02,
    /// A scene-mutating operation.
    Operation = 0x03,
    /// Full presence record (cursor, selection, camera pose).
    PresenceUpdate = 0x04,
    /// A user's current object selection.
    SelectionUpdate = 0x05,
    /// Chat text.
    ChatMessage = 0x06,
    /// Liveness ping.
    Heartbeat = 0x07,
    /// Late-joiner snapshot request.
    SyncRequest = 0x08,
    /// Session metadata broadcast.
    SessionInfo = 0x09,
    /// Role change for a user.
    PermissionChange = 0x0A,
}

impl MsgType {
    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire byte into a `MsgType`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnknownMsgType` for any byte outside the closed
    /// set above.
    pub const fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x01 => Ok(Self::UserJoin),
            0x02 => Ok(Self::UserLeave),
            0x03 => Ok(Self::Operation),
            0x04 => Ok(Self::PresenceUpdate),
            0x05 => Ok(Self::SelectionUpdate),
            0x06 => Ok(Self::ChatMessage),
            0x07 => Ok(Self::Heartbeat),
            0x08 => Ok(Self::SyncRequest),
            0x09 => Ok(Self::SessionInfo),
            0x0A => Ok(Self::PermissionChange),
            other => Err(DecodeError::UnknownMsgType(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            MsgType::UserJoin,
            MsgType::UserLeave,
            MsgType::Operation,
            MsgType::PresenceUpdate,
            MsgType::SelectionUpdate,
            MsgType::ChatMessage,
            MsgType::Heartbeat,
            MsgType::SyncRequest,
            MsgType::SessionInfo,
            MsgType::PermissionChange,
        ];
        for mt in all {
            assert_eq!(MsgType::from_u8(mt.to_u8()), Ok(mt));
        }
    }

    #[test]
    fn rejects_unknown_byte() {
        assert_eq!(MsgType::from_u8(0xFF), Err(DecodeError::UnknownMsgType(0xFF)));
    }
}
