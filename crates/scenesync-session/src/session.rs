//! Session lifecycle: hosting, joining, and assembling the snapshot burst a
//! late joiner needs before it can ingest live traffic.
//!
//! A session is a single flat group with no sub-rooms: whoever hosts creates
//! the session record and is granted [`RoleTag::Admin`]; everyone else joins
//! it directly. There is no lazy creation -- a session exists once `host`
//! has run, never implicitly.

use scenesync_core::{ids::ParticipantId, Operation, SessionError};
use scenesync_proto::{payloads::session::SessionInfo, RoleTag, PROTOCOL_VERSION};

use crate::{history::History, presence::PresenceTracker};

/// Maximum concurrent participants a hosted session accepts.
pub const MAX_SESSION_USERS: u32 = scenesync_core::ids::MAX_USERS as u32;

/// The hosted session's identifying record, broadcast as
/// [`scenesync_proto::payloads::session::SessionInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Session display name.
    pub name: String,
    /// Hash of `name` XOR the host's start time, used as a stable id.
    pub session_id: u64,
    /// Participant id of the hosting user.
    pub host_user_id: ParticipantId,
    /// Maximum concurrent participants.
    pub max_users: u32,
    /// Session creation time in epoch milliseconds.
    pub created_ms: u64,
}

impl SessionRecord {
    /// Derive the session id from its name and creation time: a simple FNV
    /// hash of the name, XORed with the start time, so two sessions with the
    /// same name at different times don't collide.
    #[must_use]
    pub fn new(name: String, host_user_id: ParticipantId, created_ms: u64) -> Self {
        let session_id = fnv1a(name.as_bytes()) ^ created_ms;
        Self { name, session_id, host_user_id, max_users: MAX_SESSION_USERS, created_ms }
    }

    /// The wire view of this record.
    #[must_use]
    pub fn to_wire(&self) -> SessionInfo {
        SessionInfo {
            name: self.name.clone(),
            session_id: self.session_id,
            host_user_id: self.host_user_id,
            max_users: self.max_users,
            created_ms: self.created_ms,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

/// Everything a newly joined peer needs to catch up before it may start
/// ingesting live traffic: the session record, every currently live user's
/// presence row, and the most recent history operations.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Session record at the time of the snapshot.
    pub session: SessionRecord,
    /// `(participant_id, username, role)` for every currently live user.
    pub users: Vec<(ParticipantId, String, RoleTag)>,
    /// Recent operations, oldest first, bounded by
    /// [`crate::history::SNAPSHOT_BURST_LIMIT`].
    pub operations: Vec<Operation>,
}

/// Owns the session record and coordinates hosting/joining lifecycle.
///
/// Routing of the resulting frames and ingestion of live traffic is the
/// [`crate::dispatcher::Dispatcher`]'s job; this type only tracks session
/// identity and assembles the snapshot, since it has no transport access.
pub struct SessionController {
    record: Option<SessionRecord>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    /// No session hosted or joined yet.
    #[must_use]
    pub fn new() -> Self {
        Self { record: None }
    }

    /// Create and host a new session, granting the host [`RoleTag::Admin`].
    ///
    /// Returns the assigned host participant id so the caller can register
    /// it with [`PresenceTracker::join`].
    pub fn host(
        &mut self,
        name: String,
        host_username: String,
        now_ms: u64,
        presence: &mut PresenceTracker,
    ) -> ParticipantId {
        const HOST_PARTICIPANT_ID: ParticipantId = 0;
        let record = SessionRecord::new(name, HOST_PARTICIPANT_ID, now_ms);
        presence.join(HOST_PARTICIPANT_ID, host_username, RoleTag::Admin, now_ms);
        self.record = Some(record);
        HOST_PARTICIPANT_ID
    }

    /// Validate and accept an incoming [`scenesync_proto::payloads::session::UserJoin`],
    /// registering the new participant at [`RoleTag::Editor`].
    ///
    /// # Errors
    ///
    /// [`SessionError::ProtocolVersionMismatch`] if the remote's protocol
    /// version does not match [`PROTOCOL_VERSION`]; [`SessionError::SessionFull`]
    /// if the session has no free participant slot.
    pub fn accept_join(
        &self,
        participant_id: ParticipantId,
        username: String,
        protocol_version: u32,
        now_ms: u64,
        presence: &mut PresenceTracker,
    ) -> Result<(), SessionError> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(SessionError::ProtocolVersionMismatch { local: PROTOCOL_VERSION, remote: protocol_version });
        }
        if presence.len() as u32 >= MAX_SESSION_USERS {
            return Err(SessionError::SessionFull { max_users: MAX_SESSION_USERS });
        }
        presence.join(participant_id, username, RoleTag::Editor, now_ms);
        Ok(())
    }

    /// The current session record, if one has been hosted.
    #[must_use]
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// Assemble the catch-up snapshot for a newly accepted joiner.
    #[must_use]
    pub fn snapshot(&self, presence: &PresenceTracker, history: &History) -> Option<Snapshot> {
        let session = self.record.clone()?;
        let users = presence.iter().map(|u| (u.participant_id, u.username.clone(), u.role)).collect();
        let operations = history.recent_for_snapshot().cloned().collect();
        Some(Snapshot { session, users, operations })
    }
}
