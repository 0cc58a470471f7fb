//! Live-user table: presence state, liveness timeout, and per-user
//! cursor/selection tracking.

use std::collections::VecDeque;

use scenesync_core::ids::{ParticipantId, MAX_USERS};
use scenesync_proto::payloads::chat::ChatMessage;
use scenesync_proto::RoleTag;

/// Milliseconds of silence after which a user is considered no longer live.
pub const PRESENCE_TIMEOUT_MS: u64 = 30_000;

/// Maximum cursor-trail points retained per user.
pub const CURSOR_TRAIL_CAPACITY: usize = 64;

/// Maximum chat lines retained by [`ChatLog`].
pub const CHAT_CAPACITY: usize = 256;

/// A connected participant's session-visible state.
#[derive(Debug, Clone)]
pub struct User {
    /// Stable id for the session.
    pub participant_id: ParticipantId,
    /// Display name at join time.
    pub username: String,
    /// Current role.
    pub role: RoleTag,
    /// Wall-clock ms of the last heartbeat or traffic from this user.
    pub last_seen_ms: u64,
    /// The most recent frame sequence number seen from this user, kept for
    /// diagnostics only -- causal ordering runs entirely off the vector
    /// clock, this never gates delivery.
    pub last_seen_sequence: u32,
    /// Recently selected object ids.
    pub selected_object_ids: Vec<u32>,
    /// Current cursor position in world units.
    pub cursor: [f32; 3],
    /// Current camera position in world units.
    pub camera_pos: [f32; 3],
    /// Current camera orientation (euler angles, radians).
    pub camera_rot: [f32; 3],
    /// Ring buffer of recent cursor positions for trail rendering.
    pub cursor_trail: VecDeque<[f32; 3]>,
}

impl User {
    fn new(participant_id: ParticipantId, username: String, role: RoleTag, now_ms: u64) -> Self {
        Self {
            participant_id,
            username,
            role,
            last_seen_ms: now_ms,
            last_seen_sequence: 0,
            selected_object_ids: Vec::new(),
            cursor: [0.0; 3],
            camera_pos: [0.0; 3],
            camera_rot: [0.0; 3],
            cursor_trail: VecDeque::new(),
        }
    }

    fn push_cursor(&mut self, position: [f32; 3]) {
        self.cursor = position;
        self.cursor_trail.push_back(position);
        if self.cursor_trail.len() > CURSOR_TRAIL_CAPACITY {
            self.cursor_trail.pop_front();
        }
    }
}

/// Dense, id-indexed table of connected users.
///
/// Joining emits an implicit `UserJoin` the dispatcher is expected to
/// broadcast; leaving (explicit or by timeout) emits `UserLeave`. This type
/// only tracks state -- broadcasting the corresponding wire messages is the
/// dispatcher's job, since it has no transport access.
pub struct PresenceTracker {
    users: [Option<User>; MAX_USERS],
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self { users: std::array::from_fn(|_| None) }
    }

    /// Register a newly joined participant.
    pub fn join(&mut self, participant_id: ParticipantId, username: String, role: RoleTag, now_ms: u64) {
        if let Some(slot) = self.users.get_mut(participant_id as usize) {
            *slot = Some(User::new(participant_id, username, role, now_ms));
        }
    }

    /// Remove a participant, explicitly or due to timeout.
    pub fn leave(&mut self, participant_id: ParticipantId) -> Option<User> {
        self.users.get_mut(participant_id as usize).and_then(Option::take)
    }

    /// Look up a user by id.
    #[must_use]
    pub fn get(&self, participant_id: ParticipantId) -> Option<&User> {
        self.users.get(participant_id as usize).and_then(Option::as_ref)
    }

    /// Whether `participant_id` currently holds a live slot.
    #[must_use]
    pub fn contains(&self, participant_id: ParticipantId) -> bool {
        self.get(participant_id).is_some()
    }

    /// The current role for `participant_id`, if they are present.
    #[must_use]
    pub fn role_of(&self, participant_id: ParticipantId) -> Option<RoleTag> {
        self.get(participant_id).map(|u| u.role)
    }

    /// Apply a role change. No-op if the user is not present.
    pub fn set_role(&mut self, participant_id: ParticipantId, role: RoleTag) {
        if let Some(Some(user)) = self.users.get_mut(participant_id as usize) {
            user.role = role;
        }
    }

    /// Refresh liveness for a heartbeat or any other traffic from
    /// `participant_id`.
    pub fn record_heartbeat(&mut self, participant_id: ParticipantId, now_ms: u64) {
        if let Some(Some(user)) = self.users.get_mut(participant_id as usize) {
            user.last_seen_ms = now_ms;
        }
    }

    /// Record the frame sequence number most recently seen from
    /// `participant_id`, for diagnostics. No-op if the user is not present.
    pub fn record_sequence(&mut self, participant_id: ParticipantId, sequence: u32) {
        if let Some(Some(user)) = self.users.get_mut(participant_id as usize) {
            user.last_seen_sequence = sequence;
        }
    }

    /// Update presence pose fields for `participant_id`.
    pub fn update_pose(
        &mut self,
        participant_id: ParticipantId,
        cursor: [f32; 3],
        camera_pos: [f32; 3],
        camera_rot: [f32; 3],
    ) {
        if let Some(Some(user)) = self.users.get_mut(participant_id as usize) {
            user.push_cursor(cursor);
            user.camera_pos = camera_pos;
            user.camera_rot = camera_rot;
        }
    }

    /// Replace the selection set for `participant_id`.
    pub fn update_selection(&mut self, participant_id: ParticipantId, object_ids: Vec<u32>) {
        if let Some(Some(user)) = self.users.get_mut(participant_id as usize) {
            user.selected_object_ids = object_ids;
        }
    }

    /// Iterate over all currently present users.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter_map(Option::as_ref)
    }

    /// Number of currently present users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no user is currently present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every user whose `now - last_seen_ms` exceeds
    /// [`PRESENCE_TIMEOUT_MS`], returning the evicted participant ids so the
    /// caller can broadcast `UserLeave` and a chat notice for each.
    pub fn sweep_timeouts(&mut self, now_ms: u64) -> Vec<ParticipantId> {
        let mut evicted = Vec::new();
        for slot in &mut self.users {
            let Some(user) = slot else { continue };
            if now_ms.saturating_sub(user.last_seen_ms) > PRESENCE_TIMEOUT_MS {
                evicted.push(user.participant_id);
                *slot = None;
            }
        }
        evicted
    }
}

/// Bounded ring of recent chat lines, user-authored or system notices.
///
/// A companion to [`PresenceTracker`] rather than a field on it: chat shares
/// presence's reliable-channel liveness semantics (any connected user may
/// post; a departed user's lines stay) but has nothing to do with the
/// per-user table itself.
#[derive(Debug, Default)]
pub struct ChatLog {
    lines: VecDeque<ChatMessage>,
}

impl ChatLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self { lines: VecDeque::new() }
    }

    /// Record a chat line, evicting the oldest past [`CHAT_CAPACITY`].
    pub fn record(&mut self, message: ChatMessage) {
        self.lines.push_back(message);
        if self.lines.len() > CHAT_CAPACITY {
            self.lines.pop_front();
        }
    }

    /// Number of lines currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the log holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Retained lines, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &ChatMessage> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_then_get_reports_the_user() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        assert_eq!(tracker.get(2).expect("joined user present").username, "ada");
    }

    #[test]
    fn leave_removes_the_user() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        assert!(tracker.leave(2).is_some());
        assert!(!tracker.contains(2));
    }

    #[test]
    fn heartbeat_refreshes_last_seen() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        tracker.record_heartbeat(2, 5_000);
        assert_eq!(tracker.get(2).expect("present").last_seen_ms, 5_000);
    }

    #[test]
    fn sweep_evicts_users_past_the_presence_timeout() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        let evicted = tracker.sweep_timeouts(PRESENCE_TIMEOUT_MS + 1);
        assert_eq!(evicted, vec![2]);
        assert!(!tracker.contains(2));
    }

    #[test]
    fn sweep_keeps_users_within_the_timeout_window() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        assert!(tracker.sweep_timeouts(PRESENCE_TIMEOUT_MS).is_empty());
    }

    #[test]
    fn cursor_trail_is_bounded() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        for i in 0..(CURSOR_TRAIL_CAPACITY + 10) {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32;
            tracker.update_pose(2, [x, 0.0, 0.0], [0.0; 3], [0.0; 3]);
        }
        assert_eq!(tracker.get(2).expect("present").cursor_trail.len(), CURSOR_TRAIL_CAPACITY);
    }

    #[test]
    fn role_change_applies_immediately() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        tracker.set_role(2, RoleTag::Viewer);
        assert_eq!(tracker.role_of(2), Some(RoleTag::Viewer));
    }

    #[test]
    fn out_of_range_participant_is_ignored() {
        let mut tracker = PresenceTracker::new();
        tracker.join(1_000, "ghost".to_string(), RoleTag::Editor, 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn record_sequence_tracks_the_most_recent_value() {
        let mut tracker = PresenceTracker::new();
        tracker.join(2, "ada".to_string(), RoleTag::Editor, 0);
        tracker.record_sequence(2, 5);
        tracker.record_sequence(2, 9);
        assert_eq!(tracker.get(2).expect("present").last_seen_sequence, 9);
    }

    fn chat_line(text: &str) -> ChatMessage {
        ChatMessage { user_id: 2, username: "ada".to_string(), message: text.to_string(), timestamp_ms: 0, flag_system: false }
    }

    #[test]
    fn chat_log_returns_lines_oldest_first() {
        let mut log = ChatLog::new();
        log.record(chat_line("hi"));
        log.record(chat_line("there"));
        let messages: Vec<_> = log.recent().map(|m| m.message.as_str()).collect();
        assert_eq!(messages, vec!["hi", "there"]);
    }

    #[test]
    fn chat_log_evicts_oldest_past_capacity() {
        let mut log = ChatLog::new();
        for i in 0..=CHAT_CAPACITY {
            log.record(chat_line(&i.to_string()));
        }
        assert_eq!(log.len(), CHAT_CAPACITY);
        let oldest = log.recent().next().expect("non-empty");
        assert_eq!(oldest.message, "1");
    }
}
