//! The single-threaded tick loop: drains the transport, ingests operations
//! through the causal engine, and runs the periodic housekeeping (heartbeat
//! emission, presence timeout, pending-local timeout).
//!
//! Nothing here blocks. A host application calls [`Dispatcher::tick`] on
//! whatever cadence it likes (a fixed-step loop, a frame callback, a
//! scheduled task); the dispatcher does not own a thread or a runtime.

use scenesync_core::{
    ids::ParticipantId, CausalEngine, EditorStore, IngestOutcome, OpStatus, Operation as CoreOperation,
    PermissionGate, VectorClock,
};
use scenesync_proto::{
    payloads::{
        chat::ChatMessage,
        op::OpHeader,
        presence::{PresenceUpdate, SelectionUpdate},
        session::{Heartbeat, PermissionChange, SyncRequest, UserJoin, UserLeave},
        Operation as WireOperation, MAX_USERS as WIRE_MAX_USERS,
    },
    Frame, Message,
};

use crate::{
    history::History,
    presence::{ChatLog, PresenceTracker},
    session::SessionController,
    transport::Transport,
};

/// Default heartbeat broadcast cadence.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Default pending-local timeout: half the presence timeout, so a dropped
/// peer's in-flight ops are retired before the peer itself is evicted.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 15_000;

fn core_context_to_wire(context: &VectorClock) -> [u32; WIRE_MAX_USERS] {
    context.entries()
}

fn wire_context_to_core(context: [u32; WIRE_MAX_USERS]) -> VectorClock {
    VectorClock::from_entries(context)
}

fn wire_op_to_core(origin: ParticipantId, sequence: u32, timestamp_ms: u64, wire: WireOperation) -> CoreOperation {
    CoreOperation {
        origin,
        sequence,
        context: wire_context_to_core(wire.context),
        timestamp_ms,
        kind: wire.header.kind,
        object_id: wire.header.object_id,
        body: wire.body,
        status: OpStatus::Pending,
    }
}

fn core_op_to_wire(op: &CoreOperation) -> WireOperation {
    WireOperation {
        header: OpHeader { kind: op.kind, object_id: op.object_id },
        body: op.body.clone(),
        context: core_context_to_wire(&op.context),
    }
}

fn chat_system_notice(text: String, timestamp_ms: u64) -> ChatMessage {
    ChatMessage { user_id: 0, username: "system".to_string(), message: text, timestamp_ms, flag_system: true }
}

fn send_frame(transport: &mut impl Transport, peer: ParticipantId, message: Message, sender_id: u32, sequence: u32, now_ms: u64) {
    match message.into_frame(sender_id, sequence, now_ms) {
        Ok(frame) => {
            if transport.send_reliable(peer, frame).is_err() {
                tracing::debug!(peer, "send_reliable failed, peer unreachable");
            }
        },
        Err(error) => tracing::warn!(%error, "failed to encode outgoing frame"),
    }
}

fn broadcast(transport: &mut impl Transport, message: Message, sender_id: u32, sequence: u32, now_ms: u64) {
    match message.into_frame(sender_id, sequence, now_ms) {
        Ok(frame) => transport.broadcast_reliable(frame),
        Err(error) => tracing::warn!(%error, "failed to encode broadcast frame"),
    }
}

/// Ties the causal engine, presence tracker, session controller, and
/// history ring to a [`Transport`], running the per-tick housekeeping that
/// keeps them all consistent.
pub struct Dispatcher {
    self_id: ParticipantId,
    causal: CausalEngine,
    presence: PresenceTracker,
    session: SessionController,
    history: History,
    chat: ChatLog,
    heartbeat_interval_ms: u64,
    operation_timeout_ms: u64,
    last_heartbeat_ms: u64,
    broadcast_sequence: u32,
}

impl Dispatcher {
    /// A fresh dispatcher for `self_id`, the participant id this site was
    /// assigned at join (or `0` if hosting).
    #[must_use]
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            causal: CausalEngine::new(self_id),
            presence: PresenceTracker::new(),
            session: SessionController::new(),
            history: History::new(),
            chat: ChatLog::new(),
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            last_heartbeat_ms: 0,
            broadcast_sequence: 0,
        }
    }

    /// This site's own participant id.
    #[must_use]
    pub const fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    /// Read-only view of the causal engine, e.g. for assertions in tests.
    #[must_use]
    pub const fn causal(&self) -> &CausalEngine {
        &self.causal
    }

    /// Read-only view of presence, e.g. to render a user list.
    #[must_use]
    pub const fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Read-only view of the session record.
    #[must_use]
    pub const fn session(&self) -> &SessionController {
        &self.session
    }

    /// Read-only view of the applied-operation history ring.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Read-only view of the chat log.
    #[must_use]
    pub const fn chat(&self) -> &ChatLog {
        &self.chat
    }

    fn is_host(&self) -> bool {
        self.session.record().is_some_and(|record| record.host_user_id == self.self_id)
    }

    fn next_sequence(&mut self) -> u32 {
        self.broadcast_sequence += 1;
        self.broadcast_sequence
    }

    /// Host a new session as [`RoleTag`](scenesync_proto::RoleTag)`::Admin`.
    pub fn host(&mut self, name: String, username: String, now_ms: u64) {
        self.session.host(name, username, now_ms, &mut self.presence);
        self.last_heartbeat_ms = now_ms;
    }

    /// Locally record that this site has joined as `username`, ahead of
    /// receiving the host's snapshot burst. Call only after the transport
    /// handshake has assigned `self_id`.
    pub fn note_joined(&mut self, username: String, now_ms: u64) {
        self.presence.join(self.self_id, username, scenesync_proto::RoleTag::Editor, now_ms);
        self.last_heartbeat_ms = now_ms;
    }

    /// Submit a locally authored operation: checks this site's own
    /// capability, stamps, applies optimistically, records it into this
    /// site's own history, and broadcasts it.
    ///
    /// Denied silently (counted in `stats().perm_denied`) if this site's own
    /// role can't perform `kind` -- symmetric with the check
    /// [`Self::handle_operation`] runs against a remote sender's role.
    pub fn submit(
        &mut self,
        kind: scenesync_proto::OpKind,
        object_id: u32,
        body: scenesync_proto::payloads::op::OpBody,
        now_ms: u64,
        transport: &mut impl Transport,
        store: &mut impl EditorStore,
    ) {
        let Some(role) = self.presence.role_of(self.self_id) else {
            self.causal.stats_mut().perm_denied += 1;
            return;
        };
        if !PermissionGate::can_apply(role, kind) {
            self.causal.stats_mut().perm_denied += 1;
            return;
        }

        let op = self.causal.submit(kind, object_id, body, now_ms, store);
        self.history.record(op.clone());
        let wire = core_op_to_wire(&op);
        // The frame's sequence carries the causal engine's own per-origin
        // op sequence, not the dispatcher's generic broadcast counter --
        // that's what a receiving site's `vc_local[origin]` and dedup
        // check are compared against, so sender and receiver numbering
        // must agree.
        broadcast(transport, Message::Operation(wire), self.self_id, op.sequence, now_ms);
    }

    /// Drain the transport and run this tick's housekeeping.
    pub fn tick(&mut self, transport: &mut impl Transport, store: &mut impl EditorStore, now_ms: u64) {
        while let Some((sender, frame)) = transport.try_recv() {
            self.handle_frame(sender, &frame, transport, store, now_ms);
        }

        if now_ms.saturating_sub(self.last_heartbeat_ms) >= self.heartbeat_interval_ms {
            let sequence = self.next_sequence();
            broadcast(transport, Message::Heartbeat(Heartbeat { user_id: self.self_id }), self.self_id, sequence, now_ms);
            self.last_heartbeat_ms = now_ms;
        }

        for evicted in self.presence.sweep_timeouts(now_ms) {
            let leave_sequence = self.next_sequence();
            broadcast(transport, Message::UserLeave(UserLeave { user_id: evicted }), self.self_id, leave_sequence, now_ms);
            let notice = chat_system_notice(format!("user {evicted} disconnected (timeout)"), now_ms);
            self.chat.record(notice.clone());
            let notice_sequence = self.next_sequence();
            broadcast(transport, Message::ChatMessage(notice), self.self_id, notice_sequence, now_ms);
        }

        self.causal.timeout_sweep(now_ms, self.operation_timeout_ms);
    }

    fn handle_frame(
        &mut self,
        sender: ParticipantId,
        frame: &Frame,
        transport: &mut impl Transport,
        store: &mut impl EditorStore,
        now_ms: u64,
    ) {
        let message = match Message::from_frame(frame) {
            Ok(message) => message,
            Err(error) => {
                self.causal.stats_mut().bad_frames += 1;
                tracing::debug!(%error, sender, "dropping malformed frame");
                return;
            },
        };

        self.presence.record_sequence(sender, frame.header.sequence());

        match message {
            Message::UserJoin(join) => self.handle_join(sender, join, transport, now_ms),
            Message::UserLeave(leave) => self.handle_leave(leave, transport, now_ms),
            Message::Operation(op) => self.handle_operation(sender, op, frame, store),
            Message::PresenceUpdate(update) => self.handle_presence_update(&update),
            Message::SelectionUpdate(update) => self.handle_selection_update(&update),
            Message::ChatMessage(chat) => {
                // No permission check: any connected user may post, and
                // there's nothing further to apply -- just keep the line.
                self.chat.record(chat);
            },
            Message::Heartbeat(heartbeat) => self.presence.record_heartbeat(heartbeat.user_id, now_ms),
            Message::SyncRequest(request) => self.handle_sync_request(&request, transport, now_ms),
            Message::SessionInfo(_) => {
                // Informational broadcast; this site's own session record
                // (if any) is authoritative for `is_host`.
            },
            Message::PermissionChange(change) => self.handle_permission_change(&change),
        }
    }

    fn handle_join(&mut self, sender: ParticipantId, join: UserJoin, transport: &mut impl Transport, now_ms: u64) {
        if !self.is_host() {
            return;
        }
        match self.session.accept_join(sender, join.username, join.protocol_version, now_ms, &mut self.presence) {
            Ok(()) => {
                // Catch the joiner up on everyone already present (itself
                // included), then tell everyone else who just arrived. Other
                // sites only ever learn of a peer through a `PresenceUpdate`,
                // which carries no username -- `handle_presence_update`
                // registers them under a placeholder name on first sight.
                self.send_roster_snapshot(sender, transport, now_ms);
                let role = self.presence.role_of(sender).unwrap_or(scenesync_proto::RoleTag::Viewer);
                let user_sequence = self.next_sequence();
                broadcast(
                    transport,
                    Message::PresenceUpdate(PresenceUpdate {
                        user_id: sender,
                        role,
                        active: true,
                        last_seen_ms: now_ms,
                        cursor: [0.0; 3],
                        camera_pos: [0.0; 3],
                        camera_rot: [0.0; 3],
                        selected_object_ids: Vec::new(),
                    }),
                    self.self_id,
                    user_sequence,
                    now_ms,
                );
            },
            Err(error) => {
                tracing::warn!(%error, sender, "rejecting join");
                let notice = chat_system_notice(error.to_string(), now_ms);
                self.chat.record(notice.clone());
                let sequence = self.next_sequence();
                send_frame(transport, sender, Message::ChatMessage(notice), self.self_id, sequence, now_ms);
            },
        }
    }

    /// Send `to` the session record, a `PresenceUpdate` for every currently
    /// known user, and recent history, in one direct burst. Shared by a
    /// fresh join and an explicit [`SyncRequest`].
    fn send_roster_snapshot(&mut self, to: ParticipantId, transport: &mut impl Transport, now_ms: u64) {
        let Some(snapshot) = self.session.snapshot(&self.presence, &self.history) else { return };

        let info_sequence = self.next_sequence();
        send_frame(transport, to, Message::SessionInfo(snapshot.session.to_wire()), self.self_id, info_sequence, now_ms);

        for (user_id, _username, role) in &snapshot.users {
            let Some(user) = self.presence.get(*user_id) else { continue };
            let last_seen_ms = user.last_seen_ms;
            let cursor = user.cursor;
            let camera_pos = user.camera_pos;
            let camera_rot = user.camera_rot;
            let selected_object_ids = user.selected_object_ids.clone();
            let sequence = self.next_sequence();
            send_frame(
                transport,
                to,
                Message::PresenceUpdate(PresenceUpdate {
                    user_id: *user_id,
                    role: *role,
                    active: true,
                    last_seen_ms,
                    cursor,
                    camera_pos,
                    camera_rot,
                    selected_object_ids,
                }),
                self.self_id,
                sequence,
                now_ms,
            );
        }

        for op in &snapshot.operations {
            let wire = core_op_to_wire(op);
            let sequence = self.next_sequence();
            send_frame(transport, to, Message::Operation(wire), op.origin, sequence, op.timestamp_ms);
        }
    }

    fn handle_leave(&mut self, leave: UserLeave, transport: &mut impl Transport, now_ms: u64) {
        if self.presence.leave(leave.user_id).is_some() {
            let sequence = self.next_sequence();
            broadcast(transport, Message::UserLeave(leave), self.self_id, sequence, now_ms);
        }
    }

    // Every site is directly connected to every other (the symmetric peer
    // topology this dispatcher was generalized to), so an ingested op
    // needs no further relay: its true author already broadcast it to
    // everyone. Re-broadcasting here would also misattribute origin --
    // the wire payload carries no author field of its own, so a relayed
    // frame would be ingested under the relaying peer's id instead of the
    // original sender's.
    fn handle_operation(&mut self, sender: ParticipantId, wire: WireOperation, frame: &Frame, store: &mut impl EditorStore) {
        let Some(role) = self.presence.role_of(sender) else {
            self.causal.stats_mut().perm_denied += 1;
            return;
        };
        if !PermissionGate::can_apply(role, wire.header.kind) {
            self.causal.stats_mut().perm_denied += 1;
            return;
        }

        let sequence = frame.header.sequence();
        let timestamp_ms = frame.header.timestamp_ms();
        let op = wire_op_to_core(sender, sequence, timestamp_ms, wire);
        let (outcome, op) = self.causal.ingest(op, store);
        if matches!(outcome, IngestOutcome::Applied) {
            self.history.record(op);
        }
    }

    fn handle_presence_update(&mut self, update: &PresenceUpdate) {
        if self.presence.get(update.user_id).is_none() {
            // Learned about this peer second-hand, via broadcast or a roster
            // snapshot; the wire message carries no username, so register a
            // placeholder a later rename could fill in.
            self.presence.join(update.user_id, String::new(), update.role, update.last_seen_ms);
        }
        self.presence.update_pose(update.user_id, update.cursor, update.camera_pos, update.camera_rot);
        self.presence.update_selection(update.user_id, update.selected_object_ids.clone());
    }

    fn handle_selection_update(&mut self, update: &SelectionUpdate) {
        self.presence.update_selection(update.user_id, update.object_ids.clone());
    }

    fn handle_sync_request(&mut self, request: &SyncRequest, transport: &mut impl Transport, now_ms: u64) {
        self.send_roster_snapshot(request.user_id, transport, now_ms);
    }

    fn handle_permission_change(&mut self, change: &PermissionChange) {
        self.presence.set_role(change.user_id, change.new_role);
    }
}

#[cfg(test)]
mod tests {
    use scenesync_core::{ids::ObjectId, store::ApplyOutcome};
    use scenesync_proto::{fixed_point::Vec3, payloads::op::OpBody, OpKind};

    use super::*;
    use crate::transport::test_support::LoopbackTransport;

    #[derive(Default)]
    struct FakeEditorStore;

    impl EditorStore for FakeEditorStore {
        fn apply(&mut self, _op: &CoreOperation) -> ApplyOutcome {
            ApplyOutcome::Applied
        }

        fn exists(&self, _object_id: ObjectId) -> bool {
            true
        }

        fn parent_of(&self, _object_id: ObjectId) -> Option<ObjectId> {
            None
        }
    }

    fn move_body() -> OpBody {
        OpBody::Vector { old: Vec3::zero(), new: Vec3::new(1.0, 0.0, 0.0) }
    }

    #[test]
    fn hosting_assigns_admin_and_starts_heartbeat_clock() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 1_000);
        assert!(dispatcher.is_host());
        assert_eq!(dispatcher.presence().role_of(0), Some(scenesync_proto::RoleTag::Admin));
    }

    #[test]
    fn submit_broadcasts_the_operation() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.submit(OpKind::Move, 7, move_body(), 0, &mut transport, &mut store);
        assert_eq!(transport.sent.len(), 1);
    }

    #[test]
    fn viewer_cannot_submit_locally() {
        let mut dispatcher = Dispatcher::new(1);
        dispatcher.presence.join(1, "viewer".to_string(), scenesync_proto::RoleTag::Viewer, 0);
        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.submit(OpKind::Move, 7, move_body(), 0, &mut transport, &mut store);
        assert_eq!(dispatcher.causal().stats().perm_denied, 1);
        assert_eq!(dispatcher.causal().pending_local_len(), 0);
        assert!(dispatcher.history().is_empty());
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn submitted_operation_enters_the_authors_own_history() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.submit(OpKind::Move, 7, move_body(), 0, &mut transport, &mut store);
        assert_eq!(dispatcher.history().len(), 1);
    }

    #[test]
    fn chat_message_is_recorded_in_the_log() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        let chat = ChatMessage { user_id: 0, username: "ada".to_string(), message: "hi".to_string(), timestamp_ms: 0, flag_system: false };
        let frame = Message::ChatMessage(chat).into_frame(0, 1, 0).expect("should build frame");
        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.handle_frame(0, &frame, &mut transport, &mut store, 0);
        assert_eq!(dispatcher.chat().len(), 1);
    }

    #[test]
    fn unauthorized_operation_is_dropped_and_counted() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        dispatcher.presence.join(1, "viewer".to_string(), scenesync_proto::RoleTag::Viewer, 0);

        let wire = WireOperation {
            header: OpHeader { kind: OpKind::Move, object_id: 7 },
            body: move_body(),
            context: [0u32; WIRE_MAX_USERS],
        };
        let frame = Message::Operation(wire).into_frame(1, 1, 0).expect("should build frame");

        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.handle_frame(1, &frame, &mut transport, &mut store, 0);
        assert_eq!(dispatcher.causal().stats().perm_denied, 1);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn malformed_frame_is_dropped_and_counted() {
        let dispatcher_self_id = 0;
        let mut dispatcher = Dispatcher::new(dispatcher_self_id);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        let header = scenesync_proto::FrameHeader::new(scenesync_proto::MsgType::Heartbeat, 1, 1, 0);
        // Heartbeat needs 4 payload bytes; an empty payload fails to decode.
        let frame = Frame::new(header, Vec::new()).expect("empty payload is within bound");
        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.handle_frame(1, &frame, &mut transport, &mut store, 0);
        assert_eq!(dispatcher.causal().stats().bad_frames, 1);
    }

    #[test]
    fn heartbeat_timeout_evicts_silent_users() {
        let mut dispatcher = Dispatcher::new(0);
        dispatcher.host("studio".to_string(), "ada".to_string(), 0);
        dispatcher.presence.join(1, "bea".to_string(), scenesync_proto::RoleTag::Editor, 0);

        let mut transport = LoopbackTransport::default();
        let mut store = FakeEditorStore;
        dispatcher.tick(&mut transport, &mut store, crate::presence::PRESENCE_TIMEOUT_MS + 1);
        assert!(dispatcher.presence().get(1).is_none());
    }
}
