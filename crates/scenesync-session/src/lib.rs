//! Session lifecycle, presence tracking, and the dispatch loop that ties the
//! causal engine to a transport.
//!
//! `scenesync-core` owns the pure operation model (conflict rules, transform
//! rules, the vector-clock causal engine, permissions); this crate is the
//! layer above it that a host application actually drives: who is in the
//! session, what they can see of each other, and how inbound/outbound
//! frames get routed through [`CausalEngine`](scenesync_core::CausalEngine).
//!
//! # Components
//!
//! - [`transport::Transport`]: the non-blocking frame queue a host provides
//! - [`presence::PresenceTracker`]: live-user table, liveness timeout, pose/selection state
//! - [`presence::ChatLog`]: bounded ring of chat lines, companion to presence
//! - [`session::SessionController`]: session identity, join acceptance, snapshot assembly
//! - [`history::History`]: bounded ring of applied operations for late joiners
//! - [`dispatcher::Dispatcher`]: the per-tick loop wiring all of the above together

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod dispatcher;
pub mod error;
pub mod history;
pub mod presence;
pub mod session;
pub mod transport;

pub use dispatcher::{Dispatcher, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_OPERATION_TIMEOUT_MS};
pub use error::TransportError;
pub use history::{History, HISTORY_CAPACITY, SNAPSHOT_BURST_LIMIT};
pub use presence::{ChatLog, PresenceTracker, User, CHAT_CAPACITY, CURSOR_TRAIL_CAPACITY, PRESENCE_TIMEOUT_MS};
pub use session::{SessionController, SessionRecord, Snapshot, MAX_SESSION_USERS};
pub use transport::Transport;
