//! Deterministic multi-site simulation harness for scenesync.
//!
//! Wires a [`scenesync_session::Dispatcher`] per simulated site to an
//! in-memory router ([`cluster::Cluster`]) instead of a real transport, so
//! concurrent-edit scenarios and long adversarial traces run in-process,
//! single-threaded, and bit-for-bit reproducibly given a seed.
//!
//! # Invariant testing
//!
//! [`invariants`] checks behavioral properties that must hold across every
//! step of a simulation -- bounded memory, store convergence -- as opposed
//! to the fixed endpoints a scripted scenario test asserts.
//!
//! # Adversarial traces
//!
//! [`trace::run`] drives a cluster through many rounds of randomly chosen
//! submissions under a seeded RNG, checking [`invariants::InvariantRegistry::standard`]
//! after every round.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cluster;
pub mod invariants;
pub mod store;
pub mod trace;
pub mod transport;

pub use cluster::{Cluster, Site};
pub use invariants::{
    BoundedHistory, BoundedPendingLocal, BoundedReceiveBuffer, ClusterSnapshot, ConvergenceWhenClocksMatch, Invariant,
    InvariantRegistry, InvariantResult, SiteSnapshot, Violation,
};
pub use store::{InMemoryStore, SceneObject};
pub use trace::{run as run_adversarial_trace, TraceConfig};
pub use transport::SiteTransport;
