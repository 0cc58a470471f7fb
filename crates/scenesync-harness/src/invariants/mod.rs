//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must hold at every step of a simulation,
//! not just at the end of a scripted scenario. A [`ClusterSnapshot`] is
//! taken after each [`crate::cluster::Cluster::step`] and run through every
//! registered [`Invariant`]; a violation panics with enough context to
//! reproduce.

mod checks;
mod snapshot;

pub use checks::{BoundedHistory, BoundedPendingLocal, BoundedReceiveBuffer, ConvergenceWhenClocksMatch};
pub use snapshot::{ClusterSnapshot, SiteSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property that must hold of a [`ClusterSnapshot`] at every step.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    fn check(&self, state: &ClusterSnapshot) -> InvariantResult;
}

/// Collects invariants and runs them all against a snapshot.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// The bounded-memory and convergence invariants every simulation
    /// should check.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(BoundedPendingLocal);
        registry.add(BoundedReceiveBuffer);
        registry.add(BoundedHistory);
        registry.add(ConvergenceWhenClocksMatch);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    pub fn check_all(&self, state: &ClusterSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> = self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with full context on the first
    /// failing one -- the harness-test equivalent of an assertion.
    pub fn assert_all(&self, state: &ClusterSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(std::string::ToString::to_string).collect();
            panic!("invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        let snapshot = ClusterSnapshot::default();
        assert!(registry.check_all(&snapshot).is_ok());
    }
}
