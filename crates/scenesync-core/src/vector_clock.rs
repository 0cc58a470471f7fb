//! Per-site vector clock over dense participant ids.

use crate::ids::{ParticipantId, Sequence, MAX_USERS};

/// Fixed-size mapping from participant id to the highest sequence from that
/// participant this site has observed and delivered.
///
/// # Invariants
///
/// Every entry is monotonically non-decreasing over the life of the clock:
/// [`VectorClock::advance`] panics in debug builds if asked to move an entry
/// backwards, since that would indicate a bug in the caller rather than a
/// condition to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorClock {
    entries: [Sequence; MAX_USERS],
}

impl VectorClock {
    /// A clock with every entry at zero (nothing delivered yet).
    #[must_use]
    pub const fn zero() -> Self {
        Self { entries: [0; MAX_USERS] }
    }

    /// Build a clock directly from a dense entry array, e.g. the context
    /// vector decoded off the wire.
    #[must_use]
    pub const fn from_entries(entries: [Sequence; MAX_USERS]) -> Self {
        Self { entries }
    }

    /// The dense entry array, e.g. for encoding onto the wire.
    #[must_use]
    pub const fn entries(&self) -> [Sequence; MAX_USERS] {
        self.entries
    }

    /// Highest sequence delivered from `participant`, or `0` if none.
    #[must_use]
    pub fn get(&self, participant: ParticipantId) -> Sequence {
        self.entries.get(participant as usize).copied().unwrap_or(0)
    }

    /// Advance `participant`'s entry to `sequence`.
    ///
    /// No-ops if `sequence` is not strictly greater than the current entry,
    /// other than in debug builds where moving backwards trips a debug
    /// assertion to surface the caller bug early.
    pub fn advance(&mut self, participant: ParticipantId, sequence: Sequence) {
        let Some(slot) = self.entries.get_mut(participant as usize) else { return };
        debug_assert!(sequence >= *slot, "vector clock entry moved backwards");
        if sequence > *slot {
            *slot = sequence;
        }
    }

    /// Whether every entry of `context` is at or behind this clock -- the
    /// causal-readiness check for an inbound op carrying `context` as its
    /// submission-time snapshot.
    ///
    /// Because a sender's own context entry for itself is always
    /// `sequence - 1` by construction (the snapshot is taken before the
    /// sender stamps its own increment), checking the sender's entry with
    /// this same rule is exactly the sequential-delivery check for that
    /// sender's stream: combined with the caller's duplicate check
    /// (`sequence > vc_local[sender]`), readiness here forces
    /// `vc_local[sender] == sequence - 1`. No special case is needed for the
    /// sender's own index.
    #[must_use]
    pub fn is_ready_for(&self, context: &Self) -> bool {
        (0..MAX_USERS as ParticipantId).all(|i| context.get(i) <= self.get(i))
    }

    /// Snapshot this clock's current state (a cheap copy).
    #[must_use]
    pub const fn snapshot(&self) -> Self {
        *self
    }
}

impl Default for VectorClock {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clock_is_all_zero() {
        let vc = VectorClock::zero();
        assert_eq!(vc.get(0), 0);
        assert_eq!(vc.get(31), 0);
    }

    #[test]
    fn advance_moves_entry_forward() {
        let mut vc = VectorClock::zero();
        vc.advance(3, 5);
        assert_eq!(vc.get(3), 5);
    }

    #[test]
    fn advance_is_idempotent_at_same_value() {
        let mut vc = VectorClock::zero();
        vc.advance(3, 5);
        vc.advance(3, 5);
        assert_eq!(vc.get(3), 5);
    }

    #[test]
    fn out_of_range_participant_reads_zero_and_ignores_advance() {
        let mut vc = VectorClock::zero();
        vc.advance(1_000, 9);
        assert_eq!(vc.get(1_000), 0);
    }

    #[test]
    fn readiness_holds_when_context_is_dominated() {
        let mut local = VectorClock::zero();
        local.advance(0, 2);
        local.advance(1, 1);

        let mut context = VectorClock::zero();
        context.advance(0, 1);
        context.advance(1, 1);
        assert!(local.is_ready_for(&context));

        context.advance(0, 3);
        // context[0]=3 > local[0]=2: a causal gap exists on participant 0.
        assert!(!local.is_ready_for(&context));
    }

    #[test]
    fn readiness_detects_gap_in_senders_own_sequence() {
        let local = VectorClock::zero();
        // an op claiming sequence 2 from participant 1 carries context {1: 1},
        // which is ahead of local's undelivered view of participant 1.
        let mut context = VectorClock::zero();
        context.advance(1, 1);
        assert!(!local.is_ready_for(&context));
    }
}
