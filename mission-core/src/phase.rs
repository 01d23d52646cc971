//! Mission phase lattice.

use core::fmt;

/// Phase of the single mission this controller runs per power cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum MissionPhase {
    AwaitingTrigger,
    Waking,
    Descending,
    Recording,
    Releasing,
    Idle,
}

impl MissionPhase {
    /// Nominal successor, `None` once idle.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::AwaitingTrigger => Some(Self::Waking),
            Self::Waking => Some(Self::Descending),
            Self::Descending => Some(Self::Recording),
            Self::Recording => Some(Self::Releasing),
            Self::Releasing => Some(Self::Idle),
            Self::Idle => None,
        }
    }

    /// Phases that sample the environment while waiting out a duration.
    #[must_use]
    pub const fn is_wait_phase(self) -> bool {
        matches!(self, Self::Descending | Self::Recording)
    }

    /// Returns `true` when `next` is the nominal successor, or `Releasing`
    /// reached early from a wait phase.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        self.successor() == Some(next) || (self.is_wait_phase() && next == Self::Releasing)
    }

    /// Validates the transition to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `next` would regress or skip phases.
    pub fn advance_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionPhase::AwaitingTrigger => f.write_str("awaiting-trigger"),
            MissionPhase::Waking => f.write_str("waking"),
            MissionPhase::Descending => f.write_str("descending"),
            MissionPhase::Recording => f.write_str("recording"),
            MissionPhase::Releasing => f.write_str("releasing"),
            MissionPhase::Idle => f.write_str("idle"),
        }
    }
}

/// Rejected phase transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionError {
    pub from: MissionPhase,
    pub to: MissionPhase,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal phase transition {} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [MissionPhase; 6] = [
        MissionPhase::AwaitingTrigger,
        MissionPhase::Waking,
        MissionPhase::Descending,
        MissionPhase::Recording,
        MissionPhase::Releasing,
        MissionPhase::Idle,
    ];

    #[test]
    fn nominal_chain_is_accepted() {
        for pair in ORDER.windows(2) {
            assert_eq!(pair[0].advance_to(pair[1]), Ok(pair[1]));
        }
        assert_eq!(MissionPhase::Idle.successor(), None);
    }

    #[test]
    fn phases_never_regress() {
        for (index, &from) in ORDER.iter().enumerate() {
            for &to in &ORDER[..=index] {
                assert!(!from.can_advance_to(to), "{from} -> {to} accepted");
            }
        }
    }

    #[test]
    fn only_wait_phases_short_circuit_to_releasing() {
        assert!(MissionPhase::Descending.can_advance_to(MissionPhase::Releasing));
        assert!(MissionPhase::Recording.can_advance_to(MissionPhase::Releasing));
        assert_eq!(
            MissionPhase::Waking.advance_to(MissionPhase::Releasing),
            Err(TransitionError {
                from: MissionPhase::Waking,
                to: MissionPhase::Releasing,
            })
        );
    }
}
