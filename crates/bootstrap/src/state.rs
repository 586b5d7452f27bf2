//! Pure state machine for system initialization. No I/O.

use serde::Serialize;

/// Where a deployment stands with respect to first-run setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    /// Nothing has been checked yet.
    Unchecked,
    /// No active users; first-run setup may proceed.
    Fresh,
    /// Terminal for normal operation. Only force re-init leaves it, and it
    /// loops straight back.
    Initialized,
    /// The backend could not be queried. Resolved only by the backend coming back.
    Unreachable,
    /// The last setup attempt was rejected; the caller may retry with
    /// corrected input.
    Rejected,
}

/// Events that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    DetectedFresh,
    DetectedInitialized,
    BackendFailed,
    SetupSucceeded,
    SetupRejected,
    ForceReinitialized,
}

impl SystemState {
    /// Apply `event`, returning the next state. Events that make no sense in
    /// the current state leave it unchanged.
    pub fn apply(self, event: Transition) -> Self {
        use {SystemState::*, Transition::*};

        match (self, event) {
            (Unchecked | Unreachable, DetectedFresh) => Fresh,
            (Unchecked | Unreachable, DetectedInitialized) => Initialized,
            (Unchecked | Unreachable, BackendFailed) => Unreachable,
            (Fresh | Rejected, SetupSucceeded) => Initialized,
            (Fresh | Rejected, SetupRejected) => Rejected,
            (Initialized, ForceReinitialized) => Initialized,
            (state, _) => state,
        }
    }

    /// Whether first-run setup may be attempted.
    pub fn can_initialize(self) -> bool {
        matches!(self, Self::Fresh | Self::Rejected)
    }

    /// Whether the destructive administrator recreation is allowed.
    pub fn can_force_reinit(self) -> bool {
        self == Self::Initialized
    }
}

#[cfg(test)]
mod tests {
    use super::{SystemState::*, Transition::*, *};

    #[test]
    fn first_run_flow() {
        let s = Unchecked.apply(DetectedFresh);
        assert_eq!(s, Fresh);
        assert!(s.can_initialize());

        let s = s.apply(SetupRejected);
        assert_eq!(s, Rejected);
        assert!(s.can_initialize());

        let s = s.apply(SetupSucceeded);
        assert_eq!(s, Initialized);
        assert!(!s.can_initialize());
    }

    #[test]
    fn initialized_is_terminal_except_reinit() {
        assert_eq!(Initialized.apply(SetupSucceeded), Initialized);
        assert_eq!(Initialized.apply(DetectedFresh), Initialized);
        assert_eq!(Initialized.apply(ForceReinitialized), Initialized);
        assert!(Initialized.can_force_reinit());
        assert!(!Fresh.can_force_reinit());
    }

    #[test]
    fn unreachable_recovers_only_via_detection() {
        let s = Unchecked.apply(BackendFailed);
        assert_eq!(s, Unreachable);
        assert_eq!(s.apply(SetupSucceeded), Unreachable);
        assert!(!s.can_initialize());
        assert_eq!(s.apply(DetectedInitialized), Initialized);
    }
}
