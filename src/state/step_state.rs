/// Step state definitions for one crawl task
///
/// A task starts in `Start`, resolves its job configuration, and then either ends in a
/// skip state or gets processed. Skip states are ordinary outcomes, not errors.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a crawl step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepState {
    // ===== Active States =====
    /// Task received, nothing looked up yet
    Start,

    /// Job configuration read (or written, for the seed task)
    ConfigResolved,

    // ===== Terminal Skip States =====
    /// The job was aborted before this task ran
    SkippedAborted,

    /// The URL was already marked visited by another task
    SkippedVisited,

    /// The job's page budget was already spent
    SkippedBudget,

    // ===== Terminal Success States =====
    /// The page was rendered, extracted and its links fanned out
    Processed,

    /// Result handed back to the executor
    Done,
}

impl StepState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start | Self::ConfigResolved)
    }

    /// Returns true if this represents a skip outcome
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedAborted | Self::SkippedVisited | Self::SkippedBudget
        )
    }

    /// Checks whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: StepState) -> bool {
        match (self, next) {
            (Self::Start, Self::ConfigResolved) => true,
            (
                Self::ConfigResolved,
                Self::SkippedAborted | Self::SkippedVisited | Self::SkippedBudget | Self::Processed,
            ) => true,
            (
                Self::SkippedAborted | Self::SkippedVisited | Self::SkippedBudget | Self::Processed,
                Self::Done,
            ) => true,
            _ => false,
        }
    }

    /// The skip reason carried by a skip state
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::SkippedAborted => Some(SkipReason::JobAborted),
            Self::SkippedVisited => Some(SkipReason::AlreadyVisited),
            Self::SkippedBudget => Some(SkipReason::MaxPagesReached),
            _ => None,
        }
    }

    /// Short snake_case name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ConfigResolved => "config_resolved",
            Self::SkippedAborted => "skipped_aborted",
            Self::SkippedVisited => "skipped_visited",
            Self::SkippedBudget => "skipped_budget",
            Self::Processed => "processed",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a task ended without processing its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "already visited")]
    AlreadyVisited,

    #[serde(rename = "max_pages limit reached")]
    MaxPagesReached,

    #[serde(rename = "job aborted")]
    JobAborted,
}

impl SkipReason {
    /// The human-readable reason reported in results
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyVisited => "already visited",
            Self::MaxPagesReached => "max_pages limit reached",
            Self::JobAborted => "job aborted",
        }
    }

    /// The terminal step state this reason belongs to
    pub fn state(&self) -> StepState {
        match self {
            Self::AlreadyVisited => StepState::SkippedVisited,
            Self::MaxPagesReached => StepState::SkippedBudget,
            Self::JobAborted => StepState::SkippedAborted,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!StepState::Start.is_terminal());
        assert!(!StepState::ConfigResolved.is_terminal());

        assert!(StepState::SkippedAborted.is_terminal());
        assert!(StepState::SkippedVisited.is_terminal());
        assert!(StepState::SkippedBudget.is_terminal());
        assert!(StepState::Processed.is_terminal());
        assert!(StepState::Done.is_terminal());
    }

    #[test]
    fn test_is_skipped() {
        assert!(StepState::SkippedVisited.is_skipped());
        assert!(StepState::SkippedBudget.is_skipped());
        assert!(StepState::SkippedAborted.is_skipped());

        assert!(!StepState::Processed.is_skipped());
        assert!(!StepState::Start.is_skipped());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(StepState::Start.can_transition_to(StepState::ConfigResolved));
        assert!(StepState::ConfigResolved.can_transition_to(StepState::SkippedVisited));
        assert!(StepState::ConfigResolved.can_transition_to(StepState::SkippedBudget));
        assert!(StepState::ConfigResolved.can_transition_to(StepState::Processed));
        assert!(StepState::Processed.can_transition_to(StepState::Done));
        assert!(StepState::SkippedVisited.can_transition_to(StepState::Done));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!StepState::Start.can_transition_to(StepState::Processed));
        assert!(!StepState::SkippedVisited.can_transition_to(StepState::Processed));
        assert!(!StepState::Done.can_transition_to(StepState::Start));
        assert!(!StepState::Processed.can_transition_to(StepState::SkippedBudget));
    }

    #[test]
    fn test_skip_reason_strings() {
        assert_eq!(SkipReason::AlreadyVisited.as_str(), "already visited");
        assert_eq!(SkipReason::MaxPagesReached.as_str(), "max_pages limit reached");
        assert_eq!(SkipReason::JobAborted.as_str(), "job aborted");
    }

    #[test]
    fn test_skip_reason_serializes_as_message() {
        let json = serde_json::to_string(&SkipReason::MaxPagesReached).unwrap();
        assert_eq!(json, "\"max_pages limit reached\"");

        let parsed: SkipReason = serde_json::from_str("\"already visited\"").unwrap();
        assert_eq!(parsed, SkipReason::AlreadyVisited);
    }

    #[test]
    fn test_skip_reason_state_roundtrip() {
        for reason in [
            SkipReason::AlreadyVisited,
            SkipReason::MaxPagesReached,
            SkipReason::JobAborted,
        ] {
            assert_eq!(reason.state().skip_reason(), Some(reason));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StepState::SkippedBudget), "skipped_budget");
        assert_eq!(format!("{}", SkipReason::AlreadyVisited), "already visited");
    }
}
