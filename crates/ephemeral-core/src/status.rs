//! Task lifecycle status and its state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Status of a Task.
///
/// ```text
/// PENDING ──► RUNNING ──► COMPLETED
///    │           │
///    └───────────┴──────► FAILED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task accepted but not yet started.
    #[default]
    Pending,
    /// Task is being worked on.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed, or was cancelled before it started.
    Failed,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Returns true if the task can never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Pending, Self::Failed)
        )
    }

    /// Validate a transition, returning `InvalidTransition` if it is not legal.
    pub fn check_transition(&self, next: TaskStatus) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown task status '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LEGAL: [(TaskStatus, TaskStatus); 4] = [
        (TaskStatus::Pending, TaskStatus::Running),
        (TaskStatus::Running, TaskStatus::Completed),
        (TaskStatus::Running, TaskStatus::Failed),
        (TaskStatus::Pending, TaskStatus::Failed),
    ];

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(TaskStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn transition_legal_iff_listed(from in any_status(), to in any_status()) {
            let legal = LEGAL.contains(&(from, to));
            prop_assert_eq!(from.can_transition_to(to), legal);
            prop_assert_eq!(from.check_transition(to).is_ok(), legal);
        }

        #[test]
        fn terminal_states_have_no_exit(from in any_status(), to in any_status()) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("running".parse::<TaskStatus>().unwrap(), TaskStatus::Running);
        assert_eq!("FAILED".parse::<TaskStatus>().unwrap(), TaskStatus::Failed);
        assert!("cancelled".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let parsed: TaskStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(parsed, TaskStatus::Pending);
    }
}
