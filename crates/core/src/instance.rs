//! Concrete dated occurrences of a template, and their status machine.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::PeriodKey;
use crate::error::CoreError;
use crate::types::{PersonId, RecordId, TemplateId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Postponed,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Scheduled => "scheduled",
            InstanceStatus::InProgress => "in_progress",
            InstanceStatus::Completed => "completed",
            InstanceStatus::Cancelled => "cancelled",
            InstanceStatus::Postponed => "postponed",
        }
    }

    /// A human already settled this instance; regeneration must leave it.
    pub fn is_manual_override(self) -> bool {
        matches!(self, InstanceStatus::Cancelled | InstanceStatus::Postponed)
    }

    /// Swaps and postponements are only allowed while still scheduled.
    pub fn is_adjustable(self) -> bool {
        self == InstanceStatus::Scheduled
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance status transitions.
pub mod state_machine {
    use super::InstanceStatus::{self, *};

    /// Returns the statuses reachable from `from`.
    ///
    /// Completed and Cancelled are terminal. Postponed instances can still
    /// be started, completed, or cancelled on their new date.
    pub fn valid_transitions(from: InstanceStatus) -> &'static [InstanceStatus] {
        match from {
            Scheduled => &[InProgress, Cancelled, Postponed],
            Postponed => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition(from: InstanceStatus, to: InstanceStatus) -> bool {
        valid_transitions(from).contains(&to)
    }
}

// ---------------------------------------------------------------------------
// Staffing
// ---------------------------------------------------------------------------

/// Whether the minimum headcount could be met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffingFlag {
    #[default]
    Ok,
    Understaffed,
}

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

/// One dated occurrence of a template. Natural key: `(template_id, period_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationInstance {
    pub id: RecordId,
    pub template_id: TemplateId,
    pub period_key: PeriodKey,
    pub scheduled_date: NaiveDate,
    /// Last day of the period the instance belongs to.
    pub due_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub assignees: Vec<PersonId>,
    pub status: InstanceStatus,
    pub staffing: StaffingFlag,
    #[serde(default)]
    pub postpone_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ObligationInstance {
    pub fn natural_key(&self) -> (TemplateId, &PeriodKey) {
        (self.template_id, &self.period_key)
    }

    pub fn is_assigned(&self, person: PersonId) -> bool {
        self.assignees.contains(&person)
    }

    /// Move to `to`, enforcing the status machine.
    ///
    /// Terminal and manually overridden states surface as
    /// `ImmutableStateConflict`; other illegal moves as `InvalidTransition`.
    pub fn transition(&mut self, to: InstanceStatus) -> Result<(), CoreError> {
        if state_machine::can_transition(self.status, to) {
            self.status = to;
            self.updated_at = Utc::now();
            return Ok(());
        }
        if matches!(
            self.status,
            InstanceStatus::Completed | InstanceStatus::Cancelled
        ) {
            return Err(self.immutable());
        }
        Err(CoreError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        })
    }

    /// Error describing why this instance refuses further adjustment.
    pub(crate) fn immutable(&self) -> CoreError {
        CoreError::ImmutableStateConflict {
            entity: "ObligationInstance",
            id: self.id,
            state: self.status.to_string(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::instance;
    use super::state_machine::*;
    use super::*;
    use crate::template::fixtures::date;
    use assert_matches::assert_matches;

    #[test]
    fn scheduled_can_start_postpone_or_cancel() {
        assert!(can_transition(InstanceStatus::Scheduled, InstanceStatus::InProgress));
        assert!(can_transition(InstanceStatus::Scheduled, InstanceStatus::Postponed));
        assert!(can_transition(InstanceStatus::Scheduled, InstanceStatus::Cancelled));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(valid_transitions(InstanceStatus::Completed).is_empty());
        assert!(valid_transitions(InstanceStatus::Cancelled).is_empty());
    }

    #[test]
    fn postponed_cannot_be_postponed_again() {
        assert!(!can_transition(InstanceStatus::Postponed, InstanceStatus::Postponed));
    }

    #[test]
    fn transition_from_terminal_is_immutable_conflict() {
        let mut inst = instance(1, "2024-01", date(2024, 1, 1), vec![1]);
        inst.status = InstanceStatus::Cancelled;
        assert_matches!(
            inst.transition(InstanceStatus::InProgress),
            Err(CoreError::ImmutableStateConflict { .. })
        );
    }

    #[test]
    fn illegal_transition_is_reported() {
        let mut inst = instance(1, "2024-01", date(2024, 1, 1), vec![1]);
        assert_matches!(
            inst.transition(InstanceStatus::Completed),
            Err(CoreError::InvalidTransition { .. })
        );
        assert_eq!(inst.status, InstanceStatus::Scheduled);
    }

    #[test]
    fn manual_override_statuses() {
        assert!(InstanceStatus::Cancelled.is_manual_override());
        assert!(InstanceStatus::Postponed.is_manual_override());
        assert!(!InstanceStatus::Scheduled.is_manual_override());
    }
}
