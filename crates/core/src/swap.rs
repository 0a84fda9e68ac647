//! Swap request records and their approval state machine.
//!
//! `pending -> approved -> applied`, or `pending -> rejected`. Rejected and
//! applied requests are terminal and immutable.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{PersonId, RecordId, Timestamp};

/// Maximum length of a swap or postpone reason.
pub const MAX_REASON_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
}

impl SwapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Applied => "applied",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SwapStatus::Rejected | SwapStatus::Applied)
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swap status transitions.
pub mod state_machine {
    use super::SwapStatus::{self, *};

    pub fn valid_transitions(from: SwapStatus) -> &'static [SwapStatus] {
        match from {
            Pending => &[Approved, Rejected],
            Approved => &[Applied],
            Rejected | Applied => &[],
        }
    }

    pub fn can_transition(from: SwapStatus, to: SwapStatus) -> bool {
        valid_transitions(from).contains(&to)
    }
}

/// Whether a reason must accompany a new request. Meeting swaps in the lab
/// workflow always carry one; task swaps may omit it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonPolicy {
    #[default]
    Optional,
    Required,
}

/// A request to exchange `requester`'s place on `from_instance` with
/// `target`'s place on `to_instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: RecordId,
    pub from_instance: RecordId,
    pub to_instance: RecordId,
    pub requester: PersonId,
    pub target: PersonId,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: SwapStatus,
    /// Why the last apply attempt failed, if it did.
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SwapRequest {
    /// A new pending request. Reason text is trimmed; blank becomes `None`.
    pub fn new(
        from_instance: RecordId,
        to_instance: RecordId,
        requester: PersonId,
        target: PersonId,
        reason: Option<String>,
        policy: ReasonPolicy,
    ) -> Result<Self, CoreError> {
        let reason = normalize_reason(reason)?;
        if policy == ReasonPolicy::Required && reason.is_none() {
            return Err(CoreError::Validation(
                "A reason is required for this swap request".to_string(),
            ));
        }
        if from_instance == to_instance {
            return Err(CoreError::Validation(
                "Cannot swap an instance with itself".to_string(),
            ));
        }
        if requester == target {
            return Err(CoreError::Validation(
                "Requester and target must be different people".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::now_v7(),
            from_instance,
            to_instance,
            requester,
            target,
            reason,
            status: SwapStatus::Pending,
            last_error: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to `to`, enforcing the state machine.
    pub fn transition(&mut self, to: SwapStatus) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::ImmutableStateConflict {
                entity: "SwapRequest",
                id: self.id,
                state: self.status.to_string(),
            });
        }
        if !state_machine::can_transition(self.status, to) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Trim a free-text reason, rejecting oversize input. Blank becomes `None`.
pub fn normalize_reason(reason: Option<String>) -> Result<Option<String>, CoreError> {
    let Some(text) = reason else {
        return Ok(None);
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_REASON_LEN {
        return Err(CoreError::Validation(format!(
            "Reason must not exceed {MAX_REASON_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}
