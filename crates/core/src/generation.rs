//! Generation request parameters and their validation.
//!
//! A [`GenerationConfig`] is transient: it is built per request, validated
//! up front, and never persisted.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::template::ObligationTemplate;
use crate::types::{PersonId, TemplateId};

/// Longest window a single generation call accepts. Longer ranges are
/// chunked by the caller into independent, idempotent calls.
pub const MAX_GENERATION_SPAN_DAYS: i64 = 731;

/// How candidates are ordered before the headcount is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Walk the rotation ledger from its pointer.
    #[default]
    Rotation,
    /// Shuffle the eligible pool with a caller-supplied seed.
    Random { seed: u64 },
}

/// Tie-break between people with equal lifetime counts under
/// `balance_workload`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the rotation order from the ledger pointer.
    #[default]
    RotationOrder,
    /// Prefer whoever has gone longest without an assignment, then rotation
    /// order.
    LeastRecentlyAssigned,
}

/// Parameters for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GenerationConfig {
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "at least one template must be selected"))]
    pub template_ids: Vec<TemplateId>,
    #[validate(length(min = 1, message = "at least one person must be selected"))]
    pub person_ids: Vec<PersonId>,
    #[serde(default)]
    pub avoid_consecutive: bool,
    /// Cap on slots one person may hold among periods overlapping a slot's
    /// period, counted across every selected template and cadence.
    #[serde(default)]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub max_assignments_per_period: Option<u32>,
    #[serde(default)]
    pub balance_workload: bool,
    #[serde(default)]
    pub mode: AssignmentMode,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Per-template headcount replacing the template default for this run.
    #[serde(default)]
    pub headcount_overrides: BTreeMap<TemplateId, u32>,
    /// Re-select slots whose instance is still `scheduled` instead of
    /// keeping their current assignees.
    #[serde(default)]
    pub regenerate_scheduled: bool,
}

impl GenerationConfig {
    /// A config with no constraint flags set.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            template_ids: Vec::new(),
            person_ids: Vec::new(),
            avoid_consecutive: false,
            max_assignments_per_period: None,
            balance_workload: false,
            mode: AssignmentMode::Rotation,
            tie_break: TieBreak::RotationOrder,
            headcount_overrides: BTreeMap::new(),
            regenerate_scheduled: false,
        }
    }

    pub fn with_templates(mut self, ids: impl IntoIterator<Item = TemplateId>) -> Self {
        self.template_ids = ids.into_iter().collect();
        self
    }

    pub fn with_people(mut self, ids: impl IntoIterator<Item = PersonId>) -> Self {
        self.person_ids = ids.into_iter().collect();
        self
    }

    pub fn avoiding_consecutive(mut self) -> Self {
        self.avoid_consecutive = true;
        self
    }

    pub fn balancing_workload(mut self) -> Self {
        self.balance_workload = true;
        self
    }

    pub fn with_max_per_period(mut self, max: u32) -> Self {
        self.max_assignments_per_period = Some(max);
        self
    }

    pub fn regenerating_scheduled(mut self) -> Self {
        self.regenerate_scheduled = true;
        self
    }

    pub fn with_mode(mut self, mode: AssignmentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check the request on its own, before any template is consulted.
    pub fn validate_request(&self) -> Result<(), CoreError> {
        if self.start_date > self.end_date {
            return Err(CoreError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let span = (self.end_date - self.start_date).num_days();
        if span > MAX_GENERATION_SPAN_DAYS {
            return Err(CoreError::InvalidConstraint(format!(
                "Generation window of {span} days exceeds {MAX_GENERATION_SPAN_DAYS}; split the request"
            )));
        }
        self.validate()?;
        Ok(())
    }

    /// Check the request against the templates it references.
    pub fn validate_against(
        &self,
        templates: &BTreeMap<TemplateId, &ObligationTemplate>,
    ) -> Result<(), CoreError> {
        for id in &self.template_ids {
            let template = templates
                .get(id)
                .ok_or_else(|| CoreError::not_found("ObligationTemplate", id))?;
            template.validate()?;
        }

        let selected: HashSet<TemplateId> = self.template_ids.iter().copied().collect();
        for (id, &headcount) in &self.headcount_overrides {
            if !selected.contains(id) {
                return Err(CoreError::InvalidConstraint(format!(
                    "Headcount override for template {id} which is not selected"
                )));
            }
            let people = templates[id].people;
            if !people.admits(headcount) {
                return Err(CoreError::InvalidConstraint(format!(
                    "Headcount override {headcount} for template {id} must lie within [{}, {}]",
                    people.min, people.max
                )));
            }
        }
        Ok(())
    }

    /// Headcount to select for `template` in this run.
    pub fn headcount_for(&self, template: &ObligationTemplate) -> u32 {
        self.headcount_overrides
            .get(&template.id)
            .copied()
            .unwrap_or(template.people.default)
    }
}
