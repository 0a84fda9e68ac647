//! Recurring obligation definitions.
//!
//! Templates are owned by administrators; the engine reads them to decide
//! which periods exist and how many people each period needs, but never
//! mutates them.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::person::Person;
use crate::types::{PersonId, TemplateId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on the frequency multiplier. Anything larger is almost
/// certainly a data-entry mistake (a 50-week interval is roughly yearly).
pub const MAX_INTERVAL: u32 = 52;

/// Upper bound on the number of people a single instance may require.
pub const MAX_PEOPLE_PER_INSTANCE: u32 = 64;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether the obligation is a chore or a meeting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    Task,
    Meeting,
}

/// The fixed frequency vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            other => Err(CoreError::Validation(format!(
                "Invalid frequency '{other}'. Must be one of: weekly, biweekly, monthly, quarterly"
            ))),
        }
    }
}

/// Ordering matters: `High` sorts last, so callers wanting high-first
/// ordering use `Reverse(priority)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Who may be drawn for a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "person_ids", rename_all = "snake_case")]
pub enum EligiblePool {
    /// Every active person.
    #[default]
    AllActive,
    /// Only the listed people.
    Explicit(BTreeSet<PersonId>),
}

// ---------------------------------------------------------------------------
// People requirement
// ---------------------------------------------------------------------------

/// Headcount bounds for one instance. Invariant: `1 <= min <= default <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleRequirement {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl PeopleRequirement {
    /// Exactly `n` people, no flexibility.
    pub fn exactly(n: u32) -> Self {
        Self {
            min: n,
            max: n,
            default: n,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min < 1 {
            return Err(CoreError::InvalidConstraint(
                "min_people must be at least 1".to_string(),
            ));
        }
        if self.max > MAX_PEOPLE_PER_INSTANCE {
            return Err(CoreError::InvalidConstraint(format!(
                "max_people must not exceed {MAX_PEOPLE_PER_INSTANCE}, got {}",
                self.max
            )));
        }
        if !(self.min <= self.default && self.default <= self.max) {
            return Err(CoreError::InvalidConstraint(format!(
                "default_people {} must lie within [{}, {}]",
                self.default, self.min, self.max
            )));
        }
        Ok(())
    }

    /// Whether `n` is an acceptable headcount for this requirement.
    pub fn admits(&self, n: u32) -> bool {
        self.min <= n && n <= self.max
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A recurring obligation from which dated instances are generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationTemplate {
    pub id: TemplateId,
    pub name: String,
    pub kind: ObligationKind,
    pub frequency: Frequency,
    /// Multiplier on `frequency` (2 + monthly = every other month).
    pub interval: u32,
    pub start_date: NaiveDate,
    /// Open-ended when absent.
    pub end_date: Option<NaiveDate>,
    pub people: PeopleRequirement,
    #[serde(default)]
    pub eligible: EligiblePool,
    /// When set, only people carrying this tag are eligible.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub is_active: bool,
    /// Meeting slots carry a time of day; tasks usually do not.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl ObligationTemplate {
    /// Check the template's internal invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.interval == 0 || self.interval > MAX_INTERVAL {
            return Err(CoreError::InvalidConstraint(format!(
                "Template {}: interval must be between 1 and {MAX_INTERVAL}, got {}",
                self.id, self.interval
            )));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(CoreError::InvalidConstraint(format!(
                    "Template {}: end_date {end} precedes start_date {}",
                    self.id, self.start_date
                )));
            }
        }
        self.people.validate().map_err(|e| match e {
            CoreError::InvalidConstraint(msg) => {
                CoreError::InvalidConstraint(format!("Template {}: {msg}", self.id))
            }
            other => other,
        })
    }

    /// Whether `person` may be drawn for this template, ignoring the
    /// generation run's own person selection.
    pub fn is_eligible(&self, person: &Person) -> bool {
        if !person.is_active {
            return false;
        }
        if let EligiblePool::Explicit(ids) = &self.eligible {
            if !ids.contains(&person.id) {
                return false;
            }
        }
        match &self.category {
            Some(tag) => person.has_tag(tag),
            None => true,
        }
    }

    /// Whether the inclusive range `[start, end]` overlaps the template's
    /// active window.
    pub fn is_active_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if end < self.start_date {
            return false;
        }
        match self.end_date {
            Some(window_end) => start <= window_end,
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn template(id: TemplateId, frequency: Frequency, start: NaiveDate) -> ObligationTemplate {
        ObligationTemplate {
            id,
            name: format!("template-{id}"),
            kind: ObligationKind::Task,
            frequency,
            interval: 1,
            start_date: start,
            end_date: None,
            people: PeopleRequirement::exactly(1),
            eligible: EligiblePool::AllActive,
            category: None,
            priority: Priority::Medium,
            is_active: true,
            start_time: None,
            duration_minutes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn exact_requirement_is_valid() {
        assert!(PeopleRequirement::exactly(2).validate().is_ok());
    }

    #[test]
    fn zero_min_rejected() {
        let req = PeopleRequirement {
            min: 0,
            max: 2,
            default: 1,
        };
        assert_matches!(req.validate(), Err(CoreError::InvalidConstraint(_)));
    }

    #[test]
    fn default_outside_bounds_rejected() {
        let req = PeopleRequirement {
            min: 2,
            max: 3,
            default: 4,
        };
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("default_people 4"));
    }

    #[test]
    fn zero_interval_rejected() {
        let mut t = template(1, Frequency::Weekly, date(2024, 1, 1));
        t.interval = 0;
        assert_matches!(t.validate(), Err(CoreError::InvalidConstraint(_)));
    }

    #[test]
    fn end_before_start_rejected() {
        let mut t = template(1, Frequency::Monthly, date(2024, 3, 1));
        t.end_date = Some(date(2024, 2, 1));
        assert_matches!(t.validate(), Err(CoreError::InvalidConstraint(_)));
    }

    #[test]
    fn explicit_pool_limits_eligibility() {
        let mut t = template(1, Frequency::Weekly, date(2024, 1, 1));
        t.eligible = EligiblePool::Explicit([1].into_iter().collect());
        assert!(t.is_eligible(&Person::new(1, "Alice")));
        assert!(!t.is_eligible(&Person::new(2, "Bob")));
    }

    #[test]
    fn category_requires_tag() {
        let mut t = template(1, Frequency::Weekly, date(2024, 1, 1));
        t.category = Some("cleaning".to_string());
        assert!(t.is_eligible(&Person::new(1, "Alice").with_tag("cleaning")));
        assert!(!t.is_eligible(&Person::new(2, "Bob")));
    }

    #[test]
    fn inactive_person_never_eligible() {
        let t = template(1, Frequency::Weekly, date(2024, 1, 1));
        assert!(!t.is_eligible(&Person::new(1, "Alice").deactivated()));
    }

    #[test]
    fn active_window_overlap() {
        let mut t = template(1, Frequency::Monthly, date(2024, 3, 15));
        t.end_date = Some(date(2024, 6, 15));
        assert!(t.is_active_during(date(2024, 3, 1), date(2024, 3, 31)));
        assert!(t.is_active_during(date(2024, 6, 1), date(2024, 6, 30)));
        assert!(!t.is_active_during(date(2024, 2, 1), date(2024, 2, 29)));
        assert!(!t.is_active_during(date(2024, 7, 1), date(2024, 7, 31)));
    }

    #[test]
    fn frequency_parses_known_values() {
        assert_eq!("biweekly".parse::<Frequency>().unwrap(), Frequency::Biweekly);
        assert!("daily".parse::<Frequency>().is_err());
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }
}
