//! Turns an assignment plan into concrete instances.
//!
//! Upserts by natural key `(template_id, period_key)`. Instances a human has
//! already settled (cancelled, postponed) or that are underway are never
//! touched, which makes regeneration over an overlapping window safe.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveTime, TimeDelta};
use serde::Serialize;

use crate::assigner::{AssignmentPlan, PlannedSlot};
use crate::calendar::PeriodKey;
use crate::error::CoreError;
use crate::instance::{InstanceStatus, ObligationInstance};
use crate::template::ObligationTemplate;
use crate::types::{RecordId, TemplateId, Timestamp};

/// A slot the materializer declined to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSlot {
    pub template_id: TemplateId,
    pub period_key: PeriodKey,
    pub instance_id: RecordId,
    pub status: InstanceStatus,
}

/// What [`materialize`] decided for every planned slot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializeOutcome {
    pub created: Vec<ObligationInstance>,
    pub updated: Vec<ObligationInstance>,
    /// Existing scheduled instances that already match the plan.
    pub unchanged: Vec<RecordId>,
    pub skipped: Vec<SkippedSlot>,
}

impl MaterializeOutcome {
    /// Instances that must be written back.
    pub fn writes(&self) -> impl Iterator<Item = &ObligationInstance> {
        self.created.iter().chain(self.updated.iter())
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

/// Upsert the plan's slots against `existing` instances.
pub fn materialize(
    plan: &AssignmentPlan,
    templates: &[ObligationTemplate],
    existing: &[ObligationInstance],
    now: Timestamp,
) -> Result<MaterializeOutcome, CoreError> {
    let by_id: BTreeMap<TemplateId, &ObligationTemplate> =
        templates.iter().map(|t| (t.id, t)).collect();
    let by_key: HashMap<(TemplateId, &PeriodKey), &ObligationInstance> = existing
        .iter()
        .map(|inst| (inst.natural_key(), inst))
        .collect();

    let mut outcome = MaterializeOutcome::default();
    for slot in &plan.slots {
        let template = by_id
            .get(&slot.template_id)
            .ok_or_else(|| CoreError::not_found("ObligationTemplate", slot.template_id))?;
        let fresh = build_instance(template, slot, now);

        match by_key.get(&(slot.template_id, &slot.period.key)) {
            None => outcome.created.push(fresh),
            Some(current) if current.status != InstanceStatus::Scheduled => {
                tracing::debug!(
                    instance_id = %current.id,
                    status = %current.status,
                    "Existing instance is not scheduled, leaving untouched",
                );
                outcome.skipped.push(SkippedSlot {
                    template_id: slot.template_id,
                    period_key: slot.period.key.clone(),
                    instance_id: current.id,
                    status: current.status,
                });
            }
            Some(current) => {
                if same_content(current, &fresh) {
                    outcome.unchanged.push(current.id);
                } else {
                    let mut updated = (*current).clone();
                    updated.assignees = fresh.assignees;
                    updated.staffing = fresh.staffing;
                    updated.scheduled_date = fresh.scheduled_date;
                    updated.due_date = fresh.due_date;
                    updated.start_time = fresh.start_time;
                    updated.end_time = fresh.end_time;
                    updated.updated_at = now;
                    outcome.updated.push(updated);
                }
            }
        }
    }

    tracing::info!(
        created = outcome.created.len(),
        updated = outcome.updated.len(),
        unchanged = outcome.unchanged.len(),
        skipped = outcome.skipped.len(),
        "Instances materialized",
    );
    Ok(outcome)
}

/// A new scheduled instance for `slot`, clamped to the template's window.
fn build_instance(
    template: &ObligationTemplate,
    slot: &PlannedSlot,
    now: Timestamp,
) -> ObligationInstance {
    let scheduled_date = slot.period.start.max(template.start_date);
    let due_date = match template.end_date {
        Some(end) => slot.period.end.min(end),
        None => slot.period.end,
    };
    ObligationInstance {
        id: uuid::Uuid::now_v7(),
        template_id: slot.template_id,
        period_key: slot.period.key.clone(),
        scheduled_date,
        due_date,
        start_time: template.start_time,
        end_time: end_time(template.start_time, template.duration_minutes),
        assignees: slot.assignees.clone(),
        status: InstanceStatus::Scheduled,
        staffing: slot.staffing,
        postpone_reason: None,
        created_at: now,
        updated_at: now,
    }
}

fn end_time(start: Option<NaiveTime>, duration_minutes: Option<u32>) -> Option<NaiveTime> {
    let start = start?;
    let minutes = duration_minutes?;
    Some(
        start
            .overflowing_add_signed(TimeDelta::minutes(i64::from(minutes)))
            .0,
    )
}

fn same_content(current: &ObligationInstance, fresh: &ObligationInstance) -> bool {
    current.assignees == fresh.assignees
        && current.staffing == fresh.staffing
        && current.scheduled_date == fresh.scheduled_date
        && current.due_date == fresh.due_date
        && current.start_time == fresh.start_time
        && current.end_time == fresh.end_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::assign;
    use crate::generation::GenerationConfig;
    use crate::instance::StaffingFlag;
    use crate::person::Person;
    use crate::template::fixtures::{date, template};
    use crate::template::{Frequency, ObligationKind};
    use chrono::Utc;

    fn meeting() -> ObligationTemplate {
        let mut t = template(7, Frequency::Monthly, date(2024, 1, 10));
        t.kind = ObligationKind::Meeting;
        t.start_time = NaiveTime::from_hms_opt(14, 0, 0);
        t.duration_minutes = Some(90);
        t
    }

    fn plan_for(t: &ObligationTemplate, existing: &[ObligationInstance]) -> AssignmentPlan {
        let config = GenerationConfig::new(date(2024, 1, 1), date(2024, 3, 31))
            .with_templates([t.id])
            .with_people([1, 2]);
        let people = [Person::new(1, "Alice"), Person::new(2, "Bob")];
        assign(&config, &[t.clone()], &people, BTreeMap::new(), existing).unwrap()
    }

    #[test]
    fn creates_instances_for_new_slots() {
        let t = meeting();
        let plan = plan_for(&t, &[]);
        let outcome = materialize(&plan, &[t], &[], Utc::now()).unwrap();

        assert_eq!(outcome.created.len(), 3);
        let jan = &outcome.created[0];
        assert_eq!(jan.period_key.as_str(), "2024-01");
        // Clamped to the template start date.
        assert_eq!(jan.scheduled_date, date(2024, 1, 10));
        assert_eq!(jan.due_date, date(2024, 1, 31));
        assert_eq!(jan.end_time, NaiveTime::from_hms_opt(15, 30, 0));
        assert_eq!(jan.status, InstanceStatus::Scheduled);
    }

    #[test]
    fn rerun_is_noop() {
        let t = meeting();
        let plan = plan_for(&t, &[]);
        let first = materialize(&plan, &[t.clone()], &[], Utc::now()).unwrap();

        let replan = plan_for(&t, &first.created);
        let second = materialize(&replan, &[t], &first.created, Utc::now()).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged.len(), 3);
    }

    #[test]
    fn postponed_and_cancelled_are_skipped() {
        let t = meeting();
        let plan = plan_for(&t, &[]);
        let mut existing = materialize(&plan, &[t.clone()], &[], Utc::now())
            .unwrap()
            .created;
        existing[0].status = InstanceStatus::Postponed;
        existing[1].status = InstanceStatus::Cancelled;
        let snapshot = existing.clone();

        // Materialize the original plan again over the adjusted instances.
        let outcome = materialize(&plan, &[t], &existing, Utc::now()).unwrap();
        assert_eq!(outcome.skipped.len(), 2);
        assert!(outcome.writes().all(|i| i.id != snapshot[0].id && i.id != snapshot[1].id));
    }

    #[test]
    fn scheduled_instance_is_overwritten_with_new_assignees() {
        let t = meeting();
        let plan = plan_for(&t, &[]);
        let mut existing = materialize(&plan, &[t.clone()], &[], Utc::now())
            .unwrap()
            .created;
        existing[0].assignees = vec![99];
        existing[0].staffing = StaffingFlag::Understaffed;

        let outcome = materialize(&plan, &[t], &existing, Utc::now()).unwrap();
        assert_eq!(outcome.updated.len(), 1);
        let updated = &outcome.updated[0];
        assert_eq!(updated.id, existing[0].id);
        assert_eq!(updated.assignees, plan.slots[0].assignees);
        assert_eq!(updated.staffing, StaffingFlag::Ok);
    }

    #[test]
    fn unknown_template_in_plan_is_not_found() {
        let t = meeting();
        let plan = plan_for(&t, &[]);
        assert!(materialize(&plan, &[], &[], Utc::now()).is_err());
    }
}
