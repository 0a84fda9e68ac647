//! The assigner: decides who covers each (template, period) slot.
//!
//! Slots are processed in chronological order so that constraint state
//! (previous-period assignees, periods already held, ledger pointers)
//! evolves the same way on every run. There is no hidden randomness: the random
//! mode draws from a generator seeded by the caller.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::calendar::{Cadence, Period, PeriodKey};
use crate::error::CoreError;
use crate::generation::{AssignmentMode, GenerationConfig, TieBreak};
use crate::instance::{InstanceStatus, ObligationInstance, StaffingFlag};
use crate::ledger::RotationLedger;
use crate::person::Person;
use crate::template::ObligationTemplate;
use crate::types::{PersonId, TemplateId};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// The assignment decided for one (template, period) slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSlot {
    pub template_id: TemplateId,
    pub period: Period,
    pub assignees: Vec<PersonId>,
    pub staffing: StaffingFlag,
    /// Taken from an existing instance rather than selected in this run.
    #[serde(default)]
    pub pinned: bool,
}

/// Non-fatal observations made during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanNote {
    /// Template skipped: nobody selected for the run is eligible and active.
    EmptyEligiblePool { template_id: TemplateId },
    /// Template skipped: its active flag is off.
    TemplateInactive { template_id: TemplateId },
    /// Avoid-consecutive exclusion lifted because too few people remained.
    ConsecutiveWaived {
        template_id: TemplateId,
        period_key: PeriodKey,
    },
    Understaffed {
        template_id: TemplateId,
        period_key: PeriodKey,
        required: u32,
        assigned: u32,
    },
}

/// Result of [`assign`]: every planned slot, the notes gathered along the
/// way, and the ledgers as they stand after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub slots: Vec<PlannedSlot>,
    pub notes: Vec<PlanNote>,
    pub ledgers: BTreeMap<TemplateId, RotationLedger>,
}

impl AssignmentPlan {
    /// `(template, period) -> assignees`.
    pub fn assignments(&self) -> BTreeMap<(TemplateId, PeriodKey), Vec<PersonId>> {
        self.slots
            .iter()
            .map(|s| ((s.template_id, s.period.key.clone()), s.assignees.clone()))
            .collect()
    }

    /// `(template, period) -> staffing flag`.
    pub fn flags(&self) -> BTreeMap<(TemplateId, PeriodKey), StaffingFlag> {
        self.slots
            .iter()
            .map(|s| ((s.template_id, s.period.key.clone()), s.staffing))
            .collect()
    }

    pub fn slot(&self, template_id: TemplateId, period_key: &str) -> Option<&PlannedSlot> {
        self.slots
            .iter()
            .find(|s| s.template_id == template_id && s.period.key.as_str() == period_key)
    }

    /// Assignees of `template_id` in chronological order.
    pub fn sequence(&self, template_id: TemplateId) -> Vec<Vec<PersonId>> {
        self.slots
            .iter()
            .filter(|s| s.template_id == template_id)
            .map(|s| s.assignees.clone())
            .collect()
    }

    pub fn understaffed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.staffing == StaffingFlag::Understaffed)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Number of slots a run would produce: for every selected active template,
/// the number of periods in the window that fall inside its active window.
pub fn preview(
    config: &GenerationConfig,
    templates: &[ObligationTemplate],
) -> Result<usize, CoreError> {
    let by_id = index_templates(templates);
    config.validate_request()?;
    config.validate_against(&by_id)?;

    let mut total = 0;
    for id in dedup(&config.template_ids) {
        let template = by_id[&id];
        if !template.is_active {
            continue;
        }
        total += active_periods(config, template)?.len();
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Assign
// ---------------------------------------------------------------------------

/// One unit of work: a template in one of its periods.
struct Job<'a> {
    template: &'a ObligationTemplate,
    pool: &'a [PersonId],
    period: Period,
    preceding: Option<PeriodKey>,
}

/// Decide assignees for every (template, period) slot in the request.
///
/// `ledgers` is consumed and returned updated inside the plan. Templates
/// without a ledger get a fresh one populated from their pool.
///
/// Slots that already have an instance in `existing` are pinned: their
/// assignees are reused, fed into the constraint state, and the ledger is
/// left alone, so re-running a request is idempotent. Cancelled slots are
/// dropped. With `regenerate_scheduled`, still-scheduled instances are
/// re-selected instead of pinned.
pub fn assign(
    config: &GenerationConfig,
    templates: &[ObligationTemplate],
    persons: &[Person],
    mut ledgers: BTreeMap<TemplateId, RotationLedger>,
    existing: &[ObligationInstance],
) -> Result<AssignmentPlan, CoreError> {
    let by_id = index_templates(templates);
    config.validate_request()?;
    config.validate_against(&by_id)?;

    let people: HashMap<PersonId, &Person> = persons.iter().map(|p| (p.id, p)).collect();
    let selected_people = dedup(&config.person_ids);
    let mut notes = Vec::new();

    // Pools are computed once per template; jobs borrow them.
    let mut pools: BTreeMap<TemplateId, Vec<PersonId>> = BTreeMap::new();
    let mut active_templates = Vec::new();
    for id in dedup(&config.template_ids) {
        let template = by_id[&id];
        if !template.is_active {
            tracing::debug!(template_id = id, "Template inactive, skipping");
            notes.push(PlanNote::TemplateInactive { template_id: id });
            continue;
        }
        let pool: Vec<PersonId> = selected_people
            .iter()
            .copied()
            .filter(|pid| people.get(pid).is_some_and(|p| template.is_eligible(p)))
            .collect();
        if pool.is_empty() {
            tracing::warn!(template_id = id, "No eligible active people, skipping template");
            notes.push(PlanNote::EmptyEligiblePool { template_id: id });
            continue;
        }
        pools.insert(id, pool);
        active_templates.push(template);
    }

    let mut jobs = Vec::new();
    for template in active_templates {
        let cadence = Cadence::of(template)?;
        let pool = pools[&template.id].as_slice();
        for period in active_periods(config, template)? {
            let preceding = cadence.preceding(&period)?.map(|p| p.key);
            jobs.push(Job {
                template,
                pool,
                period,
                preceding,
            });
        }
    }
    jobs.sort_by_key(|job| {
        (
            job.period.start,
            Reverse(job.template.priority),
            job.template.id,
        )
    });

    let existing_by_key: HashMap<(TemplateId, &PeriodKey), &ObligationInstance> = existing
        .iter()
        .map(|inst| ((inst.template_id, &inst.period_key), inst))
        .collect();

    let mut rng = match config.mode {
        AssignmentMode::Random { seed } => Some(StdRng::seed_from_u64(seed)),
        AssignmentMode::Rotation => None,
    };
    let mut served: HashMap<PersonId, Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
    let mut previous: HashMap<TemplateId, (PeriodKey, Vec<PersonId>)> = HashMap::new();
    let mut slots = Vec::with_capacity(jobs.len());

    for job in jobs {
        let template = job.template;
        let period_key = job.period.key.clone();
        let ledger = ledgers
            .entry(template.id)
            .or_insert_with(|| RotationLedger::new(template.id));
        ledger.template_id = template.id;
        ledger.merge(job.pool);
        if let Some(inst) = existing_by_key.get(&(template.id, &period_key)) {
            if inst.status == InstanceStatus::Cancelled {
                tracing::debug!(
                    template_id = template.id,
                    period = %period_key,
                    "Slot cancelled, not regenerating",
                );
                continue;
            }
            let reselect = config.regenerate_scheduled && inst.status == InstanceStatus::Scheduled;
            if !reselect {
                for &pid in &inst.assignees {
                    served.entry(pid).or_default().push((job.period.start, job.period.end));
                }
                previous.insert(template.id, (period_key.clone(), inst.assignees.clone()));
                slots.push(PlannedSlot {
                    template_id: template.id,
                    period: job.period,
                    assignees: inst.assignees.clone(),
                    staffing: inst.staffing,
                    pinned: true,
                });
                continue;
            }
            ledger.release(&inst.assignees);
        }

        let min = template.people.min;
        let mut working: Vec<PersonId> = job.pool.to_vec();

        if config.avoid_consecutive {
            if let Some(prev_key) = &job.preceding {
                let just_served: Vec<PersonId> = match previous.get(&template.id) {
                    Some((key, assignees)) if key == prev_key => assignees.clone(),
                    _ => working
                        .iter()
                        .copied()
                        .filter(|pid| ledger.last_assigned.get(pid) == Some(prev_key))
                        .collect(),
                };
                let remaining: Vec<PersonId> = working
                    .iter()
                    .copied()
                    .filter(|pid| !just_served.contains(pid))
                    .collect();
                if remaining.len() < working.len() {
                    if remaining.len() >= min as usize {
                        working = remaining;
                    } else {
                        tracing::debug!(
                            template_id = template.id,
                            period = %period_key,
                            "Avoid-consecutive waived: pool too small after exclusion",
                        );
                        notes.push(PlanNote::ConsecutiveWaived {
                            template_id: template.id,
                            period_key: period_key.clone(),
                        });
                    }
                }
            }
        }

        if let Some(cap) = config.max_assignments_per_period {
            working.retain(|&pid| overlapping(&served, pid, &job.period) < cap);
        }

        let mut order = ledger.rotation_order(&working);
        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }
        if config.balance_workload {
            rank_by_workload(&mut order, ledger, config.tie_break);
        }
        order.truncate(config.headcount_for(template) as usize);
        let assignees = order;

        let staffing = if assignees.len() < min as usize {
            tracing::warn!(
                template_id = template.id,
                period = %period_key,
                required = min,
                assigned = assignees.len(),
                "Slot understaffed",
            );
            notes.push(PlanNote::Understaffed {
                template_id: template.id,
                period_key: period_key.clone(),
                required: min,
                assigned: assignees.len() as u32,
            });
            StaffingFlag::Understaffed
        } else {
            StaffingFlag::Ok
        };

        if !assignees.is_empty() {
            ledger.record_assignment(&assignees, &period_key);
            for &pid in &assignees {
                served.entry(pid).or_default().push((job.period.start, job.period.end));
            }
        }
        previous.insert(template.id, (period_key, assignees.clone()));

        slots.push(PlannedSlot {
            template_id: template.id,
            period: job.period,
            assignees,
            staffing,
            pinned: false,
        });
    }

    tracing::info!(
        slots = slots.len(),
        pinned = slots.iter().filter(|s| s.pinned).count(),
        understaffed = slots
            .iter()
            .filter(|s| s.staffing == StaffingFlag::Understaffed)
            .count(),
        notes = notes.len(),
        "Assignment run complete",
    );

    Ok(AssignmentPlan {
        slots,
        notes,
        ledgers,
    })
}

/// Stable re-rank by lifetime count. Ties keep the incoming order, which is
/// rotation order from the pointer unless the tie-break says otherwise.
fn rank_by_workload(order: &mut [PersonId], ledger: &RotationLedger, tie_break: TieBreak) {
    match tie_break {
        TieBreak::RotationOrder => order.sort_by_key(|&pid| ledger.count_for(pid)),
        TieBreak::LeastRecentlyAssigned => order.sort_by(|a, b| {
            ledger
                .count_for(*a)
                .cmp(&ledger.count_for(*b))
                .then_with(|| ledger.last_assigned.get(a).cmp(&ledger.last_assigned.get(b)))
        }),
    }
}

/// Slots already held by `person` whose period overlaps `period`, across
/// every template in the run.
fn overlapping(
    served: &HashMap<PersonId, Vec<(NaiveDate, NaiveDate)>>,
    person: PersonId,
    period: &Period,
) -> u32 {
    served.get(&person).map_or(0, |spans| {
        spans
            .iter()
            .filter(|(start, end)| *start <= period.end && period.start <= *end)
            .count() as u32
    })
}

fn index_templates(templates: &[ObligationTemplate]) -> BTreeMap<TemplateId, &ObligationTemplate> {
    templates.iter().map(|t| (t.id, t)).collect()
}

/// Periods of `template` inside the request window and its active window.
fn active_periods(
    config: &GenerationConfig,
    template: &ObligationTemplate,
) -> Result<Vec<Period>, CoreError> {
    Ok(Cadence::of(template)?
        .periods(config.start_date, config.end_date)?
        .into_iter()
        .filter(|p| template.is_active_during(p.start, p.end))
        .collect())
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
