//! Manual overrides: swap requests, rotation advance, postpone, cancel.
//!
//! Every operation validates fully before its first write. Swap application
//! touches up to five records; if any write fails, the records already
//! written are restored and the request stays `approved` with the failure
//! recorded in `last_error`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::CoreError;
use crate::instance::{InstanceStatus, ObligationInstance};
use crate::ledger::{self, RotationLedger};
use crate::store::RotaStore;
use crate::swap::{normalize_reason, ReasonPolicy, SwapRequest, SwapStatus};
use crate::types::{PersonId, RecordId, TemplateId, Timestamp};

// ---------------------------------------------------------------------------
// Swap requests
// ---------------------------------------------------------------------------

/// Result of applying a swap: the applied request and both updated instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapApplied {
    pub request: SwapRequest,
    pub from_instance: ObligationInstance,
    pub to_instance: ObligationInstance,
}

/// Create a pending swap request after checking both instances can take it.
pub fn request_swap<S: RotaStore + ?Sized>(
    store: &mut S,
    from_instance: RecordId,
    to_instance: RecordId,
    requester: PersonId,
    target: PersonId,
    reason: Option<String>,
    policy: ReasonPolicy,
) -> Result<SwapRequest, CoreError> {
    let request = SwapRequest::new(from_instance, to_instance, requester, target, reason, policy)?;
    let from = load_instance(store, from_instance)?;
    let to = load_instance(store, to_instance)?;
    check_swappable(&from, &to, requester, target)?;

    store.put_swap_request(request.clone())?;
    tracing::info!(
        request_id = %request.id,
        requester,
        target,
        "Swap requested",
    );
    Ok(request)
}

pub fn approve_swap<S: RotaStore + ?Sized>(
    store: &mut S,
    request_id: RecordId,
) -> Result<SwapRequest, CoreError> {
    let mut request = load_request(store, request_id)?;
    request.transition(SwapStatus::Approved)?;
    store.put_swap_request(request.clone())?;
    Ok(request)
}

pub fn reject_swap<S: RotaStore + ?Sized>(
    store: &mut S,
    request_id: RecordId,
    reason: Option<String>,
) -> Result<SwapRequest, CoreError> {
    let reason = normalize_reason(reason)?;
    let mut request = load_request(store, request_id)?;
    request.transition(SwapStatus::Rejected)?;
    request.rejection_reason = reason;
    store.put_swap_request(request.clone())?;
    Ok(request)
}

/// Exchange the requester and target between the two instances and move
/// the assignment counts in the affected ledgers. Pointers are untouched.
pub fn apply_swap<S: RotaStore + ?Sized>(
    store: &mut S,
    request_id: RecordId,
    now: Timestamp,
) -> Result<SwapApplied, CoreError> {
    let mut request = load_request(store, request_id)?;
    // Surfaces ImmutableStateConflict / InvalidTransition without writing.
    request.clone().transition(SwapStatus::Applied)?;

    match try_apply(store, &request, now) {
        Ok(applied) => {
            tracing::info!(
                request_id = %request.id,
                from_instance = %applied.from_instance.id,
                to_instance = %applied.to_instance.id,
                "Swap applied",
            );
            Ok(applied)
        }
        Err(err) => {
            tracing::warn!(request_id = %request.id, error = %err, "Swap failed");
            request.last_error = Some(err.to_string());
            request.updated_at = now;
            if let Err(record_err) = store.put_swap_request(request) {
                tracing::error!(
                    request_id = %request_id,
                    error = %record_err,
                    "Failed to record swap error",
                );
            }
            Err(err)
        }
    }
}

fn try_apply<S: RotaStore + ?Sized>(
    store: &mut S,
    request: &SwapRequest,
    now: Timestamp,
) -> Result<SwapApplied, CoreError> {
    let from = load_instance(store, request.from_instance)?;
    let to = load_instance(store, request.to_instance)?;
    check_swappable(&from, &to, request.requester, request.target)?;

    let mut new_from = from.clone();
    replace_assignee(&mut new_from, request.requester, request.target);
    new_from.updated_at = now;
    let mut new_to = to.clone();
    replace_assignee(&mut new_to, request.target, request.requester);
    new_to.updated_at = now;

    let mut writes = vec![
        (Record::Instance(new_from.clone()), Record::Instance(from.clone())),
        (Record::Instance(new_to.clone()), Record::Instance(to.clone())),
    ];

    let ledger_a = stored_ledger(store, from.template_id);
    if from.template_id == to.template_id {
        let mut updated = ledger_a.clone();
        updated.transfer(request.requester, request.target, &from.period_key);
        updated.transfer(request.target, request.requester, &to.period_key);
        writes.push((Record::Ledger(updated), Record::Ledger(ledger_a)));
    } else {
        let ledger_b = stored_ledger(store, to.template_id);
        let (mut updated_a, mut updated_b) = (ledger_a.clone(), ledger_b.clone());
        ledger::apply_swap(
            &mut updated_a,
            &from.period_key,
            &mut updated_b,
            &to.period_key,
            request.requester,
            request.target,
        );
        writes.push((Record::Ledger(updated_a), Record::Ledger(ledger_a)));
        writes.push((Record::Ledger(updated_b), Record::Ledger(ledger_b)));
    }

    let mut applied = request.clone();
    applied.transition(SwapStatus::Applied)?;
    applied.last_error = None;
    applied.updated_at = now;
    writes.push((
        Record::Request(applied.clone()),
        Record::Request(request.clone()),
    ));

    commit(store, writes)?;
    Ok(SwapApplied {
        request: applied,
        from_instance: new_from,
        to_instance: new_to,
    })
}

fn check_swappable(
    from: &ObligationInstance,
    to: &ObligationInstance,
    requester: PersonId,
    target: PersonId,
) -> Result<(), CoreError> {
    for instance in [from, to] {
        if !instance.status.is_adjustable() {
            return Err(instance.immutable());
        }
    }
    if !from.is_assigned(requester) {
        return Err(CoreError::Validation(format!(
            "Person {requester} is not assigned to instance {}",
            from.id
        )));
    }
    if !to.is_assigned(target) {
        return Err(CoreError::Validation(format!(
            "Person {target} is not assigned to instance {}",
            to.id
        )));
    }
    if from.is_assigned(target) || to.is_assigned(requester) {
        return Err(CoreError::Conflict(
            "Swap would assign the same person twice to one instance".to_string(),
        ));
    }
    Ok(())
}

fn replace_assignee(instance: &mut ObligationInstance, out: PersonId, into: PersonId) {
    for id in instance.assignees.iter_mut() {
        if *id == out {
            *id = into;
        }
    }
}

// ---------------------------------------------------------------------------
// Compensating writes
// ---------------------------------------------------------------------------

enum Record {
    Instance(ObligationInstance),
    Ledger(RotationLedger),
    Request(SwapRequest),
}

fn put<S: RotaStore + ?Sized>(store: &mut S, record: Record) -> Result<(), CoreError> {
    match record {
        Record::Instance(instance) => store.put_instance(instance),
        Record::Ledger(ledger) => store.put_ledger(ledger),
        Record::Request(request) => store.put_swap_request(request),
    }
}

/// Apply `(new, previous)` pairs in order. On the first failure, restore
/// the previous value of everything already written, newest first.
fn commit<S: RotaStore + ?Sized>(
    store: &mut S,
    writes: Vec<(Record, Record)>,
) -> Result<(), CoreError> {
    let mut undo = Vec::with_capacity(writes.len());
    for (next, previous) in writes {
        if let Err(err) = put(store, next) {
            for record in undo.into_iter().rev() {
                if let Err(restore_err) = put(store, record) {
                    tracing::error!(error = %restore_err, "Failed to restore record after swap failure");
                }
            }
            return Err(err);
        }
        undo.push(previous);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

/// Result of a manual rotation advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advanced {
    pub ledger: RotationLedger,
    /// The next eligible active person, for display. `None` when nobody in
    /// the rotation order is currently eligible.
    pub next_person: Option<PersonId>,
}

/// Skip the rotation pointer forward by one. Existing instances are not
/// touched; only future generation sees the change.
///
/// People in the order who are no longer eligible are stepped over so the
/// pointer lands on someone who can actually be assigned.
pub fn advance<S: RotaStore + ?Sized>(
    store: &mut S,
    template_id: TemplateId,
) -> Result<Advanced, CoreError> {
    let template = store
        .template(template_id)
        .ok_or_else(|| CoreError::not_found("ObligationTemplate", template_id))?;
    let mut ledger = stored_ledger(store, template_id);
    let persons = store.persons();
    let eligible = |id: PersonId| {
        persons
            .iter()
            .any(|p| p.id == id && template.is_eligible(p))
    };

    let mut next = ledger.advance()?;
    let mut steps = 1;
    while !eligible(next) && steps < ledger.order.len() {
        next = ledger.advance()?;
        steps += 1;
    }
    let next_person = eligible(next).then_some(next);

    store.put_ledger(ledger.clone())?;
    tracing::info!(template_id, pointer = ledger.pointer, ?next_person, "Rotation advanced");
    Ok(Advanced {
        ledger,
        next_person,
    })
}

// ---------------------------------------------------------------------------
// Postpone / cancel / status
// ---------------------------------------------------------------------------

/// Move a scheduled instance to a later date. Assignees are unchanged and
/// regeneration will leave the instance alone from now on.
pub fn postpone<S: RotaStore + ?Sized>(
    store: &mut S,
    instance_id: RecordId,
    new_date: NaiveDate,
    reason: &str,
    now: Timestamp,
) -> Result<ObligationInstance, CoreError> {
    let reason = normalize_reason(Some(reason.to_string()))?
        .ok_or_else(|| CoreError::Validation("A reason is required to postpone".to_string()))?;
    let mut instance = load_instance(store, instance_id)?;
    if !instance.status.is_adjustable() {
        return Err(instance.immutable());
    }
    if new_date <= instance.scheduled_date {
        return Err(CoreError::Validation(format!(
            "New date {new_date} must be after the current date {}",
            instance.scheduled_date
        )));
    }

    instance.transition(InstanceStatus::Postponed)?;
    instance.scheduled_date = new_date;
    instance.due_date = instance.due_date.max(new_date);
    instance.postpone_reason = Some(reason);
    instance.updated_at = now;
    store.put_instance(instance.clone())?;

    tracing::info!(instance_id = %instance.id, %new_date, "Instance postponed");
    Ok(instance)
}

pub fn cancel<S: RotaStore + ?Sized>(
    store: &mut S,
    instance_id: RecordId,
    now: Timestamp,
) -> Result<ObligationInstance, CoreError> {
    set_status(store, instance_id, InstanceStatus::Cancelled, now)
}

/// Move an instance along its status machine (start, complete, cancel).
/// Postponing goes through [`postpone`] because it needs a date and reason.
pub fn set_status<S: RotaStore + ?Sized>(
    store: &mut S,
    instance_id: RecordId,
    status: InstanceStatus,
    now: Timestamp,
) -> Result<ObligationInstance, CoreError> {
    if status == InstanceStatus::Postponed {
        return Err(CoreError::Validation(
            "Use postpone to move an instance to a new date".to_string(),
        ));
    }
    let mut instance = load_instance(store, instance_id)?;
    instance.transition(status)?;
    instance.updated_at = now;
    store.put_instance(instance.clone())?;
    tracing::info!(instance_id = %instance.id, status = %status, "Instance status changed");
    Ok(instance)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_instance<S: RotaStore + ?Sized>(
    store: &S,
    id: RecordId,
) -> Result<ObligationInstance, CoreError> {
    store
        .instance(id)
        .ok_or_else(|| CoreError::not_found("ObligationInstance", id))
}

fn load_request<S: RotaStore + ?Sized>(store: &S, id: RecordId) -> Result<SwapRequest, CoreError> {
    store
        .swap_request(id)
        .ok_or_else(|| CoreError::not_found("SwapRequest", id))
}

fn stored_ledger<S: RotaStore + ?Sized>(store: &S, template_id: TemplateId) -> RotationLedger {
    store
        .ledger(template_id)
        .unwrap_or_else(|| RotationLedger::new(template_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::assign;
    use crate::calendar::PeriodKey;
    use crate::generation::GenerationConfig;
    use crate::instance::fixtures::instance;
    use crate::materializer::materialize;
    use crate::person::Person;
    use crate::store::MemoryStore;
    use crate::template::fixtures::{date, template};
    use crate::template::Frequency;
    use assert_matches::assert_matches;
    use chrono::Utc;

    const ALICE: PersonId = 1;
    const BOB: PersonId = 2;
    const CAROL: PersonId = 3;

    /// Template 1 with instances A (Alice, March) and B (Bob, April).
    fn store_with_pair() -> (MemoryStore, RecordId, RecordId) {
        let mut store = MemoryStore::new(
            vec![
                Person::new(ALICE, "Alice"),
                Person::new(BOB, "Bob"),
                Person::new(CAROL, "Carol"),
            ],
            vec![template(1, Frequency::Monthly, date(2024, 1, 1))],
        );
        let a = instance(1, "2024-03", date(2024, 3, 1), vec![ALICE]);
        let b = instance(1, "2024-04", date(2024, 4, 1), vec![BOB]);
        let (a_id, b_id) = (a.id, b.id);
        store.put_instance(a).unwrap();
        store.put_instance(b).unwrap();
        let mut ledger = RotationLedger::with_order(1, vec![ALICE, BOB, CAROL]);
        ledger.record_assignment(&[ALICE], &PeriodKey::from("2024-03"));
        ledger.record_assignment(&[BOB], &PeriodKey::from("2024-04"));
        store.put_ledger(ledger).unwrap();
        (store, a_id, b_id)
    }

    fn approved(store: &mut MemoryStore, a: RecordId, b: RecordId) -> RecordId {
        let request = request_swap(store, a, b, ALICE, BOB, None, ReasonPolicy::Optional).unwrap();
        approve_swap(store, request.id).unwrap();
        request.id
    }

    #[test]
    fn swap_exchanges_assignees_and_applies_request() {
        let (mut store, a, b) = store_with_pair();
        let pointer = store.ledger(1).unwrap().pointer;
        let id = approved(&mut store, a, b);

        let applied = apply_swap(&mut store, id, Utc::now()).unwrap();
        assert_eq!(applied.from_instance.assignees, vec![BOB]);
        assert_eq!(applied.to_instance.assignees, vec![ALICE]);
        assert_eq!(applied.request.status, SwapStatus::Applied);
        assert_eq!(store.instance(a).unwrap().assignees, vec![BOB]);
        assert_eq!(store.ledger(1).unwrap().pointer, pointer);

        assert_matches!(
            apply_swap(&mut store, id, Utc::now()),
            Err(CoreError::ImmutableStateConflict { .. })
        );
    }

    #[test]
    fn cross_template_swap_moves_counts() {
        let (mut store, a, _) = store_with_pair();
        store
            .templates
            .push(template(2, Frequency::Monthly, date(2024, 1, 1)));
        let other = instance(2, "2024-04", date(2024, 4, 1), vec![CAROL]);
        let other_id = other.id;
        store.put_instance(other).unwrap();
        let mut ledger_b = RotationLedger::with_order(2, vec![CAROL, ALICE]);
        ledger_b.record_assignment(&[CAROL], &PeriodKey::from("2024-04"));
        store.put_ledger(ledger_b).unwrap();

        let request =
            request_swap(&mut store, a, other_id, ALICE, CAROL, None, ReasonPolicy::Optional)
                .unwrap();
        approve_swap(&mut store, request.id).unwrap();
        apply_swap(&mut store, request.id, Utc::now()).unwrap();

        let (la, lb) = (store.ledger(1).unwrap(), store.ledger(2).unwrap());
        assert_eq!((la.count_for(ALICE), la.count_for(CAROL)), (0, 1));
        assert_eq!((lb.count_for(CAROL), lb.count_for(ALICE)), (0, 1));
    }

    #[test]
    fn unapproved_swap_cannot_be_applied() {
        let (mut store, a, b) = store_with_pair();
        let request =
            request_swap(&mut store, a, b, ALICE, BOB, None, ReasonPolicy::Optional).unwrap();
        assert_matches!(
            apply_swap(&mut store, request.id, Utc::now()),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn rejected_swap_is_terminal() {
        let (mut store, a, b) = store_with_pair();
        let request =
            request_swap(&mut store, a, b, ALICE, BOB, None, ReasonPolicy::Optional).unwrap();
        let rejected = reject_swap(&mut store, request.id, Some("no".to_string())).unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("no"));
        assert_matches!(
            approve_swap(&mut store, request.id),
            Err(CoreError::ImmutableStateConflict { .. })
        );
    }

    #[test]
    fn request_requires_membership() {
        let (mut store, a, b) = store_with_pair();
        assert_matches!(
            request_swap(&mut store, a, b, BOB, ALICE, None, ReasonPolicy::Optional),
            Err(CoreError::Validation(_))
        );
        assert!(store.swap_requests.is_empty());
    }

    #[test]
    fn swap_against_cancelled_instance_is_immutable() {
        let (mut store, a, b) = store_with_pair();
        let id = approved(&mut store, a, b);
        cancel(&mut store, b, Utc::now()).unwrap();

        assert_matches!(
            apply_swap(&mut store, id, Utc::now()),
            Err(CoreError::ImmutableStateConflict { .. })
        );
        let request = store.swap_request(id).unwrap();
        assert_eq!(request.status, SwapStatus::Approved);
        assert!(request.last_error.is_some());
        assert_eq!(store.instance(a).unwrap().assignees, vec![ALICE]);
    }

    /// Delegates to a memory store but fails the nth instance write.
    struct FailingStore {
        inner: MemoryStore,
        fail_on_instance_write: usize,
        instance_writes: usize,
    }

    impl RotaStore for FailingStore {
        fn persons(&self) -> Vec<Person> {
            self.inner.persons()
        }
        fn person(&self, id: PersonId) -> Option<Person> {
            self.inner.person(id)
        }
        fn template(&self, id: TemplateId) -> Option<crate::template::ObligationTemplate> {
            self.inner.template(id)
        }
        fn ledger(&self, template_id: TemplateId) -> Option<RotationLedger> {
            self.inner.ledger(template_id)
        }
        fn put_ledger(&mut self, ledger: RotationLedger) -> Result<(), CoreError> {
            self.inner.put_ledger(ledger)
        }
        fn instance(&self, id: RecordId) -> Option<ObligationInstance> {
            self.inner.instance(id)
        }
        fn instance_by_key(
            &self,
            template_id: TemplateId,
            key: &PeriodKey,
        ) -> Option<ObligationInstance> {
            self.inner.instance_by_key(template_id, key)
        }
        fn instances_for(&self, template_ids: &[TemplateId]) -> Vec<ObligationInstance> {
            self.inner.instances_for(template_ids)
        }
        fn put_instance(&mut self, instance: ObligationInstance) -> Result<(), CoreError> {
            self.instance_writes += 1;
            if self.instance_writes == self.fail_on_instance_write {
                return Err(CoreError::Internal("disk full".to_string()));
            }
            self.inner.put_instance(instance)
        }
        fn swap_request(&self, id: RecordId) -> Option<SwapRequest> {
            self.inner.swap_request(id)
        }
        fn put_swap_request(&mut self, request: SwapRequest) -> Result<(), CoreError> {
            self.inner.put_swap_request(request)
        }
    }

    #[test]
    fn failure_between_instance_writes_restores_both() {
        let (mut inner, a, b) = store_with_pair();
        let id = approved(&mut inner, a, b);
        let ledger_before = inner.ledger(1).unwrap();
        let mut store = FailingStore {
            inner,
            // First write (from instance) succeeds, second (to instance) fails.
            fail_on_instance_write: 2,
            instance_writes: 0,
        };

        assert_matches!(
            apply_swap(&mut store, id, Utc::now()),
            Err(CoreError::Internal(_))
        );
        assert_eq!(store.instance(a).unwrap().assignees, vec![ALICE]);
        assert_eq!(store.instance(b).unwrap().assignees, vec![BOB]);
        assert_eq!(store.ledger(1).unwrap(), ledger_before);
        let request = store.swap_request(id).unwrap();
        assert_eq!(request.status, SwapStatus::Approved);
        assert_eq!(
            request.last_error.as_deref(),
            Some("Internal error: disk full")
        );
    }

    #[test]
    fn advance_moves_pointer_and_reports_next() {
        let (mut store, _, _) = store_with_pair();
        // Pointer sits on Carol after Alice and Bob were recorded.
        let advanced = advance(&mut store, 1).unwrap();
        assert_eq!(advanced.next_person, Some(ALICE));
        assert_eq!(store.ledger(1).unwrap().pointer, 0);
    }

    #[test]
    fn advance_steps_over_inactive_people() {
        let (mut store, _, _) = store_with_pair();
        store.persons[0] = Person::new(ALICE, "Alice").deactivated();
        let advanced = advance(&mut store, 1).unwrap();
        assert_eq!(advanced.next_person, Some(BOB));
    }

    #[test]
    fn advance_without_ledger_is_empty_pool() {
        let (mut store, _, _) = store_with_pair();
        store
            .templates
            .push(template(5, Frequency::Weekly, date(2024, 1, 1)));
        assert_matches!(
            advance(&mut store, 5),
            Err(CoreError::EmptyEligiblePool { template_id: 5 })
        );
    }

    #[test]
    fn postpone_requires_reason_and_later_date() {
        let (mut store, a, _) = store_with_pair();
        assert_matches!(
            postpone(&mut store, a, date(2024, 3, 8), "  ", Utc::now()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            postpone(&mut store, a, date(2024, 3, 1), "sick", Utc::now()),
            Err(CoreError::Validation(_))
        );
        assert_eq!(store.instance(a).unwrap().status, InstanceStatus::Scheduled);

        let moved = postpone(&mut store, a, date(2024, 3, 8), "sick", Utc::now()).unwrap();
        assert_eq!(moved.status, InstanceStatus::Postponed);
        assert_eq!(moved.scheduled_date, date(2024, 3, 8));
        assert_eq!(moved.assignees, vec![ALICE]);
        assert_eq!(moved.postpone_reason.as_deref(), Some("sick"));
    }

    #[test]
    fn postponing_cancelled_instance_is_immutable() {
        let (mut store, a, _) = store_with_pair();
        cancel(&mut store, a, Utc::now()).unwrap();
        assert_matches!(
            postpone(&mut store, a, date(2024, 3, 8), "sick", Utc::now()),
            Err(CoreError::ImmutableStateConflict { .. })
        );
    }

    #[test]
    fn status_machine_runs_through_completion() {
        let (mut store, a, _) = store_with_pair();
        set_status(&mut store, a, InstanceStatus::InProgress, Utc::now()).unwrap();
        set_status(&mut store, a, InstanceStatus::Completed, Utc::now()).unwrap();
        assert_matches!(
            cancel(&mut store, a, Utc::now()),
            Err(CoreError::ImmutableStateConflict { .. })
        );
    }

    #[test]
    fn regeneration_leaves_postponed_instance_untouched() {
        let t = template(1, Frequency::Monthly, date(2024, 1, 1));
        let people = vec![Person::new(ALICE, "Alice"), Person::new(BOB, "Bob")];
        let mut store = MemoryStore::new(people.clone(), vec![t.clone()]);
        let config = GenerationConfig::new(date(2024, 1, 1), date(2024, 3, 31))
            .with_templates([1])
            .with_people([ALICE, BOB]);

        let plan = assign(&config, &[t.clone()], &people, Default::default(), &[]).unwrap();
        for inst in materialize(&plan, &[t.clone()], &[], Utc::now())
            .unwrap()
            .created
        {
            store.put_instance(inst).unwrap();
        }
        let feb = store
            .instance_by_key(1, &PeriodKey::from("2024-02"))
            .unwrap();
        let postponed = postpone(&mut store, feb.id, date(2024, 2, 20), "travel", Utc::now()).unwrap();

        let existing = store.instances_for(&[1]);
        let config = config.regenerating_scheduled();
        let replan = assign(&config, &[t.clone()], &people, Default::default(), &existing).unwrap();
        let outcome = materialize(&replan, &[t], &existing, Utc::now()).unwrap();
        assert!(outcome.writes().all(|i| i.id != postponed.id));
        assert!(outcome.created.is_empty());
    }
}
