//! Per-template rotation ledger.
//!
//! The ledger is the durable "who's next" state for one template: the
//! rotation order, a pointer into it, and per-person bookkeeping. It is
//! passed into the assigner by value and handed back updated; nothing here
//! is shared or global.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::calendar::PeriodKey;
use crate::error::CoreError;
use crate::types::{PersonId, TemplateId};

/// Rotation state for one template.
///
/// Invariant: `pointer < order.len()` whenever `order` is non-empty. An
/// empty ledger blocks generation for its template until a non-empty pool
/// populates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationLedger {
    pub template_id: TemplateId,
    /// Rotation order. May contain people no longer in any pool; those are
    /// skipped rather than dropped so their position survives a return.
    pub order: Vec<PersonId>,
    /// Index of the next person in `order`.
    pub pointer: usize,
    /// Lifetime assignment count per person.
    #[serde(default)]
    pub counts: BTreeMap<PersonId, u32>,
    /// Most recent period each person was assigned in.
    #[serde(default)]
    pub last_assigned: BTreeMap<PersonId, PeriodKey>,
}

impl RotationLedger {
    /// An empty ledger, created the first time a template participates.
    pub fn new(template_id: TemplateId) -> Self {
        Self {
            template_id,
            ..Default::default()
        }
    }

    /// A ledger explicitly populated by an administrator.
    pub fn with_order(template_id: TemplateId, order: Vec<PersonId>) -> Self {
        let mut ledger = Self::new(template_id);
        ledger.merge(&order);
        ledger
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The person the pointer currently designates.
    pub fn current(&self) -> Option<PersonId> {
        self.order.get(self.pointer).copied()
    }

    pub fn count_for(&self, person: PersonId) -> u32 {
        self.counts.get(&person).copied().unwrap_or(0)
    }

    /// Append pool members missing from the order, preserving the relative
    /// order of existing members (stable merge).
    pub fn merge(&mut self, pool: &[PersonId]) {
        let mut known: HashSet<PersonId> = self.order.iter().copied().collect();
        for &id in pool {
            if known.insert(id) {
                self.order.push(id);
            }
        }
        if self.pointer >= self.order.len() {
            self.pointer = 0;
        }
    }

    /// Every pool member in rotation order, starting at the pointer.
    ///
    /// New pool members are placed after the stored order, exactly as
    /// [`merge`](Self::merge) would place them; the ledger itself is not
    /// modified.
    pub fn rotation_order(&self, pool: &[PersonId]) -> Vec<PersonId> {
        let mut merged = self.clone();
        merged.merge(pool);

        let len = merged.order.len();
        if len == 0 {
            return Vec::new();
        }
        let in_pool: HashSet<PersonId> = pool.iter().copied().collect();
        (0..len)
            .map(|i| merged.order[(merged.pointer + i) % len])
            .filter(|id| in_pool.contains(id))
            .collect()
    }

    /// Up to `count` pool members, walking circularly from the pointer.
    ///
    /// Fewer than `count` means the pool is exhausted and the caller must
    /// treat the slot as understaffed.
    pub fn next_candidates(&self, pool: &[PersonId], count: usize) -> Vec<PersonId> {
        let mut order = self.rotation_order(pool);
        order.truncate(count);
        order
    }

    /// Record that `person_ids` were assigned in `period`: move the pointer
    /// past the last selected person and update the bookkeeping.
    pub fn record_assignment(&mut self, person_ids: &[PersonId], period: &PeriodKey) {
        let Some(&last) = person_ids.last() else {
            return;
        };
        self.merge(person_ids);
        if let Some(idx) = self.order.iter().position(|&id| id == last) {
            self.pointer = (idx + 1) % self.order.len();
        }
        for &id in person_ids {
            *self.counts.entry(id).or_insert(0) += 1;
            self.last_assigned.insert(id, period.clone());
        }
    }

    /// Undo the counts of a superseded assignment. The pointer and
    /// last-assigned periods are left as they are.
    pub fn release(&mut self, person_ids: &[PersonId]) {
        for id in person_ids {
            if let Some(count) = self.counts.get_mut(id) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Move the pointer one position forward, wrapping around, and return
    /// the newly designated person.
    pub fn advance(&mut self) -> Result<PersonId, CoreError> {
        if self.order.is_empty() {
            return Err(CoreError::EmptyEligiblePool {
                template_id: self.template_id,
            });
        }
        self.pointer = (self.pointer + 1) % self.order.len();
        Ok(self.order[self.pointer])
    }

    /// Move one assignment in `period` from `from` to `to`. The pointer is
    /// never rewound.
    pub fn transfer(&mut self, from: PersonId, to: PersonId, period: &PeriodKey) {
        if let Some(count) = self.counts.get_mut(&from) {
            *count = count.saturating_sub(1);
        }
        *self.counts.entry(to).or_insert(0) += 1;
        if !self.order.contains(&to) {
            self.order.push(to);
        }
        let newer = self
            .last_assigned
            .get(&to)
            .map_or(true, |existing| existing < period);
        if newer {
            self.last_assigned.insert(to, period.clone());
        }
    }
}

/// Bookkeeping for a swap between instances of two different templates.
///
/// `requester` leaves `period_a` (ledger A) and takes `target`'s place in
/// `period_b` (ledger B); `target` moves the other way.
pub fn apply_swap(
    ledger_a: &mut RotationLedger,
    period_a: &PeriodKey,
    ledger_b: &mut RotationLedger,
    period_b: &PeriodKey,
    requester: PersonId,
    target: PersonId,
) {
    ledger_a.transfer(requester, target, period_a);
    ledger_b.transfer(target, requester, period_b);
}
