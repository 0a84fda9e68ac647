//! The storage seam the override controller and generation pipeline work
//! against, plus an in-memory implementation.
//!
//! Persistence technology is a caller concern. Implementations must make
//! each `put_*` durable on its own; cross-record atomicity is provided by
//! the operations in [`crate::overrides`] through compensating writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::PeriodKey;
use crate::error::CoreError;
use crate::instance::ObligationInstance;
use crate::ledger::RotationLedger;
use crate::person::Person;
use crate::swap::SwapRequest;
use crate::template::ObligationTemplate;
use crate::types::{PersonId, RecordId, TemplateId};

pub trait RotaStore {
    fn persons(&self) -> Vec<Person>;
    fn person(&self, id: PersonId) -> Option<Person>;
    fn template(&self, id: TemplateId) -> Option<ObligationTemplate>;

    fn ledger(&self, template_id: TemplateId) -> Option<RotationLedger>;
    fn put_ledger(&mut self, ledger: RotationLedger) -> Result<(), CoreError>;

    fn instance(&self, id: RecordId) -> Option<ObligationInstance>;
    fn instance_by_key(&self, template_id: TemplateId, key: &PeriodKey)
        -> Option<ObligationInstance>;
    /// All instances of the given templates, in natural-key order.
    fn instances_for(&self, template_ids: &[TemplateId]) -> Vec<ObligationInstance>;
    /// Insert or replace by id. Must reject a second instance with the same
    /// natural key.
    fn put_instance(&mut self, instance: ObligationInstance) -> Result<(), CoreError>;

    fn swap_request(&self, id: RecordId) -> Option<SwapRequest>;
    fn put_swap_request(&mut self, request: SwapRequest) -> Result<(), CoreError>;
}

/// Everything the engine knows, held in memory. Also the on-disk snapshot
/// format read by the worker binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub templates: Vec<ObligationTemplate>,
    #[serde(default)]
    pub ledgers: BTreeMap<TemplateId, RotationLedger>,
    #[serde(default)]
    pub instances: Vec<ObligationInstance>,
    #[serde(default)]
    pub swap_requests: Vec<SwapRequest>,
}

impl MemoryStore {
    pub fn new(persons: Vec<Person>, templates: Vec<ObligationTemplate>) -> Self {
        Self {
            persons,
            templates,
            ..Default::default()
        }
    }

    /// Templates matching `ids`, in the order given. Unknown ids are skipped.
    pub fn templates_for(&self, ids: &[TemplateId]) -> Vec<ObligationTemplate> {
        ids.iter().filter_map(|&id| self.template(id)).collect()
    }

    /// Ledgers for `ids` that already exist.
    pub fn ledgers_for(&self, ids: &[TemplateId]) -> BTreeMap<TemplateId, RotationLedger> {
        ids.iter()
            .filter_map(|id| self.ledgers.get(id).map(|l| (*id, l.clone())))
            .collect()
    }
}

impl RotaStore for MemoryStore {
    fn persons(&self) -> Vec<Person> {
        self.persons.clone()
    }

    fn person(&self, id: PersonId) -> Option<Person> {
        self.persons.iter().find(|p| p.id == id).cloned()
    }

    fn template(&self, id: TemplateId) -> Option<ObligationTemplate> {
        self.templates.iter().find(|t| t.id == id).cloned()
    }

    fn ledger(&self, template_id: TemplateId) -> Option<RotationLedger> {
        self.ledgers.get(&template_id).cloned()
    }

    fn put_ledger(&mut self, ledger: RotationLedger) -> Result<(), CoreError> {
        self.ledgers.insert(ledger.template_id, ledger);
        Ok(())
    }

    fn instance(&self, id: RecordId) -> Option<ObligationInstance> {
        self.instances.iter().find(|i| i.id == id).cloned()
    }

    fn instance_by_key(
        &self,
        template_id: TemplateId,
        key: &PeriodKey,
    ) -> Option<ObligationInstance> {
        self.instances
            .iter()
            .find(|i| i.natural_key() == (template_id, key))
            .cloned()
    }

    fn instances_for(&self, template_ids: &[TemplateId]) -> Vec<ObligationInstance> {
        let mut found: Vec<ObligationInstance> = self
            .instances
            .iter()
            .filter(|i| template_ids.contains(&i.template_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.natural_key().cmp(&b.natural_key()));
        found
    }

    fn put_instance(&mut self, instance: ObligationInstance) -> Result<(), CoreError> {
        let clash = self
            .instances
            .iter()
            .any(|i| i.id != instance.id && i.natural_key() == instance.natural_key());
        if clash {
            return Err(CoreError::Conflict(format!(
                "Instance for template {} in period {} already exists",
                instance.template_id, instance.period_key
            )));
        }
        match self.instances.iter_mut().find(|i| i.id == instance.id) {
            Some(slot) => *slot = instance,
            None => self.instances.push(instance),
        }
        Ok(())
    }

    fn swap_request(&self, id: RecordId) -> Option<SwapRequest> {
        self.swap_requests.iter().find(|r| r.id == id).cloned()
    }

    fn put_swap_request(&mut self, request: SwapRequest) -> Result<(), CoreError> {
        match self.swap_requests.iter_mut().find(|r| r.id == request.id) {
            Some(slot) => *slot = request,
            None => self.swap_requests.push(request),
        }
        Ok(())
    }
}
