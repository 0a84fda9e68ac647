//! Generation run against a [`RotaStore`]: snapshot, assign, materialize,
//! write back.
//!
//! The writes are not atomic on their own. Callers run this inside their
//! transaction boundary (the worker runs it on a copy of the store and
//! swaps the copy in only on success).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::assigner::{self, AssignmentPlan};
use crate::error::CoreError;
use crate::generation::GenerationConfig;
use crate::materializer::{self, MaterializeOutcome};
use crate::store::RotaStore;
use crate::template::ObligationTemplate;
use crate::types::{TemplateId, Timestamp};

/// Everything a generation run decided and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// Slots the window implies before pools and overrides are consulted.
    pub preview_count: usize,
    pub plan: AssignmentPlan,
    pub instances: MaterializeOutcome,
}

/// Count the slots a run over `config` would produce, without writing.
pub fn preview<S: RotaStore + ?Sized>(
    store: &S,
    config: &GenerationConfig,
) -> Result<usize, CoreError> {
    let templates = load_templates(store, &config.template_ids)?;
    assigner::preview(config, &templates)
}

/// Plan and materialize every selected template over the window, then
/// persist the instances and the advanced ledgers.
pub fn generate<S: RotaStore + ?Sized>(
    store: &mut S,
    config: &GenerationConfig,
    now: Timestamp,
) -> Result<GenerationOutcome, CoreError> {
    config.validate_request()?;
    let templates = load_templates(store, &config.template_ids)?;
    let persons = store.persons();
    let ledgers: BTreeMap<TemplateId, _> = config
        .template_ids
        .iter()
        .filter_map(|&id| store.ledger(id).map(|ledger| (id, ledger)))
        .collect();
    let existing = store.instances_for(&config.template_ids);

    let preview_count = assigner::preview(config, &templates)?;
    let plan = assigner::assign(config, &templates, &persons, ledgers, &existing)?;
    let instances = materializer::materialize(&plan, &templates, &existing, now)?;

    for instance in instances.writes() {
        store.put_instance(instance.clone())?;
    }
    for ledger in plan.ledgers.values() {
        store.put_ledger(ledger.clone())?;
    }

    Ok(GenerationOutcome {
        preview_count,
        plan,
        instances,
    })
}

fn load_templates<S: RotaStore + ?Sized>(
    store: &S,
    ids: &[TemplateId],
) -> Result<Vec<ObligationTemplate>, CoreError> {
    ids.iter()
        .map(|&id| {
            store
                .template(id)
                .ok_or_else(|| CoreError::not_found("ObligationTemplate", id))
        })
        .collect()
}
