//! The scheduling service: the engine behind locks, a transaction boundary,
//! and the event bus.
//!
//! Generation works on a snapshot of the store taken once at the start and
//! commits every instance and ledger it produced in a single step, so a
//! failed run leaves the store exactly as it was.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rota_core::assigner::PlanNote;
use rota_core::engine::{self, GenerationOutcome};
use rota_core::generation::GenerationConfig;
use rota_core::instance::{InstanceStatus, ObligationInstance};
use rota_core::overrides::{self, Advanced, SwapApplied};
use rota_core::store::{MemoryStore, RotaStore};
use rota_core::swap::SwapRequest;
use rota_core::types::{PersonId, RecordId, TemplateId};
use rota_core::CoreError;
use rota_events::{kinds, EventBus, RotaEvent};
use tokio::sync::RwLock;

use crate::config::WorkerConfig;
use crate::locks::{LockKey, LockRegistry};

pub struct RotaService {
    store: RwLock<MemoryStore>,
    locks: LockRegistry,
    bus: Arc<EventBus>,
    config: WorkerConfig,
}

impl RotaService {
    pub fn new(store: MemoryStore, config: WorkerConfig, bus: Arc<EventBus>) -> Self {
        Self {
            store: RwLock::new(store),
            locks: LockRegistry::new(config.lock_timeout),
            bus,
            config,
        }
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// A copy of the current store contents.
    pub async fn snapshot(&self) -> MemoryStore {
        self.store.read().await.clone()
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    pub async fn preview(&self, config: &GenerationConfig) -> Result<usize, CoreError> {
        let store = self.store.read().await;
        engine::preview(&*store, config)
    }

    /// Run a generation request under its template locks.
    pub async fn generate(
        &self,
        config: &GenerationConfig,
    ) -> Result<GenerationOutcome, CoreError> {
        config.validate_request()?;
        let _locks = self
            .locks
            .acquire(config.template_ids.iter().map(|&id| LockKey::Template(id)))
            .await?;

        let mut working = self.snapshot().await;
        let outcome = engine::generate(&mut working, config, Utc::now())?;

        {
            let mut store = self.store.write().await;
            let mut next = store.clone();
            for instance in outcome.instances.writes() {
                next.put_instance(instance.clone())?;
            }
            for ledger in outcome.plan.ledgers.values() {
                next.put_ledger(ledger.clone())?;
            }
            *store = next;
        }

        tracing::info!(
            templates = config.template_ids.len(),
            slots = outcome.plan.slots.len(),
            created = outcome.instances.created.len(),
            updated = outcome.instances.updated.len(),
            understaffed = outcome.plan.understaffed_count(),
            "Generation committed",
        );
        self.publish_generation(&outcome);
        Ok(outcome)
    }

    fn publish_generation(&self, outcome: &GenerationOutcome) {
        for note in &outcome.plan.notes {
            match note {
                PlanNote::Understaffed {
                    template_id,
                    period_key,
                    required,
                    assigned,
                } => self.bus.publish(
                    RotaEvent::new(kinds::SLOT_UNDERSTAFFED)
                        .with_source("template", template_id)
                        .with_payload(serde_json::json!({
                            "period_key": period_key,
                            "required": required,
                            "assigned": assigned,
                        })),
                ),
                PlanNote::EmptyEligiblePool { template_id } => self.bus.publish(
                    RotaEvent::new(kinds::POOL_EMPTY).with_source("template", template_id),
                ),
                PlanNote::TemplateInactive { .. } | PlanNote::ConsecutiveWaived { .. } => {}
            }
        }
        self.bus.publish(
            RotaEvent::new(kinds::GENERATION_COMPLETED).with_payload(serde_json::json!({
                "preview_count": outcome.preview_count,
                "created": outcome.instances.created.len(),
                "updated": outcome.instances.updated.len(),
                "unchanged": outcome.instances.unchanged.len(),
                "skipped": outcome.instances.skipped.len(),
            })),
        );
    }

    // -----------------------------------------------------------------------
    // Swaps
    // -----------------------------------------------------------------------

    /// Create a pending swap request using the configured reason policy.
    pub async fn request_swap(
        &self,
        from_instance: RecordId,
        to_instance: RecordId,
        requester: PersonId,
        target: PersonId,
        reason: Option<String>,
    ) -> Result<SwapRequest, CoreError> {
        let mut store = self.store.write().await;
        let request = overrides::request_swap(
            &mut *store,
            from_instance,
            to_instance,
            requester,
            target,
            reason,
            self.config.swap_reason,
        )?;
        drop(store);
        self.publish_swap(kinds::SWAP_REQUESTED, &request);
        Ok(request)
    }

    pub async fn approve_swap(&self, request_id: RecordId) -> Result<SwapRequest, CoreError> {
        let request = overrides::approve_swap(&mut *self.store.write().await, request_id)?;
        self.publish_swap(kinds::SWAP_APPROVED, &request);
        Ok(request)
    }

    pub async fn reject_swap(
        &self,
        request_id: RecordId,
        reason: Option<String>,
    ) -> Result<SwapRequest, CoreError> {
        let request = overrides::reject_swap(&mut *self.store.write().await, request_id, reason)?;
        self.publish_swap(kinds::SWAP_REJECTED, &request);
        Ok(request)
    }

    /// Apply an approved swap while holding both instances and both
    /// templates. Fails closed with `LockTimeout` if any of them is busy.
    pub async fn apply_swap(&self, request_id: RecordId) -> Result<SwapApplied, CoreError> {
        let keys = self.swap_lock_keys(request_id).await?;
        let _locks = self.locks.acquire(keys).await?;

        let result = {
            let mut store = self.store.write().await;
            overrides::apply_swap(&mut *store, request_id, Utc::now())
        };
        match &result {
            Ok(applied) => self.publish_swap(kinds::SWAP_APPLIED, &applied.request),
            Err(err) => self.bus.publish(
                RotaEvent::new(kinds::SWAP_FAILED)
                    .with_source("swap_request", request_id)
                    .with_payload(serde_json::json!({ "error": err.to_string() })),
            ),
        }
        result
    }

    async fn swap_lock_keys(&self, request_id: RecordId) -> Result<Vec<LockKey>, CoreError> {
        let store = self.store.read().await;
        let request = store
            .swap_request(request_id)
            .ok_or_else(|| CoreError::not_found("SwapRequest", request_id))?;
        let mut keys = vec![
            LockKey::Instance(request.from_instance),
            LockKey::Instance(request.to_instance),
        ];
        for id in [request.from_instance, request.to_instance] {
            if let Some(instance) = store.instance(id) {
                keys.push(LockKey::Template(instance.template_id));
            }
        }
        Ok(keys)
    }

    /// The instance and its template, so overrides serialise with any
    /// generation run over the same template.
    async fn instance_lock_keys(&self, instance_id: RecordId) -> Result<Vec<LockKey>, CoreError> {
        let store = self.store.read().await;
        let instance = store
            .instance(instance_id)
            .ok_or_else(|| CoreError::not_found("ObligationInstance", instance_id))?;
        Ok(vec![
            LockKey::Template(instance.template_id),
            LockKey::Instance(instance_id),
        ])
    }

    fn publish_swap(&self, event_type: &str, request: &SwapRequest) {
        self.bus.publish(
            RotaEvent::new(event_type)
                .with_source("swap_request", request.id)
                .with_actor(request.requester)
                .with_payload(serde_json::json!({
                    "from_instance": request.from_instance,
                    "to_instance": request.to_instance,
                    "target": request.target,
                    "status": request.status,
                })),
        );
    }

    // -----------------------------------------------------------------------
    // Rotation and instance overrides
    // -----------------------------------------------------------------------

    pub async fn advance(&self, template_id: TemplateId) -> Result<Advanced, CoreError> {
        let _locks = self.locks.acquire([LockKey::Template(template_id)]).await?;
        let advanced = overrides::advance(&mut *self.store.write().await, template_id)?;
        self.bus.publish(
            RotaEvent::new(kinds::ROTATION_ADVANCED)
                .with_source("template", template_id)
                .with_payload(serde_json::json!({
                    "pointer": advanced.ledger.pointer,
                    "next_person": advanced.next_person,
                })),
        );
        Ok(advanced)
    }

    pub async fn postpone(
        &self,
        instance_id: RecordId,
        new_date: NaiveDate,
        reason: &str,
    ) -> Result<ObligationInstance, CoreError> {
        let _locks = self
            .locks
            .acquire(self.instance_lock_keys(instance_id).await?)
            .await?;
        let instance = overrides::postpone(
            &mut *self.store.write().await,
            instance_id,
            new_date,
            reason,
            Utc::now(),
        )?;
        self.bus.publish(
            RotaEvent::new(kinds::INSTANCE_POSTPONED)
                .with_source("instance", instance.id)
                .with_payload(serde_json::json!({
                    "scheduled_date": instance.scheduled_date,
                    "reason": instance.postpone_reason,
                })),
        );
        Ok(instance)
    }

    pub async fn cancel(&self, instance_id: RecordId) -> Result<ObligationInstance, CoreError> {
        self.set_status(instance_id, InstanceStatus::Cancelled).await
    }

    pub async fn set_status(
        &self,
        instance_id: RecordId,
        status: InstanceStatus,
    ) -> Result<ObligationInstance, CoreError> {
        let _locks = self
            .locks
            .acquire(self.instance_lock_keys(instance_id).await?)
            .await?;
        let instance = overrides::set_status(
            &mut *self.store.write().await,
            instance_id,
            status,
            Utc::now(),
        )?;
        self.bus.publish(
            RotaEvent::new(kinds::INSTANCE_STATUS_CHANGED)
                .with_source("instance", instance.id)
                .with_payload(serde_json::json!({ "status": instance.status })),
        );
        Ok(instance)
    }
}
