//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out every [`RotaEvent`] the scheduling service emits.
//! Share it via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use rota_core::types::PersonId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// RotaEvent
// ---------------------------------------------------------------------------

/// Event names published by the scheduling service.
pub mod kinds {
    pub const GENERATION_COMPLETED: &str = "generation.completed";
    pub const SLOT_UNDERSTAFFED: &str = "slot.understaffed";
    pub const POOL_EMPTY: &str = "template.pool_empty";
    pub const ROTATION_ADVANCED: &str = "rotation.advanced";
    pub const SWAP_REQUESTED: &str = "swap.requested";
    pub const SWAP_APPROVED: &str = "swap.approved";
    pub const SWAP_REJECTED: &str = "swap.rejected";
    pub const SWAP_APPLIED: &str = "swap.applied";
    pub const SWAP_FAILED: &str = "swap.failed";
    pub const INSTANCE_POSTPONED: &str = "instance.postponed";
    pub const INSTANCE_STATUS_CHANGED: &str = "instance.status_changed";
}

/// Something that happened to a template, instance or swap request.
///
/// Built with [`RotaEvent::new`] and the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotaEvent {
    /// Dot-separated event name, one of [`kinds`].
    pub event_type: String,

    /// Entity kind the event is about (`"template"`, `"instance"`,
    /// `"swap_request"`).
    pub source_entity_type: Option<String>,

    /// Id of that entity. Template ids and record uuids are both carried as
    /// strings.
    pub source_entity_id: Option<String>,

    /// Person who triggered the event, when a person did.
    pub actor_person_id: Option<PersonId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl RotaEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_person_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl std::fmt::Display,
    ) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_actor(mut self, person_id: PersonId) -> Self {
        self.actor_person_id = Some(person_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use rota_events::bus::{kinds, EventBus, RotaEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(RotaEvent::new(kinds::ROTATION_ADVANCED).with_source("template", 3));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<RotaEvent>,
}

impl EventBus {
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently if there are
    /// none.
    pub fn publish(&self, event: RotaEvent) {
        tracing::debug!(event_type = %event.event_type, "Publishing event");
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RotaEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
