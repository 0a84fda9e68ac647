#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rota_core::generation::GenerationConfig;
use rota_core::store::MemoryStore;
use rota_events::EventBus;
use rota_worker::{RotaService, WorkerConfig};

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const CAROL: i64 = 3;
pub const DAVE: i64 = 4;

/// Weekly kitchen cleaning (template 1, one person) and a monthly lab
/// meeting (template 2, one presenter from the `presenter` category).
pub const SNAPSHOT: &str = r#"{
    "persons": [
        {"id": 1, "display_name": "Alice", "tags": ["presenter"]},
        {"id": 2, "display_name": "Bob", "tags": ["presenter"]},
        {"id": 3, "display_name": "Carol"},
        {"id": 4, "display_name": "Dave", "tags": ["presenter"]}
    ],
    "templates": [
        {
            "id": 1,
            "name": "Kitchen cleaning",
            "kind": "task",
            "frequency": "weekly",
            "interval": 1,
            "start_date": "2024-01-01",
            "end_date": null,
            "people": {"min": 1, "max": 1, "default": 1},
            "is_active": true
        },
        {
            "id": 2,
            "name": "Lab meeting",
            "kind": "meeting",
            "frequency": "monthly",
            "interval": 1,
            "start_date": "2024-01-01",
            "end_date": null,
            "people": {"min": 1, "max": 2, "default": 1},
            "category": "presenter",
            "priority": "high",
            "is_active": true,
            "start_time": "14:00:00",
            "duration_minutes": 60
        }
    ]
}"#;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn snapshot() -> MemoryStore {
    serde_json::from_str(SNAPSHOT).expect("test snapshot should parse")
}

pub fn test_config() -> WorkerConfig {
    WorkerConfig {
        lock_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}

pub fn service() -> RotaService {
    service_with(snapshot(), test_config())
}

pub fn service_with(store: MemoryStore, config: WorkerConfig) -> RotaService {
    let bus = Arc::new(EventBus::new(config.event_capacity));
    RotaService::new(store, config, bus)
}

/// Four weeks of kitchen cleaning for Alice, Bob and Carol.
pub fn cleaning_request() -> GenerationConfig {
    GenerationConfig::new(date(2024, 1, 1), date(2024, 1, 28))
        .with_templates([1])
        .with_people([ALICE, BOB, CAROL])
}
