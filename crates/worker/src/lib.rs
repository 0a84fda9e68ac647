//! Rota scheduling service.
//!
//! Wraps the pure engine in `rota-core` with what a caller needs to run it
//! safely: per-template and per-instance locks with a bounded wait, an
//! all-or-nothing commit for generation runs, and event publication.

pub mod config;
pub mod locks;
pub mod service;

pub use config::{ConfigError, WorkerConfig};
pub use service::RotaService;
