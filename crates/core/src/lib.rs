//! Rotation and auto-assignment scheduling engine.
//!
//! Pure domain logic with no I/O:
//!
//! - [`calendar`] splits a date range into canonical periods.
//! - [`ledger`] holds each template's "who's next" rotation state.
//! - [`assigner`] decides assignees per (template, period) slot.
//! - [`materializer`] upserts the plan into dated instances.
//! - [`overrides`] applies swaps, advances, postponements and cancellations.
//! - [`engine`] ties generation to a [`store::RotaStore`].

pub mod assigner;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod generation;
pub mod instance;
pub mod ledger;
pub mod materializer;
pub mod overrides;
pub mod person;
pub mod store;
pub mod swap;
pub mod template;
pub mod types;

pub use error::CoreError;
