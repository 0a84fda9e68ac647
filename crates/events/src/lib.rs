//! Rota event bus.
//!
//! - [`EventBus`] is an in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`RotaEvent`] is the event envelope the scheduling service emits for
//!   generation runs, staffing shortfalls, rotation advances, swaps and
//!   postponements.

pub mod bus;

pub use bus::{kinds, EventBus, RotaEvent};
