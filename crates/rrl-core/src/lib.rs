//! Core infrastructure shared across the `rrl` scheduler workspace.
//!
//! This crate provides:
//! - the event system used for observability (`events`)
//! - a unified error wrapper for composing the scheduler with other
//!   middleware (`error`)
//! - the virtual/real time model the scheduler's dispatch loop and
//!   delay-queue tiers are built on (`time`)

pub mod error;
pub mod events;
pub mod time;

pub use error::ResilienceError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use time::Clock;
