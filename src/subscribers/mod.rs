//! # Event subscribers for the integrations manager.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that
//! fans runtime events out to every attached subscriber.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   run loop / Manager ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                         │
//!                                                         ▼
//!                                                   SubscriberSet::emit
//!                                                 ┌───────┼────────┐
//!                                                 ▼       ▼        ▼
//!                                              Alerts  Audit    Custom ...
//! ```

mod set;
mod subscribe;

pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
