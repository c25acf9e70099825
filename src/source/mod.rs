// src/source/mod.rs

//! Monitored value sources and the subscription adapter.
//!
//! This module is responsible for:
//! - The [`ValueSource`] seam through which a named value is monitored.
//! - Turning notifications delivered on the source's own thread into
//!   [`ChangeEvent`]s appended to an [`EventQueue`].
//! - Guaranteeing that a subscription is released exactly once
//!   ([`Subscription`]).
//!
//! It does **not** invoke user code; decision callbacks run on the trigger
//! loop, see [`crate::engine`].

pub mod event;
pub mod queue;
pub mod simulated;
pub mod subscription;

pub use event::{ChangeEvent, EventFields};
pub use queue::{EventQueue, QueuedEvent};
pub use simulated::SimulatedSource;
pub use subscription::{ChangeCallback, Subscription, SubscriptionId, ValueSource};
