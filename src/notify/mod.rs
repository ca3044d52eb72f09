//! Event plumbing between interrupt servicing and packet queues.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐  fetch_or   ┌─────────────────────┐
//! │ immediate handler │ ──────────> │ InterruptStatusWord │
//! └───────────────────┘             └──────────┬──────────┘
//!                                              │ swap(0)
//!                                              ▼
//!                                   ┌─────────────────────┐
//!                                   │ deferred processor  │
//!                                   └──────────┬──────────┘
//!                                              │ lock
//!                                              ▼
//! ┌───────────────────┐   arm /     ┌─────────────────────┐
//! │   packet queue    │ ──────────> │  NotificationGate   │
//! │                   │ <────────── │  (mask + slots)     │
//! └───────────────────┘   notify    └─────────────────────┘
//! ```
//!
//! The status word is lock-free so the immediate handler never blocks. The
//! gate serializes mask changes and queue notifications under one spin lock.

mod gate;
mod status;

pub use gate::{Direction, NotificationGate, SubscriptionGuard};
pub use status::{InterruptStatusWord, LINK_EVENT, PendingStatus};
