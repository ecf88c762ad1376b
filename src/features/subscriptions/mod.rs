//! # Feature: Subscriptions
//!
//! Subscription records, their persisted JSON shape and the store seam.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Record edits and deletion
//! - 1.1.0: Explicit reminder settings with legacy field migration
//! - 1.0.0: Initial release

pub mod record;
pub mod store;
pub mod stored;

pub use record::{ExpiryStatus, NewSubscription, SubscriptionRecord, SubscriptionUpdate};
pub use store::{migrate_records, MemoryStore, SubscriptionStore};
pub use stored::StoredSubscription;
