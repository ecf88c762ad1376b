//! # Feature: Notifications
//!
//! Channel abstraction, fan-out to enabled channels and reminder message
//! formatting. Concrete transports register themselves as [`Notifier`]s.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true

pub mod content;
pub mod notifier;
pub mod registry;

pub use content::{extract_tags, format_batch, format_test, BATCH_TITLE};
pub use notifier::{LogNotifier, Notifier};
pub use registry::{strip_markdown, Delivery, NotifierRegistry};
