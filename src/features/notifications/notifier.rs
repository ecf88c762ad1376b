//! Notification channel seam

use async_trait::async_trait;
use log::info;

/// A delivery channel (chat bot, mail, webhook, ...).
///
/// `notify` reports failure through its return value; a failing channel
/// never stops delivery to the others.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name used in `enabled_notifiers`
    fn name(&self) -> &str;

    /// Channels that cannot render markdown receive a stripped body
    fn supports_markdown(&self) -> bool {
        true
    }

    async fn notify(&self, title: &str, body: &str, tags: &[String]) -> bool;
}

/// Writes reminders to the application log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn supports_markdown(&self) -> bool {
        false
    }

    async fn notify(&self, title: &str, body: &str, tags: &[String]) -> bool {
        if tags.is_empty() {
            info!("📣 {}\n{}", title, body);
        } else {
            info!("📣 {} [{}]\n{}", title, tags.join(", "), body);
        }
        true
    }
}
