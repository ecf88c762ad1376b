//! Fan-out of one message to every enabled channel

use log::{info, warn};
use regex::Regex;
use std::sync::{Arc, OnceLock};

use super::notifier::Notifier;

static MARKDOWN_MARKS: OnceLock<Option<Regex>> = OnceLock::new();

/// Remove `**`, `*`, `#` and backticks for plain-text channels
pub fn strip_markdown(text: &str) -> String {
    let re = MARKDOWN_MARKS.get_or_init(|| Regex::new(r"\*\*|\*|##|#|`").ok());
    match re {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Result of sending to one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: String,
    pub success: bool,
}

/// Registered channels, in registration order
#[derive(Default, Clone)]
pub struct NotifierRegistry {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, replacing any channel with the same name
    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.retain(|n| n.name() != notifier.name());
        self.notifiers.push(notifier);
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.register(notifier);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Notifier>> {
        self.notifiers.iter().find(|n| n.name() == name)
    }

    /// Send to each channel named in `enabled`, one after another.
    ///
    /// Unknown names are logged and skipped. Returns one entry per channel
    /// that was attempted.
    pub async fn dispatch(
        &self,
        enabled: &[String],
        title: &str,
        body: &str,
        tags: &[String],
        log_prefix: &str,
    ) -> Vec<Delivery> {
        if enabled.is_empty() {
            info!("{} No notification channels enabled", log_prefix);
            return Vec::new();
        }

        let mut deliveries = Vec::new();
        for name in enabled {
            let name = name.trim();
            let Some(notifier) = self.get(name) else {
                warn!("{} Unknown notification channel: {}", log_prefix, name);
                continue;
            };

            let success = if notifier.supports_markdown() {
                notifier.notify(title, body, tags).await
            } else {
                notifier.notify(title, &strip_markdown(body), tags).await
            };

            if success {
                info!("{} Sent notification via {}", log_prefix, name);
            } else {
                warn!("{} Failed to send notification via {}", log_prefix, name);
            }
            deliveries.push(Delivery {
                channel: name.to_string(),
                success,
            });
        }
        deliveries
    }
}
