use anyhow::Result;
use chrono::Utc;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use renewal_reminder::core::Config;
use renewal_reminder::database::Database;
use renewal_reminder::features::notifications::{LogNotifier, NotifierRegistry};
use renewal_reminder::features::reminders::ReminderScheduler;

const USAGE: &str = "Usage: reminder [--once | --test <subscription-id>]";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting renewal reminder v{}...", env!("CARGO_PKG_VERSION"));

    let database = Database::new(&config.database_path).await?;

    let notifiers = NotifierRegistry::new().with(Arc::new(LogNotifier));
    info!("Notification channels available: {}", notifiers.names().join(", "));

    let scheduler = ReminderScheduler::new(
        Arc::new(database),
        notifiers,
        config.default_settings.clone(),
    )
    .with_settings_file(config.settings_path.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--once") => {
            let outcome = scheduler.run_tick(Utc::now()).await?;
            info!(
                "Tick finished: {} due, {} renewed, {} failed{}",
                outcome.due.len(),
                outcome.renewals.len(),
                outcome.failures.len(),
                if outcome.gated { " (outside notification hours)" } else { "" }
            );
        }
        Some("--test") => {
            let Some(id) = args.get(1) else {
                warn!("{}", USAGE);
                return Err(anyhow::anyhow!("--test needs a subscription id"));
            };
            let deliveries = scheduler.send_test_notification(id, Utc::now()).await?;
            info!(
                "Test notification sent to {}/{} channels",
                deliveries.iter().filter(|d| d.success).count(),
                deliveries.len()
            );
        }
        Some(other) => {
            warn!("Unknown argument: {}", other);
            return Err(anyhow::anyhow!("{}", USAGE));
        }
        None => {
            scheduler
                .run(Duration::from_secs(config.tick_interval_secs))
                .await;
        }
    }

    Ok(())
}
