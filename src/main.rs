use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod error;
mod logging;
mod managers;
mod messages;
mod notify;
mod state;
mod web;

use config::{AppConfig, Args};
use managers::create_shared_lifecycle_manager;
use notify::{DisabledNotifier, Dispatcher, Notifier, TelegramNotifier};
use state::{JsonFileStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Keep recent log lines for the admin panel
    let log_buffer = logging::create_log_buffer(1000);
    logging::init_tracing(log_buffer.clone());

    let config = AppConfig::from_env().with_args(&args);

    let store = JsonFileStore::new(&config.data_file);
    info!("Using snapshot file {}", store.path().display());
    match store.load().await {
        Ok(snapshot) => info!(
            "Roster has {} users, {} verified",
            snapshot.users.len(),
            snapshot.verified().count()
        ),
        Err(e) => warn!("Snapshot is unreadable, operations will be skipped until fixed: {}", e),
    }

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => {
            info!(
                "Notifications via bot API (timeout {}s)",
                config.notify_timeout.as_secs()
            );
            Arc::new(TelegramNotifier::new(telegram)?)
        }
        None => {
            warn!("BOT_TOKEN not set, notifications will not be delivered");
            Arc::new(DisabledNotifier)
        }
    };

    let manager = create_shared_lifecycle_manager(
        Arc::new(store),
        Dispatcher::new(notifier),
        config.serialize_writes,
    );
    if manager.is_serialized() {
        info!("Single-writer mode: lifecycle operations run one at a time");
    } else {
        info!("Concurrent admin actions may overwrite each other (use --serialize-writes to prevent)");
    }

    web::start_web_server(
        web::WebServerConfig {
            port: config.http_port,
            tls: config.tls.clone(),
        },
        manager,
        log_buffer,
    )
    .await?;

    warn!("Admin panel stopped.");
    Ok(())
}
