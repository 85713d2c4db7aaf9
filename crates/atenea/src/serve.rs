// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atenea serve` command implementation.
//!
//! Opens SQLite storage, syncs the configured catalogs, wires one relay
//! adapter per configured channel plus the optional Rasa bot into the
//! contact center, and serves the HTTP gateway until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use atenea_config::AteneaConfig;
use atenea_core::{AteneaError, StorageAdapter};
use atenea_engine::{ConfigCalendar, ContactCenter, EngineSettings, shutdown, sync_catalog};
use atenea_gateway::{GatewayState, ServerConfig, start_server};
use atenea_rasa::RasaBot;
use atenea_relay::RelayChannel;
use atenea_storage::SqliteStorage;
use tracing::{error, info, warn};

/// Upper bound for draining in-flight transitions on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `atenea serve` command.
pub async fn run_serve(config: AteneaConfig) -> Result<(), AteneaError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting atenea serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
    sync_catalog(storage.as_ref(), &config).await?;
    info!(path = %config.storage.database_path, "storage ready");

    let center = Arc::new(build_center(&config, storage)?);

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig::from(&config.gateway);
    let served = start_server(&server_config, GatewayState::new(Arc::clone(&center)), cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with error");
        cancel.cancel();
    }

    center.shutdown(DRAIN_TIMEOUT).await?;
    served?;

    info!("atenea serve shutdown complete");
    Ok(())
}

/// Builds the contact center with the configured adapters.
pub fn build_center(
    config: &AteneaConfig,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
) -> Result<ContactCenter, AteneaError> {
    let calendar = ConfigCalendar::from_config(&config.business_hours)?;
    let mut center = ContactCenter::new(storage, EngineSettings::from_config(config))
        .with_calendar(Arc::new(calendar));

    let timeout = Duration::from_secs(config.dispatch.timeout_secs);
    for relay in &config.dispatch.relays {
        center = center.with_channel(Arc::new(RelayChannel::new(relay, timeout)?));
    }
    for channel in &config.channels {
        if center.channels().get(&channel.code).is_none() {
            warn!(channel = %channel.code, "no relay configured, replies on this channel will fail");
        }
    }

    if config.bot.enabled {
        center = center.with_bot(Arc::new(RasaBot::new(&config.bot)?));
    } else {
        info!("bot disabled, bot-served rooms receive no automatic replies");
    }

    info!(
        channels = center.channels().len(),
        threshold = ?config.handoff.failed_turn_threshold,
        "contact center initialized"
    );
    Ok(center)
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atenea={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
