// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atenea migrate` command implementation.
//!
//! Applies pending schema migrations and syncs the catalog tables from
//! configuration without starting the server.

use atenea_config::AteneaConfig;
use atenea_core::{AteneaError, StorageAdapter};
use atenea_engine::sync_catalog;
use atenea_storage::SqliteStorage;

/// Runs the `atenea migrate` command.
pub async fn run_migrate(config: &AteneaConfig) -> Result<(), AteneaError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    sync_catalog(&storage, config).await?;
    storage.close().await?;

    println!("atenea: database ready at {}", config.storage.database_path);
    println!(
        "  {} channels, {} consult types, {} channel states, {} automatic messages",
        config.channels.len(),
        config.consult_types.len(),
        config.channel_states.len(),
        config.automatic_messages.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_creates_database_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AteneaConfig::default();
        config.storage.database_path = dir.path().join("nested").join("atenea.db").to_string_lossy().into_owned();

        run_migrate(&config).await.unwrap();
        // Running twice is a no-op.
        run_migrate(&config).await.unwrap();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        assert!(storage.get_channel("whatsapp").await.unwrap().is_some());
        assert!(storage.get_channel_state("AVAILABLE").await.unwrap().is_some());
    }
}
