// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loads the configuration-driven lookup tables into storage.

use atenea_config::model::AteneaConfig;
use atenea_core::models::{AutomaticMessage, ChannelInfo, ChannelState, ConsultType};
use atenea_core::{AteneaError, StorageAdapter};
use tracing::info;

/// Upserts channels, consult types and channel states, and replaces the
/// automatic message catalog. Variant positions follow config order.
pub async fn sync_catalog(
    storage: &(dyn StorageAdapter + Send + Sync),
    config: &AteneaConfig,
) -> Result<(), AteneaError> {
    let channels: Vec<ChannelInfo> = config
        .channels
        .iter()
        .map(|c| ChannelInfo {
            code: c.code.clone(),
            name: c.name.clone(),
            category: c.category.clone(),
        })
        .collect();
    storage.sync_channels(&channels).await?;

    let consult_types: Vec<ConsultType> = config
        .consult_types
        .iter()
        .map(|c| ConsultType {
            id: c.id,
            name: c.name.clone(),
        })
        .collect();
    storage.sync_consult_types(&consult_types).await?;

    let states: Vec<ChannelState> = config
        .channel_states
        .iter()
        .map(|s| ChannelState {
            id: s.id.clone(),
            name: s.name.clone(),
            category: s.category.clone(),
        })
        .collect();
    storage.sync_channel_states(&states).await?;

    let messages: Vec<AutomaticMessage> = config
        .automatic_messages
        .iter()
        .flat_map(|entry| {
            entry
                .variants
                .iter()
                .enumerate()
                .map(|(position, text)| AutomaticMessage {
                    channel_category: entry.channel_category.clone(),
                    name: entry.name.clone(),
                    position: position as u32,
                    description: text.clone(),
                })
        })
        .collect();
    storage.sync_automatic_messages(&messages).await?;

    info!(
        channels = channels.len(),
        consult_types = consult_types.len(),
        channel_states = states.len(),
        automatic_messages = messages.len(),
        "catalog synchronized"
    );
    Ok(())
}
