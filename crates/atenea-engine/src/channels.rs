// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry routing outbound commands to the adapter serving each channel.

use std::collections::HashMap;
use std::sync::Arc;

use atenea_core::{ChannelAdapter, HealthStatus};
use tracing::{info, warn};

/// Channel adapters keyed by channel code.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    adapters: HashMap<String, Arc<dyn ChannelAdapter + Send + Sync>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under the code it reports. A second adapter for
    /// the same code replaces the first.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter + Send + Sync>) {
        let code = adapter.channel().to_string();
        info!(channel = %code, adapter = adapter.name(), "channel adapter registered");
        if self.adapters.insert(code.clone(), adapter).is_some() {
            warn!(channel = %code, "replaced previously registered channel adapter");
        }
    }

    pub fn get(&self, channel: &str) -> Option<&Arc<dyn ChannelAdapter + Send + Sync>> {
        self.adapters.get(channel)
    }

    /// Registered channel codes, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Degraded when any adapter is not healthy.
    pub async fn health_check(&self) -> HealthStatus {
        let mut reasons = Vec::new();
        for code in self.codes() {
            let Some(adapter) = self.adapters.get(code) else {
                continue;
            };
            match adapter.health_check().await {
                Ok(HealthStatus::Healthy) => {}
                Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
                    reasons.push(format!("{code}: {reason}"));
                }
                Err(e) => reasons.push(format!("{code}: {e}")),
            }
        }
        if reasons.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(reasons.join("; "))
        }
    }

    /// Shuts every adapter down, logging failures.
    pub async fn shutdown(&self) {
        for (code, adapter) in &self.adapters {
            if let Err(e) = adapter.shutdown().await {
                warn!(channel = %code, error = %e, "channel shutdown error");
            }
        }
    }
}
