// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] the server monitors. In-flight room transitions
//! are drained before storage is closed.

use std::time::Duration;

use atenea_core::AteneaError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ContactCenter;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

impl ContactCenter {
    /// Waits up to `drain_timeout` for in-flight room and presence
    /// transitions, then shuts adapters down and closes storage.
    pub async fn shutdown(&self, drain_timeout: Duration) -> Result<(), AteneaError> {
        let active = self.room_locks.active() + self.presence_locks.active();
        if active > 0 {
            info!(count = active, "waiting for in-flight transitions to complete");
        }
        let idle = self.room_locks.wait_idle(drain_timeout).await
            && self.presence_locks.wait_idle(drain_timeout).await;
        if !idle {
            warn!(
                remaining = self.room_locks.active() + self.presence_locks.active(),
                "timeout reached, some transitions interrupted"
            );
        }

        self.channels.shutdown().await;
        if let Some(bot) = &self.bot
            && let Err(e) = bot.shutdown().await
        {
            warn!(error = %e, "bot adapter shutdown error");
        }
        self.storage.close().await?;
        info!("contact center stopped");
        Ok(())
    }
}
