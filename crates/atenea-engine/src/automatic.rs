// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned messages keyed by (channel category, name).
//!
//! Firing an automatic message never fails the triggering operation: a
//! missing entry is skipped and a failed send is only logged.

use atenea_core::AteneaError;
use atenea_core::models::{Attention, AutomaticMessage, Room};
use atenea_core::types::OutgoingPayload;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::ContactCenter;
use crate::dispatch::DispatchResult;

pub const WELCOME: &str = "welcome";
pub const ATTENTION_OPENED: &str = "attention_opened";
pub const ATTENTION_CLASSIFIED: &str = "attention_classified";
pub const ATTENTION_CLOSED: &str = "attention_closed";
pub const OUT_OF_HOURS: &str = "out_of_hours";
pub const AGENT_ASSIGNED: &str = "agent_assigned";

/// Name of the message sent when an attention is classified as `consult_type_id`.
pub fn consult_type(consult_type_id: i64) -> String {
    format!("consult_type:{consult_type_id}")
}

/// Picks one variant uniformly.
pub fn pick_variant<'a, R: Rng + ?Sized>(
    variants: &'a [AutomaticMessage],
    rng: &mut R,
) -> Option<&'a str> {
    variants.choose(rng).map(|m| m.description.as_str())
}

impl ContactCenter {
    /// Selects a variant of `name` for the category of `channel`.
    pub async fn pick_automatic(
        &self,
        channel: &str,
        name: &str,
    ) -> Result<Option<String>, AteneaError> {
        let Some(info) = self.storage.get_channel(channel).await? else {
            return Ok(None);
        };
        let variants = self.storage.automatic_messages(&info.category, name).await?;
        Ok(pick_variant(&variants, &mut rand::thread_rng()).map(str::to_string))
    }

    /// Sends `name` to the room as a bot reply, under the held room lock.
    pub(crate) async fn fire_automatic(
        &self,
        room: &Room,
        attention: Option<&Attention>,
        name: &str,
    ) -> Option<DispatchResult> {
        let text = match self.pick_automatic(&room.channel, name).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(room_id = %room.id, name, "no automatic message configured");
                return None;
            }
            Err(e) => {
                warn!(room_id = %room.id, name, error = %e, "automatic message lookup failed");
                return None;
            }
        };
        let payload = OutgoingPayload {
            room_id: room.id.clone(),
            message: text,
            options: None,
            attachments: Vec::new(),
            bot_reply: true,
            sender_user_id: None,
            idempotency_key: None,
        };
        match self.send_locked(room, attention, payload).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(room_id = %room.id, name, error = %e, "automatic message not sent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn variant(position: u32, description: &str) -> AutomaticMessage {
        AutomaticMessage {
            channel_category: "messaging".into(),
            name: WELCOME.into(),
            position,
            description: description.into(),
        }
    }

    #[test]
    fn empty_catalog_picks_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_variant(&[], &mut rng), None);
    }

    #[test]
    fn every_variant_is_reachable() {
        let variants = vec![variant(0, "Hola"), variant(1, "Buenos días")];
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            seen.insert(pick_variant(&variants, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn consult_type_names_carry_the_id() {
        assert_eq!(consult_type(5), "consult_type:5");
    }
}
