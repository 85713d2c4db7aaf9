// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound pipeline wiring identity, rooms, attentions, the ledger, the bot
//! and handoff for one channel event.

use atenea_core::AteneaError;
use atenea_core::models::{Attention, Message, Room, SYSTEM_ACTOR};
use atenea_core::types::{
    BotReply, BotTurn, Delivery, Handler, HandoffTrigger, IncomingEvent, OutgoingKind,
    OutgoingOptions, OutgoingPayload, SenderType,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ContactCenter;
use crate::automatic::{ATTENTION_OPENED, OUT_OF_HOURS, WELCOME};
use crate::ledger::LedgerEntry;
use crate::rooms::room_key;

/// What one inbound event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub citizen_id: String,
    pub room_id: String,
    pub attention_id: String,
    pub message_id: String,
    /// The external message id was already recorded; nothing else ran.
    pub replayed: bool,
    pub attention_created: bool,
    /// Who serves the room after the event.
    pub handler: Handler,
    /// Bot replies delivered for this event.
    pub bot_messages: usize,
    pub escalated: Option<HandoffTrigger>,
}

struct BotTurnOutcome {
    room: Room,
    delivered: usize,
    escalated: Option<HandoffTrigger>,
}

impl ContactCenter {
    /// Processes one normalized channel event.
    ///
    /// Re-delivery of a known (channel, message id) is answered from the
    /// ledger without side effects. Bot failures never fail the event; they
    /// count as failed turns.
    pub async fn ingest(&self, event: IncomingEvent) -> Result<IngestOutcome, AteneaError> {
        if self.storage.get_channel(&event.channel).await?.is_none() {
            return Err(AteneaError::not_found("channel", &event.channel));
        }
        if event.message.body.trim().is_empty() && event.attachments.is_empty() {
            return Err(AteneaError::Validation(
                "inbound message has no body and no attachments".to_string(),
            ));
        }
        for attachment in &event.attachments {
            attachment.validate()?;
        }

        let citizen = self.resolve_citizen(&event.channel, &event.sender).await?;
        let _guard = self
            .room_locks
            .lock(&room_key(&event.channel, &citizen.id))
            .await;

        if let Some(external_id) = event.message.id.as_deref()
            && let Some(existing) = self
                .storage
                .find_message_by_external_id(&event.channel, external_id)
                .await?
        {
            debug!(
                channel = %event.channel,
                external_message_id = external_id,
                message_id = %existing.id,
                "inbound event already recorded"
            );
            return self.replayed(citizen.id, existing).await;
        }

        let room = self
            .resolve_room_locked(&event.channel, &event.external_room_id, &citizen)
            .await?;
        let opened = self.open_attention_locked(&room, SYSTEM_ACTOR).await?;
        let attention = opened.attention;

        // Adapters echo bot-sent messages back; those are recorded, not answered.
        let echo = event.message.bot_reply.unwrap_or(false);
        let entry = LedgerEntry {
            sender_type: if echo {
                SenderType::Bot
            } else {
                SenderType::Citizen
            },
            sender_user_id: None,
            content: event.message.body.clone(),
            external_message_id: event.message.id.clone(),
            attachments: event.attachments,
            timestamp: event.timestamp,
            delivery: if echo {
                Delivery::Sent
            } else {
                Delivery::Received
            },
        };
        let appended = self.append_locked(&room, &attention, entry).await?;
        if appended.replayed {
            return self.replayed(citizen.id, appended.message).await;
        }
        info!(
            room_id = %room.id,
            attention_id = %attention.id,
            message_id = %appended.message.id,
            channel = %room.channel,
            "inbound message recorded"
        );

        let mut outcome = IngestOutcome {
            citizen_id: citizen.id,
            room_id: room.id.clone(),
            attention_id: attention.id.clone(),
            message_id: appended.message.id,
            replayed: false,
            attention_created: opened.created,
            handler: room.handler(),
            bot_messages: 0,
            escalated: None,
        };
        if echo {
            return Ok(outcome);
        }

        if opened.created {
            self.fire_automatic(&room, Some(&attention), WELCOME).await;
            self.fire_automatic(&room, Some(&attention), ATTENTION_OPENED)
                .await;
        }
        if !self.calendar.is_open(self.now()) {
            self.fire_automatic(&room, Some(&attention), OUT_OF_HOURS)
                .await;
        }

        if room.bot_replies && self.bot.is_some() {
            let turn = self
                .run_bot_turn(room, &attention, &event.message.body)
                .await?;
            outcome.handler = turn.room.handler();
            outcome.bot_messages = turn.delivered;
            outcome.escalated = turn.escalated;
        }
        Ok(outcome)
    }

    async fn replayed(
        &self,
        citizen_id: String,
        message: Message,
    ) -> Result<IngestOutcome, AteneaError> {
        let room = self.require_room(&message.room_id).await?;
        Ok(IngestOutcome {
            citizen_id,
            room_id: message.room_id,
            attention_id: message.attention_id,
            message_id: message.id,
            replayed: true,
            attention_created: false,
            handler: room.handler(),
            bot_messages: 0,
            escalated: None,
        })
    }

    /// Asks the bot, dispatches its replies and applies the escalation and
    /// failed-turn policies. Runs under the room lock.
    async fn run_bot_turn(
        &self,
        room: Room,
        attention: &Attention,
        text: &str,
    ) -> Result<BotTurnOutcome, AteneaError> {
        let Some(bot) = self.bot.as_ref() else {
            return Ok(BotTurnOutcome {
                room,
                delivered: 0,
                escalated: None,
            });
        };
        let turn = BotTurn {
            room_id: room.id.clone(),
            channel: room.channel.clone(),
            sender_key: room.id.clone(),
            text: text.to_string(),
        };
        let reply = match bot.respond(turn).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(room_id = %room.id, error = %e, "bot turn failed");
                None
            }
        };

        let delivered = match &reply {
            Some(reply) => self.dispatch_bot_reply(&room, attention, reply).await,
            None => 0,
        };

        if reply.as_ref().is_some_and(|r| r.escalate) {
            let room = self
                .escalate_locked(&room, HandoffTrigger::BotEscalation)
                .await?;
            return Ok(BotTurnOutcome {
                room,
                delivered,
                escalated: Some(HandoffTrigger::BotEscalation),
            });
        }

        if reply.as_ref().is_some_and(|r| r.understood) {
            if room.failed_bot_turns > 0 {
                self.storage.reset_failed_turns(&room.id).await?;
            }
            return Ok(BotTurnOutcome {
                room,
                delivered,
                escalated: None,
            });
        }

        let failed = self.storage.record_failed_turn(&room.id, self.now()).await?;
        debug!(room_id = %room.id, failed_turns = failed, "bot turn not understood");
        if let Some(threshold) = self.settings.failed_turn_threshold
            && failed >= threshold
        {
            let room = self
                .escalate_locked(&room, HandoffTrigger::FailedTurns)
                .await?;
            return Ok(BotTurnOutcome {
                room,
                delivered,
                escalated: Some(HandoffTrigger::FailedTurns),
            });
        }
        Ok(BotTurnOutcome {
            room,
            delivered,
            escalated: None,
        })
    }

    async fn dispatch_bot_reply(&self, room: &Room, attention: &Attention, reply: &BotReply) -> usize {
        let mut delivered = 0;
        for message in &reply.messages {
            let options = (!message.buttons.is_empty()).then(|| OutgoingOptions {
                kind: OutgoingKind::Interactive,
                buttons: message.buttons.clone(),
                footer: None,
            });
            let payload = OutgoingPayload {
                room_id: room.id.clone(),
                message: message.text.clone(),
                options,
                attachments: Vec::new(),
                bot_reply: true,
                sender_user_id: None,
                idempotency_key: None,
            };
            match self.send_locked(room, Some(attention), payload).await {
                Ok(result) if result.delivered => delivered += 1,
                Ok(_) => {}
                Err(e) => warn!(room_id = %room.id, error = %e, "bot reply not dispatched"),
            }
        }
        delivered
    }
}
