// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Citizen identity resolution.

use atenea_core::AteneaError;
use atenea_core::models::{AuditMeta, Citizen, NewCitizen, SYSTEM_ACTOR};
use atenea_core::types::Party;
use tracing::{debug, info};

use crate::{ContactCenter, new_id, require_non_empty};

impl ContactCenter {
    /// Returns the citizen behind a channel-native sender, creating it on
    /// first contact.
    pub async fn resolve_citizen(&self, channel: &str, sender: &Party) -> Result<Citizen, AteneaError> {
        require_non_empty("sender id", &sender.id)?;
        let first_name = sender
            .full_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .map(str::to_string);
        let citizen = self
            .storage
            .find_or_create_citizen(&NewCitizen {
                id: new_id(),
                channel: channel.to_string(),
                external_user_id: sender.id.clone(),
                name: first_name,
                full_name: sender.full_name.clone(),
                phone: sender.phone.clone(),
                email: sender.email.clone(),
                audit: AuditMeta::created(SYSTEM_ACTOR, self.now()),
            })
            .await?;
        debug!(citizen_id = %citizen.id, channel, "citizen resolved");
        Ok(citizen)
    }

    pub async fn get_citizen(&self, id: &str) -> Result<Citizen, AteneaError> {
        self.storage
            .get_citizen(id)
            .await?
            .ok_or_else(|| AteneaError::not_found("citizen", id))
    }

    /// Sets the citizen's document identity.
    ///
    /// The document is immutable once set: repeating the same document is
    /// accepted, a different one is `InvalidTransition`, as is a document
    /// already held by another citizen.
    pub async fn verify_identity(
        &self,
        citizen_id: &str,
        document_type: &str,
        document_number: &str,
        actor: &str,
    ) -> Result<Citizen, AteneaError> {
        require_non_empty("document_type", document_type)?;
        require_non_empty("document_number", document_number)?;
        require_non_empty("actor", actor)?;

        let citizen = self.get_citizen(citizen_id).await?;
        if citizen.document_type.is_some() || citizen.document_number.is_some() {
            return same_document(citizen, document_type, document_number);
        }
        if let Some(holder) = self
            .storage
            .find_citizen_by_document(document_type, document_number)
            .await?
            && holder.id != citizen.id
        {
            return Err(AteneaError::invalid_transition(
                "citizen",
                citizen_id,
                "document already belongs to another citizen",
            ));
        }

        let set = self
            .storage
            .set_citizen_document(citizen_id, document_type, document_number, actor, self.now())
            .await?;
        let citizen = self.get_citizen(citizen_id).await?;
        if !set {
            // Another request set a document first.
            return same_document(citizen, document_type, document_number);
        }
        info!(citizen_id, document_type, "citizen identity verified");
        Ok(citizen)
    }
}

fn same_document(
    citizen: Citizen,
    document_type: &str,
    document_number: &str,
) -> Result<Citizen, AteneaError> {
    if citizen.document_type.as_deref() == Some(document_type)
        && citizen.document_number.as_deref() == Some(document_number)
    {
        return Ok(citizen);
    }
    Err(AteneaError::invalid_transition(
        "citizen",
        &citizen.id,
        "document identity is already set",
    ))
}
