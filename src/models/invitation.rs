use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{datetime_from_json, from_json, Entity, Patchable};
use crate::db::schema::{Table, Value, INVITATIONS};
use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status")]
pub enum InvitationStatus {
    Active,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Active => "Active",
            InvitationStatus::Expired => "Expired",
            InvitationStatus::Revoked => "Revoked",
        }
    }
}

impl From<InvitationStatus> for Value {
    fn from(status: InvitationStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// SHA3-256 of the bearer token. The token itself is never stored.
    #[serde(skip)]
    pub token_hash: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// An active invitation whose deadline has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Active && now > self.expires_at
    }
}

impl Entity for Invitation {
    fn table() -> &'static Table {
        &INVITATIONS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "event_id" => self.event_id.into(),
            "user_id" => self.user_id.into(),
            "expires_at" => self.expires_at.into(),
            "token_hash" => self.token_hash.clone().into(),
            "status" => self.status.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => Value::Null,
        }
    }
}

impl Patchable for Invitation {
    const FIELDS: &'static [&'static str] = &["status", "expires_at"];

    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError> {
        match field {
            "status" => self.status = from_json(field, value)?,
            "expires_at" => self.expires_at = datetime_from_json(field, value)?,
            _ => return Err(ApiError::InvalidPath(format!("Invalid path: /{field}"))),
        }
        Ok(())
    }
}
