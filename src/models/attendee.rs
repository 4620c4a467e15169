use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{from_json, Entity, Patchable};
use crate::db::schema::{Table, Value, ATTENDEES};
use crate::errors::ApiError;

/// RSVP answer; a missing status means the attendee has not answered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendee_status")]
pub enum AttendeeStatus {
    #[serde(rename = "RSVPed")]
    #[sqlx(rename = "RSVPed")]
    Rsvped,
    Maybe,
    #[serde(rename = "Not Going")]
    #[sqlx(rename = "Not Going")]
    NotGoing,
}

impl AttendeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeStatus::Rsvped => "RSVPed",
            AttendeeStatus::Maybe => "Maybe",
            AttendeeStatus::NotGoing => "Not Going",
        }
    }
}

impl From<AttendeeStatus> for Value {
    fn from(status: AttendeeStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: Option<AttendeeStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Attendee {
    fn table() -> &'static Table {
        &ATTENDEES
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "event_id" => self.event_id.into(),
            "user_id" => self.user_id.into(),
            "status" => self.status.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => Value::Null,
        }
    }
}

impl Patchable for Attendee {
    const FIELDS: &'static [&'static str] = &["event_id", "user_id", "status"];

    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError> {
        match field {
            "event_id" => self.event_id = from_json(field, value)?,
            "user_id" => self.user_id = from_json(field, value)?,
            "status" => self.status = from_json(field, value)?,
            _ => return Err(ApiError::InvalidPath(format!("Invalid path: /{field}"))),
        }
        Ok(())
    }
}
