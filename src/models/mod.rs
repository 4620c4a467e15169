pub mod attendee;
pub mod category;
pub mod event;
pub mod invitation;
pub mod payment;
pub mod user;

pub use attendee::{Attendee, AttendeeStatus};
pub use category::Category;
pub use event::Event;
pub use invitation::{Invitation, InvitationStatus};
pub use payment::{Payment, PaymentStatus};
pub use user::User;

use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::db::schema::{Table, Value};
use crate::errors::ApiError;

/// A row type stored in one of the tables of [`crate::db::schema`].
pub trait Entity:
    Clone + std::fmt::Debug + Send + Sync + Unpin + 'static + for<'r> sqlx::FromRow<'r, PgRow>
{
    fn table() -> &'static Table;

    fn id(&self) -> Uuid;

    /// Cell value for `column`; unknown columns read as NULL.
    fn value(&self, column: &str) -> Value;
}

/// Entities that accept single-field `replace` operations.
pub trait Patchable: Entity {
    const FIELDS: &'static [&'static str];

    /// Writes `value` into `field` without running the entity rules.
    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError>;
}

pub(crate) fn from_json<T: DeserializeOwned>(
    field: &str,
    value: serde_json::Value,
) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|err| ApiError::validation(format!("Invalid value for field {field}: {err}")))
}

/// Trims an optional string, mapping blank input to `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Timestamps with or without an offset; naive values are taken as UTC.
pub mod flexible_datetime {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    use crate::db::schema::parse_timestamp;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}"))),
            }
        }
    }
}

pub(crate) fn datetime_from_json(
    field: &str,
    value: serde_json::Value,
) -> Result<chrono::DateTime<chrono::Utc>, ApiError> {
    let raw: String = from_json(field, value)?;
    crate::db::schema::parse_timestamp(&raw)
        .ok_or_else(|| ApiError::validation(format!("Invalid datetime for field {field}: {raw}")))
}
