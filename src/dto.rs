use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::{flexible_datetime, AttendeeStatus, Event, Invitation, User};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct NewUserDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewCategoryDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewEventDto {
    pub name: String,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub start_datetime: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub end_datetime: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub price: Option<i32>,
    pub user_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewAttendeeDto {
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub status: Option<AttendeeStatus>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewInvitationDto {
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(default, deserialize_with = "flexible_datetime::option::deserialize")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// `{"patch": {"<id>": {"op": "replace", "path": "/field", "value": ...}}}`
#[derive(Debug, Deserialize, Clone)]
pub struct PatchRequest {
    pub patch: BTreeMap<Uuid, PatchOperation>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Query string of every list endpoint. `filter_expression` may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn parse(query_string: &str) -> Result<Self, ApiError> {
        let mut query = ListQuery::default();
        for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
            match key.as_ref() {
                "filter_expression" => query.filters.push(value.into_owned()),
                "offset" => {
                    query.offset = value
                        .parse::<i64>()
                        .ok()
                        .filter(|o| *o >= 0)
                        .ok_or_else(|| ApiError::BadRequest("Offset must be non-negative".into()))?;
                }
                "limit" => {
                    let limit = value.parse::<i64>().ok().filter(|l| *l >= 1).ok_or_else(|| {
                        ApiError::BadRequest("Limit must be a positive integer".into())
                    })?;
                    if limit > MAX_LIMIT {
                        return Err(ApiError::BadRequest(format!(
                            "Limit must not exceed {MAX_LIMIT}"
                        )));
                    }
                    query.limit = limit;
                }
                _ => {}
            }
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
pub struct InvitationCreated {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub token: String,
    pub invitation_link: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationDetail {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub event: Event,
    pub user: User,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    /// Major currency units; falls back to the event price.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub payment_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub app: String,
    pub database: DatabaseHealth,
}
