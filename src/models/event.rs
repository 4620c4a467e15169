use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{check_len, datetime_from_json, from_json, normalize_optional, Entity, Patchable};
use crate::db::schema::{Table, Value, EVENTS};
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub picture_url: Option<String>,
    pub capacity: Option<i32>,
    /// Minor currency units.
    pub price: Option<i32>,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::validation("Event name cannot be empty"));
        }
        check_len("name", Some(&self.name), 100)?;

        if matches!(self.capacity, Some(c) if c <= 0) {
            return Err(ApiError::validation("Capacity must be positive"));
        }
        if matches!(self.price, Some(p) if p < 0) {
            return Err(ApiError::validation("Price cannot be negative"));
        }
        if self.end_datetime <= self.start_datetime {
            return Err(ApiError::validation(
                "Event end time must be after start time",
            ));
        }

        self.location = normalize_optional(self.location.take());
        self.description = normalize_optional(self.description.take());
        self.picture_url = normalize_optional(self.picture_url.take());
        check_len("location", self.location.as_deref(), 255)?;
        check_len("picture_url", self.picture_url.as_deref(), 255)?;
        Ok(())
    }
}

impl Entity for Event {
    fn table() -> &'static Table {
        &EVENTS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "start_datetime" => self.start_datetime.into(),
            "end_datetime" => self.end_datetime.into(),
            "location" => self.location.clone().into(),
            "description" => self.description.clone().into(),
            "picture_url" => self.picture_url.clone().into(),
            "capacity" => self.capacity.into(),
            "price" => self.price.into(),
            "user_id" => self.user_id.into(),
            "category_id" => self.category_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => Value::Null,
        }
    }
}

impl Patchable for Event {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "start_datetime",
        "end_datetime",
        "location",
        "description",
        "picture_url",
        "capacity",
        "price",
        "user_id",
        "category_id",
    ];

    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError> {
        match field {
            "name" => self.name = from_json(field, value)?,
            "start_datetime" => self.start_datetime = datetime_from_json(field, value)?,
            "end_datetime" => self.end_datetime = datetime_from_json(field, value)?,
            "location" => self.location = from_json(field, value)?,
            "description" => self.description = from_json(field, value)?,
            "picture_url" => self.picture_url = from_json(field, value)?,
            "capacity" => self.capacity = from_json(field, value)?,
            "price" => self.price = from_json(field, value)?,
            "user_id" => self.user_id = from_json(field, value)?,
            "category_id" => self.category_id = from_json(field, value)?,
            _ => return Err(ApiError::InvalidPath(format!("Invalid path: /{field}"))),
        }
        Ok(())
    }
}
