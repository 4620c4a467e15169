use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{check_len, from_json, normalize_optional, Entity, Patchable};
use crate::db::schema::{Table, Value, USERS};
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

impl User {
    /// Normalizes the user in place and checks every field rule.
    pub fn validate(&mut self, today: NaiveDate) -> Result<(), ApiError> {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return Err(ApiError::validation("Name cannot be empty"));
        }
        check_len("first_name", Some(&self.first_name), 50)?;
        check_len("last_name", Some(&self.last_name), 50)?;

        self.email = normalize_email(&self.email);
        if self.email.is_empty() {
            return Err(ApiError::validation("Email cannot be empty"));
        }
        if !looks_like_email(&self.email) {
            return Err(ApiError::validation(format!(
                "Invalid email address: {}",
                self.email
            )));
        }
        check_len("email", Some(&self.email), 255)?;

        if self.date_of_birth >= today {
            return Err(ApiError::validation("Date of birth must be in the past"));
        }

        self.color = normalize_optional(self.color.take());
        check_len("color", self.color.as_deref(), 100)?;
        Ok(())
    }
}

impl Entity for User {
    fn table() -> &'static Table {
        &USERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "first_name" => self.first_name.clone().into(),
            "last_name" => self.last_name.clone().into(),
            "email" => self.email.clone().into(),
            "date_of_birth" => self.date_of_birth.into(),
            "color" => self.color.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => Value::Null,
        }
    }
}

impl Patchable for User {
    const FIELDS: &'static [&'static str] =
        &["first_name", "last_name", "email", "date_of_birth", "color"];

    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError> {
        match field {
            "first_name" => self.first_name = from_json(field, value)?,
            "last_name" => self.last_name = from_json(field, value)?,
            "email" => self.email = from_json(field, value)?,
            "date_of_birth" => self.date_of_birth = from_json(field, value)?,
            "color" => self.color = from_json(field, value)?,
            _ => return Err(ApiError::InvalidPath(format!("Invalid path: /{field}"))),
        }
        Ok(())
    }
}
