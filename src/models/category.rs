use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{check_len, from_json, normalize_optional, Entity, Patchable};
use crate::db::schema::{Table, Value, CATEGORIES};
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::validation("Category name cannot be empty"));
        }
        check_len("name", Some(&self.name), 100)?;
        self.description = normalize_optional(self.description.take());
        Ok(())
    }
}

impl Entity for Category {
    fn table() -> &'static Table {
        &CATEGORIES
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "description" => self.description.clone().into(),
            _ => Value::Null,
        }
    }
}

impl Patchable for Category {
    const FIELDS: &'static [&'static str] = &["name", "description"];

    fn assign(&mut self, field: &str, value: serde_json::Value) -> Result<(), ApiError> {
        match field {
            "name" => self.name = from_json(field, value)?,
            "description" => self.description = from_json(field, value)?,
            _ => return Err(ApiError::InvalidPath(format!("Invalid path: /{field}"))),
        }
        Ok(())
    }
}
