//! Static description of every table: which columns exist, how their values
//! are typed, and which of them callers may filter on.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::filter::{Filter, FilterValue, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    /// Text on the wire, a Postgres enum type in storage.
    Enum(&'static str),
    Timestamp,
    Date,
    Integer,
    Decimal,
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub filterable: bool,
}

const fn col(name: &'static str, kind: ColumnType) -> Column {
    Column {
        name,
        kind,
        filterable: true,
    }
}

const fn hidden(name: &'static str, kind: ColumnType) -> Column {
    Column {
        name,
        kind,
        filterable: false,
    }
}

/// The first column is always the `id` primary key.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    /// Singular name used in client-facing messages.
    pub entity: &'static str,
    pub columns: &'static [Column],
}

pub static USERS: Table = Table {
    name: "users",
    entity: "User",
    columns: &[
        col("id", ColumnType::Uuid),
        col("first_name", ColumnType::Text),
        col("last_name", ColumnType::Text),
        col("email", ColumnType::Text),
        col("date_of_birth", ColumnType::Date),
        col("color", ColumnType::Text),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub static CATEGORIES: Table = Table {
    name: "categories",
    entity: "Category",
    columns: &[
        col("id", ColumnType::Uuid),
        col("name", ColumnType::Text),
        col("description", ColumnType::Text),
    ],
};

pub static EVENTS: Table = Table {
    name: "events",
    entity: "Event",
    columns: &[
        col("id", ColumnType::Uuid),
        col("name", ColumnType::Text),
        col("start_datetime", ColumnType::Timestamp),
        col("end_datetime", ColumnType::Timestamp),
        col("location", ColumnType::Text),
        col("description", ColumnType::Text),
        col("picture_url", ColumnType::Text),
        col("capacity", ColumnType::Integer),
        col("price", ColumnType::Integer),
        col("user_id", ColumnType::Uuid),
        col("category_id", ColumnType::Uuid),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub static ATTENDEES: Table = Table {
    name: "attendees",
    entity: "Attendee",
    columns: &[
        col("id", ColumnType::Uuid),
        col("event_id", ColumnType::Uuid),
        col("user_id", ColumnType::Uuid),
        col("status", ColumnType::Enum("attendee_status")),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub static INVITATIONS: Table = Table {
    name: "invitations",
    entity: "Invitation",
    columns: &[
        col("id", ColumnType::Uuid),
        col("event_id", ColumnType::Uuid),
        col("user_id", ColumnType::Uuid),
        col("expires_at", ColumnType::Timestamp),
        hidden("token_hash", ColumnType::Text),
        col("status", ColumnType::Enum("invitation_status")),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub static PAYMENTS: Table = Table {
    name: "payments",
    entity: "Payment",
    columns: &[
        col("id", ColumnType::Uuid),
        col("event_id", ColumnType::Uuid),
        col("user_id", ColumnType::Uuid),
        col("amount", ColumnType::Decimal),
        col("currency", ColumnType::Text),
        col("status", ColumnType::Enum("payment_status")),
        col("checkout_session_id", ColumnType::Text),
        col("payment_intent_id", ColumnType::Text),
        col("refund_id", ColumnType::Text),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

impl Table {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        // `columns` is 'static, so the borrow can outlive `self`.
        let columns: &'static [Column] = self.columns;
        columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &'static Column {
        let columns: &'static [Column] = self.columns;
        &columns[0]
    }

    /// Turns a parsed filter into a typed predicate against this table.
    pub fn resolve(&self, filter: &Filter) -> Result<Predicate, ApiError> {
        let column = self
            .column(&filter.field)
            .filter(|c| c.filterable)
            .ok_or_else(|| {
                ApiError::InvalidColumn(format!("Invalid column name: {}", filter.field))
            })?;

        if filter.op.is_pattern() && !matches!(column.kind, ColumnType::Text | ColumnType::Enum(_))
        {
            return Err(ApiError::InvalidFilter(format!(
                "Operator {} is only supported on text columns, not {}",
                filter.op, column.name
            )));
        }

        let value = match &filter.value {
            FilterValue::Uuid(id) => {
                if column.kind != ColumnType::Uuid {
                    return Err(ApiError::InvalidFilter(format!(
                        "Column {} does not hold identifiers",
                        column.name
                    )));
                }
                Value::Uuid(*id)
            }
            FilterValue::Raw(raw) => convert(column, raw)?,
        };

        Ok(Predicate {
            column,
            op: filter.op,
            value,
        })
    }

    pub fn not_found(&self, id: Uuid) -> ApiError {
        ApiError::not_found(format!("{} {id} not found", self.entity))
    }

    pub fn resolve_all(&self, filters: &[Filter]) -> Result<Vec<Predicate>, ApiError> {
        filters.iter().map(|f| self.resolve(f)).collect()
    }

    /// Predicate built by the services themselves; bypasses the filterable flag.
    pub fn eq(&self, column: &str, value: Value) -> Result<Predicate, ApiError> {
        let column = self.column(column).ok_or_else(|| {
            log::error!("unknown column {column} on table {}", self.name);
            ApiError::Internal
        })?;
        Ok(Predicate {
            column,
            op: Operator::Eq,
            value,
        })
    }
}

fn convert(column: &Column, raw: &str) -> Result<Value, ApiError> {
    let invalid = || {
        ApiError::InvalidFilter(format!(
            "Invalid value for {}: {raw}",
            column.name
        ))
    };
    let value = match column.kind {
        ColumnType::Uuid => Value::Uuid(Uuid::parse_str(raw).map_err(|_| invalid())?),
        ColumnType::Text | ColumnType::Enum(_) => Value::Text(raw.to_string()),
        ColumnType::Timestamp => Value::Timestamp(parse_timestamp(raw).ok_or_else(invalid)?),
        ColumnType::Date => {
            Value::Date(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?)
        }
        ColumnType::Integer => Value::Int(raw.parse().map_err(|_| invalid())?),
        ColumnType::Decimal => Value::Decimal(raw.parse().map_err(|_| invalid())?),
    };
    Ok(value)
}

/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Uuid(Uuid),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Int(i32),
    Decimal(Decimal),
}

impl Value {
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Uuid(id)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub column: &'static Column,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    /// SQL semantics: comparisons against NULL never match.
    pub fn matches(&self, cell: &Value) -> bool {
        if matches!(cell, Value::Null) || matches!(self.value, Value::Null) {
            return false;
        }
        match self.op {
            Operator::Like | Operator::ILike => {
                let (Value::Text(text), Value::Text(pattern)) = (cell, &self.value) else {
                    return false;
                };
                if self.op == Operator::ILike {
                    like(&text.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like(text, pattern)
                }
            }
            op => match cell.compare(&self.value) {
                Some(ordering) => match op {
                    Operator::Eq => ordering == Ordering::Equal,
                    Operator::Neq => ordering != Ordering::Equal,
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Gte => ordering != Ordering::Less,
                    Operator::Lt => ordering == Ordering::Less,
                    Operator::Lte => ordering != Ordering::Greater,
                    Operator::Like | Operator::ILike => false,
                },
                None => false,
            },
        }
    }
}

enum LikeToken {
    Any,
    One,
    Char(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
            c => LikeToken::Char(c),
        });
    }
    tokens
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one, `\` escapes.
///
/// Runs in `O(len(text) * len(pattern))`: `matched[j]` tells whether the
/// tokens seen so far match the first `j` characters of `text`.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for token in like_tokens(pattern) {
        let mut next = vec![false; text.len() + 1];
        match token {
            LikeToken::Any => {
                next[0] = matched[0];
                for j in 1..=text.len() {
                    next[j] = matched[j] || next[j - 1];
                }
            }
            LikeToken::One => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            LikeToken::Char(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}
