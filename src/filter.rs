//! `field:operator:value` expressions used by every list endpoint.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Operator::Like | Operator::ILike)
    }
}

impl FromStr for Operator {
    type Err = ApiError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "eq" => Ok(Operator::Eq),
            "neq" => Ok(Operator::Neq),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "like" => Ok(Operator::Like),
            "ilike" => Ok(Operator::ILike),
            other => Err(ApiError::InvalidFilter(format!(
                "Invalid filter operator: {other}. Expected one of: eq, neq, gt, gte, lt, lte, like, ilike"
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Value as written in the expression. Identifier fields are checked eagerly;
/// everything else is converted once the target column type is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Uuid(Uuid),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: FilterValue,
}

const IDENTIFIER_FIELDS: &[&str] = &[
    "id",
    "user_id",
    "event_id",
    "category_id",
    "attendee_id",
    "invitation_id",
    "payment_id",
];

pub fn is_identifier_field(field: &str) -> bool {
    IDENTIFIER_FIELDS.contains(&field)
}

pub fn parse(expression: &str) -> Result<Filter, ApiError> {
    let parts: Vec<&str> = expression.split(':').collect();
    let &[field, op, value] = parts.as_slice() else {
        return Err(ApiError::InvalidFilter(
            "Invalid filter_expression format. Expected format: field:operator:value".to_string(),
        ));
    };
    if field.is_empty() {
        return Err(ApiError::InvalidFilter(
            "Invalid filter_expression format: missing field name".to_string(),
        ));
    }
    let op: Operator = op.parse()?;
    let value = if is_identifier_field(field) {
        let id = Uuid::parse_str(value).map_err(|_| {
            ApiError::InvalidFilter(format!("Invalid UUID format for {field}: {value}"))
        })?;
        FilterValue::Uuid(id)
    } else {
        FilterValue::Raw(value.to_string())
    };

    Ok(Filter {
        field: field.to_string(),
        op,
        value,
    })
}

pub fn parse_all<I, S>(expressions: I) -> Result<Vec<Filter>, ApiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    expressions.into_iter().map(|e| parse(e.as_ref())).collect()
}
