use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::Entity;
use crate::db::schema::{Table, Value, PAYMENTS};
use crate::errors::ApiError;

pub const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl From<PaymentStatus> for Value {
    fn from(status: PaymentStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amounts are positive with at most two fractional digits.
pub fn validate_amount(amount: Decimal) -> Result<(), ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::validation("Amount must be greater than zero"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ApiError::validation(
            "Amount must have at most 2 decimal places",
        ));
    }
    Ok(())
}

/// Converts a major-unit amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Event prices are stored in minor units.
pub fn from_minor_units(cents: i32) -> Decimal {
    Decimal::new(i64::from(cents), 2)
}

impl Entity for Payment {
    fn table() -> &'static Table {
        &PAYMENTS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "event_id" => self.event_id.into(),
            "user_id" => self.user_id.into(),
            "amount" => self.amount.into(),
            "currency" => self.currency.clone().into(),
            "status" => self.status.into(),
            "checkout_session_id" => self.checkout_session_id.clone().into(),
            "payment_intent_id" => self.payment_intent_id.clone().into(),
            "refund_id" => self.refund_id.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(dec("10.00")), Some(1000));
        assert_eq!(to_minor_units(dec("25")), Some(2500));
        assert_eq!(to_minor_units(dec("10.005")), Some(1001));
        assert_eq!(to_minor_units(dec("10.004")), Some(1000));
        assert_eq!(to_minor_units(dec("0.01")), Some(1));
    }

    #[test]
    fn amount_rules() {
        assert!(validate_amount(dec("19.99")).is_ok());
        assert!(validate_amount(dec("20.500")).is_ok());
        assert!(validate_amount(dec("0")).is_err());
        assert!(validate_amount(dec("-5")).is_err());
        assert!(matches!(
            validate_amount(dec("1.234")),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn price_in_cents_becomes_decimal() {
        assert_eq!(from_minor_units(2550), dec("25.50"));
    }

    #[test]
    fn status_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::Succeeded).unwrap(),
            serde_json::json!("succeeded")
        );
    }
}
