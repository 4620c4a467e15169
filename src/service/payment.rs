//! Checkout orchestration and the processor's signed webhook.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use super::crypto;
use super::processor::CheckoutSessionRequest;
use crate::db::{schema::PAYMENTS, Db};
use crate::dto::{CheckoutRequest, CheckoutResponse, ListQuery, Page, WebhookAck};
use crate::errors::ApiError;
use crate::models::payment::{from_minor_units, to_minor_units, validate_amount, DEFAULT_CURRENCY};
use crate::models::{Event, Payment, PaymentStatus, User};
use crate::AppState;

/// Maximum age of a webhook signature timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<Payment>, ApiError> {
    super::list(&state.db, query).await
}

pub async fn create_checkout_session(
    state: &AppState,
    dto: CheckoutRequest,
) -> Result<CheckoutResponse, ApiError> {
    let event: Event = state.db.fetch(dto.event_id).await?;
    let user: User = state.db.fetch(dto.user_id).await?;

    let amount = dto
        .amount
        .or(event.price.map(from_minor_units))
        .ok_or_else(|| ApiError::validation("Amount is required for events without a price"))?;
    validate_amount(amount)?;
    let unit_amount =
        to_minor_units(amount).ok_or_else(|| ApiError::validation("Amount is out of range"))?;

    let now = state.clock.now();
    let payment = state
        .db
        .insert(&Payment {
            id: Uuid::new_v4(),
            event_id: event.id,
            user_id: user.id,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            status: PaymentStatus::Created,
            checkout_session_id: None,
            payment_intent_id: None,
            refund_id: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let frontend = &state.config.frontend_url;
    let request = CheckoutSessionRequest {
        unit_amount,
        currency: payment.currency.clone(),
        product_name: format!("{} Registration", event.name),
        success_url: format!("{frontend}/payment/success?payment_id={}", payment.id),
        cancel_url: format!("{frontend}/payment/cancel?payment_id={}", payment.id),
        customer_email: dto.email.or(Some(user.email)),
        metadata: BTreeMap::from([
            ("event_id".to_string(), event.id.to_string()),
            ("user_id".to_string(), user.id.to_string()),
            ("payment_id".to_string(), payment.id.to_string()),
        ]),
    };
    let session = state.payments.create_checkout_session(request).await?;

    let payment = state
        .db
        .update(Payment {
            checkout_session_id: Some(session.id),
            updated_at: state.clock.now(),
            ..payment
        })
        .await?;
    info!("checkout session stored on payment {}", payment.id);

    Ok(CheckoutResponse {
        checkout_url: session.url,
        payment_id: payment.id,
    })
}

/// Checks a `t=<unix>,v1=<hex>` signature header against
/// HMAC-SHA256(secret, "{t}.{payload}").
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let invalid = || ApiError::BadRequest("Invalid signature".into());
    if secret.is_empty() {
        error!("STRIPE_WEBHOOK_SECRET is not configured; rejecting webhook");
        return Err(invalid());
    }
    let header = header.ok_or_else(invalid)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(invalid)?;
    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        warn!("webhook signature timestamp outside tolerance");
        return Err(invalid());
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    if signatures
        .iter()
        .any(|sig| crypto::verify_hmac_sha256(secret, &signed, sig))
    {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<WebhookAck, ApiError> {
    verify_signature(
        payload,
        signature,
        &state.config.stripe.webhook_secret,
        state.clock.now(),
    )?;
    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|_| ApiError::BadRequest("Invalid payload".into()))?;
    let object = &event.data.object;
    let text = |key: &str| object.get(key).and_then(|v| v.as_str()).map(str::to_string);

    match event.kind.as_str() {
        "checkout.session.completed" => {
            if let Some(mut payment) = by_session(&state.db, text("id")).await? {
                payment.status = PaymentStatus::Succeeded;
                payment.payment_intent_id = text("payment_intent").or(payment.payment_intent_id);
                save(state, payment).await?;
            }
        }
        "checkout.session.expired" => {
            if let Some(mut payment) = by_session(&state.db, text("id")).await? {
                if matches!(payment.status, PaymentStatus::Created | PaymentStatus::Processing) {
                    payment.status = PaymentStatus::Canceled;
                    save(state, payment).await?;
                }
            }
        }
        "payment_intent.payment_failed" => {
            let mut payment = by_intent(&state.db, text("id")).await?;
            if payment.is_none() {
                let metadata_id = object
                    .pointer("/metadata/payment_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok());
                if let Some(id) = metadata_id {
                    payment = state.db.get::<Payment>(id).await?;
                }
            }
            match payment {
                Some(mut payment) => {
                    payment.status = PaymentStatus::Failed;
                    payment.payment_intent_id = payment.payment_intent_id.or(text("id"));
                    save(state, payment).await?;
                }
                None => warn!("payment_failed webhook matched no payment"),
            }
        }
        "charge.refunded" => {
            if let Some(mut payment) = by_intent(&state.db, text("payment_intent")).await? {
                payment.status = PaymentStatus::Refunded;
                payment.refund_id = object
                    .pointer("/refunds/data/0/id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or(payment.refund_id);
                save(state, payment).await?;
            }
        }
        other => info!("ignoring webhook event {other}"),
    }

    Ok(WebhookAck { received: true })
}

async fn by_session(db: &Db, session_id: Option<String>) -> Result<Option<Payment>, ApiError> {
    find_one(db, "checkout_session_id", session_id).await
}

async fn by_intent(db: &Db, intent_id: Option<String>) -> Result<Option<Payment>, ApiError> {
    find_one(db, "payment_intent_id", intent_id).await
}

async fn find_one(
    db: &Db,
    column: &str,
    value: Option<String>,
) -> Result<Option<Payment>, ApiError> {
    let Some(value) = value else {
        warn!("webhook object has no {column}");
        return Ok(None);
    };
    let found = db.find::<Payment>(&[PAYMENTS.eq(column, value.into())?]).await?;
    if found.is_empty() {
        warn!("no payment with {column} from webhook");
    }
    Ok(found.into_iter().next())
}

async fn save(state: &AppState, payment: Payment) -> Result<(), ApiError> {
    let payment = state
        .db
        .update(Payment {
            updated_at: state.clock.now(),
            ..payment
        })
        .await?;
    info!("payment {} is now {}", payment.id, payment.status.as_str());
    Ok(())
}
