//! Payment processor adapter. [`StripeClient`] talks to the Stripe REST API;
//! [`FakeProcessor`] records requests and answers locally.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use derive_more::Display;
use log::{error, info, warn};
use serde::Deserialize;

use crate::config::StripeConfig;
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    /// Minor currency units.
    pub unit_amount: i64,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ProcessorError {
    #[display(fmt = "payment processor rejected the request: {}", _0)]
    Rejected(String),
    #[display(fmt = "payment processor authentication failed")]
    Authentication,
    #[display(fmt = "payment processor unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for ProcessorError {}

impl From<ProcessorError> for ApiError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::Rejected(message) => {
                warn!("checkout rejected: {message}");
                ApiError::BadRequest(format!("Invalid payment request: {message}"))
            }
            ProcessorError::Authentication => {
                error!("payment processor authentication failed; check STRIPE_SECRET_KEY");
                ApiError::Internal
            }
            ProcessorError::Unavailable(message) => {
                error!("payment processor unavailable: {message}");
                ApiError::ServiceUnavailable("Payment processor unavailable".into())
            }
        }
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError>;
}

pub struct StripeClient {
    api_base: String,
    secret_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Stripe's bracketed form encoding of a checkout session.
    fn form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.unit_amount.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
            form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
        }
        form
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        if self.secret_key.is_empty() {
            return Err(ProcessorError::Authentication);
        }
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&Self::form(&request))
            .send()
            .await
            .map_err(|err| ProcessorError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let session: CheckoutSession = response
                .json()
                .await
                .map_err(|err| ProcessorError::Unavailable(format!("unreadable response: {err}")))?;
            info!("checkout session created: {}", session.id);
            return Ok(session);
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());
        match status.as_u16() {
            401 | 403 => Err(ProcessorError::Authentication),
            400..=499 => Err(ProcessorError::Rejected(message)),
            _ => Err(ProcessorError::Unavailable(message)),
        }
    }
}

/// In-process processor: records every request and hands out fake sessions,
/// or fails every call with a preset error.
#[derive(Default)]
pub struct FakeProcessor {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
    failure: Option<ProcessorError>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: ProcessorError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failure: Some(err),
        }
    }

    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let number = match self.requests.lock() {
            Ok(mut requests) => {
                requests.push(request);
                requests.len()
            }
            Err(poisoned) => {
                let mut requests = poisoned.into_inner();
                requests.push(request);
                requests.len()
            }
        };
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let id = format!("cs_test_{number}");
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{id}"),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            unit_amount: 2550,
            currency: "usd".into(),
            product_name: "Rust Meetup Registration".into(),
            success_url: "http://localhost:3000/payment/success?payment_id=1".into(),
            cancel_url: "http://localhost:3000/payment/cancel?payment_id=1".into(),
            customer_email: Some("ada@example.com".into()),
            metadata: BTreeMap::from([("payment_id".to_string(), "1".to_string())]),
        }
    }

    fn client(server: &MockServer, key: &str) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: key.into(),
            webhook_secret: String::new(),
            api_base: server.uri(),
        })
    }

    #[tokio::test]
    async fn creates_a_session_with_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("unit_amount%5D=2550"))
            .and(body_string_contains("metadata%5Bpayment_id%5D=1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_abc",
                "url": "https://checkout.stripe.com/c/pay/cs_test_abc",
                "object": "checkout.session"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server, "sk_test_123")
            .create_checkout_session(request())
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_abc");
    }

    #[tokio::test]
    async fn error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid integer: -5" }
            })))
            .mount(&server)
            .await;
        assert_eq!(
            client(&server, "sk_test_123")
                .create_checkout_session(request())
                .await,
            Err(ProcessorError::Rejected("Invalid integer: -5".into()))
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        assert_eq!(
            client(&server, "sk_bad")
                .create_checkout_session(request())
                .await,
            Err(ProcessorError::Authentication)
        );
    }

    #[tokio::test]
    async fn missing_key_is_an_authentication_failure() {
        let server = MockServer::start().await;
        assert_eq!(
            client(&server, "").create_checkout_session(request()).await,
            Err(ProcessorError::Authentication)
        );
    }

    #[test]
    fn errors_map_to_http_kinds() {
        assert!(matches!(
            ApiError::from(ProcessorError::Rejected("x".into())),
            ApiError::BadRequest(_)
        ));
        assert_eq!(ApiError::from(ProcessorError::Authentication), ApiError::Internal);
        assert!(matches!(
            ApiError::from(ProcessorError::Unavailable("down".into())),
            ApiError::ServiceUnavailable(_)
        ));
    }
}
