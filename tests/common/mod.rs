//! Shared setup for the HTTP-level tests: an in-memory store, a manual clock
//! and a recording payment processor behind the real route table.

#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    dev::{Service, ServiceResponse},
    test, App,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use event_manager::clock::{Clock, ManualClock};
use event_manager::config::Config;
use event_manager::db::Db;
use event_manager::service::auth::Authenticator;
use event_manager::service::processor::{FakeProcessor, PaymentProcessor};
use event_manager::{configure, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const FRONTEND_URL: &str = "http://frontend.test";

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2030-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub struct TestContext {
    pub state: AppState,
    pub clock: ManualClock,
    pub processor: Arc<FakeProcessor>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_processor(FakeProcessor::new())
    }

    pub fn with_processor(processor: FakeProcessor) -> Self {
        let clock = ManualClock::new(start_time());
        let processor = Arc::new(processor);
        let mut config = Config::default();
        config.frontend_url = FRONTEND_URL.to_string();
        config.stripe.webhook_secret = WEBHOOK_SECRET.to_string();

        let payments: Arc<dyn PaymentProcessor> = processor.clone();
        let state = AppState {
            db: Db::memory(),
            clock: Arc::new(clock.clone()),
            config,
            payments,
        };
        Self {
            state,
            clock,
            processor,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn app(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
        self.app_with(Authenticator::Disabled).await
    }

    pub async fn app_with(
        &self,
        authenticator: Authenticator,
    ) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
        test::init_service(App::new().configure(configure(self.state.clone(), authenticator))).await
    }
}

pub async fn get<S>(app: &S, uri: &str) -> ServiceResponse
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    test::call_service(app, test::TestRequest::get().uri(uri).to_request()).await
}

pub async fn post<S>(app: &S, uri: &str, body: Value) -> ServiceResponse
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    test::call_service(app, test::TestRequest::post().uri(uri).set_json(body).to_request()).await
}

pub async fn patch<S>(app: &S, uri: &str, body: Value) -> ServiceResponse
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    test::call_service(app, test::TestRequest::patch().uri(uri).set_json(body).to_request()).await
}

pub async fn delete<S>(app: &S, uri: &str) -> ServiceResponse
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    test::call_service(app, test::TestRequest::delete().uri(uri).to_request()).await
}

pub async fn body(resp: ServiceResponse) -> Value {
    test::read_body_json(resp).await
}

/// Asserts the status code and returns the JSON body.
pub async fn expect(resp: ServiceResponse, status: u16) -> Value {
    let code = resp.status().as_u16();
    let value = body(resp).await;
    assert_eq!(code, status, "unexpected status, body: {value}");
    value
}

pub fn replace(id: &str, path: &str, value: Value) -> Value {
    json!({ "patch": { id: { "op": "replace", "path": path, "value": value } } })
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

pub async fn create_user<S>(app: &S, email: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = post(
        app,
        "/users",
        json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email,
            "date_of_birth": "1990-12-10"
        }),
    )
    .await;
    expect(resp, 201).await
}

pub async fn create_category<S>(app: &S, name: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = post(app, "/categories", json!({ "name": name })).await;
    expect(resp, 201).await
}

/// Creates an owner, a category and an event with the given extra fields.
pub async fn create_event<S>(app: &S, extra: Value) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let owner = create_user(app, &format!("owner-{}@example.com", uuid::Uuid::new_v4())).await;
    let category = create_category(app, "Conferences").await;
    let mut event = json!({
        "name": "RustConf",
        "start_datetime": "2030-06-01T09:00:00Z",
        "end_datetime": "2030-06-01T17:00:00Z",
        "user_id": owner["id"],
        "category_id": category["id"]
    });
    if let (Some(event), Some(extra)) = (event.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            event.insert(key.clone(), value.clone());
        }
    }
    let resp = post(app, "/events", event).await;
    expect(resp, 201).await
}
