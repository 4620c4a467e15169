use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::info;

use crate::dto::{CheckoutRequest, ListQuery};
use crate::service::{self, auth::Identity};
use crate::AppState;

#[get("/payments")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::payment::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/payments/checkout-session")]
pub async fn checkout_session(
    dto: web::Json<CheckoutRequest>,
    identity: Identity,
    state: web::Data<AppState>,
) -> impl Responder {
    let dto = dto.into_inner();
    info!(
        "{} started checkout for event {} (user {})",
        identity.subject, dto.event_id, dto.user_id
    );
    match service::payment::create_checkout_session(&state, dto).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(err) => HttpResponse::from_error(err),
    }
}

/// Public: authenticity comes from the `Stripe-Signature` header.
#[post("/payments/webhook")]
pub async fn webhook(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> impl Responder {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok());
    match service::payment::handle_webhook(&state, &body, signature).await {
        Ok(ack) => HttpResponse::Ok().json(ack),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(webhook);
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all).service(checkout_session);
}
