use actix_web::{get, web, HttpResponse, Responder};

use crate::service;
use crate::AppState;

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(service::health::check(&state).await)
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
