pub mod clock;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod service;

use std::sync::Arc;

use actix_web::{
    error::{JsonPayloadError, PathError},
    web, HttpRequest,
};

use clock::Clock;
use config::Config;
use db::Db;
use errors::ApiError;
use service::auth::{AuthMiddleware, Authenticator};
use service::processor::PaymentProcessor;

/// Everything a request handler needs, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub payments: Arc<dyn PaymentProcessor>,
}

fn json_error(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    ApiError::validation(format!("Invalid request body: {err}")).into()
}

fn path_error(err: PathError, _: &HttpRequest) -> actix_web::Error {
    ApiError::validation(format!("Invalid path parameter: {err}")).into()
}

/// Registers every route. Public routes come first; the rest share one
/// authenticated scope.
pub fn configure(
    state: AppState,
    authenticator: Authenticator,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .configure(handlers::health::init_routes)
            .configure(handlers::invitation::init_public_routes)
            .configure(handlers::payment::init_public_routes)
            .service(
                web::scope("")
                    .wrap(AuthMiddleware { authenticator })
                    .configure(handlers::user::init_routes)
                    .configure(handlers::category::init_routes)
                    .configure(handlers::event::init_routes)
                    .configure(handlers::attendee::init_routes)
                    .configure(handlers::invitation::init_routes)
                    .configure(handlers::payment::init_routes),
            );
    }
}
