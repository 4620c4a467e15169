use actix_web::{get, patch, post, web, HttpResponse, Responder};

use crate::dto::{ListQuery, NewInvitationDto, PatchRequest};
use crate::service;
use crate::AppState;

#[get("/invitations")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::invitation::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/invitations")]
pub async fn create(dto: web::Json<NewInvitationDto>, state: web::Data<AppState>) -> impl Responder {
    match service::invitation::create(&state, dto.into_inner()).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[patch("/invitations")]
pub async fn update(request: web::Json<PatchRequest>, state: web::Data<AppState>) -> impl Responder {
    match service::invitation::patch(&state, request.into_inner()).await {
        Ok(invitations) => HttpResponse::Ok().json(invitations),
        Err(err) => HttpResponse::from_error(err),
    }
}

/// Public: the token itself is the credential.
#[get("/invitations/{token}")]
pub async fn get_by_token(token: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    match service::invitation::get_by_token(&state, &token).await {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_by_token);
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all).service(create).service(update);
}
