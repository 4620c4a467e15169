use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::dto::{ListQuery, NewEventDto, PatchRequest};
use crate::service::{self, auth::Identity};
use crate::AppState;

#[get("/events")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::event::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/events")]
pub async fn create(dto: web::Json<NewEventDto>, state: web::Data<AppState>) -> impl Responder {
    match service::event::create(&state, dto.into_inner()).await {
        Ok(event) => HttpResponse::Created().json(event),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[patch("/events")]
pub async fn update(request: web::Json<PatchRequest>, state: web::Data<AppState>) -> impl Responder {
    match service::event::patch(&state, request.into_inner()).await {
        Ok(events) => HttpResponse::Ok().json(events),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[delete("/events/{id}")]
pub async fn remove(
    id: web::Path<Uuid>,
    identity: Identity,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    info!("{} requested deletion of event {id}", identity.subject);
    match service::event::delete(&state, id).await {
        Ok(event) => HttpResponse::Ok().json(event),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(update)
        .service(remove);
}
