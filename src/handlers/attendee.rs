use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::dto::{ListQuery, NewAttendeeDto, PatchRequest};
use crate::service::{self, auth::Identity};
use crate::AppState;

#[get("/attendees")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::attendee::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/attendees")]
pub async fn create(dto: web::Json<NewAttendeeDto>, state: web::Data<AppState>) -> impl Responder {
    match service::attendee::create(&state, dto.into_inner()).await {
        Ok(attendee) => HttpResponse::Created().json(attendee),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[patch("/attendees")]
pub async fn update(request: web::Json<PatchRequest>, state: web::Data<AppState>) -> impl Responder {
    match service::attendee::patch(&state, request.into_inner()).await {
        Ok(attendees) => HttpResponse::Ok().json(attendees),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[delete("/attendees/{id}")]
pub async fn remove(
    id: web::Path<Uuid>,
    identity: Identity,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    info!("{} requested deletion of attendee {id}", identity.subject);
    match service::attendee::delete(&state, id).await {
        Ok(attendee) => HttpResponse::Ok().json(attendee),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(update)
        .service(remove);
}
