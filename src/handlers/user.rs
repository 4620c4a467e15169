use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::dto::{ListQuery, NewUserDto, PatchRequest};
use crate::service::{self, auth::Identity};
use crate::AppState;

#[get("/users")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::user::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/users")]
pub async fn create(dto: web::Json<NewUserDto>, state: web::Data<AppState>) -> impl Responder {
    match service::user::create(&state, dto.into_inner()).await {
        Ok(user) => HttpResponse::Created().json(user),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[patch("/users")]
pub async fn update(request: web::Json<PatchRequest>, state: web::Data<AppState>) -> impl Responder {
    match service::user::patch(&state, request.into_inner()).await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[delete("/users/{id}")]
pub async fn remove(
    id: web::Path<Uuid>,
    identity: Identity,
    state: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    info!("{} requested deletion of user {id}", identity.subject);
    match service::user::delete(&state, id).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(update)
        .service(remove);
}
