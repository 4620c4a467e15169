use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;

use crate::dto::{ListQuery, NewCategoryDto, PatchRequest};
use crate::service;
use crate::AppState;

#[get("/categories")]
pub async fn get_all(query: ListQuery, state: web::Data<AppState>) -> impl Responder {
    match service::category::list(&state, &query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/categories")]
pub async fn create(dto: web::Json<NewCategoryDto>, state: web::Data<AppState>) -> impl Responder {
    match service::category::create(&state, dto.into_inner()).await {
        Ok(category) => HttpResponse::Created().json(category),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[patch("/categories")]
pub async fn update(request: web::Json<PatchRequest>, state: web::Data<AppState>) -> impl Responder {
    match service::category::patch(&state, request.into_inner()).await {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[delete("/categories/{id}")]
pub async fn remove(id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    match service::category::delete(&state, id.into_inner()).await {
        Ok(category) => HttpResponse::Ok().json(category),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(update)
        .service(remove);
}
