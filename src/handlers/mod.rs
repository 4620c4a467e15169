pub mod attendee;
pub mod category;
pub mod event;
pub mod health;
pub mod invitation;
pub mod payment;
pub mod user;

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::dto::ListQuery;
use crate::errors::ApiError;

/// `?filter_expression=..&offset=..&limit=..`, with `filter_expression`
/// allowed to repeat.
impl FromRequest for ListQuery {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(ListQuery::parse(req.query_string()))
    }
}
