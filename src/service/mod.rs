pub mod attendee;
pub mod auth;
pub mod category;
pub mod crypto;
pub mod event;
pub mod health;
pub mod invitation;
pub mod log;
pub mod patch;
pub mod payment;
pub mod processor;
pub mod user;

use crate::db::{schema::Predicate, Db};
use crate::dto::{ListQuery, Page};
use crate::errors::ApiError;
use crate::filter;
use crate::models::Entity;

/// Parses every `field:op:value` expression and types it against `T`'s table.
pub fn predicates<T: Entity>(expressions: &[String]) -> Result<Vec<Predicate>, ApiError> {
    let filters = filter::parse_all(expressions)?;
    T::table().resolve_all(&filters)
}

pub async fn list<T: Entity>(db: &Db, query: &ListQuery) -> Result<Page<T>, ApiError> {
    let predicates = predicates::<T>(&query.filters)?;
    let (items, total) = db.list(&predicates, query.offset, query.limit).await?;
    Ok(Page {
        items,
        total,
        offset: query.offset,
        limit: query.limit,
    })
}
