use std::collections::BTreeMap;

use log::info;
use uuid::Uuid;

use super::patch::{self, Candidate};
use crate::db::Db;
use crate::dto::{ListQuery, NewEventDto, Page, PatchRequest};
use crate::errors::ApiError;
use crate::models::{Category, Event, User};
use crate::AppState;

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<Event>, ApiError> {
    super::list(&state.db, query).await
}

pub async fn create(state: &AppState, dto: NewEventDto) -> Result<Event, ApiError> {
    let now = state.clock.now();
    let mut event = Event {
        id: Uuid::new_v4(),
        name: dto.name,
        start_datetime: dto.start_datetime,
        end_datetime: dto.end_datetime,
        location: dto.location,
        description: dto.description,
        picture_url: dto.picture_url,
        capacity: dto.capacity,
        price: dto.price,
        user_id: dto.user_id,
        category_id: dto.category_id,
        created_at: now,
        updated_at: now,
    };
    event.validate()?;
    ensure_references(&state.db, &event).await?;

    let event = state.db.insert(&event).await?;
    info!("created event {} owned by {}", event.id, event.user_id);
    Ok(event)
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<Event, ApiError> {
    state.db.delete::<Event>(id).await
}

pub async fn patch(
    state: &AppState,
    request: PatchRequest,
) -> Result<BTreeMap<Uuid, Event>, ApiError> {
    let mut candidates: Vec<Candidate<Event>> = patch::plan(&state.db, request).await?;
    let now = state.clock.now();
    for candidate in &mut candidates {
        candidate.after.validate()?;
        if candidate.after.user_id != candidate.before.user_id
            || candidate.after.category_id != candidate.before.category_id
        {
            ensure_references(&state.db, &candidate.after).await?;
        }
        candidate.after.updated_at = now;
    }
    let updated = patch::commit(&state.db, candidates).await?;
    info!("patched {} events", updated.len());
    Ok(updated)
}

/// The owner and the category must exist.
async fn ensure_references(db: &Db, event: &Event) -> Result<(), ApiError> {
    db.fetch::<User>(event.user_id).await?;
    db.fetch::<Category>(event.category_id).await?;
    Ok(())
}
