use std::collections::BTreeMap;

use log::info;
use uuid::Uuid;

use super::patch::{self, Candidate};
use crate::dto::{ListQuery, NewCategoryDto, Page, PatchRequest};
use crate::errors::ApiError;
use crate::models::Category;
use crate::AppState;

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<Category>, ApiError> {
    super::list(&state.db, query).await
}

pub async fn create(state: &AppState, dto: NewCategoryDto) -> Result<Category, ApiError> {
    let mut category = Category {
        id: Uuid::new_v4(),
        name: dto.name,
        description: dto.description,
    };
    category.validate()?;
    let category = state.db.insert(&category).await?;
    info!("created category {}", category.id);
    Ok(category)
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<Category, ApiError> {
    state.db.delete::<Category>(id).await
}

pub async fn patch(
    state: &AppState,
    request: PatchRequest,
) -> Result<BTreeMap<Uuid, Category>, ApiError> {
    let mut candidates: Vec<Candidate<Category>> = patch::plan(&state.db, request).await?;
    for candidate in &mut candidates {
        candidate.after.validate()?;
    }
    patch::commit(&state.db, candidates).await
}
