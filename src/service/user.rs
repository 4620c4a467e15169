use std::collections::{BTreeMap, HashMap};

use log::info;
use uuid::Uuid;

use super::patch::{self, Candidate};
use crate::db::{schema::USERS, Db};
use crate::dto::{ListQuery, NewUserDto, Page, PatchRequest};
use crate::errors::ApiError;
use crate::models::User;
use crate::AppState;

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<User>, ApiError> {
    super::list(&state.db, query).await
}

pub async fn create(state: &AppState, dto: NewUserDto) -> Result<User, ApiError> {
    let now = state.clock.now();
    let mut user = User {
        id: Uuid::new_v4(),
        first_name: dto.first_name,
        last_name: dto.last_name,
        email: dto.email,
        date_of_birth: dto.date_of_birth,
        color: dto.color,
        created_at: now,
        updated_at: now,
    };
    user.validate(state.clock.today())?;

    if !users_with_email(&state.db, &user.email).await?.is_empty() {
        info!("duplicate email blocked on user create");
        return Err(ApiError::conflict(DUPLICATE_EMAIL));
    }

    let user = state.db.insert(&user).await?;
    info!("created user {}", user.id);
    Ok(user)
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    let user = state.db.delete::<User>(id).await?;
    info!("deleted user {id}");
    Ok(user)
}

pub async fn patch(state: &AppState, request: PatchRequest) -> Result<BTreeMap<Uuid, User>, ApiError> {
    let mut candidates: Vec<Candidate<User>> = patch::plan(&state.db, request).await?;
    let now = state.clock.now();
    let today = state.clock.today();
    for candidate in &mut candidates {
        candidate.after.validate(today)?;
        candidate.after.updated_at = now;
    }
    ensure_unique_emails(&state.db, &candidates).await?;

    let updated = patch::commit(&state.db, candidates).await?;
    info!("patched {} users", updated.len());
    Ok(updated)
}

async fn users_with_email(db: &Db, email: &str) -> Result<Vec<User>, ApiError> {
    let predicate = USERS.eq("email", email.into())?;
    db.find(&[predicate]).await
}

/// No two rows may share an email once the whole batch is applied.
async fn ensure_unique_emails(db: &Db, candidates: &[Candidate<User>]) -> Result<(), ApiError> {
    let mut batch: HashMap<&str, Uuid> = HashMap::new();
    for candidate in candidates {
        if let Some(other) = batch.insert(&candidate.after.email, candidate.id()) {
            if other != candidate.id() {
                return Err(ApiError::conflict(DUPLICATE_EMAIL));
            }
        }
    }

    for candidate in candidates {
        for holder in users_with_email(db, &candidate.after.email).await? {
            // rows in the batch are judged by their new email above
            let in_batch = candidates.iter().any(|c| c.id() == holder.id);
            if holder.id != candidate.id() && !in_batch {
                info!("duplicate email blocked on user patch");
                return Err(ApiError::conflict(DUPLICATE_EMAIL));
            }
        }
    }
    Ok(())
}
