//! Invitation tokens and their life cycle.
//!
//! A token is shown once, at creation; only its SHA3-256 hash is stored.
//! `Active` invitations past `expires_at` become `Expired` the next time
//! they are read, and the new status is persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use log::info;
use uuid::Uuid;

use super::crypto;
use super::patch::{self, Candidate};
use crate::db::{schema::INVITATIONS, Db};
use crate::dto::{InvitationCreated, InvitationDetail, ListQuery, NewInvitationDto, Page, PatchRequest};
use crate::errors::ApiError;
use crate::models::{Event, Invitation, InvitationStatus, User};
use crate::AppState;

pub const DEFAULT_EXPIRY_HOURS: i64 = 24;

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<Invitation>, ApiError> {
    let mut page: Page<Invitation> = super::list(&state.db, query).await?;
    page.items = expire_overdue(&state.db, page.items, state.clock.now()).await?;
    Ok(page)
}

pub async fn create(state: &AppState, dto: NewInvitationDto) -> Result<InvitationCreated, ApiError> {
    state.db.fetch::<User>(dto.user_id).await?;
    state.db.fetch::<Event>(dto.event_id).await?;
    let now = state.clock.now();

    let predicates = [
        INVITATIONS.eq("event_id", dto.event_id.into())?,
        INVITATIONS.eq("user_id", dto.user_id.into())?,
        INVITATIONS.eq("status", InvitationStatus::Active.into())?,
    ];
    let active = state.db.find::<Invitation>(&predicates).await?;
    let still_active = expire_overdue(&state.db, active, now)
        .await?
        .into_iter()
        .any(|i| i.status == InvitationStatus::Active);
    if still_active {
        info!(
            "active invitation already exists for user {} and event {}",
            dto.user_id, dto.event_id
        );
        return Err(ApiError::conflict(
            "An active invitation already exists for this event",
        ));
    }

    let token = crypto::generate_token();
    let invitation = Invitation {
        id: Uuid::new_v4(),
        event_id: dto.event_id,
        user_id: dto.user_id,
        expires_at: dto
            .expires_at
            .unwrap_or(now + Duration::hours(DEFAULT_EXPIRY_HOURS)),
        token_hash: crypto::get_sha3_256_hash(&token),
        status: InvitationStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let invitation = state.db.insert(&invitation).await?;
    info!("created invitation {}", invitation.id);

    let invitation_link = format!("{}/invite/{token}", state.config.frontend_url);
    Ok(InvitationCreated {
        invitation,
        token,
        invitation_link,
    })
}

/// Resolves a raw token. Revoked and expired invitations are gone (410).
pub async fn get_by_token(state: &AppState, token: &str) -> Result<InvitationDetail, ApiError> {
    let predicate = INVITATIONS.eq("token_hash", crypto::get_sha3_256_hash(token).into())?;
    let found = state.db.find::<Invitation>(&[predicate]).await?;
    if found.is_empty() {
        info!("invitation not found for token hash");
        return Err(ApiError::not_found("Invitation not found"));
    }

    let invitation = expire_overdue(&state.db, found, state.clock.now())
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    match invitation.status {
        InvitationStatus::Revoked => {
            info!("invitation {} has been revoked", invitation.id);
            Err(ApiError::Gone("Invitation has been revoked".into()))
        }
        InvitationStatus::Expired => {
            info!("invitation {} has expired", invitation.id);
            Err(ApiError::Gone("Invitation has expired".into()))
        }
        InvitationStatus::Active => {
            let event = state.db.fetch::<Event>(invitation.event_id).await?;
            let user = state.db.fetch::<User>(invitation.user_id).await?;
            Ok(InvitationDetail {
                invitation,
                event,
                user,
            })
        }
    }
}

pub async fn patch(
    state: &AppState,
    request: PatchRequest,
) -> Result<BTreeMap<Uuid, Invitation>, ApiError> {
    let mut candidates: Vec<Candidate<Invitation>> = patch::plan(&state.db, request).await?;
    let now = state.clock.now();
    for candidate in &mut candidates {
        // overdue rows count as expired even if nobody has read them yet
        let current = if candidate.before.is_overdue(now) {
            InvitationStatus::Expired
        } else {
            candidate.before.status
        };
        if current != InvitationStatus::Active && candidate.after.status != current {
            info!(
                "rejected status change of {} invitation {}",
                current.as_str(),
                candidate.id()
            );
            return Err(ApiError::validation(format!(
                "Invitation is {} and can no longer change status",
                current.as_str()
            )));
        }
        if candidate.after.status != candidate.before.status {
            info!(
                "invitation {} {} -> {}",
                candidate.id(),
                candidate.before.status.as_str(),
                candidate.after.status.as_str()
            );
        }
        candidate.after.updated_at = now;
    }
    patch::commit(&state.db, candidates).await
}

/// Marks overdue active invitations as expired, persisting the change, and
/// returns the rows in their original order.
async fn expire_overdue(
    db: &Db,
    invitations: Vec<Invitation>,
    now: DateTime<Utc>,
) -> Result<Vec<Invitation>, ApiError> {
    let overdue: Vec<Invitation> = invitations
        .iter()
        .filter(|i| i.is_overdue(now))
        .map(|i| {
            info!("auto-expiring invitation {} (expires_at {})", i.id, i.expires_at);
            Invitation {
                status: InvitationStatus::Expired,
                updated_at: now,
                ..i.clone()
            }
        })
        .collect();
    if overdue.is_empty() {
        return Ok(invitations);
    }

    let expired: BTreeMap<Uuid, Invitation> = db
        .update_many(overdue)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    Ok(invitations
        .into_iter()
        .map(|i| expired.get(&i.id).cloned().unwrap_or(i))
        .collect())
}
