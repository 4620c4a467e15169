use std::collections::{BTreeMap, HashMap, HashSet};

use log::info;
use uuid::Uuid;

use super::patch::{self, Candidate};
use crate::db::{schema::ATTENDEES, Db};
use crate::dto::{ListQuery, NewAttendeeDto, Page, PatchRequest};
use crate::errors::ApiError;
use crate::models::{Attendee, Event, User};
use crate::AppState;

const ALREADY_REGISTERED: &str = "User already registered for this event";
const EVENT_FULL: &str = "Event is full";

pub async fn list(state: &AppState, query: &ListQuery) -> Result<Page<Attendee>, ApiError> {
    super::list(&state.db, query).await
}

pub async fn create(state: &AppState, dto: NewAttendeeDto) -> Result<Attendee, ApiError> {
    let event: Event = state.db.fetch(dto.event_id).await?;
    state.db.fetch::<User>(dto.user_id).await?;

    if !registrations(&state.db, dto.event_id, dto.user_id).await?.is_empty() {
        info!(
            "duplicate registration blocked for user {} on event {}",
            dto.user_id, dto.event_id
        );
        return Err(ApiError::conflict(ALREADY_REGISTERED));
    }

    if let Some(capacity) = event.capacity {
        let current = attendee_count(&state.db, event.id).await?;
        if current >= i64::from(capacity) {
            info!(
                "capacity reached for event {} (capacity={capacity}, current={current})",
                event.id
            );
            return Err(ApiError::BadRequest(EVENT_FULL.into()));
        }
    }

    let now = state.clock.now();
    let attendee = Attendee {
        id: Uuid::new_v4(),
        event_id: dto.event_id,
        user_id: dto.user_id,
        status: dto.status,
        created_at: now,
        updated_at: now,
    };
    state.db.insert(&attendee).await
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<Attendee, ApiError> {
    state.db.delete::<Attendee>(id).await
}

pub async fn patch(
    state: &AppState,
    request: PatchRequest,
) -> Result<BTreeMap<Uuid, Attendee>, ApiError> {
    let mut candidates: Vec<Candidate<Attendee>> = patch::plan(&state.db, request).await?;
    let now = state.clock.now();
    let batch_ids: HashSet<Uuid> = candidates.iter().map(|c| c.id()).collect();

    let mut pairs = HashSet::new();
    let mut arrivals: HashMap<Uuid, i64> = HashMap::new();
    for candidate in &mut candidates {
        let after = &candidate.after;
        if !pairs.insert((after.event_id, after.user_id)) {
            return Err(ApiError::conflict(ALREADY_REGISTERED));
        }

        let moved = after.event_id != candidate.before.event_id;
        if moved || after.user_id != candidate.before.user_id {
            state.db.fetch::<Event>(after.event_id).await?;
            state.db.fetch::<User>(after.user_id).await?;
            let taken = registrations(&state.db, after.event_id, after.user_id)
                .await?
                .into_iter()
                .any(|row| !batch_ids.contains(&row.id));
            if taken {
                return Err(ApiError::conflict(ALREADY_REGISTERED));
            }
        }
        if moved {
            *arrivals.entry(after.event_id).or_default() += 1;
        }
        candidate.after.updated_at = now;
    }

    // rows leaving an event free their seats for rows arriving in the same batch
    for (event_id, arriving) in arrivals {
        let event: Event = state.db.fetch(event_id).await?;
        let Some(capacity) = event.capacity else {
            continue;
        };
        let leaving = candidates
            .iter()
            .filter(|c| c.before.event_id == event_id && c.after.event_id != event_id)
            .count() as i64;
        let current = attendee_count(&state.db, event_id).await?;
        if current - leaving + arriving > i64::from(capacity) {
            info!("capacity reached for event {event_id} on attendee patch");
            return Err(ApiError::BadRequest(EVENT_FULL.into()));
        }
    }

    patch::commit(&state.db, candidates).await
}

async fn registrations(db: &Db, event_id: Uuid, user_id: Uuid) -> Result<Vec<Attendee>, ApiError> {
    let predicates = [
        ATTENDEES.eq("event_id", event_id.into())?,
        ATTENDEES.eq("user_id", user_id.into())?,
    ];
    db.find(&predicates).await
}

async fn attendee_count(db: &Db, event_id: Uuid) -> Result<i64, ApiError> {
    db.count::<Attendee>(&[ATTENDEES.eq("event_id", event_id.into())?])
        .await
}
