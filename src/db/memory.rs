//! In-process tables with the same semantics as the Postgres backend.
//! Used when no `DATABASE_URL` is configured and by the integration tests.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use log::error;
use uuid::Uuid;

use super::schema::Predicate;
use crate::errors::ApiError;
use crate::models::Entity;

type Rows<T> = BTreeMap<Uuid, T>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<&'static str, Box<dyn Any + Send + Sync>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_rows<T: Entity, R>(&self, f: impl FnOnce(&mut Rows<T>) -> R) -> Result<R, ApiError> {
        let mut tables = self.tables.lock().map_err(|_| {
            error!("memory store lock poisoned");
            ApiError::Internal
        })?;
        let rows = tables
            .entry(T::table().name)
            .or_insert_with(|| Box::new(Rows::<T>::new()) as Box<dyn Any + Send + Sync>)
            .downcast_mut::<Rows<T>>()
            .ok_or_else(|| {
                error!("memory table {} holds another row type", T::table().name);
                ApiError::Internal
            })?;
        Ok(f(rows))
    }

    pub fn list<T: Entity>(
        &self,
        predicates: &[Predicate],
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<T>, i64), ApiError> {
        self.with_rows(|rows: &mut Rows<T>| {
            let matching: Vec<&T> = rows
                .values()
                .filter(|row| {
                    predicates
                        .iter()
                        .all(|p| p.matches(&row.value(p.column.name)))
                })
                .collect();
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect();
            (items, total)
        })
    }

    pub fn get<T: Entity>(&self, id: Uuid) -> Result<Option<T>, ApiError> {
        self.with_rows(|rows: &mut Rows<T>| rows.get(&id).cloned())
    }

    pub fn insert<T: Entity>(&self, item: &T) -> Result<T, ApiError> {
        self.with_rows(|rows: &mut Rows<T>| {
            if rows.contains_key(&item.id()) {
                error!("duplicate primary key {} in {}", item.id(), T::table().name);
                return Err(ApiError::Internal);
            }
            rows.insert(item.id(), item.clone());
            Ok(item.clone())
        })?
    }

    pub fn delete<T: Entity>(&self, id: Uuid) -> Result<T, ApiError> {
        self.with_rows(|rows: &mut Rows<T>| rows.remove(&id))?
            .ok_or_else(|| T::table().not_found(id))
    }

    /// All rows are checked before any is written, under a single lock.
    pub fn update_many<T: Entity>(&self, items: Vec<T>) -> Result<Vec<T>, ApiError> {
        self.with_rows(|rows: &mut Rows<T>| {
            if let Some(missing) = items.iter().find(|item| !rows.contains_key(&item.id())) {
                return Err(T::table().not_found(missing.id()));
            }
            for item in &items {
                rows.insert(item.id(), item.clone());
            }
            Ok(items)
        })?
    }
}
