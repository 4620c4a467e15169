pub mod memory;
pub mod postgres;
pub mod schema;

use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::Entity;
use memory::MemoryStore;
use schema::Predicate;

pub type PGPool = sqlx::PgPool;

/// Storage handle shared by every request.
#[derive(Clone)]
pub enum Db {
    Postgres(PGPool),
    Memory(MemoryStore),
}

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PGPool, ApiError> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    info!("Connected to postgresql");
    Ok(pool)
}

pub async fn run_migrations(pool: &PGPool) -> Result<(), ApiError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

impl Db {
    pub fn memory() -> Self {
        warn!("Using the in-process store; data is lost on restart");
        Db::Memory(MemoryStore::new())
    }

    /// One window of the rows matching every predicate, plus the unwindowed count.
    pub async fn list<T: Entity>(
        &self,
        predicates: &[Predicate],
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<T>, i64), ApiError> {
        match self {
            Db::Postgres(pool) => postgres::list(pool, predicates, offset, limit).await,
            Db::Memory(store) => store.list(predicates, offset, limit),
        }
    }

    /// Every row matching the predicates.
    pub async fn find<T: Entity>(&self, predicates: &[Predicate]) -> Result<Vec<T>, ApiError> {
        let (items, _) = self.list(predicates, 0, i64::MAX).await?;
        Ok(items)
    }

    pub async fn count<T: Entity>(&self, predicates: &[Predicate]) -> Result<i64, ApiError> {
        let (_, total) = self.list::<T>(predicates, 0, 0).await?;
        Ok(total)
    }

    pub async fn get<T: Entity>(&self, id: Uuid) -> Result<Option<T>, ApiError> {
        match self {
            Db::Postgres(pool) => postgres::get(pool, id).await,
            Db::Memory(store) => store.get(id),
        }
    }

    /// Like [`Db::get`], but a missing row is a 404.
    pub async fn fetch<T: Entity>(&self, id: Uuid) -> Result<T, ApiError> {
        self.get(id).await?.ok_or_else(|| T::table().not_found(id))
    }

    pub async fn insert<T: Entity>(&self, item: &T) -> Result<T, ApiError> {
        match self {
            Db::Postgres(pool) => postgres::insert(pool, item).await,
            Db::Memory(store) => store.insert(item),
        }
    }

    pub async fn delete<T: Entity>(&self, id: Uuid) -> Result<T, ApiError> {
        match self {
            Db::Postgres(pool) => postgres::delete(pool, id).await,
            Db::Memory(store) => store.delete(id),
        }
    }

    pub async fn update_many<T: Entity>(&self, items: Vec<T>) -> Result<Vec<T>, ApiError> {
        match self {
            Db::Postgres(pool) => postgres::update_many(pool, items).await,
            Db::Memory(store) => store.update_many(items),
        }
    }

    pub async fn update<T: Entity>(&self, item: T) -> Result<T, ApiError> {
        let id = item.id();
        self.update_many(vec![item])
            .await?
            .pop()
            .ok_or_else(|| T::table().not_found(id))
    }

    pub async fn version(&self) -> Result<String, ApiError> {
        match self {
            Db::Postgres(pool) => postgres::version(pool).await,
            Db::Memory(_) => Ok("in-memory".to_string()),
        }
    }
}
