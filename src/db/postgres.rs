//! Generic SQL for every entity, assembled with `QueryBuilder` from the static
//! table schema. Column names come from the schema only; every value is bound.

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use rust_decimal::Decimal;
use sqlx::{Execute, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::schema::{Column, ColumnType, Predicate, Table, Value};
use crate::errors::ApiError;
use crate::models::Entity;

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, column: &Column, value: Value) {
    match value {
        Value::Null => match column.kind {
            ColumnType::Uuid => builder.push_bind(None::<Uuid>),
            ColumnType::Text | ColumnType::Enum(_) => builder.push_bind(None::<String>),
            ColumnType::Timestamp => builder.push_bind(None::<DateTime<Utc>>),
            ColumnType::Date => builder.push_bind(None::<NaiveDate>),
            ColumnType::Integer => builder.push_bind(None::<i32>),
            ColumnType::Decimal => builder.push_bind(None::<Decimal>),
        },
        Value::Uuid(v) => builder.push_bind(v),
        Value::Text(v) => builder.push_bind(v),
        Value::Timestamp(v) => builder.push_bind(v),
        Value::Date(v) => builder.push_bind(v),
        Value::Int(v) => builder.push_bind(v),
        Value::Decimal(v) => builder.push_bind(v),
    };
    if let ColumnType::Enum(type_name) = column.kind {
        builder.push("::");
        builder.push(type_name);
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(predicate.column.name);
        // enum columns compare as their text labels
        if let ColumnType::Enum(_) = predicate.column.kind {
            builder.push("::text");
        }
        builder.push(" ");
        builder.push(predicate.op.sql());
        builder.push(" ");
        match &predicate.value {
            Value::Null => builder.push("NULL"),
            Value::Uuid(v) => builder.push_bind(*v),
            Value::Text(v) => builder.push_bind(v.clone()),
            Value::Timestamp(v) => builder.push_bind(*v),
            Value::Date(v) => builder.push_bind(*v),
            Value::Int(v) => builder.push_bind(*v),
            Value::Decimal(v) => builder.push_bind(*v),
        };
    }
}

pub async fn list<T: Entity>(
    pool: &PgPool,
    predicates: &[Predicate],
    offset: i64,
    limit: i64,
) -> Result<(Vec<T>, i64), ApiError> {
    let table = T::table();

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", table.name));
    push_where(&mut count_builder, predicates);
    let total: i64 = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT * FROM {}", table.name));
    push_where(&mut query_builder, predicates);
    query_builder.push(" ORDER BY ");
    query_builder.push(table.primary_key().name);
    query_builder.push(" LIMIT ");
    query_builder.push_bind(limit);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(offset);

    let query = query_builder.build_query_as::<T>();
    debug!("list {}: {}", table.name, query.sql());
    let items = query.fetch_all(pool).await?;
    Ok((items, total))
}

pub async fn get<T: Entity>(pool: &PgPool, id: Uuid) -> Result<Option<T>, ApiError> {
    let table = T::table();
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT * FROM {} WHERE id = ", table.name));
    query_builder.push_bind(id);
    let item = query_builder
        .build_query_as::<T>()
        .fetch_optional(pool)
        .await?;
    Ok(item)
}

pub async fn insert<T: Entity>(pool: &PgPool, item: &T) -> Result<T, ApiError> {
    let table = T::table();
    let mut query_builder = insert_query(table, item);
    let query = query_builder.build_query_as::<T>();
    debug!("insert {}: {}", table.name, query.sql());
    Ok(query.fetch_one(pool).await?)
}

fn insert_query<T: Entity>(table: &Table, item: &T) -> QueryBuilder<'static, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("INSERT INTO {} (", table.name));
    let mut columns = query_builder.separated(", ");
    for column in table.columns {
        columns.push(column.name);
    }
    query_builder.push(") VALUES (");
    for (i, column) in table.columns.iter().enumerate() {
        if i > 0 {
            query_builder.push(", ");
        }
        push_value(&mut query_builder, column, item.value(column.name));
    }
    query_builder.push(") RETURNING *");
    query_builder
}

pub async fn delete<T: Entity>(pool: &PgPool, id: Uuid) -> Result<T, ApiError> {
    let table = T::table();
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", table.name));
    query_builder.push_bind(id);
    query_builder.push(" RETURNING *");
    query_builder
        .build_query_as::<T>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| table.not_found(id))
}

/// Writes every item in one transaction; a missing row rolls back the batch.
pub async fn update_many<T: Entity>(pool: &PgPool, items: Vec<T>) -> Result<Vec<T>, ApiError> {
    let table = T::table();
    let mut tx = pool.begin().await?;
    let mut updated = Vec::with_capacity(items.len());

    for item in &items {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("UPDATE {} SET ", table.name));
        for (i, column) in table.columns.iter().skip(1).enumerate() {
            if i > 0 {
                query_builder.push(", ");
            }
            query_builder.push(column.name);
            query_builder.push(" = ");
            push_value(&mut query_builder, column, item.value(column.name));
        }
        query_builder.push(" WHERE id = ");
        query_builder.push_bind(item.id());
        query_builder.push(" RETURNING *");

        let row = query_builder
            .build_query_as::<T>()
            .fetch_optional(&mut *tx)
            .await?;
        match row {
            Some(row) => updated.push(row),
            None => {
                tx.rollback().await?;
                return Err(table.not_found(item.id()));
            }
        }
    }

    tx.commit().await?;
    Ok(updated)
}

pub async fn version(pool: &PgPool) -> Result<String, ApiError> {
    let version: String = sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await?;
    Ok(version)
}
