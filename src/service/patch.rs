//! Batch `replace` operations: `{id -> {op, path, value}}`.
//!
//! Planning never writes. Each entity service validates the returned
//! candidates and then commits them with a single `update_many`.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::db::Db;
use crate::dto::PatchRequest;
use crate::errors::ApiError;
use crate::models::{Entity, Patchable};

/// One patched row: the stored version and the version to write.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub before: T,
    pub after: T,
}

impl<T: Entity> Candidate<T> {
    pub fn id(&self) -> Uuid {
        self.before.id()
    }
}

/// Checks every operation's syntax, then loads each target and assigns the
/// new value onto a copy. Field rules are left to the caller.
pub async fn plan<T: Patchable>(
    db: &Db,
    request: PatchRequest,
) -> Result<Vec<Candidate<T>>, ApiError> {
    let mut operations = Vec::with_capacity(request.patch.len());
    for (id, operation) in request.patch {
        if operation.op != "replace" {
            return Err(ApiError::UnsupportedOperation(format!(
                "Unsupported operation: {}. Only 'replace' is supported",
                operation.op
            )));
        }
        let field = operation
            .path
            .strip_prefix('/')
            .unwrap_or(&operation.path)
            .to_string();
        if !T::FIELDS.contains(&field.as_str()) {
            return Err(ApiError::InvalidPath(format!("Invalid path: {}", operation.path)));
        }
        operations.push((id, field, operation.value));
    }

    let mut candidates = Vec::with_capacity(operations.len());
    for (id, field, value) in operations {
        let before: T = db.fetch(id).await?;
        let mut after = before.clone();
        after.assign(&field, value)?;
        candidates.push(Candidate { before, after });
    }
    Ok(candidates)
}

/// Writes the validated candidates atomically and keys the result by id.
pub async fn commit<T: Entity>(
    db: &Db,
    candidates: Vec<Candidate<T>>,
) -> Result<BTreeMap<Uuid, T>, ApiError> {
    let items = candidates.into_iter().map(|c| c.after).collect();
    let updated = db.update_many(items).await?;
    Ok(updated.into_iter().map(|item| (item.id(), item)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::dto::PatchOperation;
    use crate::models::Category;
    use serde_json::json;

    async fn seeded() -> (Db, Category) {
        let db = Db::Memory(MemoryStore::new());
        let category = Category {
            id: Uuid::new_v4(),
            name: "Tech".into(),
            description: None,
        };
        db.insert(&category).await.unwrap();
        (db, category)
    }

    fn request(id: Uuid, op: &str, path: &str, value: serde_json::Value) -> PatchRequest {
        PatchRequest {
            patch: BTreeMap::from([(
                id,
                PatchOperation {
                    op: op.into(),
                    path: path.into(),
                    value,
                },
            )]),
        }
    }

    #[actix_rt::test]
    async fn replace_assigns_onto_a_copy() {
        let (db, category) = seeded().await;
        let candidates = plan::<Category>(&db, request(category.id, "replace", "/name", json!("Music")))
            .await
            .unwrap();
        assert_eq!(candidates[0].before.name, "Tech");
        assert_eq!(candidates[0].after.name, "Music");
        // nothing written yet
        let stored: Category = db.fetch(category.id).await.unwrap();
        assert_eq!(stored.name, "Tech");
    }

    #[actix_rt::test]
    async fn only_replace_is_supported() {
        let (db, category) = seeded().await;
        let result = plan::<Category>(&db, request(category.id, "add", "/name", json!("x"))).await;
        assert!(matches!(result, Err(ApiError::UnsupportedOperation(_))));
    }

    #[actix_rt::test]
    async fn path_must_be_patchable() {
        let (db, category) = seeded().await;
        let result = plan::<Category>(&db, request(category.id, "replace", "/id", json!("x"))).await;
        assert!(matches!(result, Err(ApiError::InvalidPath(_))));
    }

    #[actix_rt::test]
    async fn unknown_id_is_not_found() {
        let (db, _) = seeded().await;
        let result =
            plan::<Category>(&db, request(Uuid::new_v4(), "replace", "name", json!("x"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[actix_rt::test]
    async fn wrong_json_type_is_a_validation_error() {
        let (db, category) = seeded().await;
        let result = plan::<Category>(&db, request(category.id, "replace", "/name", json!(42))).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
