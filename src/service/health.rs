use log::error;

use crate::dto::{DatabaseHealth, HealthResponse};
use crate::AppState;

/// Always answers; a database failure is reported, not raised.
pub async fn check(state: &AppState) -> HealthResponse {
    let database = match state.db.version().await {
        Ok(version) => DatabaseHealth {
            status: "healthy".to_string(),
            version,
        },
        Err(err) => {
            error!("health check could not reach the database: {err}");
            DatabaseHealth {
                status: "unhealthy".to_string(),
                version: "unknown".to_string(),
            }
        }
    };
    HealthResponse {
        app: "healthy".to_string(),
        database,
    }
}
