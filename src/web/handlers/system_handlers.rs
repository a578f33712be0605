// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::{info, warn};

use crate::core::Database;
use crate::web::types::{DataResponse, HealthData};

pub async fn health_handler(db: &State<Database>) -> Json<DataResponse<HealthData>> {
    let database = match db.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check: {:#}", e);
            false
        }
    };
    info!("Health check (database: {})", database);

    Json(DataResponse::success(
        if database { "OK" } else { "Degraded" }.to_string(),
        HealthData {
            status: if database { "ok" } else { "degraded" },
            database,
        },
        None,
    ))
}
