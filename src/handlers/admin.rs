// src/handlers/admin.rs
use log::info;
use serde_json::json;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::services::dashboard::Dashboard;

pub async fn clear_cache(dashboard: Arc<Dashboard>) -> Result<Json, Rejection> {
    let cleared = dashboard.cache().clear();
    info!("Fetch cache cleared ({} entries)", cleared);
    Ok(warp::reply::json(&json!({ "cleared": cleared })))
}

pub async fn health(dashboard: Arc<Dashboard>) -> Result<Json, Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "ok",
        "cache_entries": dashboard.cache().len(),
    })))
}
