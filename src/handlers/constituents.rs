// src/handlers/constituents.rs
use log::{error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::Indicator;
use crate::services::dashboard::Dashboard;

#[derive(Serialize)]
struct ConstituentsResponse {
    labels: Vec<String>,
    sectors: HashMap<String, String>,
}

#[derive(Serialize)]
struct IndicatorInfo {
    key: Indicator,
    label: &'static str,
    series_code: &'static str,
}

pub async fn get_constituents(dashboard: Arc<Dashboard>) -> Result<Json, Rejection> {
    info!("Handling request to list constituents");

    let constituents = dashboard.constituents().await.map_err(|e| {
        error!("Failed to list constituents: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&ConstituentsResponse {
        labels: constituents.labels(),
        sectors: constituents.sectors(),
    }))
}

pub async fn get_indicators() -> Result<Json, Rejection> {
    let indicators: Vec<IndicatorInfo> = Indicator::ALL
        .iter()
        .map(|i| IndicatorInfo {
            key: *i,
            label: i.label(),
            series_code: i.series_code(),
        })
        .collect();
    Ok(warp::reply::json(&indicators))
}
