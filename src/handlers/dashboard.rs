// src/handlers/dashboard.rs
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;
use warp::http::header::CONTENT_TYPE;
use warp::reply::Json;
use warp::{Rejection, Reply};

use super::error::ApiError;
use crate::models::IndicatorToggles;
use crate::services::dashboard::{Dashboard, Selection};

/// Query string shared by the chart and raw-data routes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub symbol: Option<String>,
    pub gdp: bool,
    pub cpi: bool,
    pub unemployment: bool,
    pub industrial_production: bool,
    pub consumer_sentiment: bool,
    pub retail_sales: bool,
    /// `json` (default) or `csv`, raw-data route only.
    pub format: Option<String>,
}

impl DashboardQuery {
    pub fn selection(&self) -> Selection {
        Selection {
            symbol: self.symbol.clone().filter(|s| !s.trim().is_empty()),
            toggles: IndicatorToggles {
                gdp: self.gdp,
                cpi: self.cpi,
                unemployment: self.unemployment,
                industrial_production: self.industrial_production,
                consumer_sentiment: self.consumer_sentiment,
                retail_sales: self.retail_sales,
            },
        }
    }
}

pub async fn get_dashboard(query: DashboardQuery, dashboard: Arc<Dashboard>) -> Result<Json, Rejection> {
    let selection = query.selection();
    info!("Handling dashboard request for {:?}", selection);

    match dashboard.render(&selection).await {
        Ok(view) => Ok(warp::reply::json(&view)),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

pub async fn get_raw_data(query: DashboardQuery, dashboard: Arc<Dashboard>) -> Result<warp::reply::Response, Rejection> {
    let selection = query.selection();
    info!("Handling raw data request for {:?}", selection);

    let raw = dashboard.raw_data(&selection).await.map_err(|e| {
        error!("Failed to load raw data: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    match query.format.as_deref() {
        Some("csv") => {
            let body = raw.to_csv().map_err(|e| warp::reject::custom(ApiError::from(e)))?;
            Ok(warp::reply::with_header(body, CONTENT_TYPE, "text/csv; charset=utf-8").into_response())
        }
        None | Some("json") => Ok(warp::reply::json(&raw).into_response()),
        Some(other) => Err(warp::reject::custom(ApiError::with_status(
            format!("unsupported format {:?}", other),
            warp::http::StatusCode::BAD_REQUEST,
        ))),
    }
}
