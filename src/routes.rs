// src/routes.rs
use log::info;
use std::convert::Infallible;
use std::sync::Arc;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::admin::{clear_cache, health};
use crate::handlers::constituents::{get_constituents, get_indicators};
use crate::handlers::dashboard::{get_dashboard, get_raw_data, DashboardQuery};
use crate::handlers::error::ApiError;
use crate::services::dashboard::Dashboard;

const INDEX_HTML: &str = include_str!("../static/index.html");

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message: String;

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(invalid) = err.find::<warp::reject::InvalidQuery>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = invalid.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(dashboard: Arc<Dashboard>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let dashboard_filter = warp::any().map(move || dashboard.clone());

    let index_route = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let constituents_route = warp::path!("api" / "v1" / "constituents")
        .and(warp::get())
        .and(dashboard_filter.clone())
        .and_then(get_constituents);

    let indicators_route = warp::path!("api" / "v1" / "indicators")
        .and(warp::get())
        .and_then(get_indicators);

    let dashboard_route = warp::path!("api" / "v1" / "dashboard")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(dashboard_filter.clone())
        .and_then(get_dashboard);

    let raw_route = warp::path!("api" / "v1" / "dashboard" / "raw")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(dashboard_filter.clone())
        .and_then(get_raw_data);

    let clear_cache_route = warp::path!("api" / "v1" / "cache" / "clear")
        .and(warp::post())
        .and(dashboard_filter.clone())
        .and_then(clear_cache);

    let health_route = warp::path!("api" / "v1" / "health")
        .and(warp::get())
        .and(dashboard_filter.clone())
        .and_then(health);

    info!("All routes configured successfully.");

    index_route
        .or(constituents_route)
        .or(indicators_route)
        .or(dashboard_route)
        .or(raw_route)
        .or(clear_cache_route)
        .or(health_route)
        .recover(handle_rejection)
}
