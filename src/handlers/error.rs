// src/handlers/error.rs
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::error::DashboardError;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn with_status(message: impl Into<String>, status: StatusCode) -> Self {
        ApiError {
            message: message.into(),
            status,
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let status = match &err {
            DashboardError::SourceUnavailable(_) | DashboardError::Http(_) => StatusCode::BAD_GATEWAY,
            DashboardError::DataUnavailable(_) => StatusCode::NOT_FOUND,
            DashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DashboardError::Configuration(_) | DashboardError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::with_status(err.to_string(), status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (DashboardError::SourceUnavailable("down".into()), StatusCode::BAD_GATEWAY),
            (DashboardError::DataUnavailable("GDP".into()), StatusCode::NOT_FOUND),
            (DashboardError::InvalidRequest("empty".into()), StatusCode::BAD_REQUEST),
            (DashboardError::Parse("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
        }
    }
}
