// src/services/macro_data.rs
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::models::{DateWindow, Frequency, Indicator, MacroObservation, MacroPoint, MacroSeries};

/// Lookback for the year-over-year column, in observations.
pub const YOY_PERIODS: usize = 12;

#[async_trait]
pub trait MacroSource: Send + Sync {
    /// Observations for `code` with `start <= date <= end` at native frequency.
    async fn observations(&self, code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<MacroObservation>>;
}

pub struct FredSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FredSource {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: Option<String>,
}

fn parse_observations(body: ObservationsResponse) -> Result<Vec<MacroObservation>> {
    body.observations
        .into_iter()
        .map(|raw| {
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
                .map_err(|e| DashboardError::Parse(format!("observation date {:?}: {}", raw.date, e)))?;
            // FRED marks missing observations with ".".
            let value = raw.value.trim().parse::<f64>().ok();
            Ok(MacroObservation { date, value })
        })
        .collect()
}

#[async_trait]
impl MacroSource for FredSource {
    async fn observations(&self, code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<MacroObservation>> {
        let url = format!("{}/series/observations", self.base_url);
        info!(
            "Fetching macro series {} from {} ({} to {})",
            code, url, start, end
        );

        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("series_id", code),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == StatusCode::BAD_REQUEST || resp.status() == StatusCode::NOT_FOUND {
            let message = resp
                .json::<FredErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| "series not recognized".to_string());
            if message.contains("api_key") {
                return Err(DashboardError::Configuration(format!("FRED rejected the API key: {}", message)));
            }
            warn!("Macro provider rejected series {}: {}", code, message);
            return Err(DashboardError::DataUnavailable(format!("{}: {}", code, message)));
        }

        let body = resp
            .error_for_status()?
            .json::<ObservationsResponse>()
            .await
            .map_err(|e| DashboardError::Parse(format!("observations for {}: {}", code, e)))?;

        parse_observations(body)
    }
}

/// Classifies the sampling interval from the median gap between observations.
pub fn infer_frequency(observations: &[MacroObservation]) -> Frequency {
    let mut gaps: Vec<i64> = observations
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days())
        .collect();
    if gaps.is_empty() {
        return Frequency::Unknown;
    }
    gaps.sort_unstable();

    match gaps[gaps.len() / 2] {
        0..=3 => Frequency::Daily,
        4..=10 => Frequency::Weekly,
        11..=45 => Frequency::Monthly,
        46..=140 => Frequency::Quarterly,
        141..=400 => Frequency::Annual,
        _ => Frequency::Unknown,
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Fills the gaps of a `None`-holed sequence by linear interpolation between
/// the nearest known neighbours. Values before the first or after the last
/// known point stay `None`.
pub fn interpolate_linear(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    for pair in known.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let (Some(a), Some(b)) = (values[lo], values[hi]) else { continue };
        let span = (hi - lo) as f64;
        for (offset, slot) in out[lo + 1..hi].iter_mut().enumerate() {
            let t = (offset + 1) as f64 / span;
            *slot = Some(a + (b - a) * t);
        }
    }
    out
}

/// Re-indexes to month-start dates across the observed span and fills
/// missing months linearly.
pub fn expand_to_monthly(observations: &[MacroObservation]) -> Vec<MacroObservation> {
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Vec::new();
    };

    let mut grid = Vec::new();
    let mut cursor = Some(month_start(first.date));
    let end = month_start(last.date);
    while let Some(month) = cursor.filter(|m| *m <= end) {
        grid.push(month);
        cursor = next_month(month);
    }

    let mut values: Vec<Option<f64>> = vec![None; grid.len()];
    for obs in observations {
        if let Ok(slot) = grid.binary_search(&month_start(obs.date)) {
            values[slot] = obs.value;
        }
    }

    grid.into_iter()
        .zip(interpolate_linear(&values))
        .map(|(date, value)| MacroObservation { date, value })
        .collect()
}

/// `(v[i] - v[i - periods]) / v[i - periods]`; undefined for the first
/// `periods` rows, for missing values and for a zero base.
pub fn percent_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let base = values.get(i.checked_sub(periods)?).copied().flatten()?;
            let current = (*current)?;
            if base == 0.0 {
                None
            } else {
                Some((current - base) / base)
            }
        })
        .collect()
}

/// Builds the YoY column. GDP is expanded to monthly first; every other
/// series keeps its native frequency and the fixed 12-observation lookback,
/// flagged when that lookback is not twelve months.
pub fn build_macro_series(code: &str, mut observations: Vec<MacroObservation>) -> MacroSeries {
    observations.sort_by_key(|o| o.date);
    observations.dedup_by_key(|o| o.date);

    let native = infer_frequency(&observations);
    let interpolated = code == Indicator::Gdp.series_code();
    if interpolated {
        observations = expand_to_monthly(&observations);
    }
    let frequency = if interpolated && !observations.is_empty() {
        Frequency::Monthly
    } else {
        native
    };

    let yoy_lookback_mismatch =
        !observations.is_empty() && !matches!(frequency, Frequency::Monthly | Frequency::Unknown);
    if yoy_lookback_mismatch {
        warn!(
            "Series {} is {:?}; {}-period YoY lookback does not span one year",
            code, frequency, YOY_PERIODS
        );
    }

    let values: Vec<Option<f64>> = observations.iter().map(|o| o.value).collect();
    let yoy = percent_change(&values, YOY_PERIODS);

    MacroSeries {
        code: code.to_string(),
        frequency,
        interpolated,
        yoy_lookback_mismatch,
        points: observations
            .into_iter()
            .zip(yoy)
            .map(|(o, yoy_change)| MacroPoint {
                date: o.date,
                value: o.value,
                yoy_change,
            })
            .collect(),
    }
}

pub async fn get_macro_series(source: &dyn MacroSource, code: &str, window: DateWindow) -> Result<MacroSeries> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DashboardError::InvalidRequest("indicator code must not be empty".to_string()));
    }
    if window.start > window.end {
        return Err(DashboardError::InvalidRequest(format!(
            "start {} is after end {}",
            window.start, window.end
        )));
    }

    let observations = source.observations(code, window.start, window.end).await?;
    if observations.is_empty() {
        warn!("No observations for {} between {} and {}", code, window.start, window.end);
    }
    Ok(build_macro_series(code, observations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(start_year: i32, values: &[f64]) -> Vec<MacroObservation> {
        let mut month = date(start_year, 1, 1);
        values
            .iter()
            .map(|v| {
                let obs = MacroObservation { date: month, value: Some(*v) };
                month = next_month(month).unwrap();
                obs
            })
            .collect()
    }

    fn quarterly(start_year: i32, values: &[f64]) -> Vec<MacroObservation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MacroObservation {
                date: date(start_year + (i / 4) as i32, 1 + 3 * (i % 4) as u32, 1),
                value: Some(*v),
            })
            .collect()
    }

    #[test]
    fn yoy_matches_twelve_period_ratio() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 2.0).collect();
        let series = build_macro_series("UNRATE", monthly(2020, &values));

        assert!(series.points[..YOY_PERIODS].iter().all(|p| p.yoy_change.is_none()));
        for i in YOY_PERIODS..values.len() {
            let expected = (values[i] - values[i - 12]) / values[i - 12];
            let got = series.points[i].yoy_change.unwrap();
            assert!((got - expected).abs() < 1e-12, "row {}", i);
        }
        assert_eq!(series.frequency, Frequency::Monthly);
        assert!(!series.yoy_lookback_mismatch);
        assert!(!series.interpolated);
    }

    #[test]
    fn percent_change_skips_missing_and_zero_bases() {
        let values = vec![Some(0.0), None, Some(2.0), Some(4.0), Some(3.0)];
        let changes = percent_change(&values, 2);
        assert_eq!(changes, vec![None, None, None, None, Some(0.5)]);
    }

    #[test]
    fn gdp_is_expanded_to_month_starts() {
        let series = build_macro_series("GDP", quarterly(2020, &[100.0, 130.0, 160.0]));
        let dates: Vec<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], date(2020, 1, 1));
        assert_eq!(dates[6], date(2020, 7, 1));
        assert!(series.interpolated);
        assert_eq!(series.frequency, Frequency::Monthly);

        let values: Vec<f64> = series.points.iter().map(|p| p.value.unwrap()).collect();
        assert!((values[1] - 110.0).abs() < 1e-9);
        assert!((values[2] - 120.0).abs() < 1e-9);
    }

    #[test]
    fn interpolated_months_lie_between_monotonic_quarters() {
        let quarters = [100.0, 104.0, 109.5, 111.0, 120.0, 125.0];
        let series = build_macro_series("GDP", quarterly(2019, &quarters));
        for (q, pair) in quarters.windows(2).enumerate() {
            for offset in 1..3 {
                let v = series.points[q * 3 + offset].value.unwrap();
                assert!(v > pair[0] && v < pair[1], "quarter {} offset {}", q, offset);
            }
        }
    }

    #[test]
    fn interpolation_never_extrapolates() {
        let filled = interpolate_linear(&[None, Some(1.0), None, Some(3.0), None]);
        assert_eq!(filled, vec![None, Some(1.0), Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn quarterly_series_keeps_lookback_but_is_flagged() {
        let values: Vec<f64> = (0..16).map(|i| 10.0 + i as f64).collect();
        let series = build_macro_series("GDPC1", quarterly(2018, &values));
        assert_eq!(series.frequency, Frequency::Quarterly);
        assert!(series.yoy_lookback_mismatch);
        assert!(!series.interpolated);
        assert_eq!(series.points.len(), 16);
        let expected = (values[12] - values[0]) / values[0];
        assert!((series.points[12].yoy_change.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn frequency_is_inferred_from_median_gap() {
        assert_eq!(infer_frequency(&monthly(2020, &[1.0, 2.0, 3.0])), Frequency::Monthly);
        assert_eq!(infer_frequency(&quarterly(2020, &[1.0, 2.0, 3.0])), Frequency::Quarterly);
        assert_eq!(infer_frequency(&monthly(2020, &[1.0])), Frequency::Unknown);
    }

    #[test]
    fn fred_payload_marks_dots_as_missing() {
        let json = r#"{"observations":[
            {"realtime_start":"2024-01-01","realtime_end":"2024-01-01","date":"2023-01-01","value":"3.4"},
            {"realtime_start":"2024-01-01","realtime_end":"2024-01-01","date":"2023-02-01","value":"."}]}"#;
        let body: ObservationsResponse = serde_json::from_str(json).unwrap();
        let observations = parse_observations(body).unwrap();
        assert_eq!(observations[0].value, Some(3.4));
        assert_eq!(observations[1].value, None);
        assert_eq!(observations[1].date, date(2023, 2, 1));
    }

    #[test]
    fn empty_series_is_typed_and_unflagged() {
        let series = build_macro_series("GDP", Vec::new());
        assert!(series.is_empty());
        assert!(!series.has_yoy());
        assert!(!series.yoy_lookback_mismatch);
    }

    /// Serves a canned observations response on a local port and returns its base URL.
    async fn serve_observations(status: warp::http::StatusCode, body: serde_json::Value) -> String {
        use warp::Filter;

        let route = warp::path!("series" / "observations")
            .map(move || warp::reply::with_status(warp::reply::json(&body), status));
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn unrecognized_series_is_data_unavailable() {
        let base = serve_observations(
            warp::http::StatusCode::BAD_REQUEST,
            serde_json::json!({"error_code": 400, "error_message": "Bad Request.  The series does not exist."}),
        )
        .await;
        let source = FredSource::new(base, "key");
        let window = DateWindow::trailing_years(date(2024, 1, 1), 5);

        let result = get_macro_series(&source, "NOPE", window).await;
        assert!(matches!(result, Err(DashboardError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn missing_series_path_is_data_unavailable() {
        let base = serve_observations(warp::http::StatusCode::NOT_FOUND, serde_json::json!({})).await;
        let source = FredSource::new(base, "key");

        let result = source.observations("CPIAUCSL", date(2023, 1, 1), date(2024, 1, 1)).await;
        assert!(matches!(result, Err(DashboardError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn rejected_api_key_is_a_configuration_error() {
        let base = serve_observations(
            warp::http::StatusCode::BAD_REQUEST,
            serde_json::json!({"error_code": 400, "error_message":
                "Bad Request.  The value for variable api_key is not registered."}),
        )
        .await;
        let source = FredSource::new(base, "revoked");

        let result = source.observations("CPIAUCSL", date(2023, 1, 1), date(2024, 1, 1)).await;
        assert!(matches!(result, Err(DashboardError::Configuration(_))));
    }

    #[tokio::test]
    async fn observations_are_fetched_over_http() {
        let base = serve_observations(
            warp::http::StatusCode::OK,
            serde_json::json!({"observations": [
                {"date": "2023-01-01", "value": "3.4"},
                {"date": "2023-02-01", "value": "."}
            ]}),
        )
        .await;
        let source = FredSource::new(base, "key");

        let observations = source.observations("UNRATE", date(2023, 1, 1), date(2023, 3, 1)).await.unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, Some(3.4));
        assert_eq!(observations[1].value, None);
    }
}
