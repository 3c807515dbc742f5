// src/services/market_data.rs
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::models::{DailyBar, DateWindow, MonthlyPricePoint, MonthlyPriceSeries};

/// Trailing window, in trading rows, for the monthly return column.
pub const RETURN_PERIODS: usize = 30;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily bars for `ticker` with `start <= date < end`. An unknown ticker
    /// or a range without trading yields an empty vector.
    async fn daily_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>>;
}

pub struct YahooPriceSource {
    client: Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Class shares are quoted with a dash (`BRK.B` -> `BRK-B`).
fn provider_symbol(ticker: &str) -> String {
    ticker.trim().replace('.', "-")
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn trading_date(ts: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.with_timezone(&New_York).date_naive())
}

fn at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

fn bars_from_result(result: ChartResult) -> Vec<DailyBar> {
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        // Rows without a close are halted or partial sessions.
        let Some(close) = at(&quote.close, i) else { continue };
        let Some(date) = trading_date(*ts) else { continue };
        bars.push(DailyBar {
            date,
            open: at(&quote.open, i).unwrap_or(close),
            high: at(&quote.high, i).unwrap_or(close),
            low: at(&quote.low, i).unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }
    bars
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn daily_history(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url,
            provider_symbol(ticker),
            epoch_seconds(start),
            epoch_seconds(end)
        );
        info!("Fetching daily history from URL: {}", url);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            // Unknown symbols and ranges before a listing come back as errors
            // with an explanation in `chart.error`.
            let text = resp.text().await?;
            return match serde_json::from_str::<ChartResponse>(&text) {
                Ok(body) if body.chart.result.is_none() => {
                    if let Some(err) = body.chart.error {
                        warn!("No price data for {}: {} ({})", ticker, err.description, err.code);
                    }
                    Ok(Vec::new())
                }
                _ if status == StatusCode::NOT_FOUND => {
                    warn!("Price provider has no symbol {}", ticker);
                    Ok(Vec::new())
                }
                _ => Err(DashboardError::SourceUnavailable(format!(
                    "price provider rejected request for {} with status {}",
                    ticker, status
                ))),
            };
        }

        let body = resp
            .error_for_status()?
            .json::<ChartResponse>()
            .await
            .map_err(|e| DashboardError::Parse(format!("price history for {}: {}", ticker, e)))?;

        Ok(body
            .chart
            .result
            .and_then(|mut r| r.pop())
            .map(bars_from_result)
            .unwrap_or_default())
    }
}

fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Computes the trailing return on the daily rows, then keeps the last row
/// of each calendar month labelled with the month-end date.
pub fn resample_monthly(ticker: &str, bars: &[DailyBar]) -> MonthlyPriceSeries {
    let mut daily = bars.to_vec();
    daily.sort_by_key(|b| b.date);
    daily.dedup_by_key(|b| b.date);

    let mut rows: Vec<MonthlyPricePoint> = Vec::new();
    for (i, bar) in daily.iter().enumerate() {
        let monthly_return = i
            .checked_sub(RETURN_PERIODS)
            .map(|j| daily[j].close)
            .filter(|base| *base != 0.0)
            .map(|base| bar.close / base - 1.0);

        let point = MonthlyPricePoint {
            date: month_end(bar.date),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            monthly_return,
        };

        match rows.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => rows.push(point),
        }
    }

    MonthlyPriceSeries {
        ticker: ticker.to_string(),
        rows,
    }
}

/// Monthly series for `ticker` over `window`. No rows is not an error: the
/// result is an empty series so charts can show a notice.
pub async fn get_price_history(source: &dyn PriceSource, ticker: &str, window: DateWindow) -> Result<MonthlyPriceSeries> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(DashboardError::InvalidRequest("ticker must not be empty".to_string()));
    }
    if window.start > window.end {
        return Err(DashboardError::InvalidRequest(format!(
            "start {} is after end {}",
            window.start, window.end
        )));
    }

    let bars = source.daily_history(ticker, window.start, window.end).await?;
    if bars.is_empty() {
        warn!("No price rows for {} between {} and {}", ticker, window.start, window.end);
        return Ok(MonthlyPriceSeries::empty(ticker));
    }

    Ok(resample_monthly(ticker, &bars))
}
