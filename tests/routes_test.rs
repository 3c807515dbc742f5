use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;
use std::sync::Arc;

use sector_macro_dashboard::cache::FetchCache;
use sector_macro_dashboard::error::{DashboardError, Result};
use sector_macro_dashboard::models::{Constituents, DailyBar, MacroObservation, SymbolRecord};
use sector_macro_dashboard::routes::routes;
use sector_macro_dashboard::services::constituents::ConstituentSource;
use sector_macro_dashboard::services::dashboard::Dashboard;
use sector_macro_dashboard::services::macro_data::MacroSource;
use sector_macro_dashboard::services::market_data::PriceSource;

struct StaticConstituents;

#[async_trait]
impl ConstituentSource for StaticConstituents {
    async fn list_constituents(&self) -> Result<Constituents> {
        Ok(Constituents {
            records: vec![SymbolRecord {
                symbol: "AAPL".into(),
                company: "Apple Inc.".into(),
                sector: "Information Technology".into(),
            }],
        })
    }
}

struct DownConstituents;

#[async_trait]
impl ConstituentSource for DownConstituents {
    async fn list_constituents(&self) -> Result<Constituents> {
        Err(DashboardError::SourceUnavailable("constituent table not found on page".into()))
    }
}

struct LinearPrices;

#[async_trait]
impl PriceSource for LinearPrices {
    async fn daily_history(&self, _ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let mut bars = Vec::new();
        let mut day = start;
        while day < end {
            if day.weekday().number_from_monday() <= 5 {
                let close = 50.0 + bars.len() as f64;
                bars.push(DailyBar {
                    date: day,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 10,
                });
            }
            day += Duration::days(1);
        }
        Ok(bars)
    }
}

struct MonthlyMacro;

#[async_trait]
impl MacroSource for MonthlyMacro {
    async fn observations(&self, _code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<MacroObservation>> {
        let mut out = Vec::new();
        let mut month = NaiveDate::from_ymd_opt(start.year(), start.month(), 1).unwrap();
        while month <= end {
            out.push(MacroObservation {
                date: month,
                value: Some(100.0 + out.len() as f64),
            });
            month = (month + Duration::days(32)).with_day(1).unwrap();
        }
        Ok(out)
    }
}

fn dashboard(constituents: Arc<dyn ConstituentSource>) -> Arc<Dashboard> {
    Arc::new(Dashboard::new(
        constituents,
        Arc::new(LinearPrices),
        Arc::new(MonthlyMacro),
        Arc::new(FetchCache::new(60)),
        5,
    ))
}

#[tokio::test]
async fn dashboard_route_returns_chart_set() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/dashboard?symbol=AAPL%20-%20Apple%20Inc.&unemployment=true")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["sector_etf"], "XLK");
    assert_eq!(body["combined"]["traces"].as_array().unwrap().len(), 3);
    assert_eq!(body["combined"]["traces"][2]["yaxis"], "y2");
    assert_eq!(body["grid"]["panels"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn no_indicators_returns_selection_notice() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request().path("/api/v1/dashboard").reply(&filter).await;

    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body["grid"]["panels"].as_array().unwrap().is_empty());
    assert_eq!(
        body["grid"]["notices"][0],
        "Please select at least one economic indicator to display individual charts."
    );
}

#[tokio::test]
async fn constituents_route_lists_labels_and_sectors() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request().path("/api/v1/constituents").reply(&filter).await;

    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["labels"][0], "AAPL - Apple Inc.");
    assert_eq!(body["sectors"]["AAPL"], "Information Technology");
}

#[tokio::test]
async fn unavailable_source_maps_to_bad_gateway() {
    let filter = routes(dashboard(Arc::new(DownConstituents)));
    let resp = warp::test::request().path("/api/v1/dashboard?cpi=true").reply(&filter).await;

    assert_eq!(resp.status(), 502);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Source unavailable"));
}

#[tokio::test]
async fn raw_route_exports_csv() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request()
        .path("/api/v1/dashboard/raw?symbol=AAPL&cpi=true&format=csv")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "text/csv; charset=utf-8");
    let body = String::from_utf8(resp.body().to_vec()).unwrap();
    assert!(body.starts_with("AAPL Stock Data\n"));
    assert!(body.contains("CPI Data\nDate,Value,YoY_Change\n"));
}

#[tokio::test]
async fn cache_can_be_cleared_manually() {
    let dashboard = dashboard(Arc::new(StaticConstituents));
    let filter = routes(dashboard.clone());

    warp::test::request().path("/api/v1/dashboard?symbol=AAPL").reply(&filter).await;
    assert_eq!(dashboard.cache().len(), 3);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/cache/clear")
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["cleared"], 3);
    assert!(dashboard.cache().is_empty());
}

#[tokio::test]
async fn bad_toggle_value_is_a_bad_request() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request().path("/api/v1/dashboard?gdp=maybe").reply(&filter).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let filter = routes(dashboard(Arc::new(StaticConstituents)));
    let resp = warp::test::request().path("/api/v2/nothing").reply(&filter).await;
    assert_eq!(resp.status(), 404);
}
