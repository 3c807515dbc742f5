// src/services/dashboard.rs
use chrono::{NaiveDate, Utc};
use chrono_tz::America::New_York;
use csv::WriterBuilder;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::{CacheKey, CachedValue, FetchCache};
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::models::{
    symbol_from_label, Constituents, DateWindow, Indicator, IndicatorToggles, MacroSeries, MonthlyPriceSeries,
};
use crate::services::charts::{build_combined_chart, build_indicator_grid, ChartSpec, IndicatorGrid};
use crate::services::constituents::{ConstituentSource, WikipediaConstituents};
use crate::services::macro_data::{get_macro_series, FredSource, MacroSource};
use crate::services::market_data::{get_price_history, PriceSource, YahooPriceSource};
use crate::services::sector::map_sector_to_etf;

const UNKNOWN_SECTOR: &str = "Unknown";

/// Current user input: one stock and six independent indicator switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// `AAPL` or `AAPL - Apple Inc.`; `None` picks the first constituent.
    pub symbol: Option<String>,
    pub toggles: IndicatorToggles,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub symbol: String,
    pub company: Option<String>,
    pub sector: String,
    pub sector_etf: String,
    pub window: DateWindow,
    pub combined: ChartSpec,
    pub grid: IndicatorGrid,
    /// Indicators whose 12-observation YoY lookback is not one year.
    pub lookback_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawData {
    pub tables: Vec<RawTable>,
}

impl RawData {
    /// One section per table: a title line, a header line, then the rows.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
        for table in &self.tables {
            writer.write_record([table.title.as_str()]).map_err(csv_error)?;
            writer.write_record(&table.columns).map_err(csv_error)?;
            for row in &table.rows {
                writer.write_record(row).map_err(csv_error)?;
            }
        }
        let bytes = writer.into_inner().map_err(csv_error)?;
        String::from_utf8(bytes).map_err(csv_error)
    }
}

fn csv_error(e: impl std::fmt::Display) -> DashboardError {
    DashboardError::Parse(format!("csv export: {}", e))
}

/// Everything one interaction fetched, before it is turned into charts.
struct Gathered {
    symbol: String,
    company: Option<String>,
    sector: String,
    sector_etf: String,
    window: DateWindow,
    stock: Arc<MonthlyPriceSeries>,
    sector_prices: Arc<MonthlyPriceSeries>,
    indicators: Vec<(Indicator, Option<Arc<MacroSeries>>)>,
}

/// Pull-based recomputation: the hosting UI passes the current selection
/// and gets back the full chart set.
pub struct Dashboard {
    constituent_source: Arc<dyn ConstituentSource>,
    price_source: Arc<dyn PriceSource>,
    macro_source: Arc<dyn MacroSource>,
    cache: Arc<FetchCache>,
    lookback_years: i64,
}

impl Dashboard {
    pub fn new(
        constituent_source: Arc<dyn ConstituentSource>,
        price_source: Arc<dyn PriceSource>,
        macro_source: Arc<dyn MacroSource>,
        cache: Arc<FetchCache>,
        lookback_years: i64,
    ) -> Self {
        Self {
            constituent_source,
            price_source,
            macro_source,
            cache,
            lookback_years,
        }
    }

    /// Live providers and a fresh cache, as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(WikipediaConstituents::new(config.constituents_url.clone())?),
            Arc::new(YahooPriceSource::new(config.yahoo_base_url.clone())?),
            Arc::new(FredSource::new(config.fred_base_url.clone(), config.fred_api_key.clone())),
            Arc::new(FetchCache::new(config.cache_ttl_minutes)),
            config.lookback_years,
        ))
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    /// Today in the exchange timezone.
    pub fn today() -> NaiveDate {
        Utc::now().with_timezone(&New_York).date_naive()
    }

    pub fn window_ending(&self, today: NaiveDate) -> DateWindow {
        DateWindow::trailing_years(today, self.lookback_years)
    }

    pub async fn constituents(&self) -> Result<Arc<Constituents>> {
        let key = CacheKey::Constituents;
        if let Some(CachedValue::Constituents(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }
        debug!("Cache miss for {:?}", key);
        let fresh = Arc::new(self.constituent_source.list_constituents().await?);
        self.cache.insert(key, CachedValue::Constituents(fresh.clone()));
        Ok(fresh)
    }

    pub async fn price_history(&self, ticker: &str, window: DateWindow) -> Result<Arc<MonthlyPriceSeries>> {
        let key = CacheKey::PriceHistory {
            ticker: ticker.trim().to_uppercase(),
            start: window.start,
            end: window.end,
        };
        if let Some(CachedValue::Prices(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }
        debug!("Cache miss for {:?}", key);
        let fresh = Arc::new(get_price_history(self.price_source.as_ref(), ticker, window).await?);
        self.cache.insert(key, CachedValue::Prices(fresh.clone()));
        Ok(fresh)
    }

    pub async fn macro_series(&self, code: &str, window: DateWindow) -> Result<Arc<MacroSeries>> {
        let key = CacheKey::MacroSeries {
            code: code.trim().to_string(),
            start: window.start,
            end: window.end,
        };
        if let Some(CachedValue::Macro(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }
        debug!("Cache miss for {:?}", key);
        let fresh = Arc::new(get_macro_series(self.macro_source.as_ref(), code, window).await?);
        self.cache.insert(key, CachedValue::Macro(fresh.clone()));
        Ok(fresh)
    }

    /// Fetches strictly in order: constituents, stock, sector ETF, then each
    /// selected indicator. Only `DataUnavailable` from an indicator is absorbed.
    async fn gather(&self, selection: &Selection, today: NaiveDate) -> Result<Gathered> {
        let window = self.window_ending(today);
        let constituents = self.constituents().await?;

        let symbol = match selection.symbol.as_deref().map(symbol_from_label) {
            Some(symbol) if !symbol.is_empty() => symbol.to_string(),
            _ => constituents
                .first_symbol()
                .map(str::to_string)
                .ok_or_else(|| DashboardError::SourceUnavailable("constituent list is empty".to_string()))?,
        };

        let record = constituents.records.iter().find(|r| r.symbol == symbol);
        let sector = match record {
            Some(r) => r.sector.clone(),
            None => {
                warn!("{} is not an index constituent, using the broad index ETF", symbol);
                UNKNOWN_SECTOR.to_string()
            }
        };
        let sector_etf = map_sector_to_etf(&sector).to_string();
        info!(
            "Rendering {} ({} -> {}) for {} to {}",
            symbol, sector, sector_etf, window.start, window.end
        );

        let stock = self.price_history(&symbol, window).await?;
        let sector_prices = self.price_history(&sector_etf, window).await?;

        let mut indicators = Vec::new();
        for indicator in selection.toggles.selected() {
            match self.macro_series(indicator.series_code(), window).await {
                Ok(series) => indicators.push((indicator, Some(series))),
                Err(e) if e.is_data_unavailable() => {
                    warn!("{} unavailable: {}", indicator.label(), e);
                    indicators.push((indicator, None));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Gathered {
            company: record.map(|r| r.company.clone()),
            symbol,
            sector,
            sector_etf,
            window,
            stock,
            sector_prices,
            indicators,
        })
    }

    pub async fn render(&self, selection: &Selection) -> Result<DashboardView> {
        self.render_at(selection, Self::today()).await
    }

    pub async fn render_at(&self, selection: &Selection, today: NaiveDate) -> Result<DashboardView> {
        let gathered = self.gather(selection, today).await?;

        let empty_series: Vec<MacroSeries> = gathered
            .indicators
            .iter()
            .map(|(indicator, _)| MacroSeries::empty(indicator.series_code()))
            .collect();

        let combined_inputs: Vec<(&str, &MacroSeries)> = gathered
            .indicators
            .iter()
            .zip(&empty_series)
            .map(|((indicator, series), empty)| (indicator.label(), series.as_deref().unwrap_or(empty)))
            .collect();
        let combined = build_combined_chart(
            &gathered.stock,
            &gathered.sector_prices,
            &gathered.sector,
            &combined_inputs,
        );

        let grid_inputs: Vec<(Indicator, Option<&MacroSeries>)> = gathered
            .indicators
            .iter()
            .map(|(indicator, series)| (*indicator, series.as_deref()))
            .collect();
        let grid = build_indicator_grid(&grid_inputs);

        let lookback_warnings = gathered
            .indicators
            .iter()
            .filter(|(_, series)| series.as_ref().map_or(false, |s| s.yoy_lookback_mismatch))
            .map(|(indicator, _)| indicator.label().to_string())
            .collect();

        Ok(DashboardView {
            symbol: gathered.symbol,
            company: gathered.company,
            sector: gathered.sector,
            sector_etf: gathered.sector_etf,
            window: gathered.window,
            combined,
            grid,
            lookback_warnings,
        })
    }

    pub async fn raw_data(&self, selection: &Selection) -> Result<RawData> {
        self.raw_data_at(selection, Self::today()).await
    }

    /// Tables behind every active series, for the expandable raw view.
    pub async fn raw_data_at(&self, selection: &Selection, today: NaiveDate) -> Result<RawData> {
        let gathered = self.gather(selection, today).await?;

        let mut tables = vec![
            price_table(format!("{} Stock Data", gathered.symbol), &gathered.stock),
            price_table(
                format!("{} Sector ETF ({}) Data", gathered.sector, gathered.sector_etf),
                &gathered.sector_prices,
            ),
        ];
        for (indicator, series) in &gathered.indicators {
            tables.push(macro_table(format!("{} Data", indicator.label()), series.as_deref()));
        }

        Ok(RawData { tables })
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn price_table(title: String, series: &MonthlyPriceSeries) -> RawTable {
    RawTable {
        title,
        columns: ["Date", "Open", "High", "Low", "Close", "Volume", "Monthly_Return"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: series
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.date.to_string(),
                    r.open.to_string(),
                    r.high.to_string(),
                    r.low.to_string(),
                    r.close.to_string(),
                    r.volume.to_string(),
                    optional(r.monthly_return),
                ]
            })
            .collect(),
    }
}

fn macro_table(title: String, series: Option<&MacroSeries>) -> RawTable {
    RawTable {
        title,
        columns: ["Date", "Value", "YoY_Change"].iter().map(|c| c.to_string()).collect(),
        rows: series
            .map(|s| {
                s.points
                    .iter()
                    .map(|p| vec![p.date.to_string(), optional(p.value), optional(p.yoy_change)])
                    .collect()
            })
            .unwrap_or_default(),
    }
}
