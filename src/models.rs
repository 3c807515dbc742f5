// src/models.rs
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub company: String,
    pub sector: String,
}

impl SymbolRecord {
    pub fn label(&self) -> String {
        format!("{} - {}", self.symbol, self.company)
    }
}

/// Scraped index membership, in page order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Constituents {
    pub records: Vec<SymbolRecord>,
}

impl Constituents {
    /// `"SYMBOL - Company"` labels in page order.
    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(SymbolRecord::label).collect()
    }

    pub fn sectors(&self) -> HashMap<String, String> {
        self.records
            .iter()
            .map(|r| (r.symbol.clone(), r.sector.clone()))
            .collect()
    }

    pub fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| r.sector.as_str())
    }

    pub fn first_symbol(&self) -> Option<&str> {
        self.records.first().map(|r| r.symbol.as_str())
    }
}

/// Extracts the ticker from either `AAPL` or `AAPL - Apple Inc.`.
pub fn symbol_from_label(label: &str) -> &str {
    label.split(" - ").next().unwrap_or(label).trim()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPricePoint {
    /// Calendar month-end.
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Trailing 30-trading-day return as a fraction.
    pub monthly_return: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPriceSeries {
    pub ticker: String,
    pub rows: Vec<MonthlyPricePoint>,
}

impl MonthlyPriceSeries {
    pub fn empty(ticker: impl Into<String>) -> Self {
        MonthlyPriceSeries {
            ticker: ticker.into(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroObservation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
    /// Fractional change against the value 12 periods earlier.
    pub yoy_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSeries {
    pub code: String,
    pub frequency: Frequency,
    pub interpolated: bool,
    /// Set when the 12-period lookback does not span twelve months.
    pub yoy_lookback_mismatch: bool,
    pub points: Vec<MacroPoint>,
}

impl MacroSeries {
    pub fn empty(code: impl Into<String>) -> Self {
        MacroSeries {
            code: code.into(),
            frequency: Frequency::Unknown,
            interpolated: false,
            yoy_lookback_mismatch: false,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_yoy(&self) -> bool {
        self.points.iter().any(|p| p.yoy_change.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Gdp,
    Cpi,
    Unemployment,
    IndustrialProduction,
    ConsumerSentiment,
    RetailSales,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Gdp,
        Indicator::Cpi,
        Indicator::Unemployment,
        Indicator::IndustrialProduction,
        Indicator::ConsumerSentiment,
        Indicator::RetailSales,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Indicator::Gdp => "GDP",
            Indicator::Cpi => "CPI",
            Indicator::Unemployment => "Unemployment Rate",
            Indicator::IndustrialProduction => "Industrial Production Index",
            Indicator::ConsumerSentiment => "Consumer Sentiment",
            Indicator::RetailSales => "Retail Sales",
        }
    }

    /// FRED series id.
    pub fn series_code(self) -> &'static str {
        match self {
            Indicator::Gdp => "GDP",
            Indicator::Cpi => "CPIAUCSL",
            Indicator::Unemployment => "UNRATE",
            Indicator::IndustrialProduction => "INDPRO",
            Indicator::ConsumerSentiment => "UMCSENT",
            Indicator::RetailSales => "RSAFS",
        }
    }
}

/// One independent switch per recognized indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorToggles {
    pub gdp: bool,
    pub cpi: bool,
    pub unemployment: bool,
    pub industrial_production: bool,
    pub consumer_sentiment: bool,
    pub retail_sales: bool,
}

impl IndicatorToggles {
    pub fn is_enabled(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::Gdp => self.gdp,
            Indicator::Cpi => self.cpi,
            Indicator::Unemployment => self.unemployment,
            Indicator::IndustrialProduction => self.industrial_production,
            Indicator::ConsumerSentiment => self.consumer_sentiment,
            Indicator::RetailSales => self.retail_sales,
        }
    }

    pub fn set(&mut self, indicator: Indicator, enabled: bool) {
        let slot = match indicator {
            Indicator::Gdp => &mut self.gdp,
            Indicator::Cpi => &mut self.cpi,
            Indicator::Unemployment => &mut self.unemployment,
            Indicator::IndustrialProduction => &mut self.industrial_production,
            Indicator::ConsumerSentiment => &mut self.consumer_sentiment,
            Indicator::RetailSales => &mut self.retail_sales,
        };
        *slot = enabled;
    }

    /// Enabled indicators in fixed display order.
    pub fn selected(&self) -> Vec<Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(|i| self.is_enabled(*i))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Trailing window of `years * 365` days ending at `end`. Negative years
    /// give an empty window; spans past the calendar floor start at `NaiveDate::MIN`.
    pub fn trailing_years(end: NaiveDate, years: i64) -> Self {
        let days = u64::try_from(years).unwrap_or(0).saturating_mul(365);
        DateWindow {
            start: end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            end,
        }
    }
}
