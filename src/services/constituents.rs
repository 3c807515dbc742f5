// src/services/constituents.rs
use async_trait::async_trait;
use log::{error, info, warn};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{DashboardError, Result};
use crate::models::{Constituents, SymbolRecord};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[async_trait]
pub trait ConstituentSource: Send + Sync {
    async fn list_constituents(&self) -> Result<Constituents>;
}

/// Scrapes the index membership table from a public wiki page.
pub struct WikipediaConstituents {
    client: Client,
    url: String,
}

impl WikipediaConstituents {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConstituentSource for WikipediaConstituents {
    async fn list_constituents(&self) -> Result<Constituents> {
        info!("Fetching index constituents from URL: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Constituent page request failed: {}", e);
                DashboardError::SourceUnavailable(format!("failed to retrieve {}: {}", self.url, e))
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::SourceUnavailable(format!("failed to read page body: {}", e)))?;

        let constituents = parse_constituents(&body)?;
        info!("Parsed {} constituents", constituents.records.len());
        Ok(constituents)
    }
}

/// Column positions of symbol, company and sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    symbol: usize,
    company: usize,
    sector: usize,
}

impl ColumnLayout {
    const FALLBACK: ColumnLayout = ColumnLayout {
        symbol: 0,
        company: 1,
        sector: 3,
    };

    fn from_headers(headers: &[String]) -> Self {
        let find = |needles: &[&str]| {
            headers.iter().position(|h| {
                let h = h.to_lowercase();
                needles.iter().any(|n| h.contains(n))
            })
        };
        let symbol = find(&["symbol", "ticker"]);
        let company = find(&["security", "company"]);
        let sector = find(&["sector"]);

        match (symbol, company, sector) {
            (Some(symbol), Some(company), Some(sector)) => ColumnLayout { symbol, company, sector },
            _ => {
                warn!("Constituent table headers {:?} not recognized, using default column order", headers);
                Self::FALLBACK
            }
        }
    }

    fn widest(&self) -> usize {
        self.symbol.max(self.company).max(self.sector)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DashboardError::Parse(format!("bad selector {}: {:?}", css, e)))
}

fn cell_text(cell: ElementRef<'_>, footnote: &Regex) -> String {
    let raw = cell.text().collect::<String>();
    footnote.replace_all(&raw, "").trim().to_string()
}

/// Reads the first `wikitable sortable` table: header row first, then one
/// row per constituent.
pub fn parse_constituents(html: &str) -> Result<Constituents> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.wikitable.sortable")?;
    let row_selector = selector("tr")?;
    let header_selector = selector("th")?;
    let cell_selector = selector("td")?;
    let footnote = Regex::new(r"\[[^\]]*\]").map_err(|e| DashboardError::Parse(e.to_string()))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| DashboardError::SourceUnavailable("constituent table not found on page".to_string()))?;

    let mut rows = table.select(&row_selector);
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.select(&header_selector).map(|c| cell_text(c, &footnote)).collect())
        .unwrap_or_default();
    let layout = ColumnLayout::from_headers(&headers);

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.select(&cell_selector).map(|c| cell_text(c, &footnote)).collect();
        if cells.len() <= layout.widest() {
            continue;
        }
        let symbol = cells[layout.symbol].clone();
        if symbol.is_empty() {
            continue;
        }
        records.push(SymbolRecord {
            symbol,
            company: cells[layout.company].clone(),
            sector: cells[layout.sector].clone(),
        });
    }

    if records.is_empty() {
        return Err(DashboardError::SourceUnavailable(
            "constituent table contained no rows".to_string(),
        ));
    }

    Ok(Constituents { records })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
        <table class="wikitable sortable sticky-header" id="constituents">
          <tbody>
            <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th><th>GICS Sub-Industry</th></tr>
            <tr><td><a href="#">MMM</a></td><td><a href="#">3M</a></td><td>Industrials</td><td>Industrial Conglomerates</td></tr>
            <tr><td>AAPL</td><td>Apple Inc.<sup>[4]</sup></td><td>Information Technology</td><td>Technology Hardware</td></tr>
            <tr><td>BAD</td></tr>
          </tbody>
        </table>
        <table class="wikitable sortable"><tr><th>Date</th></tr><tr><td>ignored</td></tr></table>
        </body></html>
    "##;

    #[test]
    fn parses_rows_using_header_positions() {
        let constituents = parse_constituents(PAGE).unwrap();
        assert_eq!(constituents.records.len(), 2);
        assert_eq!(
            constituents.labels(),
            vec!["MMM - 3M".to_string(), "AAPL - Apple Inc.".to_string()]
        );
        assert_eq!(constituents.sector_of("AAPL"), Some("Information Technology"));
        assert_eq!(constituents.sector_of("MMM"), Some("Industrials"));
    }

    #[test]
    fn falls_back_to_legacy_column_order() {
        let page = r#"
            <table class="wikitable sortable">
              <tr><th>A</th><th>B</th><th>C</th><th>D</th></tr>
              <tr><td>XOM</td><td>ExxonMobil</td><td>reports</td><td>Energy</td></tr>
            </table>
        "#;
        let constituents = parse_constituents(page).unwrap();
        assert_eq!(constituents.sector_of("XOM"), Some("Energy"));
    }

    #[test]
    fn missing_table_is_source_unavailable() {
        let err = parse_constituents("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable(_)));
    }

    #[test]
    fn header_only_table_is_source_unavailable() {
        let page = r#"<table class="wikitable sortable"><tr><th>Symbol</th></tr></table>"#;
        let err = parse_constituents(page).unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable(_)));
    }
}
