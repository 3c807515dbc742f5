// src/services/sector.rs

/// Broad-index ETF used for any sector without a dedicated fund.
pub const DEFAULT_ETF: &str = "SPY";

const SECTOR_ETFS: &[(&str, &str)] = &[
    ("Information Technology", "XLK"),
    ("Health Care", "XLV"),
    ("Financials", "XLF"),
    ("Consumer Discretionary", "XLY"),
    ("Communication Services", "XLC"),
    ("Industrials", "XLI"),
    ("Consumer Staples", "XLP"),
    ("Energy", "XLE"),
    ("Utilities", "XLU"),
    ("Real Estate", "XLRE"),
    ("Materials", "XLB"),
];

pub fn map_sector_to_etf(sector: &str) -> &'static str {
    let sector = sector.trim();
    SECTOR_ETFS
        .iter()
        .find(|(name, _)| *name == sector)
        .map(|(_, etf)| *etf)
        .unwrap_or(DEFAULT_ETF)
}
