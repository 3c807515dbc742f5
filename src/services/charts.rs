// src/services/charts.rs
//! Display specs shaped like plotly figures so a browser page can hand
//! `traces` and `layout` straight to `Plotly.newPlot`.
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Indicator, MacroSeries, MonthlyPriceSeries};

pub const STOCK_COLOR: &str = "#4a9ff5";
pub const SECTOR_COLOR: &str = "#50c878";
pub const INDICATOR_COLORS: [&str; 6] = ["#ff6b6b", "#feca57", "#48dbfb", "#ff9ff3", "#54a0ff", "#5f27cd"];

const PANEL_BG: &str = "rgba(45,45,45,1)";
const FONT_COLOR: &str = "#ffffff";
const GRID_COLOR: &str = "#444444";

pub const NO_DATA_NOTICE: &str = "No data";
pub const SELECT_INDICATOR_NOTICE: &str =
    "Please select at least one economic indicator to display individual charts.";
pub const GRID_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    #[serde(rename = "y")]
    Primary,
    #[serde(rename = "y2")]
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<Option<f64>>,
    pub line: Line,
    #[serde(rename = "yaxis")]
    pub axis: Axis,
}

impl Trace {
    fn line(name: String, x: Vec<NaiveDate>, y: Vec<Option<f64>>, color: &str, axis: Axis) -> Self {
        Trace {
            kind: "scatter",
            mode: "lines",
            name,
            x,
            y,
            line: Line { color: color.to_string() },
            axis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLayout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub showgrid: bool,
    pub gridcolor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickformat: Option<&'static str>,
}

impl AxisLayout {
    fn gridded(title: Option<&str>) -> Self {
        AxisLayout {
            title: title.map(|t| Title { text: t.to_string() }),
            showgrid: true,
            gridcolor: GRID_COLOR,
            overlaying: None,
            side: None,
            tickformat: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: &'static str,
    pub yanchor: &'static str,
    pub y: f64,
    pub xanchor: &'static str,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font: Font,
    pub xaxis: AxisLayout,
    pub yaxis: AxisLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<AxisLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

impl Layout {
    fn dark(title: &str, height: u32) -> Self {
        Layout {
            title: Title { text: title.to_string() },
            height,
            width: None,
            paper_bgcolor: PANEL_BG,
            plot_bgcolor: PANEL_BG,
            font: Font { color: FONT_COLOR },
            xaxis: AxisLayout::gridded(None),
            yaxis: AxisLayout::gridded(None),
            yaxis2: None,
            legend: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub traces: Vec<Trace>,
    pub layout: Layout,
    /// Shown instead of, or beside, the plot when inputs are missing.
    pub notices: Vec<String>,
}

impl ChartSpec {
    pub fn has_data(&self) -> bool {
        !self.traces.is_empty()
    }
}

/// Which macro column a single-series panel plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColumn {
    Value,
    YoyChange,
}

fn price_trace(name: String, series: &MonthlyPriceSeries, color: &str) -> Trace {
    Trace::line(
        name,
        series.rows.iter().map(|r| r.date).collect(),
        series.rows.iter().map(|r| Some(r.close)).collect(),
        color,
        Axis::Primary,
    )
}

fn macro_trace(name: String, series: &MacroSeries, column: SeriesColumn, color: &str, axis: Axis) -> Trace {
    let y = series
        .points
        .iter()
        .map(|p| match column {
            SeriesColumn::Value => p.value,
            SeriesColumn::YoyChange => p.yoy_change,
        })
        .collect();
    Trace::line(name, series.points.iter().map(|p| p.date).collect(), y, color, axis)
}

/// Stock and sector ETF close on the left axis, every macro YoY series on
/// the right axis. Empty inputs become notices rather than empty traces.
pub fn build_combined_chart(
    stock: &MonthlyPriceSeries,
    sector: &MonthlyPriceSeries,
    sector_name: &str,
    indicators: &[(&str, &MacroSeries)],
) -> ChartSpec {
    let title = format!(
        "Stock Price ({}), Sector ETF ({}), and Economic Indicators YoY Change",
        stock.ticker, sector.ticker
    );
    let mut traces = Vec::new();
    let mut notices = Vec::new();

    if stock.is_empty() {
        notices.push(format!("No price data for {} in the selected time range.", stock.ticker));
    } else {
        traces.push(price_trace(format!("{} Stock Price", stock.ticker), stock, STOCK_COLOR));
    }

    if sector.is_empty() {
        notices.push(format!("No price data for sector ETF {} in the selected time range.", sector.ticker));
    } else {
        traces.push(price_trace(
            format!("{} Sector ETF ({})", sector_name, sector.ticker),
            sector,
            SECTOR_COLOR,
        ));
    }

    for (i, (label, series)) in indicators.iter().enumerate() {
        if series.has_yoy() {
            let color = INDICATOR_COLORS[i % INDICATOR_COLORS.len()];
            traces.push(macro_trace(
                format!("{} YoY Change", label),
                series,
                SeriesColumn::YoyChange,
                color,
                Axis::Secondary,
            ));
        } else {
            notices.push(format!("{} YoY change is not available for the selected time range.", label));
        }
    }

    if traces.is_empty() {
        notices.insert(0, NO_DATA_NOTICE.to_string());
    }

    let mut layout = Layout::dark(&title, 600);
    layout.xaxis = AxisLayout::gridded(Some("Date"));
    layout.yaxis = AxisLayout::gridded(Some("Price"));
    layout.yaxis2 = Some(AxisLayout {
        title: Some(Title { text: "YoY Change (%)".to_string() }),
        showgrid: false,
        gridcolor: GRID_COLOR,
        overlaying: Some("y"),
        side: Some("right"),
        tickformat: Some(".0%"),
    });
    layout.legend = Some(Legend {
        orientation: "h",
        yanchor: "bottom",
        y: 1.02,
        xanchor: "right",
        x: 1.0,
    });

    ChartSpec {
        title,
        traces,
        layout,
        notices,
    }
}

/// One-line panel for an individual indicator.
pub fn build_single_series_chart(series: &MacroSeries, title: &str, column: SeriesColumn) -> ChartSpec {
    let mut layout = Layout::dark(title, 300);
    layout.width = Some(400);

    let has_values = series.points.iter().any(|p| match column {
        SeriesColumn::Value => p.value.is_some(),
        SeriesColumn::YoyChange => p.yoy_change.is_some(),
    });

    let (traces, notices) = if has_values {
        let trace = macro_trace(title.to_string(), series, column, STOCK_COLOR, Axis::Primary);
        (vec![trace], Vec::new())
    } else {
        (Vec::new(), vec![NO_DATA_NOTICE.to_string()])
    };

    ChartSpec {
        title: title.to_string(),
        traces,
        layout,
        notices,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub indicator: Indicator,
    pub label: &'static str,
    /// Grid column, `0` or `1`.
    pub column: usize,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorGrid {
    pub columns: usize,
    pub panels: Vec<Panel>,
    pub notices: Vec<String>,
}

/// Lays selected indicators out two per row. `None` marks an indicator the
/// provider could not supply.
pub fn build_indicator_grid(indicators: &[(Indicator, Option<&MacroSeries>)]) -> IndicatorGrid {
    if indicators.is_empty() {
        return IndicatorGrid {
            columns: GRID_COLUMNS,
            panels: Vec::new(),
            notices: vec![SELECT_INDICATOR_NOTICE.to_string()],
        };
    }

    let panels = indicators
        .iter()
        .enumerate()
        .map(|(i, (indicator, series))| {
            let label = indicator.label();
            let title = format!("{} Value", label);
            let mut chart = match series {
                Some(series) => build_single_series_chart(series, &title, SeriesColumn::Value),
                None => build_single_series_chart(&MacroSeries::empty(indicator.series_code()), &title, SeriesColumn::Value),
            };
            if !chart.has_data() {
                chart.notices = vec![format!("{} data is not available for the selected time range.", label)];
            }
            Panel {
                indicator: *indicator,
                label,
                column: i % GRID_COLUMNS,
                chart,
            }
        })
        .collect();

    IndicatorGrid {
        columns: GRID_COLUMNS,
        panels,
        notices: Vec::new(),
    }
}
