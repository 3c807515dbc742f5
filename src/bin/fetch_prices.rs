use anyhow::Context;
use dotenv::dotenv;
use sector_macro_dashboard::config::DEFAULT_YAHOO_BASE_URL;
use sector_macro_dashboard::models::DateWindow;
use sector_macro_dashboard::services::dashboard::Dashboard;
use sector_macro_dashboard::services::market_data::{get_price_history, YahooPriceSource};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let ticker = env::args().nth(1).context("usage: fetch_prices <TICKER>")?;
    let base_url = env::var("YAHOO_BASE_URL").unwrap_or_else(|_| DEFAULT_YAHOO_BASE_URL.to_string());
    let source = YahooPriceSource::new(base_url)?;
    let window = DateWindow::trailing_years(Dashboard::today(), 5);

    let series = get_price_history(&source, &ticker, window).await?;
    if series.is_empty() {
        println!("No price data for {} between {} and {}", ticker, window.start, window.end);
        return Ok(());
    }
    for row in &series.rows {
        println!("{}  close={:>10.2}  30d={:?}", row.date, row.close, row.monthly_return);
    }

    Ok(())
}
