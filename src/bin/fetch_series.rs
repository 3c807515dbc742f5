use anyhow::Context;
use dotenv::dotenv;
use sector_macro_dashboard::config::Config;
use sector_macro_dashboard::models::DateWindow;
use sector_macro_dashboard::services::dashboard::Dashboard;
use sector_macro_dashboard::services::macro_data::{get_macro_series, FredSource};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let code = env::args().nth(1).context("usage: fetch_series <SERIES_CODE>")?;
    let config = Config::from_env()?;
    let source = FredSource::new(config.fred_base_url.clone(), config.fred_api_key.clone());
    let window = DateWindow::trailing_years(Dashboard::today(), config.lookback_years);

    let series = get_macro_series(&source, &code, window).await?;
    println!(
        "{}: {} points, {:?}, interpolated={}, lookback mismatch={}",
        series.code,
        series.points.len(),
        series.frequency,
        series.interpolated,
        series.yoy_lookback_mismatch
    );
    for point in &series.points {
        println!("{}  {:>12?}  {:>10?}", point.date, point.value, point.yoy_change);
    }

    Ok(())
}
