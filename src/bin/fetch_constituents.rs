use dotenv::dotenv;
use log::info;
use sector_macro_dashboard::config::DEFAULT_CONSTITUENTS_URL;
use sector_macro_dashboard::services::constituents::{ConstituentSource, WikipediaConstituents};
use sector_macro_dashboard::services::sector::map_sector_to_etf;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let url = env::var("CONSTITUENTS_URL").unwrap_or_else(|_| DEFAULT_CONSTITUENTS_URL.to_string());
    info!("Testing constituent scrape from {}", url);

    let constituents = WikipediaConstituents::new(url)?.list_constituents().await?;
    println!("{} constituents", constituents.records.len());
    for record in constituents.records.iter().take(10) {
        println!("{:<40} {:<28} {}", record.label(), record.sector, map_sector_to_etf(&record.sector));
    }

    Ok(())
}
