use dotenv::dotenv;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use warp::Filter;

use sector_macro_dashboard::cache::FetchCache;
use sector_macro_dashboard::config::Config;
use sector_macro_dashboard::routes;
use sector_macro_dashboard::services::dashboard::Dashboard;

/// Every 15 minutes, on the minute.
const PURGE_SCHEDULE: &str = "0 */15 * * * *";

async fn start_cache_purge(cache: Arc<FetchCache>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(PURGE_SCHEDULE, move |_uuid, _l| {
        let cache = cache.clone();
        Box::pin(async move {
            let purged = cache.purge_expired();
            if purged > 0 {
                info!("Purged {} expired cache entries", purged);
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    // Fail before binding if the macro provider key is missing.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let dashboard = match Dashboard::from_config(&config) {
        Ok(dashboard) => Arc::new(dashboard),
        Err(e) => {
            error!("Failed to build data sources: {}", e);
            process::exit(1);
        }
    };

    let _scheduler = match start_cache_purge(dashboard.cache().clone()).await {
        Ok(scheduler) => Some(scheduler),
        Err(e) => {
            warn!("Cache purge job not started, entries expire on access only: {}", e);
            None
        }
    };

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(dashboard).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
}
