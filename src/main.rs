#![allow(clippy::result_large_err)]

use bes_scraper::{
    api::{BesApi, HttpTransport},
    config::{self, credentials::load_credentials, database},
    errors::Result,
    pipeline::Extractor,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Configuration and credentials
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let credentials = load_credentials(&app_config.server.username)?;

    // 4. Store
    let database_url = database::get_database_url(&app_config);
    database::ensure_sqlite_dir(&database_url)?;
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Remote client
    let transport = HttpTransport::new(
        &app_config.server.base_url,
        credentials,
        app_config.server.timeout(),
        app_config.server.ignore_ssl,
    )?;
    let api = BesApi::from_config(transport, &app_config);
    info!("Extracting from {}", app_config.server.base_url);

    // 6. Run
    let summary = Extractor::from_config(&api, &db, &app_config)
        .run()
        .await
        .inspect_err(|e| error!("Extraction aborted: {}", e))?;

    if summary.total_failed() > 0 {
        info!(
            "Extraction finished with {} failures; rerun to pick up what was missed",
            summary.total_failed()
        );
    } else {
        info!("Extraction finished");
    }
    Ok(())
}
