use super_agent_router::{api::start_server, config::AppConfig, executor::build_default_executor};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; chat and grounded answers will fail");
    }

    info!("Super Agent Router - API Server");
    info!(
        port = config.port,
        staging_dir = %config.staging_dir.display(),
        index_dir = %config.index_storage_dir.display(),
        search = %config.elasticsearch_url,
        "Configuration loaded"
    );

    let executor = Arc::new(build_default_executor(&config)?);

    info!("Executor initialized, starting API server");

    start_server(executor, config.port).await?;

    Ok(())
}
