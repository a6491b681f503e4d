use brief_core::BriefingStore;
use brief_server::http::{self, AppState};
use brief_server::BriefConfig;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(config: BriefConfig) -> anyhow::Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            warn!("config: {}", e);
        }
        anyhow::bail!("Invalid configuration ({} problem(s))", errors.len());
    }

    info!("Starting Brief server v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP: {}", config.server.http_addr);
    info!("Data: {:?}", config.server.data_dir);

    info!("Opening database...");
    let pipeline = Arc::new(crate::cli::open_pipeline(&config)?);
    let projects = pipeline.store().list_projects()?;
    info!("Database loaded: {} projects", projects.len());
    info!("Model: {}", pipeline.model_name());

    let app = http::create_router(AppState::new(pipeline));
    let addr = config.http_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Brief server ready on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, terminating...");
        })
        .await?;

    Ok(())
}
