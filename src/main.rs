//! geoprofile - Location Intelligence Microservice
//!
//! Aggregates crime, environmental, transit, and weather signals for a
//! geographic point from independent open-data providers, tolerating the
//! failure of any subset of them, and serves the merged profile with a
//! confidence score over HTTP.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoprofile::adapters::{
    OpenMeteoAdapter, OverpassTransitAdapter, SocrataCrimeAdapter, UsgsQuakeAdapter,
};
use geoprofile::config::EngineConfig;
use geoprofile::registry::ProviderRegistry;
use geoprofile::{AppState, ProfileEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting geoprofile (Location Intelligence) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load()?;

    // Explicit registry construction: every provider the deployment can
    // reach is registered here, once, before the engine starts
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(OpenMeteoAdapter::new()?));
    registry.register(Arc::new(UsgsQuakeAdapter::new()?));
    registry.register(Arc::new(OverpassTransitAdapter::new()?));

    match (
        config.providers.socrata_domain.clone(),
        config.providers.socrata_dataset.clone(),
    ) {
        (Some(domain), Some(dataset)) => {
            registry.register(Arc::new(SocrataCrimeAdapter::new(
                domain,
                dataset,
                config.providers.socrata_app_token.clone(),
            )?));
        }
        _ => info!("Socrata crime source not configured; crime category disabled"),
    }

    for descriptor in registry.descriptors() {
        info!(
            provider = %descriptor.name,
            category = %descriptor.category,
            timeout_ms = descriptor.timeout_ms,
            "Registered provider"
        );
    }

    let engine = Arc::new(ProfileEngine::new(Arc::new(registry), &config));
    let state = AppState::new(engine);
    let app = geoprofile::build_router(state);

    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
