use std::{sync::Arc, time::Duration};

use anyhow::bail;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sowcast::cache::{create_geo_cache, start_cache_cleanup_task};
use sowcast::config::AppConfig;
use sowcast::create_http_client;
use sowcast::forecast::ForecastClient;
use sowcast::location::{LocationResolver, NominatimClient};
use sowcast::orchestrator::{RequestState, WeatherOrchestrator};
use sowcast::planting::PlantingWindowAdvisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sowcast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded successfully");

    // Shared HTTP client with connection pooling
    let http_client = create_http_client(&config)?;
    tracing::debug!("Shared HTTP client created");

    let geocoder = Arc::new(NominatimClient::new(
        http_client.clone(),
        &config.geocoding_api_url,
        &config.user_agent,
        &config.accept_language,
    ));
    let forecast = Arc::new(ForecastClient::new(
        http_client,
        &config.forecast_api_url,
        config.forecast_days,
    ));

    let geo_cache = create_geo_cache(Duration::from_secs(config.geocode_cache_ttl_secs));
    let _cleanup = start_cache_cleanup_task(geo_cache.clone());

    let orchestrator = WeatherOrchestrator::new(
        LocationResolver::new(geocoder, geo_cache),
        forecast,
        PlantingWindowAdvisor::new(config.planting),
    );
    let mut watcher = orchestrator.subscribe();

    let query = config.default_location.to_query()?;
    tracing::info!(query = ?query, "Requesting weather report");
    let ticket = orchestrator.accept(query);

    let snapshot = tokio::select! {
        snapshot = watcher.settled() => snapshot,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                generation = ticket.generation(),
                "Interrupted before the report arrived"
            );
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&watcher.view())?);

    if let RequestState::Failure { kind, message } = snapshot.state {
        bail!("{}: {}", kind.code(), message);
    }

    Ok(())
}
