use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weather_core::Config;
use weather_server::{AppState, create_router};

#[derive(Debug, Parser)]
#[command(name = "weather-server", about = "Weather aggregation HTTP service")]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Fails fast on unknown provider names in the chain variables.
    let config = Config::from_env()?;
    info!(
        primary = %config.primary,
        fallback = %config.fallback,
        ttl_secs = config.cache_ttl_secs,
        demo_fallback = config.demo_fallback,
        "configuration loaded"
    );

    let app_state = AppState::from_config(&config);
    info!(available = ?app_state.service.registry().available_names(), "providers ready");

    let app = create_router(app_state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "weather-server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
