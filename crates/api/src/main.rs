use anyhow::{Context, Result};
use gateway_api::{build_app, ApiConfig};
use gateway_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("gateway_api");

    let config = ApiConfig::from_env();
    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        bind = %config.bind,
        model = %config.gemini_model,
        upstream = %config.gemini_base_url,
        "intent gateway api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
