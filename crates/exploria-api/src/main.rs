//! Exploria API Server

use anyhow::Context;
use exploria_api::email::{HttpMailer, LogMailer, Mailer};
use exploria_api::{create_router, state::AppState};
use exploria_core::{AppConfig, EmailProvider, LoggingConfig};
use std::sync::Arc;

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "exploria_api={level},exploria_store={level},audit=info,tower_http=info",
            level = logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    if config.auth.jwt_secret == exploria_core::config::DEVELOPMENT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is the development default; set it before deploying");
    }

    let repository = exploria_store::connect(&config.database)
        .await
        .context("Failed to open account store")?;

    let mailer: Arc<dyn Mailer> = match config.email.provider {
        EmailProvider::Log => Arc::new(LogMailer),
        EmailProvider::Http => Arc::new(HttpMailer::new(&config.email)?),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, repository, mailer)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Exploria API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
