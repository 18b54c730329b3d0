use parley_ai::{ChatOrchestrator, ChatService, OpenAiCompatibleBackend};
use parley_server::{config::ServerConfig, routes};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        endpoint = %config.model.completions_url(),
        model = %config.model.model,
        "Loaded configuration"
    );

    let registry = Arc::new(parley_tools::builtin_registry()?);
    tracing::info!(tools = registry.len(), "Registered tools");

    let backend = OpenAiCompatibleBackend::new(config.model)?;
    let orchestrator =
        ChatOrchestrator::new(backend, registry, config.chat.orchestrator_config());
    let service = Arc::new(ChatService::new(
        orchestrator,
        config.chat.session_defaults(),
    ));

    let app = routes::router(service);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
