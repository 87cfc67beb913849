use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use portfolio_chat_server::build_router;
use portfolio_chat_server::config::Settings;
use portfolio_chat_server::services::conversation::SessionPolicy;
use portfolio_chat_server::services::portfolio::{HtmlExtractor, HttpDocumentSource};
use portfolio_chat_server::services::{
    ChatService, ContextAssembler, LlmService, PortfolioCache, ResponseCache, SessionStore,
};
use portfolio_chat_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,portfolio_chat_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting portfolio chat server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");
    if settings.llm.api_key.is_empty() {
        tracing::warn!("No LLM API key configured; generation requests will be rejected upstream");
    }

    // Portfolio document cache
    let source = HttpDocumentSource::from_config(&settings.portfolio)?;
    let portfolio = Arc::new(PortfolioCache::new(
        Arc::new(source),
        Arc::new(HtmlExtractor::from_config(&settings.portfolio)),
        settings.portfolio.clone(),
    ));
    info!("✅ Portfolio source: {}", settings.portfolio.url);

    let llm_service = Arc::new(LlmService::new(settings.llm.clone())?);
    info!("✅ LLM backend: {} ({})", settings.llm.base_url, settings.llm.model);

    let chat_service = Arc::new(ChatService::new(
        Arc::new(ResponseCache::from_config(&settings.cache)),
        portfolio,
        SessionStore::new(SessionPolicy::from(&settings.session)),
        ContextAssembler::new(&settings.prompts),
        llm_service,
        settings.stream.clone(),
    ));

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let app = build_router(AppState {
        settings: Arc::new(settings),
        chat_service,
    });

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
