use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod error;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatcher_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("DISPATCH_CONFIG").ok();
    let config = dispatcher_core::config::DispatcherConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("config load failed ({}), using defaults", e);
            dispatcher_core::config::DispatcherConfig::default()
        });

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let session_conn = rusqlite::Connection::open(&config.database.path)?;
    dispatcher_sessions::db::init_db(&session_conn)?;
    let sessions = dispatcher_sessions::SessionStore::new(session_conn);

    let knowledge_conn = rusqlite::Connection::open(&config.database.path)?;
    dispatcher_retrieval::db::init_db(&knowledge_conn)?;
    let knowledge = dispatcher_retrieval::KnowledgeStore::new(knowledge_conn);

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config, sessions, knowledge)?);
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("dispatcher gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
