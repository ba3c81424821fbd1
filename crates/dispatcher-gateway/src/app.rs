use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use dispatcher_core::config::DispatcherConfig;
use dispatcher_llm::{AnthropicProvider, LlmProvider};
use dispatcher_retrieval::KnowledgeStore;
use dispatcher_scheduling::{CalendarProvider, SqliteCalendarProvider};
use dispatcher_sessions::SessionStore;
use dispatcher_surfaces::{RestUserSurface, SurfaceManager};
use dispatcher_workspace::{EventDedup, RestWorkspaceAdapter, WorkspaceAdapter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Central shared state for the gateway binary — one `SessionStore` and one
/// `KnowledgeStore` connection, the provider adapters reached through their
/// trait objects, and the model name resolved once at startup.
pub struct AppState {
    pub config: DispatcherConfig,
    pub model: String,
    pub sessions: SessionStore,
    pub knowledge: KnowledgeStore,
    pub llm: Box<dyn LlmProvider>,
    pub calendar: Box<dyn CalendarProvider>,
    pub workspace: Box<dyn WorkspaceAdapter>,
    pub surfaces: SurfaceManager,
    /// Dedups both `/workspace/events` and `/workspace/actions` deliveries,
    /// keyed by `(workspace_thread_key, event_id)`.
    pub dedup: EventDedup,
    /// In-flight turn per session, shared across every `/user/events` request
    /// in the process so a newer message can actually cancel an older one.
    pub cancellations: DashMap<String, CancellationToken>,
}

impl AppState {
    pub fn new(config: DispatcherConfig, sessions: SessionStore, knowledge: KnowledgeStore) -> anyhow::Result<Self> {
        let anthropic = config
            .providers
            .anthropic
            .clone()
            .ok_or_else(|| anyhow::anyhow!("providers.anthropic must be configured"))?;
        let llm: Box<dyn LlmProvider> = Box::new(AnthropicProvider::new(
            anthropic.api_key.clone(),
            Some(anthropic.base_url.clone()),
        ));
        let model = anthropic.model.clone();

        let calendar_conn = rusqlite::Connection::open(&config.database.path)?;
        let calendar: Box<dyn CalendarProvider> = Box::new(SqliteCalendarProvider::new(calendar_conn)?);

        let workspace_cfg = config
            .providers
            .workspace
            .clone()
            .ok_or_else(|| anyhow::anyhow!("providers.workspace must be configured"))?;
        let workspace: Box<dyn WorkspaceAdapter> = Box::new(RestWorkspaceAdapter::new(
            reqwest::Client::new(),
            workspace_cfg.base_url,
        ));

        let mut surfaces = SurfaceManager::new();
        for surface_cfg in &config.providers.user_surfaces {
            surfaces.register(Box::new(RestUserSurface::new(
                reqwest::Client::new(),
                surface_cfg.name.clone(),
                surface_cfg.base_url.clone(),
            )));
        }

        Ok(Self {
            config,
            model,
            sessions,
            knowledge,
            llm,
            calendar,
            workspace,
            surfaces,
            dedup: EventDedup::new(),
            cancellations: DashMap::new(),
        })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/user/events", post(crate::http::user_events::handler))
        .route("/workspace/events", post(crate::http::workspace_events::handler))
        .route("/workspace/actions", post(crate::http::workspace_actions::handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
