use crate::{
    config::AppConfig,
    error::{Result, ServiceError},
    query::{
        examples::{self, ExampleCatalogue},
        template_catalogue, BuildFilterRequest, BuildFilterResponse, DebugRequest, ExplainRequest,
        ExplainResponse, FilterEngine, TemplateEntry,
    },
    state::AppState,
    validation::QueryDebugInfo,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let engine = FilterEngine::new(Arc::clone(&config));
        let state = AppState::new(Arc::clone(&config), engine);

        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/filter", post(Self::build_filter))
            .route("/api/explain", post(Self::explain))
            .route("/api/debug", post(Self::debug))
            .route("/api/templates", get(Self::templates))
            .route("/api/examples", get(Self::examples))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, default_table = %self.config.default_table, "NLQ listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn build_filter(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<BuildFilterRequest>,
    ) -> Result<Json<BuildFilterResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let response = state.engine.translate(request)?;
        Ok(Json(response))
    }

    async fn explain(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<ExplainRequest>,
    ) -> Result<Json<ExplainResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let response = state.engine.explain(request)?;
        Ok(Json(response))
    }

    async fn debug(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<DebugRequest>,
    ) -> Result<Json<QueryDebugInfo>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(state.engine.debug(request)))
    }

    async fn templates(
        State(state): State<AppState>,
        headers: HeaderMap,
    ) -> Result<Json<Vec<TemplateEntry>>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(template_catalogue()))
    }

    async fn examples(
        State(state): State<AppState>,
        headers: HeaderMap,
    ) -> Result<Json<&'static ExampleCatalogue>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(examples::catalogue()))
    }
}

fn enforce_api_key(headers: &HeaderMap, config: &AppConfig) -> Result<()> {
    if let Some(expected) = &config.api_key {
        let provided = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Auth);
        }
    }

    Ok(())
}
