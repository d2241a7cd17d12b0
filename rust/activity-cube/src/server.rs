use crate::{
    config::AppConfig,
    dimension::Dimension,
    error::Result,
    query::{self, QueryRequest, TranslateResponse},
    rules::{self, RulesDocument},
    state::AppState,
};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
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
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        if let Some(path) = &config.rules_file {
            let groups = rules::generate_for(&config.rule_scenarios);
            rules::write_rules_file(path, &groups).await?;
        }

        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config));

        Ok(Self { config, state })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/activity/translate", post(Self::translate))
            .route("/api/activity/rules", get(Self::rules))
            .route("/api/activity/dimensions", get(Self::dimensions))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, scenarios = self.config.rule_scenarios.len(), "activity cube listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn translate(Json(request): Json<QueryRequest>) -> Result<Json<TranslateResponse>> {
        let response = query::translate(&request)?;
        Ok(Json(response))
    }

    async fn rules(State(state): State<AppState>) -> impl IntoResponse {
        let groups = rules::generate_for(&state.config.rule_scenarios);
        (
            [(header::CONTENT_TYPE, "text/yaml; charset=utf-8")],
            RulesDocument(&groups).to_string(),
        )
    }

    async fn dimensions() -> Json<[Dimension; 8]> {
        Json(Dimension::ALL)
    }
}
