use axum::Json;
use axum::extract::State;
use axum::response::Html;

use super::super::dto::HealthResponse;
use super::super::state::ServerState;

const INDEX_HTML: &str = include_str!("../../../templates/index.html");

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.agent().settings().model.clone(),
    })
}
