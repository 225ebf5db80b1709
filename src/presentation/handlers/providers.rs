use axum::extract::State;
use axum::response::Response;

use crate::presentation::state::AppState;

use super::api_response::ok;

pub async fn list_providers_handler(State(state): State<AppState>) -> Response {
    ok(state.registry.list())
}
