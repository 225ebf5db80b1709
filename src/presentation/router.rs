use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    cancel_batch_job_handler, create_folder_handler, create_notification_handler,
    delete_folder_handler, delete_notification_handler, events_handler, get_batch_job_handler,
    get_file_handler, get_folder_handler, get_notification_handler, health_handler,
    list_batch_jobs_handler, list_files_handler, list_folders_handler,
    list_notifications_handler, list_providers_handler, push_events_handler,
    retry_batch_job_handler, retry_file_handler, scan_folder_handler, start_folder_handler,
    stop_folder_handler, test_notification_handler, update_folder_handler,
    update_notification_handler, validate_folder_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let api = Router::new()
        .route(
            "/folders",
            get(list_folders_handler).post(create_folder_handler),
        )
        .route("/folders/validate", post(validate_folder_handler))
        .route(
            "/folders/{id}",
            get(get_folder_handler)
                .put(update_folder_handler)
                .delete(delete_folder_handler),
        )
        .route("/folders/{id}/start", post(start_folder_handler))
        .route("/folders/{id}/stop", post(stop_folder_handler))
        .route("/folders/{id}/scan", post(scan_folder_handler))
        .route("/folders/{id}/events", post(push_events_handler))
        .route("/batch-jobs", get(list_batch_jobs_handler))
        .route("/batch-jobs/{id}", get(get_batch_job_handler))
        .route("/batch-jobs/{id}/cancel", post(cancel_batch_job_handler))
        .route("/batch-jobs/{id}/retry", post(retry_batch_job_handler))
        .route("/files", get(list_files_handler))
        .route("/files/{id}", get(get_file_handler))
        .route("/files/{id}/retry", post(retry_file_handler))
        .route(
            "/notifications",
            get(list_notifications_handler).post(create_notification_handler),
        )
        .route(
            "/notifications/{id}",
            get(get_notification_handler)
                .put(update_notification_handler)
                .delete(delete_notification_handler),
        )
        .route("/notifications/{id}/test", post(test_notification_handler))
        .route("/providers", get(list_providers_handler))
        .route("/events", get(events_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
