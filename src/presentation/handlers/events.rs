use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::domain::FolderId;
use crate::presentation::state::AppState;

const KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub folder_id: Option<Uuid>,
}

/// Server-sent feed of status changes, optionally limited to one folder.
/// Slow consumers skip what they missed and get a `lagged` event.
#[tracing::instrument(skip(state))]
pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let folder_filter = query.folder_id.map(FolderId::from_uuid);
    let mut receiver = state.processor.subscribe();

    let stream = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if folder_filter.is_some_and(|id| event.folder_id() != id) {
                        continue;
                    }
                    match Event::default().event("status").json_data(&event) {
                        Ok(sse) => yield Ok::<_, Infallible>(sse),
                        Err(e) => tracing::warn!(error = %e, "Failed to encode status event"),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Status subscriber lagged");
                    yield Ok(Event::default().event("lagged").data(missed.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}
