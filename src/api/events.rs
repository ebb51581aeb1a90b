//! Server-sent change events

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::AppState;

use super::AuthenticatedUser;

/// Stream change notifications.
///
/// Each `change` event carries `{entity, at}`; clients refetch the named
/// data. A `lagged` event means some changes were dropped and everything
/// should be refetched.
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "text/event-stream of change events", body = crate::services::bus::ChangeEvent, content_type = "text/event-stream")
    )
)]
pub async fn stream_events(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %claims.user_id, "Event stream opened");

    let stream = BroadcastStream::new(state.services.bus.subscribe()).filter_map(|message| match message {
        Ok(change) => Event::default().event("change").json_data(&change).ok().map(Ok),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            Some(Ok(Event::default().event("lagged").data(missed.to_string())))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
