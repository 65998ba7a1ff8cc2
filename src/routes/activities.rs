use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::db::activities;
use crate::db::models::ActivityView;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub const NEW_ACTIVITY_EVENT: &str = "newActivity";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activities", get(recent_activities))
        .route("/activities/stream", get(activity_stream))
}

/// GET /activities — newest activities first, photos filtered per viewer
async fn recent_activities(
    State(state): State<AppState>,
    viewer: CurrentUser,
) -> AppResult<Json<Vec<ActivityView>>> {
    let conn = state.db.get()?;
    let feed = activities::recent(&conn, state.config.activity.feed_size)?;
    Ok(Json(feed.iter().map(|a| a.view_for(&viewer.id)).collect()))
}

/// GET /activities/stream — SSE feed of activities logged from now on.
/// Clients load the snapshot from /activities first; nothing is replayed here.
async fn activity_stream(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("User {} subscribed to activity stream", user.id);

    let viewer_id = user.id;
    let stream = BroadcastStream::new(state.activities.subscribe()).filter_map(move |msg| match msg {
        Ok(activity) => match Event::default()
            .event(NEW_ACTIVITY_EVENT)
            .json_data(activity.view_for(&viewer_id))
        {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("Dropping unserializable activity {}: {}", activity.id, e);
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("Activity listener lagged, skipped {} events", skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
