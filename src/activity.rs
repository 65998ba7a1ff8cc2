// Activity log: append to storage, then fan out to live listeners.
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::activities;
use crate::db::models::{ActivityKind, ActivityRecord};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Fan-out channel for freshly logged activities.
///
/// Delivery is best effort: listeners that fall behind lose events, and
/// nothing is replayed to listeners that subscribe later.
#[derive(Clone)]
pub struct ActivityHub {
    tx: broadcast::Sender<ActivityRecord>,
}

impl ActivityHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityRecord> {
        self.tx.subscribe()
    }

    /// Returns how many listeners received the event.
    pub fn publish(&self, activity: ActivityRecord) -> usize {
        // An error only means nobody is listening right now.
        self.tx.send(activity).unwrap_or(0)
    }
}

/// Store one activity and broadcast its populated form. Listeners filter
/// the photo per viewer.
pub fn record(
    conn: &Connection,
    hub: &ActivityHub,
    kind: ActivityKind,
    user_id: &str,
    photo_id: Option<&str>,
) -> AppResult<ActivityRecord> {
    let id = activities::insert_activity(conn, kind, user_id, photo_id)?;
    let activity = activities::find_record(conn, &id)?
        .ok_or_else(|| AppError::Internal(format!("activity {} vanished after insert", id)))?;

    let listeners = hub.publish(activity.clone());
    tracing::debug!("Activity {} {} sent to {} listeners", kind, id, listeners);
    Ok(activity)
}

/// Log an activity for a mutation that has already been committed.
/// A failure here is logged and does not undo or fail the mutation.
pub fn log(state: &AppState, kind: ActivityKind, user_id: &str, photo_id: Option<&str>) {
    let result = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| record(&conn, &state.activities, kind, user_id, photo_id));

    if let Err(e) = result {
        tracing::error!("Failed to log {} activity for {}: {}", kind, user_id, e);
    }
}
