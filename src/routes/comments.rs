use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::activity;
use crate::db::models::{ActivityKind, Comment, CommentView, UserCommentView, UserSummary};
use crate::db::{now_timestamp, photos};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::gallery;
use crate::routes::photos::visible_photo;
use crate::routes::{json_body, parse_id};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateCommentRequest {
    pub comment: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/{user_id}", get(comments_of_user))
        .route("/commentsOfPhoto/{photo_id}", post(create_comment))
        .route(
            "/commentsOfPhoto/{photo_id}/{comment_id}",
            delete(delete_comment),
        )
}

// --- Handlers ---

/// GET /comments/{user_id} — comments by a user on photos the viewer can see
async fn comments_of_user(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<UserCommentView>>> {
    let user_id = parse_id(&user_id)?;
    let conn = state.db.get()?;

    let authored = photos::comments_by_user(&conn, &user_id)?;
    let photo_ids: BTreeSet<&str> = authored.iter().map(|c| c.photo_id.as_str()).collect();
    let mut commented_photos = Vec::with_capacity(photo_ids.len());
    for photo_id in photo_ids {
        if let Some(photo) = photos::find_photo(&conn, photo_id)? {
            commented_photos.push(photo);
        }
    }

    Ok(Json(gallery::comments_of_user(
        &commented_photos,
        &authored,
        &user_id,
        &viewer.id,
    )))
}

/// POST /commentsOfPhoto/{photo_id}
async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(photo_id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<Json<CommentView>> {
    let photo_id = parse_id(&photo_id).map_err(|_| AppError::BadRequest("Invalid photo ID".into()))?;
    let req = json_body(payload)?;
    let text = req.comment.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }

    let comment = Comment {
        id: uuid::Uuid::now_v7().to_string(),
        photo_id,
        user_id: user.id.clone(),
        comment: text.to_string(),
        date_time: now_timestamp(),
    };

    {
        let conn = state.db.get()?;
        visible_photo(&conn, &comment.photo_id, &user.id)?;
        photos::insert_comment(&conn, &comment)?;
    }

    activity::log(
        &state,
        ActivityKind::Comment,
        &user.id,
        Some(&comment.photo_id),
    );

    Ok(Json(CommentView {
        id: comment.id,
        comment: comment.comment,
        date_time: comment.date_time,
        user: UserSummary {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
        },
    }))
}

/// DELETE /commentsOfPhoto/{photo_id}/{comment_id} — author only
async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((photo_id, comment_id)): Path<(String, String)>,
) -> AppResult<&'static str> {
    let photo_id = parse_id(&photo_id)?;
    let comment_id = parse_id(&comment_id)?;

    let conn = state.db.get()?;
    visible_photo(&conn, &photo_id, &user.id)?;
    let comment =
        photos::find_comment(&conn, &photo_id, &comment_id)?.ok_or(AppError::NotFound("Comment"))?;

    if comment.user_id != user.id {
        return Err(AppError::Unauthorized);
    }

    photos::delete_comment(&conn, &comment.id)?;
    tracing::info!("User {} deleted comment {}", user.id, comment.id);
    Ok("Comment deleted")
}
