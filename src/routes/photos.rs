use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity;
use crate::config::Config;
use crate::db::models::{ActivityKind, LikeState, Photo, PhotoView};
use crate::db::{now_timestamp, photos, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::gallery;
use crate::routes::parse_id;
use crate::state::AppState;
use crate::storage::image_extension;
use crate::visibility::Sharing;

#[derive(Serialize)]
pub struct UploadedPhoto {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub user_id: String,
    pub sharing_list: Sharing,
}

struct UploadedFile {
    original_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

// --- Router ---

pub fn router(config: &Config) -> Router<AppState> {
    Router::new()
        .route("/photosOfUser/{id}", get(photos_of_user))
        .route(
            "/photos/new",
            post(upload_photo).layer(DefaultBodyLimit::max(config.storage.max_upload_bytes)),
        )
        .route("/photos/{photo_id}", delete(delete_photo))
        .route("/photos/{photo_id}/like", post(like_photo).delete(unlike_photo))
}

// --- Handlers ---

/// GET /photosOfUser/{id} — the user's photos visible to the viewer
async fn photos_of_user(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PhotoView>>> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;

    if !users::exists(&conn, &id)? {
        return Err(AppError::NotFound("User"));
    }

    let owned = photos::photos_of_user(&conn, &id)?;
    let views = gallery::visible_photos(&owned, &viewer.id)
        .map(|photo| {
            Ok(PhotoView {
                id: photo.id.clone(),
                user_id: photo.user_id.clone(),
                file_name: photo.file_name.clone(),
                date_time: photo.date_time,
                sharing_list: photo.sharing.clone(),
                likes: photos::likes_of(&conn, &photo.id)?,
                comments: photos::comment_views(&conn, &photo.id)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(views))
}

/// POST /photos/new — multipart upload with a `photo` file and an optional
/// `sharing_list` field
async fn upload_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadedPhoto>> {
    let mut multipart =
        multipart.map_err(|_| AppError::BadRequest("No file uploaded".into()))?;

    let mut file: Option<UploadedFile> = None;
    let mut sharing_raw: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        let is_file = field.file_name().is_some();

        if name.as_deref() == Some("sharing_list") && !is_file {
            sharing_raw = Some(field.text().await?);
        } else if is_file || name.as_deref() == Some("photo") {
            if file.is_some() {
                return Err(AppError::BadRequest("Only one file may be uploaded".into()));
            }
            let original_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            file = Some(UploadedFile {
                original_name,
                content_type,
                data,
            });
        }
    }

    let file = file
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let extension = image_extension(file.original_name.as_deref(), file.content_type.as_deref())?;
    let sharing = parse_sharing_list(sharing_raw.as_deref())?;

    let photo = state
        .images
        .save_then(&extension, &file.data, |file_name| {
            let photo = Photo {
                id: uuid::Uuid::now_v7().to_string(),
                user_id: user.id.clone(),
                file_name: file_name.to_string(),
                date_time: now_timestamp(),
                sharing,
            };
            let conn = state.db.get()?;
            photos::insert_photo(&conn, &photo)?;
            Ok(photo)
        })
        .await?;

    tracing::info!("User {} uploaded photo {}", user.id, photo.id);
    activity::log(&state, ActivityKind::PhotoUpload, &user.id, Some(&photo.id));

    Ok(Json(UploadedPhoto {
        id: photo.id,
        file_name: photo.file_name,
        date_time: photo.date_time,
        user_id: photo.user_id,
        sharing_list: photo.sharing,
    }))
}

/// DELETE /photos/{photo_id} — owner only
async fn delete_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(photo_id): Path<String>,
) -> AppResult<&'static str> {
    let photo_id = parse_id(&photo_id)?;

    let photo = {
        let conn = state.db.get()?;
        let photo = visible_photo(&conn, &photo_id, &user.id)?;
        if photo.user_id != user.id {
            return Err(AppError::Unauthorized);
        }
        photos::delete_photo(&conn, &photo.id)?;
        photo
    };

    state.images.remove_all(&[photo.file_name]).await;
    tracing::info!("User {} deleted photo {}", user.id, photo.id);
    Ok("Photo deleted")
}

/// POST /photos/{photo_id}/like
async fn like_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(photo_id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let photo_id = parse_id(&photo_id)?;
    let conn = state.db.get()?;
    visible_photo(&conn, &photo_id, &user.id)?;
    photos::like(&conn, &photo_id, &user.id)?;
    like_state(&conn, &photo_id, &user.id).map(Json)
}

/// DELETE /photos/{photo_id}/like
async fn unlike_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(photo_id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let photo_id = parse_id(&photo_id)?;
    let conn = state.db.get()?;
    visible_photo(&conn, &photo_id, &user.id)?;
    photos::unlike(&conn, &photo_id, &user.id)?;
    like_state(&conn, &photo_id, &user.id).map(Json)
}

// --- Helpers ---

/// Load a photo the viewer is allowed to see. Hidden photos are reported as
/// missing so their existence does not leak.
pub(crate) fn visible_photo(
    conn: &rusqlite::Connection,
    photo_id: &str,
    viewer_id: &str,
) -> AppResult<Photo> {
    photos::find_photo(conn, photo_id)?
        .filter(|p| p.is_visible_to(viewer_id))
        .ok_or(AppError::NotFound("Photo"))
}

fn like_state(conn: &rusqlite::Connection, photo_id: &str, user_id: &str) -> AppResult<LikeState> {
    let likes = photos::likes_of(conn, photo_id)?;
    Ok(LikeState {
        liked: likes.iter().any(|id| id == user_id),
        likes: likes.len(),
    })
}

/// `sharing_list` form value: absent, empty or `null` means public; otherwise
/// a JSON array of user ids (`[]` = only the owner).
fn parse_sharing_list(raw: Option<&str>) -> AppResult<Sharing> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") => return Ok(Sharing::Public),
        Some(raw) => raw,
    };

    let ids: Vec<String> = serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest("Invalid sharing list".into()))?;
    let ids = ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Sharing::from_list(Some(ids)))
}
