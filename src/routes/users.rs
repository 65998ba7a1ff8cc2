use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::activity;
use crate::auth::handlers::clear_session_cookie;
use crate::db::models::{ActivityKind, User, UserCounts, UserDetail, UserSummary};
use crate::db::{now_timestamp, photos, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::gallery;
use crate::routes::{json_body, parse_id, required};
use crate::state::AppState;

// --- Forms ---

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Serialize)]
pub struct RegisteredUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", post(register))
        .route("/user/list", get(list_users))
        .route("/user/list/counts", get(list_counts))
        .route("/user/{id}", get(get_user).delete(delete_account))
}

// --- Handlers ---

/// POST /user — register a new account
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Json<RegisteredUser>> {
    let req = json_body(payload)?;

    let login_name = required(req.login_name.as_deref(), "Login name")?;
    // Blank passwords are rejected, but the stored value is the password as given.
    required(req.password.as_deref(), "Password")?;
    let password = req.password.unwrap_or_default();
    let first_name = required(req.first_name.as_deref(), "First name")?;
    let last_name = required(req.last_name.as_deref(), "Last name")?;

    let stored_password = state
        .config
        .auth
        .password_scheme
        .store(&password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        login_name,
        password: stored_password,
        first_name,
        last_name,
        location: req.location.unwrap_or_default(),
        description: req.description.unwrap_or_default(),
        occupation: req.occupation.unwrap_or_default(),
        created_at: now_timestamp(),
    };

    {
        let conn = state.db.get()?;
        if users::find_by_login(&conn, &user.login_name)?.is_some() {
            return Err(AppError::BadRequest("Login name already exists".into()));
        }
        users::insert_user(&conn, &user).map_err(|e| {
            if users::is_duplicate_login(&e) {
                AppError::BadRequest("Login name already exists".into())
            } else {
                AppError::from(e)
            }
        })?;
    }

    tracing::info!("Registered user {} ({})", user.id, user.login_name);
    activity::log(&state, ActivityKind::UserRegister, &user.id, None);

    Ok(Json(RegisteredUser {
        id: user.id,
        login_name: user.login_name,
        first_name: user.first_name,
        last_name: user.last_name,
    }))
}

/// GET /user/list
async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list_summaries(&conn)?))
}

/// GET /user/list/counts — photo and comment counts the viewer can see
async fn list_counts(
    State(state): State<AppState>,
    viewer: CurrentUser,
) -> AppResult<Json<Vec<UserCounts>>> {
    let conn = state.db.get()?;
    let all_users = users::list_summaries(&conn)?;
    let all_photos = photos::all_photos(&conn)?;
    let all_comments = photos::all_comments(&conn)?;

    Ok(Json(gallery::user_counts(
        &all_users,
        &all_photos,
        &all_comments,
        &viewer.id,
    )))
}

/// GET /user/{id}
async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserDetail>> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    let user = users::find_by_id(&conn, &id)?.ok_or(AppError::NotFound("User"))?;
    Ok(Json(UserDetail::from(user)))
}

/// DELETE /user/{id} — delete the caller's own account and everything it owns
async fn delete_account(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    if id != viewer.id {
        return Err(AppError::Unauthorized);
    }

    let file_names = {
        let mut conn = state.db.get()?;
        users::delete_user(&mut conn, &id)?.ok_or(AppError::NotFound("User"))?
    };

    state.images.remove_all(&file_names).await;
    tracing::info!(
        "Deleted account {} and {} photos",
        id,
        file_names.len()
    );

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        "Account deleted",
    )
        .into_response())
}
