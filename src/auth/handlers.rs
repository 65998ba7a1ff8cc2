use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::activity;
use crate::auth::session;
use crate::db::models::{ActivityKind, UserSummary};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::{json_body, required};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
}

// -- Cookie helpers --

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

// -- Handlers --

/// POST /admin/login — check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(payload)?;
    let login_name = required(req.login_name.as_deref(), "Login name")?;
    // Passwords are compared as given, never trimmed.
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Password is required".into()))?;

    let (summary, token) = {
        let conn = state.db.get()?;
        let user = users::find_by_login(&conn, &login_name)?
            .ok_or_else(|| AppError::BadRequest("User not found".into()))?;

        if !state.config.auth.password_scheme.verify(&password, &user.password) {
            tracing::info!("Failed login for {}", login_name);
            return Err(AppError::BadRequest("Incorrect password".into()));
        }

        let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;
        (UserSummary::from(&user), token)
    };

    tracing::info!("User {} logged in", summary.id);
    activity::log(&state, ActivityKind::UserLogin, &summary.id, None);

    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(summary)).into_response())
}

/// POST /admin/logout — destroy the current session
pub async fn logout(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let user = user.ok_or_else(|| AppError::BadRequest("No user is currently logged in".into()))?;

    {
        let conn = state.db.get()?;
        session::delete_session(&conn, &user.token)?;
    }

    tracing::info!("User {} logged out", user.id);
    activity::log(&state, ActivityKind::UserLogout, &user.id, None);

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        "Logout successful",
    )
        .into_response())
}
