use axum::routing::post;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(handlers::login))
        .route("/admin/logout", post(handlers::logout))
}
