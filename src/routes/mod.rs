pub mod activities;
pub mod auth;
pub mod comments;
pub mod images;
pub mod photos;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, Method};
use axum::Json;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(photos::router(&state.config))
        .merge(comments::router())
        .merge(activities::router())
        .merge(images::router());

    let app = match cors_layer(&state.config.server.allowed_origin) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!("Ignoring invalid allowed_origin {:?}", origin);
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                header::ORIGIN,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::AUTHORIZATION,
            ]),
    )
}

// --- Input helpers ---

/// Validate an entity id from a path or body.
pub fn parse_id(raw: &str) -> AppResult<String> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::invalid_id())
}

/// A required string field, trimmed. Missing or blank values are rejected.
pub fn required(value: Option<&str>, field: &str) -> AppResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

/// Turn JSON extraction failures into plain 400s.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_uuids_only() {
        let id = uuid::Uuid::now_v7().to_string();
        assert_eq!(parse_id(&id).unwrap(), id);
        assert_eq!(parse_id(&id.to_uppercase()).unwrap(), id);
        assert!(parse_id("not-an-id").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  alice "), "Login name").unwrap(), "alice");
        assert!(required(Some("   "), "Login name").is_err());
        assert!(required(None, "Login name").is_err());
    }

    #[test]
    fn invalid_origin_disables_cors() {
        assert!(cors_layer("http://localhost:3000").is_some());
        assert!(cors_layer("bad\norigin").is_none());
    }

    #[tokio::test]
    async fn preflight_allows_configured_origin_with_credentials() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let dir = tempfile::TempDir::new().unwrap();
        let mut config = crate::config::Config::default();
        config.resolve_paths(dir.path());
        let app = router(AppState::init(config).unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/user/list")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
