//! HTTP surface: routing, middleware and handlers.

pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::models::Envelope;
use crate::session::session_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let admin = routes::admin_routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        session_middleware,
    ));

    Router::new()
        .merge(routes::public_routes())
        .merge(admin)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(
            state.config.server.max_request_body_size,
        ))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin without credentials; otherwise only the listed
/// origins, with cookies.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT_LANGUAGE,
        ]);

    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}

async fn route_not_found() -> Response {
    Envelope::<()>::failure(StatusCode::NOT_FOUND, "Route not found", None).into_response()
}
