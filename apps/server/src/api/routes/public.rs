use crate::api::handlers::{health, ppdb, user};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Admissions form
        .route("/ppdb/add", post(ppdb::register))
        // Admin session
        .route("/user/login", post(user::login))
        .route("/user/logout", post(user::logout))
        .route("/user/session", get(user::session))
}
