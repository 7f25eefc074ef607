use crate::api::handlers::{batch, dashboard, parent, student};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Routes behind the admin session.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Students
        .route("/student/add", post(student::create_student))
        .route("/student/bulk-add", post(student::create_students_bulk))
        .route("/student/get/:id", get(student::get_student))
        .route("/student/get-all", get(student::list_students))
        .route(
            "/student/batch/:year",
            get(student::list_students_by_batch_year),
        )
        .route("/student/update/:id", put(student::update_student))
        .route("/student/delete/:id", delete(student::delete_student))
        // Parents
        .route("/parent/add", post(parent::create_parent))
        .route("/parent/get/:id", get(parent::get_parent))
        .route("/parent/get-all", get(parent::list_parents))
        .route("/parent/update/:id", put(parent::update_parent))
        .route("/parent/delete/:id", delete(parent::delete_parent))
        // Batches
        .route("/batch/add", post(batch::create_batch))
        .route("/batch/active", get(batch::get_active_batch))
        .route("/batch/get/:id", get(batch::get_batch))
        .route("/batch/get-all", get(batch::list_batches))
        .route("/batch/update/:id", put(batch::update_batch))
        .route("/batch/delete/:id", delete(batch::delete_batch))
        // Dashboard
        .route("/dashboard", get(dashboard::get_dashboard))
}
