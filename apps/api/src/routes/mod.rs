pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::intake::handlers as intake;
use crate::matching::handlers as matching;
use crate::notify::handlers as notify;
use crate::reporting::handlers as reporting;
use crate::state::AppState;

/// Request body cap. Several resume files can share one multipart request.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(intake::handle_list_jobs).post(intake::handle_create_job),
        )
        .route("/api/v1/jobs/upload", post(intake::handle_upload_job))
        .route(
            "/api/v1/jobs/:id",
            get(intake::handle_get_job).delete(intake::handle_delete_job),
        )
        // Resumes
        .route(
            "/api/v1/jobs/:id/resumes",
            get(intake::handle_list_resumes).post(intake::handle_upload_resumes),
        )
        .route(
            "/api/v1/resumes/:id",
            delete(intake::handle_delete_resume),
        )
        // Matching
        .route("/api/v1/jobs/:id/analyze", post(matching::handle_analyze_job))
        .route(
            "/api/v1/jobs/:id/analyze/cancel",
            post(matching::handle_cancel_batch),
        )
        .route(
            "/api/v1/resumes/:id/analyze",
            post(matching::handle_analyze_resume),
        )
        .route(
            "/api/v1/resumes/:id/analysis",
            get(matching::handle_get_analysis),
        )
        .route("/api/v1/analyze", post(matching::handle_quick_analysis))
        // Reporting
        .route("/api/v1/jobs/:id/results", get(reporting::handle_job_results))
        .route("/api/v1/jobs/:id/export", get(reporting::handle_export_csv))
        .route("/api/v1/dashboard", get(reporting::handle_dashboard))
        .route("/api/v1/shortlist", get(reporting::handle_shortlist))
        // Notifications
        .route(
            "/api/v1/jobs/:id/notify",
            post(notify::handle_notify_shortlisted),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
