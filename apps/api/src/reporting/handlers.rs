//! Axum route handlers for results, dashboard, shortlist and CSV export.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::reporting::export::candidates_csv;
use crate::reporting::{
    dashboard, job_stats, load_ranked, summarize, DashboardStats, JobSummary, RankedCandidate,
};
use crate::state::AppState;
use crate::store::require_job;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct JobResultsResponse {
    pub job: JobRow,
    /// Whether a batch analysis for this job is in progress.
    pub analysis_running: bool,
    pub summary: JobSummary,
    pub candidates: Vec<RankedCandidate>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistEntry {
    pub job_id: Uuid,
    pub job_title: String,
    pub company: String,
    #[serde(flatten)]
    pub candidate: RankedCandidate,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub threshold: u8,
    pub candidates: Vec<ShortlistEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs/:id/results
pub async fn handle_job_results(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResultsResponse>, AppError> {
    let job = require_job(state.store.as_ref(), job_id).await?;
    let candidates =
        load_ranked(state.store.as_ref(), job_id, state.config.shortlist_threshold).await?;

    Ok(Json(JobResultsResponse {
        job,
        analysis_running: state.batches.is_running(job_id),
        summary: summarize(&candidates),
        candidates,
    }))
}

/// GET /api/v1/jobs/:id/export
///
/// Ranked results as a CSV attachment.
pub async fn handle_export_csv(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = require_job(state.store.as_ref(), job_id).await?;
    let candidates =
        load_ranked(state.store.as_ref(), job_id, state.config.shortlist_threshold).await?;
    let csv = candidates_csv(&candidates)?;

    let disposition = format!(
        "attachment; filename=\"{}_results.csv\"",
        filename_slug(&job.title)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let threshold = state.config.shortlist_threshold;
    let mut stats = Vec::new();
    for job in state.store.list_jobs().await? {
        let ranked = load_ranked(state.store.as_ref(), job.id, threshold).await?;
        stats.push(job_stats(&job, &ranked));
    }
    Ok(Json(dashboard(stats, threshold)))
}

/// GET /api/v1/shortlist
///
/// Every shortlisted candidate across all jobs, best score first.
pub async fn handle_shortlist(
    State(state): State<AppState>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let threshold = state.config.shortlist_threshold;
    let mut candidates = Vec::new();
    for job in state.store.list_jobs().await? {
        let ranked = load_ranked(state.store.as_ref(), job.id, threshold).await?;
        candidates.extend(
            ranked
                .into_iter()
                .filter(|c| c.shortlisted)
                .map(|candidate| ShortlistEntry {
                    job_id: job.id,
                    job_title: job.title.clone(),
                    company: job.company.clone(),
                    candidate,
                }),
        );
    }
    candidates.sort_by(|a, b| b.candidate.score().cmp(&a.candidate.score()));

    Ok(Json(ShortlistResponse {
        threshold,
        candidates,
    }))
}

/// Lowercase ASCII alphanumerics with `_` separators, for download filenames.
fn filename_slug(title: &str) -> String {
    let slug = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "job".to_string()
    } else {
        slug
    }
}
