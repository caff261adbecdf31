//! Axum route handlers for the Matching API.

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::header,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction;
use crate::intake::uploads::MultipartForm;
use crate::matching::batch::BatchReport;
use crate::matching::quick::{QuickAnalysisRequest, QuickAnalysisResponse};
use crate::matching::{analyze_batch, BatchItem};
use crate::models::analysis::{AnalysisResult, Provenance};
use crate::state::AppState;
use crate::store::require_job;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeJobQuery {
    /// Include resumes that already have an analysis.
    #[serde(default)]
    pub reanalyze: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub resume_id: Uuid,
    pub candidate_name: String,
    pub analysis: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub job_id: Uuid,
    pub processed: usize,
    pub model: usize,
    pub fallback: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub results: Vec<BatchItemResponse>,
}

impl BatchResponse {
    pub fn from_report(job_id: Uuid, report: BatchReport) -> Self {
        let cancelled = report.cancelled();
        let skipped = report.skipped;
        let results: Vec<BatchItemResponse> = report
            .outcomes
            .into_iter()
            .map(|outcome| {
                let (analysis, error) = match outcome.result {
                    Ok(analysis) => (Some(analysis), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                BatchItemResponse {
                    resume_id: outcome.resume.id,
                    candidate_name: outcome.resume.candidate_name,
                    analysis,
                    error,
                }
            })
            .collect();

        let count = |p: Provenance| {
            results
                .iter()
                .filter(|r| r.analysis.as_ref().is_some_and(|a| a.provenance == p))
                .count()
        };
        Self {
            job_id,
            processed: results.len(),
            model: count(Provenance::Model),
            fallback: count(Provenance::Fallback),
            failed: results.iter().filter(|r| r.error.is_some()).count(),
            skipped,
            cancelled,
            results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    /// Whether a running batch was signalled.
    pub cancelled: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:id/analyze
///
/// Runs the batch for a job. By default only resumes without an analysis are
/// processed; `?reanalyze=true` processes all of them.
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<AnalyzeJobQuery>,
) -> Result<Json<BatchResponse>, AppError> {
    let job = require_job(state.store.as_ref(), job_id).await?;

    let guard = state.batches.begin(job_id).ok_or_else(|| {
        AppError::Conflict(format!("A batch analysis is already running for job {job_id}"))
    })?;

    let mut resumes = state.store.list_resumes(job_id).await?;
    if !query.reanalyze {
        let analyzed: std::collections::HashSet<Uuid> = state
            .store
            .list_analyses(job_id)
            .await?
            .into_iter()
            .map(|a| a.resume_id)
            .collect();
        resumes.retain(|r| !analyzed.contains(&r.id));
    }

    let items: Vec<BatchItem> = resumes.into_iter().map(BatchItem::from).collect();
    let report = analyze_batch(
        &state.matcher,
        &job,
        items,
        state.config.batch_concurrency,
        guard.flag(),
    )
    .await;

    Ok(Json(BatchResponse::from_report(job_id, report)))
}

/// POST /api/v1/jobs/:id/analyze/cancel
///
/// Requests an early stop. Resumes already being analyzed finish and persist.
pub async fn handle_cancel_batch(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let cancelled = state.batches.cancel(job_id);
    Ok(Json(CancelResponse { job_id, cancelled }))
}

/// POST /api/v1/resumes/:id/analyze
///
/// Analyzes (or re-analyzes) a single resume.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<AnalysisResult>, AppError> {
    let resume = state
        .store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    let job = require_job(state.store.as_ref(), resume.job_id).await?;

    let result = state.matcher.analyze(&job, &resume).await?;
    Ok(Json(result))
}

/// GET /api/v1/resumes/:id/analysis
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<AnalysisResult>, AppError> {
    if state.store.get_resume(resume_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    state
        .store
        .get_analysis(resume_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} has not been analyzed")))
}

/// POST /api/v1/analyze
///
/// One-off analysis of a job description against a resume; nothing is stored.
/// Accepts JSON `{job_description, resume_text}` or a multipart form where
/// `job_file` / `resume_file` parts take precedence over the text fields of the
/// same names.
pub async fn handle_quick_analysis(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<QuickAnalysisResponse>, AppError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let (job_text, resume_text) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        let form = MultipartForm::read(multipart).await?;
        (
            form_document(&form, "job_file", "job_description")?,
            form_document(&form, "resume_file", "resume_text")?,
        )
    } else {
        let Json(body) = Json::<QuickAnalysisRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        (body.job_description, body.resume_text)
    };

    let job_text = extraction::normalize_text(&job_text);
    let resume_text = extraction::normalize_text(&resume_text);
    if job_text.is_empty() || resume_text.is_empty() {
        return Err(AppError::Validation(
            "both a job description and resume text are required".to_string(),
        ));
    }

    let analysis = state.matcher.preview(&job_text, &resume_text).await;
    Ok(Json(QuickAnalysisResponse::from(analysis)))
}

/// Text of the file part `file_field`, else the text field `text_field`.
fn form_document(
    form: &MultipartForm,
    file_field: &str,
    text_field: &str,
) -> Result<String, AppError> {
    match form.file(file_field) {
        Some(file) => Ok(extraction::extract(&file.bytes, file.format()?)?),
        None => Ok(form.text(text_field).unwrap_or_default()),
    }
}
