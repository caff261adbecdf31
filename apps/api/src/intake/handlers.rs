//! Axum route handlers for job and resume intake.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction;
use crate::intake::job_title::extract_job_title;
use crate::intake::uploads::{
    candidate_name_from_filename, extract_for_cache, MultipartForm, UploadedFile,
};
use crate::matching::handlers::BatchResponse;
use crate::matching::{analyze_batch, BatchItem};
use crate::models::job::{JobRow, NewJob};
use crate::models::resume::{NewResume, ResumeRow};
use crate::state::AppState;
use crate::store::{require_job, AnalysisStore};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    /// Extracted from the description by the model when absent.
    pub title: Option<String>,
    pub company: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadResumesQuery {
    /// Analyze the new resumes before responding.
    #[serde(default)]
    pub analyze: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResumesResponse {
    pub resumes: Vec<ResumeRow>,
    /// Filenames whose text could not be extracted at upload.
    pub extraction_failures: Vec<String>,
    pub analysis: Option<BatchResponse>,
}

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let job = create_job(&state, request.title, request.company, request.description).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /api/v1/jobs/upload
///
/// Multipart: `company`, optional `title`, and the description either as a
/// `description` text field or a `file` part (PDF, DOCX or plain text).
pub async fn handle_upload_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let form = MultipartForm::read(multipart).await?;

    let description = match form.files.first() {
        Some(file) => {
            let format = file.format()?;
            extraction::extract(&file.bytes, format)?
        }
        None => form.text("description").unwrap_or_default(),
    };
    let company = form.text("company").unwrap_or_default();

    let job = create_job(&state, form.text("title"), company, description).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn create_job(
    state: &AppState,
    title: Option<String>,
    company: String,
    description: String,
) -> Result<JobRow, AppError> {
    let company = company.trim().to_string();
    if company.is_empty() {
        return Err(AppError::Validation("company cannot be empty".to_string()));
    }
    let description = extraction::normalize_text(&description);
    if description.is_empty() {
        return Err(AppError::Validation(
            "description cannot be empty".to_string(),
        ));
    }

    let title = match title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(title) => title,
        None => {
            extract_job_title(state.llm.as_ref(), &description, state.config.llm_timeout).await
        }
    };

    Ok(state
        .store
        .create_job(NewJob {
            title,
            company,
            description,
        })
        .await?)
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(require_job(state.store.as_ref(), job_id).await?))
}

/// DELETE /api/v1/jobs/:id
///
/// Cascades to the job's resumes and analyses. A running batch is cancelled first.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.batches.cancel(job_id);
    if !state.store.delete_job(job_id).await? {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    info!("Deleted job {job_id}");
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Resumes
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:id/resumes
///
/// Multipart: one or more file parts, plus optional `name` and `email` fields
/// that apply when a single file is uploaded. Every file is validated before
/// anything is written, and a failed write leaves no resumes behind.
///
/// With `?analyze=true` the new resumes are analyzed as the job's running
/// batch, so it can be cancelled and conflicts with any other batch for the job.
pub async fn handle_upload_resumes(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<UploadResumesQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResumesResponse>), AppError> {
    let job = require_job(state.store.as_ref(), job_id).await?;
    let form = MultipartForm::read(multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::Validation(
            "at least one resume file is required".to_string(),
        ));
    }

    let formats = form
        .files
        .iter()
        .map(UploadedFile::format)
        .collect::<Result<Vec<_>, _>>()?;

    let batch = if query.analyze {
        Some(state.batches.begin(job_id).ok_or_else(|| {
            AppError::Conflict(format!("A batch analysis is already running for job {job_id}"))
        })?)
    } else {
        None
    };

    let source_keys: Vec<Option<String>> = match &state.archive {
        Some(archive) => archive
            .store_all(job_id, &form.files)
            .await?
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None; form.files.len()],
    };
    let archived: Vec<String> = source_keys.iter().flatten().cloned().collect();

    let single = form.files.len() == 1;
    let mut drafts = Vec::with_capacity(form.files.len());
    let mut extraction_failures = Vec::new();

    for ((file, &format), source_key) in form.files.iter().zip(&formats).zip(source_keys) {
        let resume_text = extract_for_cache(file, format);
        if resume_text.is_none() {
            extraction_failures.push(file.filename.clone());
        }

        let candidate_name = form
            .text("name")
            .filter(|_| single)
            .unwrap_or_else(|| candidate_name_from_filename(&file.filename));

        drafts.push(NewResume {
            job_id,
            candidate_name,
            candidate_email: form.text("email").filter(|_| single),
            resume_text,
            source_filename: Some(file.filename.clone()),
            source_key,
        });
    }

    let resumes = match create_resumes(state.store.as_ref(), drafts).await {
        Ok(resumes) => resumes,
        Err(e) => {
            if let Some(archive) = &state.archive {
                for key in &archived {
                    archive.remove(key).await;
                }
            }
            return Err(e);
        }
    };

    let items: Vec<BatchItem> = resumes
        .iter()
        .zip(form.files.iter().zip(formats))
        .map(|(resume, (file, format))| {
            info!(
                "Stored resume {} ({}) for job {}",
                resume.id, resume.candidate_name, job_id
            );
            BatchItem {
                resume: resume.clone(),
                upload: Some(file.to_upload(format)),
            }
        })
        .collect();

    let analysis = match batch {
        Some(guard) => {
            let report = analyze_batch(
                &state.matcher,
                &job,
                items,
                state.config.batch_concurrency,
                guard.flag(),
            )
            .await;
            Some(BatchResponse::from_report(job_id, report))
        }
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResumesResponse {
            resumes,
            extraction_failures,
            analysis,
        }),
    ))
}

/// Creates every resume or none: rows already written are deleted when a later
/// insert fails.
async fn create_resumes(
    store: &dyn AnalysisStore,
    drafts: Vec<NewResume>,
) -> Result<Vec<ResumeRow>, AppError> {
    let mut created: Vec<ResumeRow> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match store.create_resume(draft).await {
            Ok(resume) => created.push(resume),
            Err(e) => {
                for resume in &created {
                    if let Err(cleanup) = store.delete_resume(resume.id).await {
                        warn!("Failed to roll back resume {}: {}", resume.id, cleanup);
                    }
                }
                return Err(e.into());
            }
        }
    }
    Ok(created)
}

/// GET /api/v1/jobs/:id/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    require_job(state.store.as_ref(), job_id).await?;
    Ok(Json(state.store.list_resumes(job_id).await?))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_resume(resume_id).await? {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::seed_job;

    fn draft(job_id: Uuid, name: &str) -> NewResume {
        NewResume {
            job_id,
            candidate_name: name.to_string(),
            candidate_email: None,
            resume_text: Some(format!("{name} knows Rust")),
            source_filename: Some(format!("{name}.txt")),
            source_key: None,
        }
    }

    #[tokio::test]
    async fn test_create_resumes_rolls_back_on_failure() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;

        let drafts = vec![
            draft(job.id, "Ann"),
            draft(job.id, "Bob"),
            draft(Uuid::new_v4(), "Orphan"),
        ];
        let err = create_resumes(&store, drafts).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.list_resumes(job.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_resumes_keeps_input_order() {
        let store = MemoryStore::new();
        let job = seed_job(&store).await;

        let created = create_resumes(&store, vec![draft(job.id, "Ann"), draft(job.id, "Bob")])
            .await
            .unwrap();

        let names: Vec<&str> = created.iter().map(|r| r.candidate_name.as_str()).collect();
        assert_eq!(names, ["Ann", "Bob"]);
        assert_eq!(store.list_resumes(job.id).await.unwrap().len(), 2);
    }
}
