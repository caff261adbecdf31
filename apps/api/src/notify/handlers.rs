use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::notify::ShortlistNotice;
use crate::reporting::load_ranked;
use crate::state::AppState;
use crate::store::require_job;

#[derive(Debug, Serialize)]
pub struct FailedNotice {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub job_id: Uuid,
    pub sent: Vec<String>,
    /// Shortlisted candidates without an e-mail address.
    pub no_email: Vec<String>,
    pub failed: Vec<FailedNotice>,
}

/// POST /api/v1/jobs/:id/notify
///
/// E-mails every shortlisted candidate of the job. One failed delivery does not
/// stop the others.
pub async fn handle_notify_shortlisted(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<NotifyResponse>, AppError> {
    let job = require_job(state.store.as_ref(), job_id).await?;
    let ranked =
        load_ranked(state.store.as_ref(), job_id, state.config.shortlist_threshold).await?;

    let mut response = NotifyResponse {
        job_id,
        sent: Vec::new(),
        no_email: Vec::new(),
        failed: Vec::new(),
    };

    for candidate in ranked.iter().filter(|c| c.shortlisted) {
        let Some(analysis) = &candidate.analysis else {
            continue;
        };
        let Some(notice) = ShortlistNotice::render(&job, &candidate.resume, analysis) else {
            response.no_email.push(candidate.resume.candidate_name.clone());
            continue;
        };

        match state.notifier.send(&notice).await {
            Ok(()) => response.sent.push(notice.email),
            Err(e) => {
                warn!("Shortlist notice to {} failed: {}", notice.email, e);
                response.failed.push(FailedNotice {
                    email: notice.email,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(response))
}
