use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: Option<String>,
    /// Extracted text cached at upload. `None` when extraction failed then.
    pub resume_text: Option<String>,
    pub source_filename: Option<String>,
    /// S3 key of the archived original upload, if archiving is enabled.
    pub source_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResumeRow {
    /// Cached text, if any non-blank text was extracted at upload.
    pub fn cached_text(&self) -> Option<&str> {
        self.resume_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub job_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: Option<String>,
    pub resume_text: Option<String>,
    pub source_filename: Option<String>,
    pub source_key: Option<String>,
}
