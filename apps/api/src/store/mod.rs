//! Persistence boundary: the system of record for jobs, resumes and analyses.
//!
//! The store alone assigns identifiers and timestamps. `upsert_analysis` is keyed
//! by resume id, so there is never more than one analysis per resume.
//!
//! `AppState` holds an `Arc<dyn AnalysisStore>`: PostgreSQL when `DATABASE_URL`
//! is set, otherwise the in-memory store.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::{AnalysisDraft, AnalysisResult};
use crate::models::job::{JobRow, NewJob};
use crate::models::resume::{NewResume, ResumeRow};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Resume {0} not found")]
    ResumeNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>, StoreError>;

    /// Newest first.
    async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError>;

    /// Deletes the job with its resumes and their analyses. Returns whether it existed.
    async fn delete_job(&self, job_id: Uuid) -> Result<bool, StoreError>;

    /// Fails with `JobNotFound` when the owning job does not exist.
    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, StoreError>;

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, StoreError>;

    /// Resumes of one job in upload order.
    async fn list_resumes(&self, job_id: Uuid) -> Result<Vec<ResumeRow>, StoreError>;

    /// Deletes the resume with its analysis. Returns whether it existed.
    async fn delete_resume(&self, resume_id: Uuid) -> Result<bool, StoreError>;

    /// Inserts or fully replaces the analysis of a resume.
    async fn upsert_analysis(
        &self,
        resume_id: Uuid,
        draft: AnalysisDraft,
    ) -> Result<AnalysisResult, StoreError>;

    async fn get_analysis(&self, resume_id: Uuid) -> Result<Option<AnalysisResult>, StoreError>;

    /// Every analysis belonging to resumes of one job.
    async fn list_analyses(&self, job_id: Uuid) -> Result<Vec<AnalysisResult>, StoreError>;
}

/// The job, or `JobNotFound` when it does not exist.
pub async fn require_job(store: &dyn AnalysisStore, job_id: Uuid) -> Result<JobRow, StoreError> {
    store
        .get_job(job_id)
        .await?
        .ok_or(StoreError::JobNotFound(job_id))
}
