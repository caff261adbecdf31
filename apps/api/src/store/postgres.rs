use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{AnalysisStore, StoreError};
use crate::models::analysis::{AnalysisDraft, AnalysisResult, AnalysisRow};
use crate::models::job::{JobRow, NewJob};
use crate::models::resume::{NewResume, ResumeRow};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_result(row: AnalysisRow) -> Result<AnalysisResult, StoreError> {
    AnalysisResult::try_from(row).map_err(StoreError::Corrupt)
}

#[async_trait]
impl AnalysisStore for PgStore {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (id, title, company, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.description)
        .fetch_one(&self.pool)
        .await?;

        info!("Created job {} ({} at {})", row.id, row.title, row.company);
        Ok(row)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at DESC, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<bool, StoreError> {
        // resumes and analysis_results go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, StoreError> {
        if self.get_job(resume.job_id).await?.is_none() {
            return Err(StoreError::JobNotFound(resume.job_id));
        }

        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, job_id, candidate_name, candidate_email, resume_text,
                 source_filename, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume.job_id)
        .bind(&resume.candidate_name)
        .bind(&resume.candidate_email)
        .bind(&resume.resume_text)
        .bind(&resume.source_filename)
        .bind(&resume.source_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
                .bind(resume_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_resumes(&self, job_id: Uuid) -> Result<Vec<ResumeRow>, StoreError> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE job_id = $1 ORDER BY created_at, id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_resume(&self, resume_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(resume_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_analysis(
        &self,
        resume_id: Uuid,
        draft: AnalysisDraft,
    ) -> Result<AnalysisResult, StoreError> {
        if self.get_resume(resume_id).await?.is_none() {
            return Err(StoreError::ResumeNotFound(resume_id));
        }

        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            INSERT INTO analysis_results
                (id, resume_id, score, verdict, summary, feedback,
                 missing_skills, provenance, fallback_reason, analyzed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (resume_id) DO UPDATE SET
                score = EXCLUDED.score,
                verdict = EXCLUDED.verdict,
                summary = EXCLUDED.summary,
                feedback = EXCLUDED.feedback,
                missing_skills = EXCLUDED.missing_skills,
                provenance = EXCLUDED.provenance,
                fallback_reason = EXCLUDED.fallback_reason,
                analyzed_at = EXCLUDED.analyzed_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(i32::from(draft.score))
        .bind(draft.verdict.as_str())
        .bind(&draft.summary)
        .bind(&draft.feedback)
        .bind(&draft.missing_skills)
        .bind(draft.provenance.as_str())
        .bind(&draft.fallback_reason)
        .fetch_one(&self.pool)
        .await?;

        into_result(row)
    }

    async fn get_analysis(&self, resume_id: Uuid) -> Result<Option<AnalysisResult>, StoreError> {
        sqlx::query_as::<_, AnalysisRow>("SELECT * FROM analysis_results WHERE resume_id = $1")
            .bind(resume_id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_result)
            .transpose()
    }

    async fn list_analyses(&self, job_id: Uuid) -> Result<Vec<AnalysisResult>, StoreError> {
        sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT ar.*
            FROM analysis_results ar
            JOIN resumes r ON r.id = ar.resume_id
            WHERE r.job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(into_result)
        .collect()
    }
}
