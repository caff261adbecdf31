use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnalysisStore, StoreError};
use crate::models::analysis::{AnalysisDraft, AnalysisResult};
use crate::models::job::{JobRow, NewJob};
use crate::models::resume::{NewResume, ResumeRow};

/// Process-local store. Used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    // Vecs keep insertion order, which stands in for created_at ordering.
    jobs: Vec<JobRow>,
    resumes: Vec<ResumeRow>,
    analyses: HashMap<Uuid, AnalysisResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored analyses across all jobs.
    #[cfg(test)]
    pub async fn analysis_count(&self) -> usize {
        self.inner.read().await.analyses.len()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn create_job(&self, job: NewJob) -> Result<JobRow, StoreError> {
        let row = JobRow {
            id: Uuid::new_v4(),
            title: job.title,
            company: job.company,
            description: job.description,
            created_at: Utc::now(),
        };
        self.inner.write().await.jobs.push(row.clone());
        Ok(row)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.iter().rev().cloned().collect())
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|j| j.id != job_id);
        if inner.jobs.len() == before {
            return Ok(false);
        }

        let removed: Vec<Uuid> = inner
            .resumes
            .iter()
            .filter(|r| r.job_id == job_id)
            .map(|r| r.id)
            .collect();
        inner.resumes.retain(|r| r.job_id != job_id);
        for resume_id in removed {
            inner.analyses.remove(&resume_id);
        }
        Ok(true)
    }

    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.jobs.iter().any(|j| j.id == resume.job_id) {
            return Err(StoreError::JobNotFound(resume.job_id));
        }

        let row = ResumeRow {
            id: Uuid::new_v4(),
            job_id: resume.job_id,
            candidate_name: resume.candidate_name,
            candidate_email: resume.candidate_email,
            resume_text: resume.resume_text,
            source_filename: resume.source_filename,
            source_key: resume.source_key,
            created_at: Utc::now(),
        };
        inner.resumes.push(row.clone());
        Ok(row)
    }

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.resumes.iter().find(|r| r.id == resume_id).cloned())
    }

    async fn list_resumes(&self, job_id: Uuid) -> Result<Vec<ResumeRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .resumes
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn delete_resume(&self, resume_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.resumes.len();
        inner.resumes.retain(|r| r.id != resume_id);
        inner.analyses.remove(&resume_id);
        Ok(inner.resumes.len() != before)
    }

    async fn upsert_analysis(
        &self,
        resume_id: Uuid,
        draft: AnalysisDraft,
    ) -> Result<AnalysisResult, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.resumes.iter().any(|r| r.id == resume_id) {
            return Err(StoreError::ResumeNotFound(resume_id));
        }

        // A replacement keeps the original row id, matching ON CONFLICT DO UPDATE.
        let id = inner
            .analyses
            .get(&resume_id)
            .map(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4);
        let result = AnalysisResult::from_draft(id, resume_id, draft);
        inner.analyses.insert(resume_id, result.clone());
        Ok(result)
    }

    async fn get_analysis(&self, resume_id: Uuid) -> Result<Option<AnalysisResult>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.analyses.get(&resume_id).cloned())
    }

    async fn list_analyses(&self, job_id: Uuid) -> Result<Vec<AnalysisResult>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .resumes
            .iter()
            .filter(|r| r.job_id == job_id)
            .filter_map(|r| inner.analyses.get(&r.id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{Provenance, Verdict};

    fn new_job() -> NewJob {
        NewJob {
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Rust, PostgreSQL".to_string(),
        }
    }

    fn new_resume(job_id: Uuid, name: &str) -> NewResume {
        NewResume {
            job_id,
            candidate_name: name.to_string(),
            candidate_email: None,
            resume_text: Some("Rust developer".to_string()),
            source_filename: None,
            source_key: None,
        }
    }

    fn draft(score: u8) -> AnalysisDraft {
        AnalysisDraft {
            score,
            verdict: Verdict::Medium,
            summary: "ok".to_string(),
            feedback: "ok".to_string(),
            missing_skills: vec![],
            provenance: Provenance::Model,
            fallback_reason: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_instead_of_appending() {
        let store = MemoryStore::new();
        let job = store.create_job(new_job()).await.unwrap();
        let resume = store.create_resume(new_resume(job.id, "Ada")).await.unwrap();

        let first = store.upsert_analysis(resume.id, draft(40)).await.unwrap();
        let second = store.upsert_analysis(resume.id, draft(90)).await.unwrap();

        assert_eq!(store.analysis_count().await, 1);
        assert_eq!(first.id, second.id);
        let stored = store.get_analysis(resume.id).await.unwrap().unwrap();
        assert_eq!(stored.score, 90);
    }

    #[tokio::test]
    async fn test_create_resume_requires_existing_job() {
        let store = MemoryStore::new();
        let err = store
            .create_resume(new_resume(Uuid::new_v4(), "Ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_job_cascades_to_resumes_and_analyses() {
        let store = MemoryStore::new();
        let job = store.create_job(new_job()).await.unwrap();
        let resume = store.create_resume(new_resume(job.id, "Ada")).await.unwrap();
        store.upsert_analysis(resume.id, draft(70)).await.unwrap();

        assert!(store.delete_job(job.id).await.unwrap());
        assert!(store.get_resume(resume.id).await.unwrap().is_none());
        assert!(store.get_analysis(resume.id).await.unwrap().is_none());
        assert!(!store.delete_job(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_analyses_is_scoped_to_job() {
        let store = MemoryStore::new();
        let job_a = store.create_job(new_job()).await.unwrap();
        let job_b = store.create_job(new_job()).await.unwrap();
        let ra = store.create_resume(new_resume(job_a.id, "Ada")).await.unwrap();
        let rb = store.create_resume(new_resume(job_b.id, "Bob")).await.unwrap();
        store.upsert_analysis(ra.id, draft(70)).await.unwrap();
        store.upsert_analysis(rb.id, draft(20)).await.unwrap();

        let analyses = store.list_analyses(job_a.id).await.unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].resume_id, ra.id);
    }

    #[tokio::test]
    async fn test_jobs_are_listed_newest_first() {
        let store = MemoryStore::new();
        let first = store.create_job(new_job()).await.unwrap();
        let second = store.create_job(new_job()).await.unwrap();
        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }
}
