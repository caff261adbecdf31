// Reporting: ranked results per job, dashboard statistics, shortlist and CSV export.
// Read-only views over the store; nothing here writes.

pub mod export;
pub mod handlers;

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::analysis::AnalysisResult;
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::store::{AnalysisStore, StoreError};

/// A resume with its analysis, if any, as shown in rankings.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub resume: ResumeRow,
    pub analysis: Option<AnalysisResult>,
    pub shortlisted: bool,
}

impl RankedCandidate {
    pub fn score(&self) -> Option<u8> {
        self.analysis.as_ref().map(|a| a.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub total_candidates: usize,
    pub analyzed: usize,
    pub shortlisted: usize,
    /// Mean score of analyzed candidates, one decimal. `None` when nothing is analyzed.
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStats {
    pub job_id: Uuid,
    pub title: String,
    pub company: String,
    pub applicants: usize,
    pub shortlisted: usize,
    pub rejected: usize,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_jobs: usize,
    pub total_candidates: usize,
    pub shortlisted_count: usize,
    pub shortlist_threshold: u8,
    pub jobs: Vec<JobStats>,
}

pub fn is_shortlisted(analysis: &AnalysisResult, threshold: u8) -> bool {
    analysis.score >= threshold
}

/// Joins resumes with their analyses and orders them by score, highest first.
/// Unanalyzed resumes come last; ties keep upload order.
pub fn rank_candidates(
    resumes: Vec<ResumeRow>,
    analyses: Vec<AnalysisResult>,
    threshold: u8,
) -> Vec<RankedCandidate> {
    let mut by_resume: HashMap<Uuid, AnalysisResult> =
        analyses.into_iter().map(|a| (a.resume_id, a)).collect();

    let mut ranked: Vec<RankedCandidate> = resumes
        .into_iter()
        .map(|resume| {
            let analysis = by_resume.remove(&resume.id);
            let shortlisted = analysis
                .as_ref()
                .is_some_and(|a| is_shortlisted(a, threshold));
            RankedCandidate {
                resume,
                analysis,
                shortlisted,
            }
        })
        .collect();

    // sort_by is stable, so equal scores stay in upload order
    ranked.sort_by(|a, b| match (a.score(), b.score()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked
}

/// Resumes of a job joined with their analyses, best score first.
pub async fn load_ranked(
    store: &dyn AnalysisStore,
    job_id: Uuid,
    threshold: u8,
) -> Result<Vec<RankedCandidate>, StoreError> {
    let resumes = store.list_resumes(job_id).await?;
    let analyses = store.list_analyses(job_id).await?;
    Ok(rank_candidates(resumes, analyses, threshold))
}

pub fn summarize(ranked: &[RankedCandidate]) -> JobSummary {
    let scores: Vec<u8> = ranked.iter().filter_map(RankedCandidate::score).collect();
    JobSummary {
        total_candidates: ranked.len(),
        analyzed: scores.len(),
        shortlisted: ranked.iter().filter(|c| c.shortlisted).count(),
        average_score: average(&scores),
    }
}

pub fn job_stats(job: &JobRow, ranked: &[RankedCandidate]) -> JobStats {
    let summary = summarize(ranked);
    JobStats {
        job_id: job.id,
        title: job.title.clone(),
        company: job.company.clone(),
        applicants: summary.total_candidates,
        shortlisted: summary.shortlisted,
        rejected: summary.analyzed - summary.shortlisted,
        avg_score: summary.average_score,
    }
}

pub fn dashboard(jobs: Vec<JobStats>, threshold: u8) -> DashboardStats {
    DashboardStats {
        total_jobs: jobs.len(),
        total_candidates: jobs.iter().map(|j| j.applicants).sum(),
        shortlisted_count: jobs.iter().map(|j| j.shortlisted).sum(),
        shortlist_threshold: threshold,
        jobs,
    }
}

fn average(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let mean = f64::from(total) / scores.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::models::analysis::{AnalysisResult, Provenance, Verdict};
    use crate::models::job::JobRow;
    use crate::models::resume::ResumeRow;

    pub fn job() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            title: "Platform Engineer".to_string(),
            company: "Initech".to_string(),
            description: "Kubernetes, Terraform".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn resume(job: &JobRow, name: &str, order: i64) -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            job_id: job.id,
            candidate_name: name.to_string(),
            candidate_email: Some(format!("{}@example.com", name.to_lowercase())),
            resume_text: Some("text".to_string()),
            source_filename: None,
            source_key: None,
            created_at: Utc::now() + Duration::seconds(order),
        }
    }

    pub fn analysis(resume: &ResumeRow, score: u8) -> AnalysisResult {
        AnalysisResult {
            id: Uuid::new_v4(),
            resume_id: resume.id,
            score,
            verdict: Verdict::Medium,
            summary: format!("Summary for {}", resume.candidate_name),
            feedback: "Feedback, with a comma".to_string(),
            missing_skills: vec!["Go".to_string(), "Helm".to_string()],
            provenance: Provenance::Model,
            fallback_reason: None,
            analyzed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_rank_orders_by_score_with_unanalyzed_last() {
        let job = job();
        let a = resume(&job, "Ann", 0);
        let b = resume(&job, "Bob", 1);
        let c = resume(&job, "Cid", 2);
        let d = resume(&job, "Dee", 3);
        let analyses = vec![analysis(&a, 40), analysis(&c, 90), analysis(&d, 40)];

        let ranked = rank_candidates(vec![a, b, c, d], analyses, 65);
        let names: Vec<&str> = ranked
            .iter()
            .map(|r| r.resume.candidate_name.as_str())
            .collect();

        assert_eq!(names, ["Cid", "Ann", "Dee", "Bob"]);
        assert!(ranked[0].shortlisted);
        assert!(!ranked[1].shortlisted);
        assert!(ranked[3].analysis.is_none());
    }

    #[test]
    fn test_shortlist_threshold_is_inclusive() {
        let job = job();
        let r = resume(&job, "Ann", 0);
        assert!(is_shortlisted(&analysis(&r, 65), 65));
        assert!(!is_shortlisted(&analysis(&r, 64), 65));
    }

    #[test]
    fn test_summary_and_job_stats() {
        let job = job();
        let a = resume(&job, "Ann", 0);
        let b = resume(&job, "Bob", 1);
        let c = resume(&job, "Cid", 2);
        let analyses = vec![analysis(&a, 70), analysis(&b, 55)];

        let ranked = rank_candidates(vec![a, b, c], analyses, 65);
        assert_eq!(
            summarize(&ranked),
            JobSummary {
                total_candidates: 3,
                analyzed: 2,
                shortlisted: 1,
                average_score: Some(62.5),
            }
        );

        let stats = job_stats(&job, &ranked);
        assert_eq!(stats.applicants, 3);
        assert_eq!(stats.shortlisted, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_average_is_none_without_analyses() {
        let job = job();
        let ranked = rank_candidates(vec![resume(&job, "Ann", 0)], vec![], 65);
        assert_eq!(summarize(&ranked).average_score, None);
    }

    #[test]
    fn test_dashboard_totals() {
        let first = job();
        let second = job();
        let a = resume(&first, "Ann", 0);
        let b = resume(&second, "Bob", 0);
        let c = resume(&second, "Cid", 1);

        let stats = vec![
            job_stats(&first, &rank_candidates(vec![a.clone()], vec![analysis(&a, 80)], 65)),
            job_stats(
                &second,
                &rank_candidates(vec![b.clone(), c], vec![analysis(&b, 66)], 65),
            ),
        ];
        let dashboard = dashboard(stats, 65);

        assert_eq!(dashboard.total_jobs, 2);
        assert_eq!(dashboard.total_candidates, 3);
        assert_eq!(dashboard.shortlisted_count, 2);
    }
}
