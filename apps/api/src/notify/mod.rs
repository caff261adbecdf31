//! Notification boundary: shortlist e-mails to candidates.
//!
//! `SmtpNotifier` delivers through lettre's blocking SMTP transport on the
//! blocking thread pool. `LogNotifier` is used when SMTP is not configured.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;
use crate::models::analysis::{AnalysisResult, Verdict};
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;

pub mod handlers;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid e-mail address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A rendered shortlist e-mail for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ShortlistNotice {
    pub candidate_name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub score: u8,
    pub verdict: Verdict,
}

impl ShortlistNotice {
    /// Renders the notice. `None` when the candidate left no e-mail address.
    pub fn render(job: &JobRow, resume: &ResumeRow, analysis: &AnalysisResult) -> Option<Self> {
        let email = resume
            .candidate_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())?
            .to_string();

        let subject = format!(
            "Update on your application for {} at {}",
            job.title, job.company
        );
        let body = format!(
            "Dear {name},\n\n\
             Thank you for applying for the {title} position at {company}.\n\n\
             We are pleased to let you know that your application has been shortlisted \
             for the next stage of our selection process.\n\n\
             Match score: {score}/100\n\
             Overall fit: {verdict}\n\n\
             Summary of our assessment:\n{summary}\n\n\
             Our recruitment team will contact you shortly with next steps.\n\n\
             Kind regards,\n\
             The {company} Recruitment Team\n",
            name = resume.candidate_name,
            title = job.title,
            company = job.company,
            score = analysis.score,
            verdict = analysis.verdict,
            summary = analysis.summary,
        );

        Some(Self {
            candidate_name: resume.candidate_name.clone(),
            email,
            subject,
            body,
            score: analysis.score,
            verdict: analysis.verdict,
        })
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &ShortlistNotice) -> Result<(), NotifyError>;
}

pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from = mailbox(None, &config.from)?;
        let mailer = SmtpTransport::relay(&config.server)?
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notice: &ShortlistNotice) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(Some(&notice.candidate_name), &notice.email)?)
            .subject(notice.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())?;

        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&message)).await??;

        info!("Shortlist e-mail sent to {}", notice.email);
        Ok(())
    }
}

/// Logs notices instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: &ShortlistNotice) -> Result<(), NotifyError> {
        info!(
            "SMTP not configured; shortlist notice for {} <{}> not sent: {}",
            notice.candidate_name, notice.email, notice.subject
        );
        Ok(())
    }
}

fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox, NotifyError> {
    let parsed = address
        .trim()
        .parse::<Address>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })?;
    Ok(Mailbox::new(name.map(String::from), parsed))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::analysis::Provenance;

    fn job() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            title: "Data Engineer".to_string(),
            company: "Globex".to_string(),
            description: "Spark and Airflow".to_string(),
            created_at: Utc::now(),
        }
    }

    fn resume(email: Option<&str>) -> ResumeRow {
        ResumeRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            candidate_name: "Grace Hopper".to_string(),
            candidate_email: email.map(String::from),
            resume_text: Some("COBOL".to_string()),
            source_filename: None,
            source_key: None,
            created_at: Utc::now(),
        }
    }

    fn analysis(resume_id: Uuid) -> AnalysisResult {
        AnalysisResult {
            id: Uuid::new_v4(),
            resume_id,
            score: 88,
            verdict: Verdict::High,
            summary: "Deep data pipeline experience.".to_string(),
            feedback: "Mention Airflow explicitly.".to_string(),
            missing_skills: vec![],
            provenance: Provenance::Model,
            fallback_reason: None,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_includes_score_verdict_and_summary() {
        let job = job();
        let resume = resume(Some("grace@example.com"));
        let notice = ShortlistNotice::render(&job, &resume, &analysis(resume.id)).unwrap();

        assert_eq!(notice.email, "grace@example.com");
        assert_eq!(
            notice.subject,
            "Update on your application for Data Engineer at Globex"
        );
        assert!(notice.body.starts_with("Dear Grace Hopper,"));
        assert!(notice.body.contains("Match score: 88/100"));
        assert!(notice.body.contains("Overall fit: High"));
        assert!(notice.body.contains("Deep data pipeline experience."));
    }

    #[test]
    fn test_render_skips_candidates_without_email() {
        let job = job();
        for email in [None, Some("   ")] {
            let resume = resume(email);
            assert!(ShortlistNotice::render(&job, &resume, &analysis(resume.id)).is_none());
        }
    }

    #[test]
    fn test_mailbox_rejects_malformed_address() {
        assert!(matches!(
            mailbox(None, "not-an-address"),
            Err(NotifyError::InvalidAddress { .. })
        ));
        assert!(mailbox(Some("Grace"), " grace@example.com ").is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_notice() {
        let job = job();
        let resume = resume(Some("grace@example.com"));
        let notice = ShortlistNotice::render(&job, &resume, &analysis(resume.id)).unwrap();
        assert!(LogNotifier.send(&notice).await.is_ok());
    }
}
