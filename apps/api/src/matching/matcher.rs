//! Matcher: analyzes one resume against one job and persists the result.
//!
//! Flow per invocation:
//!   Extracting → Prompting → Calling → Parsing → Persisted
//!
//! A failure in any stage before persistence becomes a fallback draft, so every
//! invocation ends in exactly one upsert. The only error surfaced to callers is a
//! failed persistence write. `preview` runs the same stages over free-standing
//! texts and persists nothing.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::extraction::{self, DocumentFormat};
use crate::llm_client::{CompletionClient, LlmError};
use crate::matching::parser::{self, fallback_draft, FallbackReason, ParseOutcome};
use crate::matching::prompts::{build_prompt_with, PromptLimits};
use crate::models::analysis::{AnalysisDraft, AnalysisResult};
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::store::{AnalysisStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Extracting,
    Prompting,
    Calling,
    Parsing,
    Persisted,
}

/// Raw bytes of an uploaded document plus its declared format.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone)]
pub struct MatcherSettings {
    pub timeout: Duration,
    /// Upper bound on concurrent model calls across all batches.
    pub max_concurrent_calls: usize,
    pub limits: PromptLimits,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(45),
            max_concurrent_calls: 4,
            limits: PromptLimits::default(),
        }
    }
}

#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn AnalysisStore>,
    llm: Arc<dyn CompletionClient>,
    settings: MatcherSettings,
    permits: Arc<Semaphore>,
}

impl Matcher {
    pub fn new(
        store: Arc<dyn AnalysisStore>,
        llm: Arc<dyn CompletionClient>,
        settings: MatcherSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_calls.max(1)));
        Self {
            store,
            llm,
            settings,
            permits,
        }
    }

    /// Analyzes a resume using its cached text and upserts the result.
    pub async fn analyze(
        &self,
        job: &JobRow,
        resume: &ResumeRow,
    ) -> Result<AnalysisResult, StoreError> {
        self.run(job, resume, None).await
    }

    /// Like `analyze`, extracting from `upload` when the resume has no cached text.
    pub async fn analyze_upload(
        &self,
        job: &JobRow,
        resume: &ResumeRow,
        upload: &Upload,
    ) -> Result<AnalysisResult, StoreError> {
        self.run(job, resume, Some(upload)).await
    }

    /// Scores free-standing texts without touching the store.
    pub async fn preview(&self, job_text: &str, resume_text: &str) -> AnalysisDraft {
        let prompt = build_prompt_with(self.settings.limits, job_text, resume_text);
        let outcome = match self.call_model(&prompt).await {
            Ok(raw) => parser::parse(&raw),
            Err(e) => ParseOutcome::Fallback(FallbackReason::upstream(&e)),
        };
        if let ParseOutcome::Fallback(reason) = &outcome {
            warn!("Quick analysis fell back: {}", reason.describe());
        }
        outcome.into_draft()
    }

    async fn run(
        &self,
        job: &JobRow,
        resume: &ResumeRow,
        upload: Option<&Upload>,
    ) -> Result<AnalysisResult, StoreError> {
        let draft = self.evaluate(job, resume, upload).await;
        let result = self.store.upsert_analysis(resume.id, draft).await?;

        info!(
            stage = ?MatchStage::Persisted,
            "Analysis for resume {} ({}) against job {}: score={} verdict={} provenance={}",
            resume.id,
            resume.candidate_name,
            job.id,
            result.score,
            result.verdict,
            result.provenance
        );
        Ok(result)
    }

    /// Runs every stage up to (not including) persistence. Never fails.
    async fn evaluate(
        &self,
        job: &JobRow,
        resume: &ResumeRow,
        upload: Option<&Upload>,
    ) -> AnalysisDraft {
        debug!(stage = ?MatchStage::Extracting, "resume {}", resume.id);
        let resume_text = match resolve_text(resume, upload) {
            Ok(text) => text,
            Err(reason) => return self.degrade(resume, MatchStage::Extracting, reason),
        };

        debug!(stage = ?MatchStage::Prompting, "resume {}", resume.id);
        let prompt = build_prompt_with(self.settings.limits, &job.description, &resume_text);

        debug!(stage = ?MatchStage::Calling, "resume {}", resume.id);
        let raw = match self.call_model(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                return self.degrade(resume, MatchStage::Calling, FallbackReason::upstream(&e))
            }
        };

        debug!(stage = ?MatchStage::Parsing, "resume {}", resume.id);
        let outcome = parser::parse(&raw);
        if let ParseOutcome::Fallback(reason) = &outcome {
            warn_fallback(resume, MatchStage::Parsing, reason);
        }
        outcome.into_draft()
    }

    async fn call_model(&self, prompt: &str) -> Result<String, LlmError> {
        // A closed semaphore never happens in practice; proceed unthrottled if it does.
        let _permit = self.permits.acquire().await.ok();
        let timeout = self.settings.timeout;
        tokio::time::timeout(timeout, self.llm.complete(prompt, timeout))
            .await
            .map_err(|_| LlmError::Timeout(timeout))?
    }

    fn degrade(
        &self,
        resume: &ResumeRow,
        stage: MatchStage,
        reason: FallbackReason,
    ) -> AnalysisDraft {
        warn_fallback(resume, stage, &reason);
        fallback_draft(&reason)
    }
}

fn warn_fallback(resume: &ResumeRow, stage: MatchStage, reason: &FallbackReason) {
    warn!(
        failed_stage = ?stage,
        "Falling back for resume {} ({}): {}",
        resume.id,
        resume.candidate_name,
        reason.describe()
    );
}

/// Cached text first, then the supplied upload.
fn resolve_text(resume: &ResumeRow, upload: Option<&Upload>) -> Result<String, FallbackReason> {
    if let Some(text) = resume.cached_text() {
        return Ok(text.to_string());
    }

    let upload = upload.ok_or_else(|| {
        FallbackReason::Extraction(
            "resume has no extracted text and no source document was supplied".to_string(),
        )
    })?;

    let text = extraction::extract(&upload.bytes, upload.format)
        .map_err(|e| FallbackReason::Extraction(e.to_string()))?;
    if text.is_empty() {
        return Err(FallbackReason::Extraction(
            "document contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}
