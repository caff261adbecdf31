//! Batch Orchestrator: runs the matcher over many resumes for one job.
//!
//! Outcomes come back in input order. One resume failing never aborts the rest.
//! Cancellation is checked before each resume starts; work already started runs
//! to completion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{future, stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use super::matcher::{Matcher, Upload};
use crate::models::analysis::{AnalysisResult, Provenance};
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::store::StoreError;

/// One resume to analyze, optionally with the document it was uploaded from.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub resume: ResumeRow,
    pub upload: Option<Upload>,
}

impl From<ResumeRow> for BatchItem {
    fn from(resume: ResumeRow) -> Self {
        Self {
            resume,
            upload: None,
        }
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub resume: ResumeRow,
    pub result: Result<AnalysisResult, StoreError>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
    /// Resumes never started because the batch was cancelled.
    pub skipped: usize,
}

impl BatchReport {
    pub fn cancelled(&self) -> bool {
        self.skipped > 0
    }
}

/// Cooperative cancellation signal shared between a batch and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Analyzes every item against `job`. At most `concurrency` resumes are in
/// flight at once; outcomes keep the order of `items`.
pub async fn analyze_batch(
    matcher: &Matcher,
    job: &JobRow,
    items: Vec<BatchItem>,
    concurrency: usize,
    cancel: &CancelFlag,
) -> BatchReport {
    let total = items.len();
    info!(
        "Starting batch for job {} ({} resumes, concurrency {})",
        job.id, total, concurrency
    );

    let outcomes: Vec<BatchOutcome> = stream::iter(items)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|item| async move {
            let result = match &item.upload {
                Some(upload) => matcher.analyze_upload(job, &item.resume, upload).await,
                None => matcher.analyze(job, &item.resume).await,
            };
            if let Err(e) = &result {
                warn!(
                    "Batch item {} ({}) was not persisted: {}",
                    item.resume.id, item.resume.candidate_name, e
                );
            }
            BatchOutcome {
                resume: item.resume,
                result,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let report = BatchReport {
        skipped: total - outcomes.len(),
        outcomes,
    };

    let fallbacks = report
        .outcomes
        .iter()
        .filter(|o| matches!(&o.result, Ok(r) if r.provenance == Provenance::Fallback))
        .count();
    let errors = report.outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "Batch for job {} finished: {} processed ({} fallback, {} errors), {} skipped",
        job.id,
        report.outcomes.len(),
        fallbacks,
        errors,
        report.skipped
    );
    report
}

/// Tracks the running batch per job so it can be cancelled from another request.
#[derive(Clone, Default)]
pub struct BatchRegistry {
    running: Arc<Mutex<HashMap<Uuid, CancelFlag>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch for `job_id`. Returns `None` if one is already running.
    /// The registration is released when the guard drops.
    pub fn begin(&self, job_id: Uuid) -> Option<BatchGuard> {
        let mut running = self.lock();
        if running.contains_key(&job_id) {
            return None;
        }
        let flag = CancelFlag::default();
        running.insert(job_id, flag.clone());
        Some(BatchGuard {
            registry: self.clone(),
            job_id,
            flag,
        })
    }

    /// Signals the running batch for `job_id`. Returns whether one was running.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.lock().get(&job_id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        self.lock().contains_key(&job_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, CancelFlag>> {
        // The map stays consistent even if a holder panicked.
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct BatchGuard {
    registry: BatchRegistry,
    job_id: Uuid,
    flag: CancelFlag,
}

impl BatchGuard {
    pub fn flag(&self) -> &CancelFlag {
        &self.flag
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.job_id);
    }
}
