use std::sync::Arc;

use crate::config::Config;
use crate::intake::uploads::UploadArchive;
use crate::llm_client::CompletionClient;
use crate::matching::{BatchRegistry, Matcher};
use crate::notify::Notifier;
use crate::store::AnalysisStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PgStore when DATABASE_URL is set, MemoryStore otherwise.
    pub store: Arc<dyn AnalysisStore>,
    /// Used directly only for job-title extraction; matching goes through `matcher`.
    pub llm: Arc<dyn CompletionClient>,
    pub matcher: Matcher,
    /// Archive for original uploads. `None` when S3 is not configured.
    pub archive: Option<UploadArchive>,
    /// SmtpNotifier when SMTP is configured, LogNotifier otherwise.
    pub notifier: Arc<dyn Notifier>,
    pub batches: BatchRegistry,
    pub config: Config,
}
