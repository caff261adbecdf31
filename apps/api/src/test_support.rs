//! Shared fixtures for unit tests: a scripted completion client and store seeding.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::llm_client::{CompletionClient, LlmError};
use crate::matching::prompts::PromptLimits;
use crate::matching::{BatchRegistry, Matcher, MatcherSettings};
use crate::models::job::{JobRow, NewJob};
use crate::models::resume::{NewResume, ResumeRow};
use crate::notify::LogNotifier;
use crate::state::AppState;
use crate::store::{AnalysisStore, MemoryStore};

pub const VALID_REPLY: &str = r#"{
    "relevance_score": 82,
    "verdict": "High",
    "summary": "Strong Rust background with production async experience.",
    "feedback": "Quantify the impact of the services you built.",
    "missing_skills": ["Kubernetes"]
}"#;

/// What the scripted client does for a prompt.
#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail(fn() -> LlmError),
    /// Sleeps for the duration, then replies with `VALID_REPLY`.
    Stall(Duration),
}

/// A `CompletionClient` whose behavior is chosen by substring match on the prompt.
pub struct ScriptedClient {
    default: Script,
    rules: Vec<(String, Script)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(default: Script) -> Self {
        Self {
            default,
            rules: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::new(Script::Reply(reply.to_string()))
    }

    pub fn failing(err: fn() -> LlmError) -> Self {
        Self::new(Script::Fail(err))
    }

    pub fn stalling(delay: Duration) -> Self {
        Self::new(Script::Stall(delay))
    }

    /// Prompts containing `marker` get `script` instead of the default.
    pub fn when(mut self, marker: &str, script: Script) -> Self {
        self.rules.push((marker.to_string(), script));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let script = self
            .rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| self.default.clone());

        match script {
            Script::Reply(reply) => Ok(reply),
            Script::Fail(err) => Err(err()),
            Script::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(VALID_REPLY.to_string())
            }
        }
    }
}

pub async fn seed_job(store: &MemoryStore) -> JobRow {
    store
        .create_job(NewJob {
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            description: "We need a Rust engineer with Tokio and PostgreSQL experience."
                .to_string(),
        })
        .await
        .unwrap()
}

pub async fn seed_resume(
    store: &MemoryStore,
    job: &JobRow,
    name: &str,
    text: Option<&str>,
) -> ResumeRow {
    store
        .create_resume(NewResume {
            job_id: job.id,
            candidate_name: name.to_string(),
            candidate_email: None,
            resume_text: text.map(String::from),
            source_filename: None,
            source_key: None,
        })
        .await
        .unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        anthropic_api_key: "test-key".to_string(),
        s3: None,
        smtp: None,
        port: 0,
        rust_log: "debug".to_string(),
        llm_timeout: Duration::from_secs(30),
        llm_max_concurrency: 2,
        batch_concurrency: 1,
        max_prompt_chars: 8000,
        shortlist_threshold: 65,
    }
}

/// App state over a fresh in-memory store, no archive and a log-only notifier.
pub fn test_state(llm: Arc<ScriptedClient>) -> AppState {
    let config = test_config();
    let store: Arc<dyn AnalysisStore> = Arc::new(MemoryStore::new());
    let llm: Arc<dyn CompletionClient> = llm;
    let matcher = Matcher::new(
        store.clone(),
        llm.clone(),
        MatcherSettings {
            timeout: config.llm_timeout,
            max_concurrent_calls: config.llm_max_concurrency,
            limits: PromptLimits::uniform(config.max_prompt_chars),
        },
    );
    AppState {
        store,
        llm,
        matcher,
        archive: None,
        notifier: Arc::new(LogNotifier),
        batches: BatchRegistry::new(),
        config,
    }
}
