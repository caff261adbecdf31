mod config;
mod db;
mod errors;
mod extraction;
mod intake;
mod llm_client;
mod matching;
mod models;
mod notify;
mod reporting;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, S3Config};
use crate::db::create_pool;
use crate::intake::uploads::UploadArchive;
use crate::llm_client::{CompletionClient, LlmClient};
use crate::matching::prompts::PromptLimits;
use crate::matching::{BatchRegistry, Matcher, MatcherSettings};
use crate::notify::{LogNotifier, Notifier, SmtpNotifier};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{AnalysisStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Persistence: PostgreSQL when configured, otherwise process memory
    let store: Arc<dyn AnalysisStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize S3 / MinIO archive for original uploads
    let archive = match &config.s3 {
        Some(s3) => {
            let archive = UploadArchive::new(build_s3_client(s3).await, s3.bucket.clone());
            info!("S3 upload archive enabled (bucket: {})", s3.bucket);
            Some(archive)
        }
        None => None,
    };

    // Initialize LLM client
    let llm: Arc<dyn CompletionClient> = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
    )?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let matcher = Matcher::new(
        store.clone(),
        llm.clone(),
        MatcherSettings {
            timeout: config.llm_timeout,
            max_concurrent_calls: config.llm_max_concurrency,
            limits: PromptLimits::uniform(config.max_prompt_chars),
        },
    );
    info!(
        "Matcher ready (timeout {:?}, {} concurrent model calls, batch concurrency {})",
        config.llm_timeout, config.llm_max_concurrency, config.batch_concurrency
    );

    // Shortlist e-mail delivery
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => {
            info!("SMTP not configured; shortlist notices will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // Build app state
    let state = AppState {
        store,
        llm,
        matcher,
        archive,
        notifier,
        batches: BatchRegistry::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the dashboard host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        "screener-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
