use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent ⇒ the in-memory store is used.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub s3: Option<S3Config>,
    pub smtp: Option<SmtpConfig>,
    pub port: u16,
    pub rust_log: String,
    pub llm_timeout: Duration,
    pub llm_max_concurrency: usize,
    pub batch_concurrency: usize,
    pub max_prompt_chars: usize,
    pub shortlist_threshold: u8,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3 = match optional_env("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let smtp = match optional_env("SMTP_SERVER") {
            Some(server) => Some(SmtpConfig {
                server,
                user: require_env("SMTP_USER")?,
                pass: require_env("SMTP_PASS")?,
                from: require_env("MAIL_FROM")?,
            }),
            None => None,
        };

        let shortlist_threshold: u8 = parse_env("SHORTLIST_THRESHOLD", 65)?;
        if shortlist_threshold > 100 {
            anyhow::bail!("SHORTLIST_THRESHOLD must be between 0 and 100");
        }

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            s3,
            smtp,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 45)?),
            llm_max_concurrency: parse_env::<usize>("LLM_MAX_CONCURRENCY", 4)?.max(1),
            batch_concurrency: parse_env::<usize>("BATCH_CONCURRENCY", 1)?.max(1),
            max_prompt_chars: parse_env("MAX_PROMPT_CHARS", 8000)?,
            shortlist_threshold,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
