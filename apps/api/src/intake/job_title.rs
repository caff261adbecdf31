use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::CompletionClient;
use crate::matching::parser::locate_json_object;
use crate::matching::prompts::truncate_head;

const MAX_TITLE_CHARS: usize = 120;
const TITLE_PROMPT_MAX_CHARS: usize = 4000;

const TITLE_PROMPT_TEMPLATE: &str = r#"You are an expert HR assistant. Extract ONLY the job title from the job description below.

---
{job_text}
---

Return a single JSON object: {"title": "<job title>"}
If the description names no job title, return {"title": null}."#;

/// Asks the model for the job title. Falls back to a timestamped placeholder
/// when the call fails or the model finds no title.
pub async fn extract_job_title(
    llm: &dyn CompletionClient,
    description: &str,
    timeout: Duration,
) -> String {
    let prompt = TITLE_PROMPT_TEMPLATE.replacen(
        "{job_text}",
        &truncate_head(description.trim(), TITLE_PROMPT_MAX_CHARS),
        1,
    );

    let reply = match tokio::time::timeout(timeout, llm.complete(&prompt, timeout)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            warn!("Job title extraction failed ({}): {}", e.kind(), e);
            return fallback_title(Utc::now());
        }
        Err(_) => {
            warn!("Job title extraction timed out after {:?}", timeout);
            return fallback_title(Utc::now());
        }
    };

    match title_from_reply(&reply) {
        Some(title) => {
            info!("Extracted job title: {title}");
            title
        }
        None => fallback_title(Utc::now()),
    }
}

/// `{"title": ".."}` if present, otherwise the first non-empty line of the reply.
fn title_from_reply(reply: &str) -> Option<String> {
    let candidate = match locate_json_object(reply) {
        Some(object) => match object.get("title") {
            Some(Value::String(title)) => title.clone(),
            _ => return None,
        },
        None => reply.lines().map(str::trim).find(|l| !l.is_empty())?.to_string(),
    };

    let title = candidate
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*' || c == '#')
        .trim();
    if title.is_empty() || title.to_lowercase().contains("no job title") {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}

pub fn fallback_title(now: DateTime<Utc>) -> String {
    format!("Job Position {}", now.format("%Y%m%d_%H%M%S"))
}
