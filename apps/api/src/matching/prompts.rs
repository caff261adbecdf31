//! Prompt Builder: job text + resume text → one instruction block for the model.
//!
//! Deterministic: identical inputs always produce an identical prompt.

/// Default per-text character budget. Keeps a long job posting plus a long
/// resume comfortably inside the model context window.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 8000;

/// Marker appended to a text that was cut short.
const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

/// Per-text character limits, applied independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_job_chars: usize,
    pub max_resume_chars: usize,
}

impl PromptLimits {
    pub fn uniform(max_chars: usize) -> Self {
        Self {
            max_job_chars: max_chars,
            max_resume_chars: max_chars,
        }
    }
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self::uniform(DEFAULT_MAX_TEXT_CHARS)
    }
}

/// Match prompt template. Replace `{job_text}` and `{resume_text}`.
const MATCH_PROMPT_TEMPLATE: &str = r#"You are an expert HR recruitment assistant. Evaluate how well the candidate's resume fits the job description below.

JOB DESCRIPTION:
---
{job_text}
---

CANDIDATE RESUME:
---
{resume_text}
---

Return a single JSON object with EXACTLY these fields:
{
  "relevance_score": 0,
  "verdict": "High",
  "summary": "string",
  "feedback": "string",
  "missing_skills": ["string"]
}

Field rules:
- "relevance_score": an integer from 0 to 100 rating how well the resume matches the job.
- "verdict": exactly one of "High", "Medium" or "Low".
- "summary": one concise paragraph on the candidate's strengths and weaknesses for this role.
- "feedback": specific, constructive advice on improving the resume for this kind of role.
- "missing_skills": skills, certifications or experience the job asks for that the resume does not clearly show.

Return ONLY the JSON object. No markdown, no commentary before or after it."#;

/// Builds the match prompt with the default limits.
pub fn build_prompt(job_text: &str, resume_text: &str) -> String {
    build_prompt_with(PromptLimits::default(), job_text, resume_text)
}

pub fn build_prompt_with(limits: PromptLimits, job_text: &str, resume_text: &str) -> String {
    let job = truncate_head(job_text.trim(), limits.max_job_chars);
    let resume = truncate_head(resume_text.trim(), limits.max_resume_chars);

    // Job text is substituted last so a resume containing "{job_text}" cannot inject it.
    MATCH_PROMPT_TEMPLATE
        .replacen("{resume_text}", &resume, 1)
        .replacen("{job_text}", &job, 1)
}

/// Keeps the first `max_chars` characters, cutting on a char boundary.
pub fn truncate_head(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
