use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Coarse three-level classification of resume/job match quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    High,
    Medium,
    Low,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::High => "High",
            Verdict::Medium => "Medium",
            Verdict::Low => "Low",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Verdict::High),
            "medium" => Ok(Verdict::Medium),
            "low" => Ok(Verdict::Low),
            other => Err(format!("unknown verdict '{other}'")),
        }
    }
}

/// Whether a result came from the model or from the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Model,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Model => "model",
            Provenance::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Provenance::Model),
            "fallback" => Ok(Provenance::Fallback),
            other => Err(format!("unknown provenance '{other}'")),
        }
    }
}

/// A validated analysis not yet persisted. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisDraft {
    pub score: u8, // 0 – 100
    pub verdict: Verdict,
    pub summary: String,
    pub feedback: String,
    pub missing_skills: Vec<String>,
    pub provenance: Provenance,
    pub fallback_reason: Option<String>,
}

impl AnalysisDraft {
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// The persisted analysis for one resume. Exactly one exists per resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub score: u8,
    pub verdict: Verdict,
    pub summary: String,
    pub feedback: String,
    pub missing_skills: Vec<String>,
    pub provenance: Provenance,
    pub fallback_reason: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn from_draft(id: Uuid, resume_id: Uuid, draft: AnalysisDraft) -> Self {
        Self {
            id,
            resume_id,
            score: draft.score,
            verdict: draft.verdict,
            summary: draft.summary,
            feedback: draft.feedback,
            missing_skills: draft.missing_skills,
            provenance: draft.provenance,
            fallback_reason: draft.fallback_reason,
            analyzed_at: Utc::now(),
        }
    }
}

/// Raw `analysis_results` row; enums are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub score: i32,
    pub verdict: String,
    pub summary: String,
    pub feedback: String,
    pub missing_skills: Vec<String>,
    pub provenance: String,
    pub fallback_reason: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for AnalysisResult {
    type Error = String;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        Ok(AnalysisResult {
            id: row.id,
            resume_id: row.resume_id,
            score: row.score.clamp(0, 100) as u8,
            verdict: row.verdict.parse()?,
            summary: row.summary,
            feedback: row.feedback,
            missing_skills: row.missing_skills,
            provenance: row.provenance.parse()?,
            fallback_reason: row.fallback_reason,
            analyzed_at: row.analyzed_at,
        })
    }
}
