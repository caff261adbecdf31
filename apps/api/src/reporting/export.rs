use anyhow::Result;

use super::RankedCandidate;
use crate::models::analysis::AnalysisResult;

const HEADER: [&str; 11] = [
    "rank",
    "candidate_name",
    "candidate_email",
    "score",
    "verdict",
    "shortlisted",
    "summary",
    "feedback",
    "missing_skills",
    "provenance",
    "analyzed_at",
];

/// Renders ranked candidates as CSV, one row per resume in ranking order.
/// Unanalyzed resumes get empty analysis columns.
pub fn candidates_csv(ranked: &[RankedCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;

    for (i, candidate) in ranked.iter().enumerate() {
        let resume = &candidate.resume;
        let analysis = candidate.analysis.as_ref();
        let field = |f: fn(&AnalysisResult) -> String| {
            analysis.map(f).unwrap_or_default()
        };
        wtr.write_record([
            (i + 1).to_string(),
            resume.candidate_name.clone(),
            resume.candidate_email.clone().unwrap_or_default(),
            field(|a| a.score.to_string()),
            field(|a| a.verdict.to_string()),
            if candidate.shortlisted { "yes" } else { "no" }.to_string(),
            field(|a| a.summary.clone()),
            field(|a| a.feedback.clone()),
            field(|a| a.missing_skills.join("; ")),
            field(|a| a.provenance.to_string()),
            field(|a| a.analyzed_at.to_rfc3339()),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
