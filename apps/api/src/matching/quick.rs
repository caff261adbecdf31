//! Quick analysis: one job description against one resume, nothing stored.
//!
//! Alongside the analysis the caller gets cover-letter guidance picked by score
//! tier. Fallback analyses carry no guidance since their score is a placeholder.

use serde::{Deserialize, Serialize};

use crate::models::analysis::AnalysisDraft;

/// Lowest score of the strong tier.
pub const STRONG_MATCH_SCORE: u8 = 80;
/// Lowest score of the good tier.
pub const GOOD_MATCH_SCORE: u8 = 65;

const STRONG_TIPS: &[&str] = &[
    "Lead with your most relevant achievements",
    "Quantify your impact with specific metrics",
    "Show enthusiasm for the company's mission",
    "Demonstrate knowledge of their recent developments",
];

const GOOD_TIPS: &[&str] = &[
    "Address any skill gaps with related experience",
    "Show your learning agility and growth mindset",
    "Highlight transferable skills from other domains",
    "Express genuine interest in developing missing skills",
];

const DEVELOPING_TIPS: &[&str] = &[
    "Emphasize your eagerness to learn and grow",
    "Highlight any relevant projects or coursework",
    "Show how your unique background brings value",
    "Demonstrate commitment to skill development",
];

/// Advice common to every tier.
const KEY_POINTS: &[&str] = &[
    "Reference specific requirements from the job description",
    "Use keywords from the job posting naturally",
    "Tell a story about your relevant experience",
    "Show genuine interest in the company and role",
    "Keep it concise (3-4 paragraphs maximum)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverLetterTier {
    Strong,
    Good,
    Developing,
}

impl CoverLetterTier {
    pub fn for_score(score: u8) -> Self {
        if score >= STRONG_MATCH_SCORE {
            CoverLetterTier::Strong
        } else if score >= GOOD_MATCH_SCORE {
            CoverLetterTier::Good
        } else {
            CoverLetterTier::Developing
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            CoverLetterTier::Strong => "Strong match: highlight your strengths",
            CoverLetterTier::Good => "Good match: bridge the gaps",
            CoverLetterTier::Developing => "Developing match: focus on potential",
        }
    }

    fn tips(self) -> &'static [&'static str] {
        match self {
            CoverLetterTier::Strong => STRONG_TIPS,
            CoverLetterTier::Good => GOOD_TIPS,
            CoverLetterTier::Developing => DEVELOPING_TIPS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverLetterGuidance {
    pub tier: CoverLetterTier,
    pub headline: &'static str,
    pub tips: &'static [&'static str],
    pub key_points: &'static [&'static str],
}

impl CoverLetterGuidance {
    pub fn for_score(score: u8) -> Self {
        let tier = CoverLetterTier::for_score(score);
        Self {
            tier,
            headline: tier.headline(),
            tips: tier.tips(),
            key_points: KEY_POINTS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuickAnalysisRequest {
    pub job_description: String,
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct QuickAnalysisResponse {
    #[serde(flatten)]
    pub analysis: AnalysisDraft,
    pub guidance: Option<CoverLetterGuidance>,
}

impl From<AnalysisDraft> for QuickAnalysisResponse {
    fn from(analysis: AnalysisDraft) -> Self {
        let guidance =
            (!analysis.is_fallback()).then(|| CoverLetterGuidance::for_score(analysis.score));
        Self { analysis, guidance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::parser::{fallback_draft, FallbackReason};

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(CoverLetterTier::for_score(100), CoverLetterTier::Strong);
        assert_eq!(CoverLetterTier::for_score(80), CoverLetterTier::Strong);
        assert_eq!(CoverLetterTier::for_score(79), CoverLetterTier::Good);
        assert_eq!(CoverLetterTier::for_score(65), CoverLetterTier::Good);
        assert_eq!(CoverLetterTier::for_score(64), CoverLetterTier::Developing);
        assert_eq!(CoverLetterTier::for_score(0), CoverLetterTier::Developing);
    }

    #[test]
    fn test_guidance_matches_tier() {
        let guidance = CoverLetterGuidance::for_score(70);
        assert_eq!(guidance.tier, CoverLetterTier::Good);
        assert_eq!(guidance.tips, GOOD_TIPS);
        assert_eq!(guidance.key_points.len(), 5);
    }

    #[test]
    fn test_fallback_gets_no_guidance() {
        let draft = fallback_draft(&FallbackReason::Decode("empty reply".to_string()));
        let response = QuickAnalysisResponse::from(draft);
        assert!(response.guidance.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["provenance"], "fallback");
        assert!(json["guidance"].is_null());
    }
}
