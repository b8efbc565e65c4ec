//! Input/output shapes of the downstream judgment stage.
//!
//! Judges read the aggregated evidence and emit opinions; a consolidation
//! step folds them into per-criterion results and a report. Only the data
//! contract lives here.

use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Score spread above which a dissent summary is mandatory.
pub const DISSENT_SPREAD: u8 = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JudgmentError {
    #[error("score {score} for {criterion} outside {MIN_SCORE}..={MAX_SCORE}")]
    ScoreOutOfRange { criterion: String, score: u8 },

    #[error("criterion {criterion}: judge scores spread by {spread}, dissent summary required")]
    MissingDissent { criterion: String, spread: u8 },

    #[error("overall score {0} outside {MIN_SCORE}..={MAX_SCORE}")]
    OverallOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Judge {
    Prosecutor,
    Defense,
    TechLead,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudicialOpinion {
    pub judge: Judge,
    pub criterion_id: String,
    pub score: u8,
    pub argument: String,
    /// Evidence locations the argument relies on.
    #[serde(default)]
    pub cited_evidence: Vec<String>,
}

impl JudicialOpinion {
    pub fn validate(&self) -> Result<(), JudgmentError> {
        check_score(&self.criterion_id, self.score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionResult {
    pub dimension_id: String,
    pub dimension_name: String,
    pub final_score: u8,
    pub judge_opinions: Vec<JudicialOpinion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissent_summary: Option<String>,
    /// File-level instructions for improvement.
    pub remediation: String,
}

impl CriterionResult {
    /// max - min over the judges' scores; 0 with fewer than two opinions.
    pub fn score_spread(&self) -> u8 {
        let scores = self.judge_opinions.iter().map(|o| o.score);
        match (scores.clone().min(), scores.max()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    pub fn requires_dissent(&self) -> bool {
        self.score_spread() > DISSENT_SPREAD
    }

    pub fn validate(&self) -> Result<(), JudgmentError> {
        check_score(&self.dimension_id, self.final_score)?;
        for opinion in &self.judge_opinions {
            opinion.validate()?;
        }
        let has_dissent = self
            .dissent_summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if self.requires_dissent() && !has_dissent {
            return Err(JudgmentError::MissingDissent {
                criterion: self.dimension_id.clone(),
                spread: self.score_spread(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    pub repo_url: String,
    pub executive_summary: String,
    pub overall_score: f64,
    pub criteria: Vec<CriterionResult>,
    pub remediation_plan: String,
}

impl AuditReport {
    pub fn validate(&self) -> Result<(), JudgmentError> {
        let range = f64::from(MIN_SCORE)..=f64::from(MAX_SCORE);
        if !range.contains(&self.overall_score) {
            return Err(JudgmentError::OverallOutOfRange(self.overall_score));
        }
        self.criteria.iter().try_for_each(CriterionResult::validate)
    }
}

fn check_score(criterion: &str, score: u8) -> Result<(), JudgmentError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(JudgmentError::ScoreOutOfRange {
            criterion: criterion.to_string(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opinion(judge: Judge, score: u8) -> JudicialOpinion {
        JudicialOpinion {
            judge,
            criterion_id: "git_forensic_analysis".into(),
            score,
            argument: "see history".into(),
            cited_evidence: vec!["abc123".into()],
        }
    }

    fn criterion(scores: &[(Judge, u8)], dissent: Option<&str>) -> CriterionResult {
        CriterionResult {
            dimension_id: "git_forensic_analysis".into(),
            dimension_name: "Git Forensic Analysis".into(),
            final_score: 3,
            judge_opinions: scores.iter().map(|(j, s)| opinion(*j, *s)).collect(),
            dissent_summary: dissent.map(String::from),
            remediation: "split commits in src/graph.py".into(),
        }
    }

    #[test]
    fn wide_spread_requires_dissent() {
        let c = criterion(&[(Judge::Prosecutor, 1), (Judge::Defense, 5)], None);
        assert_eq!(c.score_spread(), 4);
        assert!(matches!(
            c.validate(),
            Err(JudgmentError::MissingDissent { spread: 4, .. })
        ));

        let c = criterion(
            &[(Judge::Prosecutor, 1), (Judge::Defense, 5)],
            Some("defense credits the commit cadence"),
        );
        assert!(c.validate().is_ok());
    }

    #[test]
    fn spread_of_two_needs_no_dissent() {
        let c = criterion(
            &[(Judge::Prosecutor, 2), (Judge::Defense, 4), (Judge::TechLead, 3)],
            None,
        );
        assert!(!c.requires_dissent());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn scores_out_of_range_are_rejected() {
        assert!(opinion(Judge::TechLead, 0).validate().is_err());
        assert!(opinion(Judge::TechLead, 6).validate().is_err());

        let report = AuditReport {
            repo_url: "https://example.invalid/repo.git".into(),
            executive_summary: "ok".into(),
            overall_score: 5.5,
            criteria: vec![],
            remediation_plan: "none".into(),
        };
        assert!(matches!(
            report.validate(),
            Err(JudgmentError::OverallOutOfRange(_))
        ));
    }
}
