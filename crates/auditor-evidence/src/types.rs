//! Evidence Contract
//!
//! The atomic unit of findings: one collector's answer for one audit goal.
//! Records are validated on construction and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Identifier of an audit dimension (rubric criterion).
pub type GoalId = String;

/// Errors raised when an Evidence record violates the data model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvidenceError {
    #[error("evidence goal must not be empty")]
    EmptyGoal,

    #[error("evidence rationale must not be empty (goal: {goal})")]
    EmptyRationale { goal: String },

    #[error("confidence {value} outside [0.0, 1.0] (goal: {goal})")]
    ConfidenceOutOfRange { goal: String, value: f64 },
}

/// A single collector's finding for one goal, with provenance and confidence.
///
/// `found` and `confidence` are expected to agree with the producing
/// collector's declared policy (a negative finding carries low confidence).
/// That pairing is a collector contract and is not checked here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// Audit dimension this evidence addresses.
    pub goal: GoalId,

    /// Whether the collector located supporting material.
    pub found: bool,

    /// Supporting excerpt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Origin reference used for citation: file path, commit hash or source handle.
    pub location: String,

    /// Justification for the confidence value.
    pub rationale: String,

    /// Certainty in `found`, within [0.0, 1.0].
    pub confidence: f64,
}

impl Evidence {
    /// Build a validated Evidence record.
    pub fn new(
        goal: impl Into<GoalId>,
        found: bool,
        content: Option<String>,
        location: impl Into<String>,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, EvidenceError> {
        let evidence = Self {
            goal: goal.into(),
            found,
            content,
            location: location.into(),
            rationale: rationale.into(),
            confidence,
        };
        evidence.validate()?;
        Ok(evidence)
    }

    /// Check the structural invariants of the record.
    ///
    /// Deserialized records bypass [`Evidence::new`], so artifact readers call
    /// this explicitly.
    pub fn validate(&self) -> Result<(), EvidenceError> {
        if self.goal.trim().is_empty() {
            return Err(EvidenceError::EmptyGoal);
        }
        if self.rationale.trim().is_empty() {
            return Err(EvidenceError::EmptyRationale {
                goal: self.goal.clone(),
            });
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(EvidenceError::ConfidenceOutOfRange {
                goal: self.goal.clone(),
                value: self.confidence,
            });
        }
        Ok(())
    }
}
