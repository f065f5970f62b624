use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The policy by which raw per-page findings become a verdict for a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStrategy {
    /// Fail the page as soon as any associated rule reports a violation
    AnyViolation,
    /// Pass only when every associated rule reports a pass
    AllPass,
    /// Never decided automatically; always routed to human review
    ManualOnly,
}

impl std::fmt::Display for EvalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalStrategy::AnyViolation => write!(f, "any_violation"),
            EvalStrategy::AllPass => write!(f, "all_pass"),
            EvalStrategy::ManualOnly => write!(f, "manual_only"),
        }
    }
}

/// Verdict for one criterion, per page or aggregated across the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionStatus {
    /// At least one associated rule failed
    Violation,
    /// The rule engine could not decide; needs a follow-up check
    Incomplete,
    /// Requires human review
    Manual,
    /// All associated checks passed
    Pass,
}

impl std::fmt::Display for CriterionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriterionStatus::Violation => write!(f, "violation"),
            CriterionStatus::Incomplete => write!(f, "incomplete"),
            CriterionStatus::Manual => write!(f, "manual"),
            CriterionStatus::Pass => write!(f, "pass"),
        }
    }
}

/// One named, independently evaluable accessibility rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    /// Stable identifier (e.g., "img-alt")
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Grouping theme (e.g., "images", "links", "structure")
    pub theme: String,

    /// How findings are turned into a verdict
    pub strategy: EvalStrategy,

    /// Rule-engine ids whose findings feed this criterion
    #[serde(default)]
    pub rule_ids: BTreeSet<String>,

    /// Evidence flag ids that attach supporting detail for reviewers
    #[serde(default)]
    pub evidence_flags: BTreeSet<String>,

    /// Reviewer-facing notes
    #[serde(default)]
    pub notes: String,
}

impl Criterion {
    /// Whether automated evaluation ever produces a verdict for this criterion
    pub fn is_automated(&self) -> bool {
        self.strategy != EvalStrategy::ManualOnly
    }
}
