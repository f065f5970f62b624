use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CriterionStatus, EvidenceItem, PageEvidence, RuleFinding};

/// Outcome of auditing a single page.
///
/// Exactly one of `evidence`/`error` is meaningfully populated; the
/// constructors are the only way this type is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,

    /// When the audit of this page finished
    pub audited_at: DateTime<Utc>,

    /// Raw evidence; None when the page could not be audited
    pub evidence: Option<PageEvidence>,

    /// Failure description; set exactly when evidence is absent
    pub error: Option<String>,
}

impl PageResult {
    /// A successfully audited page
    pub fn ok(url: impl Into<String>, evidence: PageEvidence) -> Self {
        Self {
            url: url.into(),
            audited_at: Utc::now(),
            evidence: Some(evidence),
            error: None,
        }
    }

    /// A page that could not be audited (navigation error, timeout, extraction error)
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            audited_at: Utc::now(),
            evidence: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One criterion's verdict for one page.
///
/// Derived by the evaluator, held in memory only for the duration of
/// aggregation; persisted state carries the raw `PageResult` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageClassification {
    pub criterion_id: String,

    pub status: CriterionStatus,

    /// Rule-engine violations matched to this criterion
    #[serde(default)]
    pub matched_violations: Vec<RuleFinding>,

    /// Incomplete findings matched to this criterion
    #[serde(default)]
    pub matched_incomplete: Vec<RuleFinding>,

    /// DOM evidence attached as supporting detail
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
}
