use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CriterionStatus;

/// Fixed wording included in every report.
pub const COVERAGE_NOTICE: &str = "Automated checks cover only a subset of accessibility \
requirements. Criteria listed in the manual checklist were not evaluated automatically; a \
conforming audit additionally requires human review of every page.";

/// Whole-audit verdict for one criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedCriterion {
    pub criterion_id: String,

    pub title: String,

    pub theme: String,

    pub status: CriterionStatus,

    #[serde(default)]
    pub pages_violating: BTreeSet<String>,

    #[serde(default)]
    pub pages_passing: BTreeSet<String>,

    #[serde(default)]
    pub pages_manual: BTreeSet<String>,

    #[serde(default)]
    pub pages_incomplete: BTreeSet<String>,
}

/// One ranked entry of the top-issues list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopIssue {
    pub criterion_id: String,

    pub title: String,

    /// Distinct pages with a violation for this criterion
    pub violating_page_count: usize,
}

/// Where one duplicate-labelled link occurs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateOccurrence {
    /// Page the element was found on
    pub page: String,

    /// CSS selector locating the element
    pub selector: String,

    /// Destination as written in the document
    pub href: String,
}

/// A link label used for more than one destination across the site.
///
/// Invisible from any single page's evidence; materialized during
/// aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateLabel {
    /// Normalized accessible label shared by the elements
    pub label: String,

    /// Distinct destinations the label resolves to
    pub destinations: BTreeSet<String>,

    /// Every element carrying the label, on every page
    pub occurrences: Vec<DuplicateOccurrence>,
}

/// Criterion automation never decides, listed for the human checklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualCheck {
    pub criterion_id: String,

    pub title: String,

    pub theme: String,

    #[serde(default)]
    pub notes: String,
}

/// Report header data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Site the audit was run against
    pub site_url: String,

    pub audited_at: DateTime<Utc>,

    /// Pages that went into this report
    pub page_count: usize,

    /// Themes the catalog covers, in catalog order
    pub themes: Vec<String>,

    pub total_criteria: usize,

    /// Criteria with an automated strategy
    pub covered_criteria: usize,
}

/// Terminal artifact of an audit, handed to the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,

    /// Always [`COVERAGE_NOTICE`]
    pub coverage_notice: String,

    /// One entry per catalog criterion, catalog order
    pub criteria: Vec<AggregatedCriterion>,

    /// Criteria with violations, ranked by violating-page count
    pub top_issues: Vec<TopIssue>,

    /// Same-label-different-destination links found across pages
    #[serde(default)]
    pub duplicate_labels: Vec<DuplicateLabel>,

    /// Criteria requiring human review on every page
    pub manual_checklist: Vec<ManualCheck>,
}
