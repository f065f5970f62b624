//! Cross-page aggregation
//!
//! Folds per-page classifications into one whole-audit verdict per catalog
//! criterion, detects cross-page duplicate evidence that no single page can
//! reveal, ranks the worst issues, and assembles the final report object for
//! the rendering layer.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use crate::catalog::CriterionCatalog;
use crate::domain::{
    AggregatedCriterion, AuditSession, CriterionStatus, DuplicateLabel, DuplicateOccurrence,
    ManualCheck, PageClassification, PageEvidence, Report, ReportMeta, TopIssue, COVERAGE_NOTICE,
    LINK_LABEL_DUPLICATE_FLAG,
};
use crate::evaluator;

/// Most criteria listed in the ranked top-issues section
pub const TOP_ISSUE_LIMIT: usize = 5;

/// One page's inputs to aggregation
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: String,

    /// Per-criterion verdicts for this page
    pub classifications: Vec<PageClassification>,

    /// Raw evidence enables cross-page correlation; None skips this page
    pub evidence: Option<PageEvidence>,
}

/// Aggregate per-page outcomes into the final report.
///
/// The result is total over the catalog: every criterion appears exactly
/// once, regardless of how many pages were audited (including zero).
pub fn aggregate(catalog: &CriterionCatalog, site_url: &str, pages: &[PageOutcome]) -> Report {
    let mut aggregates: Vec<AggregatedCriterion> = catalog
        .iter()
        .map(|c| AggregatedCriterion {
            criterion_id: c.id.clone(),
            title: c.title.clone(),
            theme: c.theme.clone(),
            status: CriterionStatus::Pass,
            pages_violating: BTreeSet::new(),
            pages_passing: BTreeSet::new(),
            pages_manual: BTreeSet::new(),
            pages_incomplete: BTreeSet::new(),
        })
        .collect();
    let index: HashMap<&str, usize> = catalog
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.id.as_str(), idx))
        .collect();

    for page in pages {
        for classification in &page.classifications {
            let Some(&idx) = index.get(classification.criterion_id.as_str()) else {
                continue;
            };
            let agg = &mut aggregates[idx];
            let set = match classification.status {
                CriterionStatus::Violation => &mut agg.pages_violating,
                CriterionStatus::Incomplete => &mut agg.pages_incomplete,
                CriterionStatus::Manual => &mut agg.pages_manual,
                CriterionStatus::Pass => &mut agg.pages_passing,
            };
            set.insert(page.url.clone());
        }
    }

    for agg in &mut aggregates {
        agg.status = resolve_status(agg);
    }

    let duplicate_labels = detect_duplicate_labels(pages);
    apply_duplicate_labels(catalog, &mut aggregates, &duplicate_labels);

    let top_issues = rank_top_issues(&aggregates);
    let manual_checklist = catalog
        .iter()
        .filter(|c| !c.is_automated())
        .map(|c| ManualCheck {
            criterion_id: c.id.clone(),
            title: c.title.clone(),
            theme: c.theme.clone(),
            notes: c.notes.clone(),
        })
        .collect();

    Report {
        meta: ReportMeta {
            site_url: site_url.to_string(),
            audited_at: Utc::now(),
            page_count: pages.len(),
            themes: catalog.themes(),
            total_criteria: catalog.len(),
            covered_criteria: catalog.automated_count(),
        },
        coverage_notice: COVERAGE_NOTICE.to_string(),
        criteria: aggregates,
        top_issues,
        duplicate_labels,
        manual_checklist,
    }
}

/// Evaluate and aggregate everything a finished (or partial) session produced
pub fn report_for_session(
    catalog: &CriterionCatalog,
    session: &AuditSession,
    site_url: &str,
) -> Report {
    let pages: Vec<PageOutcome> = session
        .completed_pages
        .iter()
        .filter_map(|url| session.results.get(url))
        .map(|result| PageOutcome {
            url: result.url.clone(),
            classifications: evaluator::evaluate_page(catalog, result.evidence.as_ref()),
            evidence: result.evidence.clone(),
        })
        .collect();
    aggregate(catalog, site_url, &pages)
}

/// Status precedence after folding: violation, then incomplete, then manual
/// (only when nothing passed), then pass. All-empty sets mean no page was
/// audited and the initialized pass stands.
fn resolve_status(agg: &AggregatedCriterion) -> CriterionStatus {
    if !agg.pages_violating.is_empty() {
        CriterionStatus::Violation
    } else if !agg.pages_incomplete.is_empty() {
        CriterionStatus::Incomplete
    } else if !agg.pages_manual.is_empty() && agg.pages_passing.is_empty() {
        CriterionStatus::Manual
    } else {
        CriterionStatus::Pass
    }
}

/// Case-insensitive, whitespace-trimmed accessible label
fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Group link evidence across every page by normalized label; a label whose
/// targets resolve to more than one distinct destination is a duplicate.
fn detect_duplicate_labels(pages: &[PageOutcome]) -> Vec<DuplicateLabel> {
    struct Group {
        destinations: BTreeSet<String>,
        occurrences: Vec<DuplicateOccurrence>,
    }

    let mut groups: HashMap<String, Group> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for page in pages {
        let Some(dom) = page.evidence.as_ref().and_then(|e| e.dom.as_ref()) else {
            continue;
        };
        for link in &dom.links {
            let label = normalize_label(&link.label);
            if label.is_empty() {
                continue;
            }
            let group = groups.entry(label.clone()).or_insert_with(|| {
                order.push(label.clone());
                Group {
                    destinations: BTreeSet::new(),
                    occurrences: Vec::new(),
                }
            });
            group.destinations.insert(link.href.trim().to_string());
            group.occurrences.push(DuplicateOccurrence {
                page: page.url.clone(),
                selector: link.selector.clone(),
                href: link.href.clone(),
            });
        }
    }

    order
        .into_iter()
        .filter_map(|label| {
            let group = groups.remove(&label)?;
            (group.destinations.len() > 1).then(|| DuplicateLabel {
                label,
                destinations: group.destinations,
                occurrences: group.occurrences,
            })
        })
        .collect()
}

/// Fold duplicate-label findings into the criteria owning the flag.
///
/// A criterion that was passing is upgraded to violation; criteria already
/// violating collect the involved pages as well. Manual and incomplete
/// verdicts keep their status - the annotation still ships in the report.
fn apply_duplicate_labels(
    catalog: &CriterionCatalog,
    aggregates: &mut [AggregatedCriterion],
    duplicates: &[DuplicateLabel],
) {
    if duplicates.is_empty() {
        return;
    }

    let involved: BTreeSet<String> = duplicates
        .iter()
        .flat_map(|d| d.occurrences.iter().map(|o| o.page.clone()))
        .collect();
    tracing::info!(
        labels = duplicates.len(),
        pages = involved.len(),
        "duplicate link labels detected across pages"
    );

    for (criterion, agg) in catalog.iter().zip(aggregates.iter_mut()) {
        if !criterion.evidence_flags.contains(LINK_LABEL_DUPLICATE_FLAG) {
            continue;
        }
        if agg.status == CriterionStatus::Pass {
            agg.status = CriterionStatus::Violation;
        }
        if agg.status == CriterionStatus::Violation {
            agg.pages_passing.retain(|url| !involved.contains(url));
            agg.pages_violating.extend(involved.iter().cloned());
        }
    }
}

/// Criteria with at least one violating page, worst first; ties keep catalog
/// order (stable sort), truncated to [`TOP_ISSUE_LIMIT`]
fn rank_top_issues(aggregates: &[AggregatedCriterion]) -> Vec<TopIssue> {
    let mut issues: Vec<TopIssue> = aggregates
        .iter()
        .filter(|a| !a.pages_violating.is_empty())
        .map(|a| TopIssue {
            criterion_id: a.criterion_id.clone(),
            title: a.title.clone(),
            violating_page_count: a.pages_violating.len(),
        })
        .collect();
    issues.sort_by(|a, b| b.violating_page_count.cmp(&a.violating_page_count));
    issues.truncate(TOP_ISSUE_LIMIT);
    issues
}
