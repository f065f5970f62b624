//! Criterion evaluation
//!
//! Pure classification of one page's raw evidence against the catalog.
//! No IO and no async: the worker pool gathers evidence, this module turns
//! it into verdicts. Absence of evidence is never an error - a page that
//! failed to load degrades every criterion to a manual check.

use std::collections::BTreeSet;

use crate::catalog::CriterionCatalog;
use crate::domain::{
    Criterion, CriterionStatus, DomEvidence, EvalStrategy, EvidenceItem, PageClassification,
    PageEvidence, RuleFinding,
};

/// Classify one page against a single criterion.
pub fn evaluate(criterion: &Criterion, evidence: Option<&PageEvidence>) -> PageClassification {
    let attached = evidence
        .and_then(|e| e.dom.as_ref())
        .map(|dom| collect_evidence_items(criterion, dom))
        .unwrap_or_default();

    // No evidence at all (page failed to load): never fabricate a verdict.
    let Some(evidence) = evidence else {
        return manual(criterion, attached);
    };

    if criterion.strategy == EvalStrategy::ManualOnly {
        return manual(criterion, attached);
    }

    let rules = evidence.rules.as_ref();
    let matched_violations = matched(rules.map(|r| r.violations.as_slice()), criterion);
    let matched_incomplete = matched(rules.map(|r| r.incomplete.as_slice()), criterion);

    let status = if !matched_violations.is_empty() {
        CriterionStatus::Violation
    } else {
        match criterion.strategy {
            EvalStrategy::AnyViolation => {
                if matched_incomplete.is_empty() {
                    CriterionStatus::Pass
                } else {
                    CriterionStatus::Incomplete
                }
            }
            EvalStrategy::AllPass => {
                let passed: BTreeSet<&str> = rules
                    .map(|r| r.passes.iter().map(|f| f.rule_id.as_str()).collect())
                    .unwrap_or_default();
                if criterion.rule_ids.iter().all(|id| passed.contains(id.as_str())) {
                    CriterionStatus::Pass
                } else {
                    CriterionStatus::Incomplete
                }
            }
            // Handled by the early return above
            EvalStrategy::ManualOnly => CriterionStatus::Manual,
        }
    };

    PageClassification {
        criterion_id: criterion.id.clone(),
        status,
        matched_violations,
        matched_incomplete,
        evidence: attached,
    }
}

/// Classify one page against every catalog entry, in catalog order
pub fn evaluate_page(
    catalog: &CriterionCatalog,
    evidence: Option<&PageEvidence>,
) -> Vec<PageClassification> {
    catalog.iter().map(|c| evaluate(c, evidence)).collect()
}

fn manual(criterion: &Criterion, attached: Vec<EvidenceItem>) -> PageClassification {
    PageClassification {
        criterion_id: criterion.id.clone(),
        status: CriterionStatus::Manual,
        matched_violations: Vec::new(),
        matched_incomplete: Vec::new(),
        evidence: attached,
    }
}

fn matched(findings: Option<&[RuleFinding]>, criterion: &Criterion) -> Vec<RuleFinding> {
    findings
        .map(|list| {
            list.iter()
                .filter(|f| criterion.rule_ids.contains(&f.rule_id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Evidence elements whose flags intersect the criterion's flag set
fn collect_evidence_items(criterion: &Criterion, dom: &DomEvidence) -> Vec<EvidenceItem> {
    let matches = |flags: &[String]| flags.iter().any(|f| criterion.evidence_flags.contains(f));

    let mut items = Vec::new();
    for image in &dom.images {
        if matches(&image.flags) {
            items.push(EvidenceItem::Image(image.clone()));
        }
    }
    for link in &dom.links {
        if matches(&link.flags) {
            items.push(EvidenceItem::Link(link.clone()));
        }
    }
    for heading in &dom.headings {
        if matches(&heading.flags) {
            items.push(EvidenceItem::Heading(heading.clone()));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FindingSeverity, ImageEvidence, RuleFindings};

    fn criterion(strategy: EvalStrategy, rule_ids: &[&str], flags: &[&str]) -> Criterion {
        Criterion {
            id: "test-criterion".to_string(),
            title: "Test criterion".to_string(),
            theme: "test".to_string(),
            strategy,
            rule_ids: rule_ids.iter().map(|s| s.to_string()).collect(),
            evidence_flags: flags.iter().map(|s| s.to_string()).collect(),
            notes: String::new(),
        }
    }

    fn finding(rule_id: &str) -> RuleFinding {
        RuleFinding::new(rule_id, FindingSeverity::Serious)
    }

    fn evidence_with_rules(rules: RuleFindings) -> PageEvidence {
        PageEvidence {
            rules: Some(rules),
            dom: None,
        }
    }

    #[test]
    fn test_absent_evidence_is_manual_for_every_strategy() {
        for strategy in [
            EvalStrategy::AnyViolation,
            EvalStrategy::AllPass,
            EvalStrategy::ManualOnly,
        ] {
            let c = criterion(strategy, &["image-alt"], &[]);
            let classification = evaluate(&c, None);
            assert_eq!(classification.status, CriterionStatus::Manual);
            assert!(classification.matched_violations.is_empty());
        }
    }

    #[test]
    fn test_manual_only_ignores_findings_but_attaches_evidence() {
        let c = criterion(EvalStrategy::ManualOnly, &["image-alt"], &["image-empty-alt"]);
        let evidence = PageEvidence {
            rules: Some(RuleFindings {
                violations: vec![finding("image-alt")],
                ..Default::default()
            }),
            dom: Some(DomEvidence {
                images: vec![ImageEvidence {
                    selector: "img.logo".to_string(),
                    src: "/logo.png".to_string(),
                    alt: Some(String::new()),
                    flags: vec!["image-empty-alt".to_string()],
                }],
                ..Default::default()
            }),
        };

        let classification = evaluate(&c, Some(&evidence));
        assert_eq!(classification.status, CriterionStatus::Manual);
        assert_eq!(classification.evidence.len(), 1);
    }

    #[test]
    fn test_any_violation_matching() {
        let c = criterion(EvalStrategy::AnyViolation, &["image-alt"], &[]);

        // Matching violation wins
        let violating = evidence_with_rules(RuleFindings {
            violations: vec![finding("image-alt")],
            ..Default::default()
        });
        assert_eq!(
            evaluate(&c, Some(&violating)).status,
            CriterionStatus::Violation
        );

        // Matching rule only in passes
        let passing = evidence_with_rules(RuleFindings {
            passes: vec![finding("image-alt")],
            ..Default::default()
        });
        assert_eq!(evaluate(&c, Some(&passing)).status, CriterionStatus::Pass);

        // No matching rule present at all: default is pass, not incomplete
        let unrelated = evidence_with_rules(RuleFindings {
            violations: vec![finding("color-contrast")],
            ..Default::default()
        });
        assert_eq!(evaluate(&c, Some(&unrelated)).status, CriterionStatus::Pass);

        // Matching incomplete finding, no violation
        let undecided = evidence_with_rules(RuleFindings {
            incomplete: vec![finding("image-alt")],
            ..Default::default()
        });
        assert_eq!(
            evaluate(&c, Some(&undecided)).status,
            CriterionStatus::Incomplete
        );
    }

    #[test]
    fn test_all_pass_requires_every_rule() {
        let c = criterion(EvalStrategy::AllPass, &["html-has-lang", "html-lang-valid"], &[]);

        let both = evidence_with_rules(RuleFindings {
            passes: vec![finding("html-has-lang"), finding("html-lang-valid")],
            ..Default::default()
        });
        assert_eq!(evaluate(&c, Some(&both)).status, CriterionStatus::Pass);

        let one = evidence_with_rules(RuleFindings {
            passes: vec![finding("html-has-lang")],
            ..Default::default()
        });
        assert_eq!(evaluate(&c, Some(&one)).status, CriterionStatus::Incomplete);

        // A matched violation wins immediately
        let violated = evidence_with_rules(RuleFindings {
            violations: vec![finding("html-lang-valid")],
            passes: vec![finding("html-has-lang")],
            ..Default::default()
        });
        assert_eq!(
            evaluate(&c, Some(&violated)).status,
            CriterionStatus::Violation
        );
    }

    #[test]
    fn test_evidence_collection_never_fails_on_empty_categories() {
        let c = criterion(EvalStrategy::AnyViolation, &["link-name"], &["link-empty-label"]);
        let evidence = PageEvidence {
            rules: None,
            dom: Some(DomEvidence::default()),
        };
        let classification = evaluate(&c, Some(&evidence));
        assert_eq!(classification.status, CriterionStatus::Pass);
        assert!(classification.evidence.is_empty());
    }

    #[test]
    fn test_evaluate_page_is_total_over_catalog() {
        let catalog = CriterionCatalog::load().expect("embedded catalog");
        let classifications = evaluate_page(&catalog, None);
        assert_eq!(classifications.len(), catalog.len());
        assert!(
            classifications
                .iter()
                .all(|c| c.status == CriterionStatus::Manual)
        );
    }
}
