//! Shared test utilities for worker pool and pipeline tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use siteaudit::domain::{DomEvidence, FindingSeverity, ProgressEvent, RuleFinding, RuleFindings};
use siteaudit::pool::PageAuditor;

/// Canned behavior for one url
#[derive(Clone, Default)]
pub struct StubPage {
    /// Rule ids reported as violations
    pub violations: Vec<&'static str>,

    /// Rule ids reported as passes
    pub passes: Vec<&'static str>,

    /// DOM evidence returned for the page
    pub dom: DomEvidence,

    /// Fail the audit with a navigation error
    pub fail: bool,

    /// Never return, to exercise the page timeout
    pub hang: bool,
}

impl StubPage {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn violating(rule_ids: &[&'static str]) -> Self {
        Self {
            violations: rule_ids.to_vec(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_dom(mut self, dom: DomEvidence) -> Self {
        self.dom = dom;
        self
    }
}

/// Scripted `PageAuditor` that records the concurrency it observes.
///
/// Urls without a scripted page behave as passing pages with no findings.
#[derive(Default)]
pub struct StubAuditor {
    pages: HashMap<String, StubPage>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each page audit open for `delay`, so concurrency is observable
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page(mut self, url: &str, page: StubPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Highest number of simultaneously in-flight page audits seen
    pub fn max_observed(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted(&self, url: &str) -> StubPage {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}

fn findings(rule_ids: &[&'static str]) -> Vec<RuleFinding> {
    rule_ids
        .iter()
        .map(|id| RuleFinding::new(*id, FindingSeverity::Serious))
        .collect()
}

#[async_trait]
impl PageAuditor for StubAuditor {
    async fn analyze_page(&self, url: &str) -> Result<RuleFindings> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let page = self.scripted(url);
        if page.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if page.fail {
            return Err(anyhow!("navigation failed: {url}"));
        }
        Ok(RuleFindings {
            violations: findings(&page.violations),
            passes: findings(&page.passes),
            incomplete: Vec::new(),
        })
    }

    async fn collect_evidence(&self, url: &str) -> Result<DomEvidence> {
        Ok(self.scripted(url).dom)
    }
}

/// Drain the event stream until the pool closes it
pub async fn collect_events(mut rx: UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
