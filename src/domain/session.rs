use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageResult;

/// Durable, crash-recoverable record of one audit run.
///
/// Invariant: `completed_pages` and `pending_pages` partition the original
/// URL set at all times, and `results` has an entry for every completed url.
/// The worker pool mutates the session through [`complete_page`] only and
/// checkpoints it after every mutation.
///
/// [`complete_page`]: AuditSession::complete_page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSession {
    pub session_id: String,

    pub started_at: DateTime<Utc>,

    /// Number of urls the run was started with
    pub total_pages: usize,

    /// Completion order, not input order
    pub completed_pages: Vec<String>,

    pub pending_pages: BTreeSet<String>,

    pub results: HashMap<String, PageResult>,
}

impl AuditSession {
    /// Start a fresh session over a deduplicated url list
    pub fn new(session_id: impl Into<String>, urls: &[String]) -> Self {
        let pending_pages: BTreeSet<String> = urls.iter().cloned().collect();
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            total_pages: pending_pages.len(),
            completed_pages: Vec::new(),
            pending_pages,
            results: HashMap::new(),
        }
    }

    /// Generate a fresh session identifier
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Record a finished page, preserving the pending/completed partition.
    ///
    /// A result for a url that is not pending (already completed, or never
    /// part of this session) is ignored.
    pub fn complete_page(&mut self, result: PageResult) {
        if self.pending_pages.remove(&result.url) {
            self.completed_pages.push(result.url.clone());
            self.results.insert(result.url.clone(), result);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending_pages.is_empty()
    }

    /// Pages audited so far, successful or not
    pub fn completed_count(&self) -> usize {
        self.completed_pages.len()
    }

    /// Pages whose audit failed
    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|r| r.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PageEvidence;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_session_partitions_urls() {
        let session = AuditSession::new("s1", &urls(&["a", "b", "c"]));
        assert_eq!(session.total_pages, 3);
        assert_eq!(session.pending_pages.len(), 3);
        assert!(session.completed_pages.is_empty());
        assert!(!session.is_complete());
    }

    #[test]
    fn test_complete_page_moves_url_and_stores_result() {
        let mut session = AuditSession::new("s1", &urls(&["a", "b"]));
        session.complete_page(PageResult::ok("b", PageEvidence::default()));

        assert_eq!(session.completed_pages, vec!["b".to_string()]);
        assert_eq!(session.pending_pages.len(), 1);
        assert!(session.results.contains_key("b"));
        assert_eq!(session.completed_count(), 1);
        assert_eq!(session.failed_count(), 0);
    }

    #[test]
    fn test_complete_page_ignores_unknown_and_repeated_urls() {
        let mut session = AuditSession::new("s1", &urls(&["a"]));
        session.complete_page(PageResult::failed("a", "timeout"));
        session.complete_page(PageResult::ok("a", PageEvidence::default()));
        session.complete_page(PageResult::ok("zzz", PageEvidence::default()));

        assert_eq!(session.completed_pages.len(), 1);
        assert_eq!(session.results.len(), 1);
        assert!(session.results["a"].is_failed());
        assert_eq!(session.failed_count(), 1);
        assert!(session.is_complete());
    }
}
