use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PageResult;

/// Final tallies for one audit run, carried by the terminal event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_pages: usize,

    /// Pages audited, successful or not
    pub completed: usize,

    /// Pages whose audit failed
    pub failed: usize,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

/// Progress notification emitted by the worker pool.
///
/// Events for the same url are strictly ordered (`PageStart` before its
/// terminal event); events for different urls interleave across workers.
/// `AuditComplete` is always the last event of a stream. Serialized with a
/// `type` discriminator so each event maps onto one transport message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A worker picked up the page
    PageStart { url: String },

    /// The page was audited successfully
    PageComplete { url: String, result: PageResult },

    /// The page could not be audited
    PageError { url: String, error: String },

    /// Terminal event; always last
    AuditComplete { summary: AuditSummary },
}

impl ProgressEvent {
    /// The url this event concerns, if it is page-scoped
    pub fn url(&self) -> Option<&str> {
        match self {
            ProgressEvent::PageStart { url }
            | ProgressEvent::PageComplete { url, .. }
            | ProgressEvent::PageError { url, .. } => Some(url),
            ProgressEvent::AuditComplete { .. } => None,
        }
    }

    /// Whether this is a per-page terminal event (complete or error)
    pub fn is_page_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::PageComplete { .. } | ProgressEvent::PageError { .. }
        )
    }
}
