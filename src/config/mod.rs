//! Audit limits configuration
//!
//! The knobs the embedding process may set before starting a run: page
//! ceiling, requested worker concurrency, per-page timeout. Values are
//! validated and clamped into safe ranges before they reach the worker
//! pool.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pool::{PoolOptions, MAX_WORKERS};

/// Most pages one audit run may visit
pub const MAX_PAGE_CEILING: usize = 200;

/// Longest allowed per-page budget in seconds
pub const MAX_PAGE_TIMEOUT_SECS: u64 = 120;

/// Tunable limits for one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLimits {
    /// Pages beyond this count are dropped from the audit
    pub max_pages: usize,

    /// Requested worker count; the pool enforces its own hard ceiling too
    pub concurrency: usize,

    /// Per-page budget covering navigation and evidence extraction
    pub page_timeout_secs: u64,
}

impl Default for AuditLimits {
    fn default() -> Self {
        Self {
            max_pages: 25,
            concurrency: 2,
            page_timeout_secs: 30,
        }
    }
}

impl AuditLimits {
    /// Load limits from a TOML file and clamp them into range
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read limits file: {}", path.display()))?;
        let limits: AuditLimits = toml::from_str(&content)
            .with_context(|| format!("Failed to parse limits file: {}", path.display()))?;
        Ok(limits.validated())
    }

    /// Clamp every field into its allowed range, logging adjustments
    pub fn validated(mut self) -> Self {
        let max_pages = self.max_pages.clamp(1, MAX_PAGE_CEILING);
        if max_pages != self.max_pages {
            tracing::warn!(
                requested = self.max_pages,
                clamped = max_pages,
                "max_pages out of range"
            );
            self.max_pages = max_pages;
        }

        let concurrency = self.concurrency.clamp(1, MAX_WORKERS);
        if concurrency != self.concurrency {
            tracing::warn!(
                requested = self.concurrency,
                clamped = concurrency,
                "concurrency out of range"
            );
            self.concurrency = concurrency;
        }

        let page_timeout_secs = self.page_timeout_secs.clamp(1, MAX_PAGE_TIMEOUT_SECS);
        if page_timeout_secs != self.page_timeout_secs {
            tracing::warn!(
                requested = self.page_timeout_secs,
                clamped = page_timeout_secs,
                "page_timeout_secs out of range"
            );
            self.page_timeout_secs = page_timeout_secs;
        }

        self
    }

    /// Apply the page ceiling to a discovered url list
    pub fn truncate_urls(&self, mut urls: Vec<String>) -> Vec<String> {
        if urls.len() > self.max_pages {
            tracing::warn!(
                discovered = urls.len(),
                max_pages = self.max_pages,
                "truncating url list to page ceiling"
            );
            urls.truncate(self.max_pages);
        }
        urls
    }

    /// Pool tuning derived from these limits
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            concurrency: self.concurrency,
            page_timeout: Duration::from_secs(self.page_timeout_secs),
        }
    }
}
