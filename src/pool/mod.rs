//! Audit worker pool
//!
//! Drives page audits across a url list with bounded concurrency. A fixed
//! set of long-lived workers pulls from one shared FIFO queue; each finished
//! page is folded into the session, checkpointed to disk, and announced on
//! the event channel before the worker picks up the next url. One page's
//! failure never aborts the run - it becomes a failed result and a
//! `PageError` event. Only a checkpoint write failure is fatal, since losing
//! crash-recovery state silently is unacceptable.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::domain::{
    AuditSession, AuditSummary, DomEvidence, PageEvidence, PageResult, ProgressEvent, RuleFindings,
};
use crate::store::SessionStore;

/// Hard ceiling on simultaneous page audits. Each worker drives a browser
/// context; more than a handful overwhelms the host machine.
pub const MAX_WORKERS: usize = 3;

/// Evidence-extraction collaborator: navigates to a page and produces raw
/// rule-engine findings plus structured DOM evidence. Implemented outside
/// the core by the browser driver; stubbed in tests.
#[async_trait]
pub trait PageAuditor: Send + Sync {
    /// Run the accessibility rule engine against the page
    async fn analyze_page(&self, url: &str) -> Result<RuleFindings>;

    /// Collect image/link/heading evidence from the DOM
    async fn collect_evidence(&self, url: &str) -> Result<DomEvidence>;
}

/// Cooperative cancellation for a running audit.
///
/// Workers check the token before each dequeue: once cancelled, no further
/// url is picked up, while pages already in flight complete, checkpoint and
/// emit their terminal event as usual. The terminal `AuditComplete` still
/// arrives, carrying the partial counts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Worker pool tuning
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Requested number of workers; clamped to 1..=[`MAX_WORKERS`]
    pub concurrency: usize,

    /// Budget for one page: navigation plus evidence extraction
    pub page_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            concurrency: 2,
            page_timeout: Duration::from_secs(30),
        }
    }
}

/// A running audit: the event stream plus the supervisor handle.
///
/// The stream ends with exactly one `AuditComplete` unless a checkpoint
/// write failed; that failure resolves the handle with the error instead.
pub struct AuditRun {
    /// Progress events; closed after the terminal event
    pub events: UnboundedReceiver<ProgressEvent>,

    /// Resolves once every worker exited
    pub handle: JoinHandle<Result<AuditSummary>>,
}

/// Bounded pool of page-audit workers
pub struct AuditPool {
    auditor: Arc<dyn PageAuditor>,
    store: SessionStore,
    options: PoolOptions,
}

impl AuditPool {
    pub fn new(auditor: Arc<dyn PageAuditor>, store: SessionStore, options: PoolOptions) -> Self {
        Self {
            auditor,
            store,
            options,
        }
    }

    /// Start an audit over `urls`. Returns immediately; progress arrives on
    /// the event stream.
    pub fn run(
        &self,
        urls: Vec<String>,
        session_id: impl Into<String>,
        cancel: CancelToken,
    ) -> AuditRun {
        let session_id = session_id.into();
        let worker_count = self.options.concurrency.clamp(1, MAX_WORKERS);

        // First occurrence wins; the queue must never dispatch a url twice.
        let mut seen = HashSet::new();
        let urls: Vec<String> = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(tokio::sync::Mutex::new(AuditSession::new(
            &session_id,
            &urls,
        )));
        let queue: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(urls.into_iter().collect()));

        let handle = tokio::spawn(supervise(
            session_id,
            worker_count,
            queue,
            self.auditor.clone(),
            self.store.clone(),
            session,
            tx,
            self.options.page_timeout,
            cancel,
        ));

        AuditRun { events: rx, handle }
    }
}

#[allow(clippy::too_many_arguments)]
async fn supervise(
    session_id: String,
    worker_count: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    auditor: Arc<dyn PageAuditor>,
    store: SessionStore,
    session: Arc<tokio::sync::Mutex<AuditSession>>,
    tx: UnboundedSender<ProgressEvent>,
    page_timeout: Duration,
    cancel: CancelToken,
) -> Result<AuditSummary> {
    let started_at = Utc::now();
    {
        let session = session.lock().await;
        tracing::info!(
            session = %session_id,
            pages = session.total_pages,
            workers = worker_count,
            "starting audit"
        );
    }

    let workers: Vec<_> = (0..worker_count)
        .map(|worker_id| {
            tokio::spawn(worker_loop(
                worker_id,
                queue.clone(),
                auditor.clone(),
                store.clone(),
                session.clone(),
                tx.clone(),
                page_timeout,
                cancel.clone(),
            ))
        })
        .collect();

    for joined in join_all(workers).await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(session = %session_id, error = %err, "audit aborted");
                return Err(err);
            }
            Err(err) => return Err(anyhow!("audit worker panicked: {err}")),
        }
    }

    let summary = {
        let session = session.lock().await;
        AuditSummary {
            total_pages: session.total_pages,
            completed: session.completed_count(),
            failed: session.failed_count(),
            started_at,
            finished_at: Utc::now(),
        }
    };
    tracing::info!(
        session = %session_id,
        completed = summary.completed,
        failed = summary.failed,
        "audit finished"
    );
    let _ = tx.send(ProgressEvent::AuditComplete {
        summary: summary.clone(),
    });
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    auditor: Arc<dyn PageAuditor>,
    store: SessionStore,
    session: Arc<tokio::sync::Mutex<AuditSession>>,
    tx: UnboundedSender<ProgressEvent>,
    page_timeout: Duration,
    cancel: CancelToken,
) -> Result<()> {
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(worker_id, "cancelled, worker exiting");
            break;
        }

        let url = match queue.lock() {
            Ok(mut q) => q.pop_front(),
            Err(_) => None,
        };
        let Some(url) = url else { break };

        let _ = tx.send(ProgressEvent::PageStart { url: url.clone() });
        tracing::debug!(worker_id, url = %url, "auditing page");

        let result = audit_page(auditor.as_ref(), &url, page_timeout).await;

        {
            // Checkpoint before announcing the result, under the session
            // lock: a consumer must never see a completion the store does
            // not yet know about, and the written snapshot must match the
            // in-memory mutation that produced it.
            let mut session = session.lock().await;
            session.complete_page(result.clone());
            if let Err(err) = store.save(&session) {
                cancel.cancel();
                return Err(err).with_context(|| {
                    format!("checkpoint write failed for session {}", session.session_id)
                });
            }
        }

        match result.error.clone() {
            None => {
                let _ = tx.send(ProgressEvent::PageComplete { url, result });
            }
            Some(error) => {
                tracing::warn!(url = %url, error = %error, "page audit failed");
                let _ = tx.send(ProgressEvent::PageError { url, error });
            }
        }
    }
    Ok(())
}

/// Run one page audit under the page timeout. Failures of any kind
/// (navigation, extraction, timeout) are captured as a failed result; this
/// function never errors out of the worker.
async fn audit_page(auditor: &dyn PageAuditor, url: &str, page_timeout: Duration) -> PageResult {
    let extraction = async {
        let rules = auditor.analyze_page(url).await?;
        let dom = auditor.collect_evidence(url).await?;
        Ok::<PageEvidence, anyhow::Error>(PageEvidence {
            rules: Some(rules),
            dom: Some(dom),
        })
    };

    match tokio::time::timeout(page_timeout, extraction).await {
        Ok(Ok(evidence)) => PageResult::ok(url, evidence),
        Ok(Err(err)) => PageResult::failed(url, format!("{err:#}")),
        Err(_) => PageResult::failed(
            url,
            format!("page audit timed out after {}s", page_timeout.as_secs()),
        ),
    }
}
