//! Siteaudit - site-wide accessibility audit engine
//!
//! Siteaudit drives a bounded pool of page-audit workers across a list of
//! urls, checkpoints progress to disk after every page so partial work
//! survives a crash, streams structured progress events to any observer, and
//! classifies raw per-page findings into a fixed catalog of compliance
//! criteria aggregated across the whole site.
//!
//! Page discovery, evidence extraction (browser driver + rule engine) and
//! report rendering live outside this crate; the engine consumes the first
//! two through the [`pool::PageAuditor`] trait and produces a
//! [`domain::Report`] for the third.

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod evaluator;
pub mod pool;
pub mod store;

pub use domain::*;
