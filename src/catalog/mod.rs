//! Criterion catalog loading
//!
//! The catalog is the immutable table of evaluation rules everything else
//! depends on. The built-in table is embedded at compile time from
//! `assets/criteria.toml`; deployments can load an override file instead.
//! Loading is explicit construction - the catalog object is passed by
//! reference into the evaluator and aggregator, never cached in module
//! state. A missing, malformed or empty catalog is a startup precondition
//! failure, not a per-request error.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::Criterion;

/// Embedded default catalog (compile-time)
pub const DEFAULT_CATALOG_TOML: &str = include_str!("../../assets/criteria.toml");

/// Errors raised while loading a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog contains no criteria")]
    Empty,

    #[error("duplicate criterion id: {0}")]
    DuplicateId(String),
}

/// TOML shape of a catalog file
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "criterion")]
    criteria: Vec<Criterion>,
}

/// Immutable, ordered table of evaluation criteria
#[derive(Debug, Clone)]
pub struct CriterionCatalog {
    criteria: Vec<Criterion>,
    by_id: HashMap<String, usize>,
}

impl CriterionCatalog {
    /// Load the embedded default catalog
    pub fn load() -> Result<Self, CatalogError> {
        Self::from_toml_str(DEFAULT_CATALOG_TOML)
    }

    /// Load a catalog override from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a catalog from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_criteria(file.criteria)
    }

    /// Build a catalog from criteria already in memory (synthetic catalogs in tests)
    pub fn from_criteria(criteria: Vec<Criterion>) -> Result<Self, CatalogError> {
        if criteria.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::new();
        for (idx, criterion) in criteria.iter().enumerate() {
            if by_id.insert(criterion.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(criterion.id.clone()));
            }
        }

        tracing::debug!("Loaded criterion catalog with {} entries", criteria.len());
        Ok(Self { criteria, by_id })
    }

    pub fn lookup(&self, id: &str) -> Option<&Criterion> {
        self.by_id.get(id).map(|&idx| &self.criteria[idx])
    }

    /// Criteria in catalog (file) order
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Distinct themes, first-appearance order
    pub fn themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Vec::new();
        for criterion in &self.criteria {
            if !themes.contains(&criterion.theme) {
                themes.push(criterion.theme.clone());
            }
        }
        themes
    }

    /// Criteria with an automated strategy
    pub fn automated_count(&self) -> usize {
        self.criteria.iter().filter(|c| c.is_automated()).count()
    }
}
