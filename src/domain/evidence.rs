use serde::{Deserialize, Serialize};

/// Flag attached during aggregation to link elements whose label is reused
/// for a different destination elsewhere on the site.
pub const LINK_LABEL_DUPLICATE_FLAG: &str = "link-label-duplicate";

/// Severity reported by the external rule engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl std::fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingSeverity::Minor => write!(f, "minor"),
            FindingSeverity::Moderate => write!(f, "moderate"),
            FindingSeverity::Serious => write!(f, "serious"),
            FindingSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A single rule-engine finding (violation, pass, or incomplete)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFinding {
    /// Rule-engine id (e.g., "image-alt")
    pub rule_id: String,

    /// Impact reported by the rule engine
    pub severity: FindingSeverity,

    /// CSS selectors of the affected elements
    #[serde(default)]
    pub elements: Vec<String>,
}

impl RuleFinding {
    pub fn new(rule_id: impl Into<String>, severity: FindingSeverity) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            elements: Vec::new(),
        }
    }

    /// Attach the affected element selectors
    pub fn with_elements(mut self, elements: Vec<String>) -> Self {
        self.elements = elements;
        self
    }
}

/// Everything the rule engine reported for one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFindings {
    #[serde(default)]
    pub violations: Vec<RuleFinding>,

    #[serde(default)]
    pub passes: Vec<RuleFinding>,

    #[serde(default)]
    pub incomplete: Vec<RuleFinding>,
}

/// An image observed on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEvidence {
    /// CSS selector locating the element
    pub selector: String,

    /// Source URL as written in the document
    pub src: String,

    /// Alt attribute; None when the attribute is absent entirely
    pub alt: Option<String>,

    /// Flags raised by the extractor (e.g., "image-missing-alt")
    #[serde(default)]
    pub flags: Vec<String>,
}

/// A link together with its accessible label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEvidence {
    /// CSS selector locating the element
    pub selector: String,

    /// Accessible name as computed by the extractor
    pub label: String,

    /// Destination as written in the document
    pub href: String,

    /// Flags raised by the extractor (e.g., "link-empty-label")
    #[serde(default)]
    pub flags: Vec<String>,
}

/// One entry of the heading tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingEvidence {
    /// Heading level, 1-6
    pub level: u8,

    /// Visible text
    pub text: String,

    /// Flags raised by the extractor (e.g., "heading-skipped-level")
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Structured DOM evidence collected by the browser driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomEvidence {
    #[serde(default)]
    pub images: Vec<ImageEvidence>,

    #[serde(default)]
    pub links: Vec<LinkEvidence>,

    #[serde(default)]
    pub headings: Vec<HeadingEvidence>,
}

/// All raw evidence gathered for one audited page.
///
/// Either side may be absent independently: a page can load and yield DOM
/// evidence while the rule engine errors out, and vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageEvidence {
    /// Rule-engine findings
    pub rules: Option<RuleFindings>,

    /// Structured image/link/heading evidence
    pub dom: Option<DomEvidence>,
}

/// A piece of supporting evidence attached to a classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceItem {
    Image(ImageEvidence),
    Link(LinkEvidence),
    Heading(HeadingEvidence),
}
