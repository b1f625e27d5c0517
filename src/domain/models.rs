//! Core domain entities shared by all validators.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ====== Page snapshot ======

/// One link discovered on the analyzed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredLink {
    pub text: String,
    pub href: String,
}

/// Immutable captured representation of one fetched page.
///
/// Produced by a snapshot provider, owned by the orchestrator for the
/// duration of one run, and shared read-only with every validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub source_url: String,
    pub raw_html: String,
    /// Markdown-like rendering of the page text.
    pub text_representation: String,
    /// Open string-keyed map: title, description, social preview fields,
    /// status code, response time.
    pub metadata: HashMap<String, String>,
    pub screenshot: Option<Vec<u8>>,
    pub discovered_links: Vec<DiscoveredLink>,
}

impl PageSnapshot {
    /// Convenience accessor for metadata values.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

// ====== Issues ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Error,
    Warning,
    Info,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Error => "error",
            IssueKind::Warning => "warning",
            IssueKind::Info => "info",
        }
    }
}

/// Impact tier of a finding. Validators that speak high/medium/low map
/// onto the critical/moderate/minor tiers through their scoring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        }
    }
}

/// One finding from a validator. Read-only once created; owned by the
/// `ValidatorResult` that contains it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    /// Selector or line reference, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    pub severity: Severity,
    /// Classification tag, e.g. a WCAG clause or an SEO category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guideline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Issue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            locator: None,
            severity,
            guideline: None,
            recommendation: None,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_guideline(mut self, guideline: impl Into<String>) -> Self {
        self.guideline = Some(guideline.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

// ====== Validator results ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    Success,
    Warning,
    Error,
}

impl ValidatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorStatus::Success => "success",
            ValidatorStatus::Warning => "warning",
            ValidatorStatus::Error => "error",
        }
    }
}

/// Which backing service or fallback produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "w3c-validator")]
    W3cValidator,
    #[serde(rename = "local-markup-heuristics")]
    MarkupHeuristics,
    #[serde(rename = "accessibility-engine")]
    RuleEngine,
    #[serde(rename = "local-accessibility-heuristics")]
    AccessibilityHeuristics,
    #[serde(rename = "local-contrast-analysis")]
    ContrastAnalysis,
    #[serde(rename = "seo-service")]
    SeoService,
    #[serde(rename = "local-seo-analysis")]
    SeoHeuristics,
    #[serde(rename = "header-probe")]
    HeaderProbe,
    #[serde(rename = "pagespeed-api")]
    PageSpeedApi,
    #[serde(rename = "simulated-baseline")]
    Simulated,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::W3cValidator => "w3c-validator",
            DataSource::MarkupHeuristics => "local-markup-heuristics",
            DataSource::RuleEngine => "accessibility-engine",
            DataSource::AccessibilityHeuristics => "local-accessibility-heuristics",
            DataSource::ContrastAnalysis => "local-contrast-analysis",
            DataSource::SeoService => "seo-service",
            DataSource::SeoHeuristics => "local-seo-analysis",
            DataSource::HeaderProbe => "header-probe",
            DataSource::PageSpeedApi => "pagespeed-api",
            DataSource::Simulated => "simulated-baseline",
        }
    }
}

/// Normalized report unit produced once per validator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorResult {
    pub id: String,
    pub label: String,
    pub status: ValidatorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    pub message: String,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}
