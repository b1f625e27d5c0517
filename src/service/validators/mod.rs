//! Validator strategies for page quality analysis.
//!
//! Each validator reads the same immutable snapshot and produces one
//! normalized result. Validators with an external primary service fall
//! back to a local analyzer on failure; the result's data source tag
//! records which path actually ran.

mod accessibility;
mod contrast;
mod markup;
mod performance;
mod security;
mod seo;

pub use accessibility::{AccessibilityValidator, EngineFinding, RuleEngine};
pub use contrast::ContrastValidator;
pub use markup::MarkupValidator;
pub use performance::PerformanceValidator;
pub use security::SecurityValidator;
pub use seo::SeoValidator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AnalyzerConfig;
use crate::domain::models::{PageSnapshot, ValidatorResult};
use crate::error::Result;

/// Strategy trait for one analysis dimension.
#[async_trait]
pub trait Validator: Send + Sync {
    fn id(&self) -> &'static str;

    /// Human-readable display name.
    fn label(&self) -> &'static str;

    /// Analyze the snapshot and return a normalized result.
    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult>;
}

/// Declarative entry in the validator registry.
#[derive(Debug, Clone)]
pub struct ValidatorDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub enabled: bool,
}

/// The six validators, all enabled.
pub fn default_descriptors() -> Vec<ValidatorDescriptor> {
    [
        ("markup", "HTML Markup"),
        ("accessibility", "Accessibility"),
        ("contrast", "Color Contrast"),
        ("seo", "Search Optimization"),
        ("security", "Security Headers"),
        ("performance", "Performance"),
    ]
    .into_iter()
    .map(|(id, label)| ValidatorDescriptor { id, label, enabled: true })
    .collect()
}

/// Construct the validator behind a descriptor id.
pub fn build_validator(id: &str, config: &AnalyzerConfig) -> Option<Arc<dyn Validator>> {
    match id {
        "markup" => Some(Arc::new(MarkupValidator::new(config))),
        "accessibility" => Some(Arc::new(AccessibilityValidator::new(config))),
        "contrast" => Some(Arc::new(ContrastValidator::new(config))),
        "seo" => Some(Arc::new(SeoValidator::new(config))),
        "security" => Some(Arc::new(SecurityValidator::new(config))),
        "performance" => Some(Arc::new(PerformanceValidator::new(config))),
        _ => None,
    }
}
