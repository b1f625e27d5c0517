//! Runtime configuration for one analyzer instance.
//!
//! External service endpoints and keys come from the environment; every
//! other knob carries an explicit default so a bare `AnalyzerConfig::default()`
//! runs fully offline (local analyzers plus the simulated performance
//! baseline).

use std::time::Duration;

use crate::service::validators::{default_descriptors, ValidatorDescriptor};

/// Device strategy requested from the performance-metrics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceStrategy {
    #[default]
    Desktop,
    Mobile,
}

impl PerformanceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceStrategy::Desktop => "desktop",
            PerformanceStrategy::Mobile => "mobile",
        }
    }
}

/// Which of the two observed SEO weight tables to score with.
///
/// Both tables exist in the wild; neither is canonical. `Standard`
/// deducts 12/5/2 per high/medium/low issue. `Strict` deducts 20/8/3
/// and additionally forces error status whenever any high-priority
/// issue is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeoWeights {
    #[default]
    Standard,
    Strict,
}

/// Configuration consumed by [`crate::Analyzer`] at construction time.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Remote structural-validation endpoint (Nu-style). `None` disables
    /// the primary path; the local heuristic fallback is then used.
    pub markup_service_url: Option<String>,
    /// Paid on-page SEO analysis service. Both must be set for the
    /// external path to be probed.
    pub seo_service_url: Option<String>,
    pub seo_service_key: Option<String>,
    /// Performance-metrics API endpoint and key. Without a key the
    /// performance validator returns the simulated baseline.
    pub pagespeed_api_url: Option<String>,
    pub pagespeed_api_key: Option<String>,
    pub performance_strategy: PerformanceStrategy,
    pub seo_weights: SeoWeights,
    /// Caller-level timeout wrapping the whole validator fan-out.
    pub run_timeout: Duration,
    /// Issues kept per result, most severe first.
    pub max_issues_per_result: usize,
    /// Declarative validator list; disabled entries are skipped at
    /// construction, not at run time.
    pub validators: Vec<ValidatorDescriptor>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            markup_service_url: Some("https://validator.w3.org/nu/".to_string()),
            seo_service_url: None,
            seo_service_key: None,
            pagespeed_api_url: Some(
                "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".to_string(),
            ),
            pagespeed_api_key: None,
            performance_strategy: PerformanceStrategy::default(),
            seo_weights: SeoWeights::default(),
            run_timeout: Duration::from_secs(60),
            max_issues_per_result: 25,
            validators: default_descriptors(),
        }
    }
}

impl AnalyzerConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `SITELENS_MARKUP_SERVICE_URL`,
    /// `SITELENS_SEO_SERVICE_URL`, `SITELENS_SEO_SERVICE_KEY`,
    /// `SITELENS_PAGESPEED_URL`, `SITELENS_PAGESPEED_KEY`,
    /// `SITELENS_PERF_STRATEGY` (`mobile`/`desktop`),
    /// `SITELENS_SEO_WEIGHTS` (`standard`/`strict`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env_nonempty("SITELENS_MARKUP_SERVICE_URL") {
            config.markup_service_url = Some(url);
        }
        config.seo_service_url = env_nonempty("SITELENS_SEO_SERVICE_URL");
        config.seo_service_key = env_nonempty("SITELENS_SEO_SERVICE_KEY");
        if let Some(url) = env_nonempty("SITELENS_PAGESPEED_URL") {
            config.pagespeed_api_url = Some(url);
        }
        config.pagespeed_api_key = env_nonempty("SITELENS_PAGESPEED_KEY");

        if let Some(strategy) = env_nonempty("SITELENS_PERF_STRATEGY") {
            config.performance_strategy = match strategy.to_lowercase().as_str() {
                "mobile" => PerformanceStrategy::Mobile,
                _ => PerformanceStrategy::Desktop,
            };
        }
        if let Some(weights) = env_nonempty("SITELENS_SEO_WEIGHTS") {
            config.seo_weights = match weights.to_lowercase().as_str() {
                "strict" => SeoWeights::Strict,
                _ => SeoWeights::Standard,
            };
        }

        config
    }

    /// True when the paid SEO service is fully configured.
    pub fn seo_service_configured(&self) -> bool {
        self.seo_service_url.is_some() && self.seo_service_key.is_some()
    }

    /// True when the performance-metrics service is fully configured.
    pub fn pagespeed_configured(&self) -> bool {
        self.pagespeed_api_url.is_some() && self.pagespeed_api_key.is_some()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
