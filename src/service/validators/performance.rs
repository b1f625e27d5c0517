//! Performance validator - delegates to an external metrics service.
//!
//! Requests the four category scores (performance, accessibility, best
//! practices, SEO) from a PageSpeed-style API with a selectable device
//! strategy. The validator's own score is the performance category
//! alone. Missing configuration or any service failure yields a fixed
//! simulated baseline that is unmistakably tagged as such.

use async_trait::async_trait;
use rquest::Client;
use serde::Deserialize;

use crate::config::{AnalyzerConfig, PerformanceStrategy};
use crate::domain::models::{DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult};
use crate::error::Result;
use crate::service::assembler::ResultAssembler;
use crate::service::http::{create_client, ClientType};
use crate::service::scoring::status_for;
use crate::service::validators::Validator;

/// Fixed baseline reported when no real measurement is possible.
const SIMULATED_BASELINE: CategoryScores =
    CategoryScores { performance: 85, accessibility: 90, best_practices: 88, seo: 92 };

/// Categories scoring below this produce an advisory finding.
const LOW_CATEGORY_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScores {
    pub performance: u8,
    pub accessibility: u8,
    pub best_practices: u8,
    pub seo: u8,
}

#[derive(Debug, Deserialize)]
struct PagespeedResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Categories,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Option<Category>,
    accessibility: Option<Category>,
    #[serde(rename = "best-practices")]
    best_practices: Option<Category>,
    seo: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    /// 0.0 to 1.0
    score: Option<f64>,
}

pub struct PerformanceValidator {
    client: Client,
    api_url: Option<String>,
    api_key: Option<String>,
    strategy: PerformanceStrategy,
    assembler: ResultAssembler,
}

impl PerformanceValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: create_client(ClientType::Plain).expect("Failed to create HTTP client"),
            api_url: config.pagespeed_api_url.clone(),
            api_key: config.pagespeed_api_key.clone(),
            strategy: config.performance_strategy,
            assembler: ResultAssembler::new(config.max_issues_per_result),
        }
    }

    async fn fetch_scores(&self, api_url: &str, key: &str, page_url: &str) -> anyhow::Result<CategoryScores> {
        log::info!("[PERF] Requesting {} metrics for {}", self.strategy.as_str(), page_url);

        let response = self
            .client
            .get(api_url)
            .query(&[
                ("url", page_url),
                ("strategy", self.strategy.as_str()),
                ("key", key),
                ("category", "performance"),
                ("category", "accessibility"),
                ("category", "best-practices"),
                ("category", "seo"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("metrics service returned status {}", response.status());
        }

        let parsed: PagespeedResponse = response.json().await?;
        let categories = parsed.lighthouse_result.categories;

        Ok(CategoryScores {
            performance: to_percent(categories.performance),
            accessibility: to_percent(categories.accessibility),
            best_practices: to_percent(categories.best_practices),
            seo: to_percent(categories.seo),
        })
    }

    fn category_findings(scores: &CategoryScores) -> Vec<Issue> {
        [
            ("performance", scores.performance),
            ("accessibility", scores.accessibility),
            ("best practices", scores.best_practices),
            ("SEO", scores.seo),
        ]
        .into_iter()
        .filter(|(_, score)| *score < LOW_CATEGORY_THRESHOLD)
        .map(|(name, score)| {
            Issue::new(
                IssueKind::Warning,
                Severity::Moderate,
                format!("Lighthouse {} category scored {}", name, score),
            )
            .with_recommendation(format!("Review the {} audit details in the metrics report", name))
        })
        .collect()
    }

    fn summary(scores: &CategoryScores, simulated: bool) -> String {
        let prefix = if simulated {
            "Simulated baseline (metrics service unavailable)"
        } else {
            "Measured category scores"
        };
        format!(
            "{}: performance {}, accessibility {}, best practices {}, SEO {}",
            prefix, scores.performance, scores.accessibility, scores.best_practices, scores.seo
        )
    }
}

#[async_trait]
impl Validator for PerformanceValidator {
    fn id(&self) -> &'static str {
        "performance"
    }

    fn label(&self) -> &'static str {
        "Performance"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        let measured = match (self.api_url.as_deref(), self.api_key.as_deref()) {
            (Some(api_url), Some(key)) => {
                match self.fetch_scores(api_url, key, &snapshot.source_url).await {
                    Ok(scores) => Some(scores),
                    Err(e) => {
                        log::warn!("[PERF] Metrics service failed, reporting simulated baseline: {}", e);
                        None
                    }
                }
            }
            _ => {
                log::debug!("[PERF] No metrics service configured, reporting simulated baseline");
                None
            }
        };

        let (scores, source) = match measured {
            Some(scores) => (scores, DataSource::PageSpeedApi),
            None => (SIMULATED_BASELINE, DataSource::Simulated),
        };

        // the validator's score is the performance category alone
        let score = scores.performance;
        let issues = Self::category_findings(&scores);

        Ok(self.assembler.assemble(
            self.id(),
            self.label(),
            status_for(score),
            Some(score),
            Self::summary(&scores, source == DataSource::Simulated),
            issues,
            source,
        ))
    }
}

fn to_percent(category: Option<Category>) -> u8 {
    category
        .and_then(|c| c.score)
        .map(|s| (s * 100.0).round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ValidatorStatus;
    use crate::service::validators::test_support::snapshot;

    #[tokio::test]
    async fn missing_configuration_reports_simulated_baseline() {
        let config = AnalyzerConfig::default(); // no API key
        let validator = PerformanceValidator::new(&config);
        let result = validator
            .validate(&snapshot("https://example.com", "<html></html>"))
            .await
            .unwrap();

        assert_eq!(result.data_source, Some(DataSource::Simulated));
        assert_ne!(result.data_source, Some(DataSource::PageSpeedApi));
        assert_eq!(result.score, Some(85), "score is the performance category alone");
        assert_eq!(result.status, ValidatorStatus::Success);
        assert!(result.message.contains("Simulated baseline"));
    }

    #[tokio::test]
    async fn measured_scores_use_the_performance_category_only() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/runPagespeed")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"lighthouseResult": {"categories": {
                    "performance": {"score": 0.42},
                    "accessibility": {"score": 0.97},
                    "best-practices": {"score": 0.88},
                    "seo": {"score": 1.0}
                }}}"#,
            )
            .create_async()
            .await;

        let mut config = AnalyzerConfig::default();
        config.pagespeed_api_url = Some(format!("{}/runPagespeed", server.url()));
        config.pagespeed_api_key = Some("k".to_string());
        let validator = PerformanceValidator::new(&config);

        let result = validator
            .validate(&snapshot("https://example.com", "<html></html>"))
            .await
            .unwrap();

        assert_eq!(result.data_source, Some(DataSource::PageSpeedApi));
        assert_eq!(result.score, Some(42), "97/88/100 must not be averaged in");
        assert_eq!(result.status, ValidatorStatus::Error);
        assert!(result.issues.iter().any(|i| i.message.contains("performance category scored 42")));
    }

    #[tokio::test]
    async fn service_failure_falls_back_to_simulated_baseline() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/runPagespeed")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let mut config = AnalyzerConfig::default();
        config.pagespeed_api_url = Some(format!("{}/runPagespeed", server.url()));
        config.pagespeed_api_key = Some("k".to_string());
        let validator = PerformanceValidator::new(&config);

        let result = validator
            .validate(&snapshot("https://example.com", "<html></html>"))
            .await
            .unwrap();

        assert_eq!(result.data_source, Some(DataSource::Simulated));
        assert_eq!(result.score, Some(85));
    }

    #[test]
    fn category_conversion_handles_missing_scores() {
        assert_eq!(to_percent(Some(Category { score: Some(0.856) })), 86);
        assert_eq!(to_percent(Some(Category { score: None })), 0);
        assert_eq!(to_percent(None), 0);
    }
}
