//! SEO validator - on-page search-optimization signals.
//!
//! Thirteen local checks tagged with a priority and a category. When a
//! paid on-page analysis service is configured its score and issue
//! list are used verbatim; on failure the local analyzer runs and the
//! result is tagged accordingly.

use std::sync::OnceLock;

use async_trait::async_trait;
use rquest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::config::{AnalyzerConfig, SeoWeights};
use crate::domain::models::{
    DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult, ValidatorStatus,
};
use crate::error::Result;
use crate::extractor::PageExtractor;
use crate::service::assembler::ResultAssembler;
use crate::service::http::{create_client, ClientType};
use crate::service::scoring::{self, status_for, ScoringPolicy};
use crate::service::validators::Validator;

const TITLE_IDEAL: (usize, usize) = (50, 60);
const DESCRIPTION_IDEAL: (usize, usize) = (150, 160);
const MIN_WORD_COUNT: usize = 300;
const MIN_INTERNAL_LINKS: usize = 3;
const LINK_DENSITY_THRESHOLD: usize = 5;
const MAX_RENDER_BLOCKING: usize = 3;

/// Check priority; maps onto the severity tiers the scorer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn severity(self) -> Severity {
        match self {
            Priority::High => Severity::Critical,
            Priority::Medium => Severity::Moderate,
            Priority::Low => Severity::Minor,
        }
    }

    fn kind(self) -> IssueKind {
        match self {
            Priority::High => IssueKind::Error,
            Priority::Medium | Priority::Low => IssueKind::Warning,
        }
    }
}

pub struct SeoValidator {
    client: Client,
    service_url: Option<String>,
    service_key: Option<String>,
    weights: SeoWeights,
    assembler: ResultAssembler,
}

/// Response shape of the external on-page analysis service.
#[derive(Debug, Deserialize)]
struct ServiceResponse {
    score: u8,
    #[serde(default)]
    issues: Vec<ServiceIssue>,
}

#[derive(Debug, Deserialize)]
struct ServiceIssue {
    priority: String,
    #[serde(default)]
    category: Option<String>,
    message: String,
    #[serde(default)]
    recommendation: Option<String>,
}

impl SeoValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: create_client(ClientType::Plain).expect("Failed to create HTTP client"),
            service_url: config.seo_service_url.clone(),
            service_key: config.seo_service_key.clone(),
            weights: config.seo_weights,
            assembler: ResultAssembler::new(config.max_issues_per_result),
        }
    }

    fn policy(&self) -> ScoringPolicy {
        match self.weights {
            SeoWeights::Standard => scoring::SEO_STANDARD,
            SeoWeights::Strict => scoring::SEO_STRICT,
        }
    }

    /// Status for a local-analyzer result. The strict table carries the
    /// observed rule that any high-priority issue forces error status.
    fn status(&self, score: u8, issues: &[Issue]) -> ValidatorStatus {
        if self.weights == SeoWeights::Strict
            && issues.iter().any(|i| i.severity == Severity::Critical)
        {
            return ValidatorStatus::Error;
        }
        status_for(score)
    }

    async fn analyze_remote(
        &self,
        url: &str,
        key: &str,
        snapshot: &PageSnapshot,
    ) -> anyhow::Result<(u8, Vec<Issue>)> {
        let response = self
            .client
            .get(url)
            .query(&[("url", snapshot.source_url.as_str()), ("key", key)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("SEO service returned status {}", response.status());
        }

        let parsed: ServiceResponse = response.json().await?;
        let issues = parsed
            .issues
            .into_iter()
            .map(|issue| {
                let priority = match issue.priority.as_str() {
                    "high" => Priority::High,
                    "low" => Priority::Low,
                    _ => Priority::Medium,
                };
                let mut out =
                    Issue::new(priority.kind(), priority.severity(), issue.message);
                if let Some(category) = issue.category {
                    out = out.with_guideline(format!("seo/{}", category));
                }
                if let Some(rec) = issue.recommendation {
                    out = out.with_recommendation(rec);
                }
                out
            })
            .collect();

        Ok((parsed.score.min(100), issues))
    }

    fn analyze_local(&self, snapshot: &PageSnapshot) -> Vec<Issue> {
        let html = Html::parse_document(&snapshot.raw_html);
        let mut issues = Vec::new();

        check_title(&html, &mut issues);
        check_meta_description(&html, &mut issues);
        check_meta_keywords(&html, &mut issues);
        check_single_h1(&html, &mut issues);
        check_image_alt_coverage(&html, snapshot, &mut issues);
        check_internal_link_density(&html, snapshot, &mut issues);
        check_open_graph(&html, &mut issues);
        check_twitter_card(&html, &mut issues);
        check_structured_data(&html, &mut issues);
        check_canonical(&html, &mut issues);
        check_viewport(&html, &mut issues);
        check_render_blocking(&html, &mut issues);
        check_word_count(&html, &mut issues);

        issues
    }
}

#[async_trait]
impl Validator for SeoValidator {
    fn id(&self) -> &'static str {
        "seo"
    }

    fn label(&self) -> &'static str {
        "Search Optimization"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        if let (Some(url), Some(key)) = (self.service_url.clone(), self.service_key.clone()) {
            match self.analyze_remote(&url, &key, snapshot).await {
                Ok((score, issues)) => {
                    log::info!("[SEO] External service scored {} with {} issues", score, issues.len());
                    let message = format!("{} search-optimization issues found", issues.len());
                    return Ok(self.assembler.assemble(
                        self.id(),
                        self.label(),
                        status_for(score),
                        Some(score),
                        message,
                        issues,
                        DataSource::SeoService,
                    ));
                }
                Err(e) => {
                    log::warn!("[SEO] External service failed, using local analyzer: {}", e);
                }
            }
        }

        let issues = self.analyze_local(snapshot);
        let score = self.policy().score(&issues);
        let status = self.status(score, &issues);

        let high = issues.iter().filter(|i| i.severity == Severity::Critical).count();
        log::debug!("[SEO] {} issues ({} high priority), score {}", issues.len(), high, score);

        let message = if issues.is_empty() {
            "Page follows on-page SEO best practices".to_string()
        } else {
            format!("{} search-optimization issues found ({} high priority)", issues.len(), high)
        };

        Ok(self.assembler.assemble(
            self.id(),
            self.label(),
            status,
            Some(score),
            message,
            issues,
            DataSource::SeoHeuristics,
        ))
    }
}

// ====== The thirteen checks ======

fn push(
    issues: &mut Vec<Issue>,
    priority: Priority,
    category: &str,
    message: String,
    locator: Option<&str>,
    recommendation: &str,
) {
    let mut issue = Issue::new(priority.kind(), priority.severity(), message)
        .with_guideline(format!("seo/{}", category))
        .with_recommendation(recommendation.to_string());
    if let Some(locator) = locator {
        issue = issue.with_locator(locator.to_string());
    }
    issues.push(issue);
}

fn check_title(html: &Html, issues: &mut Vec<Issue>) {
    match PageExtractor::extract_title(html) {
        None => push(
            issues,
            Priority::High,
            "meta",
            "Page has no title tag".to_string(),
            Some("title"),
            "Add a unique, descriptive title of 50-60 characters",
        ),
        Some(title) if title.len() < TITLE_IDEAL.0 => push(
            issues,
            Priority::Medium,
            "meta",
            format!("Title is {} characters; 50-60 is ideal", title.len()),
            Some("title"),
            "Expand the title toward 50-60 characters with the main keyword",
        ),
        Some(title) if title.len() > TITLE_IDEAL.1 => push(
            issues,
            Priority::Medium,
            "meta",
            format!("Title is {} characters and will be truncated in results", title.len()),
            Some("title"),
            "Shorten the title to 50-60 characters",
        ),
        _ => {}
    }
}

fn check_meta_description(html: &Html, issues: &mut Vec<Issue>) {
    match PageExtractor::extract_meta(html, "description") {
        None => push(
            issues,
            Priority::High,
            "meta",
            "Page has no meta description".to_string(),
            Some("meta[name=description]"),
            "Add a compelling meta description of 150-160 characters",
        ),
        Some(desc) if desc.len() < DESCRIPTION_IDEAL.0 => push(
            issues,
            Priority::Medium,
            "meta",
            format!("Meta description is {} characters; 150-160 is ideal", desc.len()),
            Some("meta[name=description]"),
            "Expand the description toward 150-160 characters",
        ),
        Some(desc) if desc.len() > DESCRIPTION_IDEAL.1 => push(
            issues,
            Priority::Medium,
            "meta",
            format!("Meta description is {} characters and will be truncated", desc.len()),
            Some("meta[name=description]"),
            "Shorten the description to 150-160 characters",
        ),
        _ => {}
    }
}

fn check_meta_keywords(html: &Html, issues: &mut Vec<Issue>) {
    if PageExtractor::extract_meta(html, "keywords").is_some() {
        // deprecated signal; reported but never scored
        issues.push(
            Issue::new(
                IssueKind::Info,
                Severity::Minor,
                "Page declares the deprecated meta keywords tag",
            )
            .with_locator("meta[name=keywords]")
            .with_guideline("seo/meta")
            .with_recommendation("Search engines ignore meta keywords; it can be removed"),
        );
    }
}

fn check_single_h1(html: &Html, issues: &mut Vec<Issue>) {
    let h1_count = PageExtractor::extract_headings(html)
        .iter()
        .filter(|h| h.level == 1)
        .count();

    if h1_count == 0 {
        push(
            issues,
            Priority::High,
            "structure",
            "Page has no H1 heading".to_string(),
            Some("h1"),
            "Add one H1 containing the main keyword",
        );
    } else if h1_count > 1 {
        push(
            issues,
            Priority::Medium,
            "structure",
            format!("Page has {} H1 headings", h1_count),
            Some("h1"),
            "Use only one H1 per page",
        );
    }
}

fn check_image_alt_coverage(html: &Html, snapshot: &PageSnapshot, issues: &mut Vec<Issue>) {
    let images = PageExtractor::extract_images(html, &snapshot.source_url);
    let missing = images.iter().filter(|img| img.alt.is_none()).count();
    if missing > 0 {
        push(
            issues,
            Priority::Medium,
            "content",
            format!("{} of {} images lack alt text", missing, images.len()),
            Some("img"),
            "Add descriptive alt text; it is indexed for image search",
        );
    }
}

fn check_internal_link_density(html: &Html, snapshot: &PageSnapshot, issues: &mut Vec<Issue>) {
    let links = PageExtractor::extract_links(html, &snapshot.source_url);
    let internal = links.iter().filter(|l| l.is_internal).count();
    if links.len() > LINK_DENSITY_THRESHOLD && internal < MIN_INTERNAL_LINKS {
        push(
            issues,
            Priority::Low,
            "structure",
            format!("Only {} of {} links are internal", internal, links.len()),
            None,
            "Add internal links to related pages to spread link equity",
        );
    }
}

fn check_open_graph(html: &Html, issues: &mut Vec<Issue>) {
    let missing: Vec<&str> = ["og:title", "og:description", "og:image"]
        .into_iter()
        .filter(|p| PageExtractor::extract_meta_property(html, p).is_none())
        .collect();

    if !missing.is_empty() {
        push(
            issues,
            Priority::Medium,
            "meta",
            format!("Missing Open Graph tags: {}", missing.join(", ")),
            None,
            "Add og:title, og:description and og:image for link previews",
        );
    }
}

fn check_twitter_card(html: &Html, issues: &mut Vec<Issue>) {
    if PageExtractor::extract_meta(html, "twitter:card").is_none() {
        push(
            issues,
            Priority::Low,
            "meta",
            "Missing Twitter card meta tag".to_string(),
            Some("meta[name=twitter:card]"),
            "Add a twitter:card tag for shared-link previews",
        );
    }
}

fn check_structured_data(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| {
        Selector::parse("script[type='application/ld+json'], [itemscope], [typeof]").unwrap()
    });

    if html.select(selector).next().is_none() {
        push(
            issues,
            Priority::Low,
            "structure",
            "No structured data (JSON-LD, microdata or RDFa) found".to_string(),
            None,
            "Add structured data to qualify for rich results",
        );
    }
}

fn check_canonical(html: &Html, issues: &mut Vec<Issue>) {
    match PageExtractor::extract_canonical(html) {
        None => push(
            issues,
            Priority::Medium,
            "meta",
            "Page has no canonical URL".to_string(),
            Some("link[rel=canonical]"),
            "Add a canonical link to prevent duplicate-content dilution",
        ),
        Some(href) if Url::parse(&href).is_err() => push(
            issues,
            Priority::Low,
            "meta",
            format!("Canonical URL \"{}\" is not absolute", href),
            Some("link[rel=canonical]"),
            "Use an absolute canonical URL",
        ),
        _ => {}
    }
}

fn check_viewport(html: &Html, issues: &mut Vec<Issue>) {
    match PageExtractor::extract_meta(html, "viewport") {
        None => push(
            issues,
            Priority::High,
            "mobile",
            "Page has no viewport meta tag".to_string(),
            Some("meta[name=viewport]"),
            "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
        ),
        Some(content) if !content.contains("width=device-width") => push(
            issues,
            Priority::Medium,
            "mobile",
            "Viewport tag is missing width=device-width".to_string(),
            Some("meta[name=viewport]"),
            "Configure the viewport for responsive rendering",
        ),
        _ => {}
    }
}

fn check_render_blocking(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| {
        Selector::parse("head link[rel='stylesheet'], head script[src]:not([async]):not([defer])")
            .unwrap()
    });

    let count = html.select(selector).count();
    if count > MAX_RENDER_BLOCKING {
        push(
            issues,
            Priority::Low,
            "performance",
            format!("{} render-blocking resources in <head>", count),
            Some("head"),
            "Defer non-critical scripts and inline critical CSS",
        );
    }
}

fn check_word_count(html: &Html, issues: &mut Vec<Issue>) {
    let words = PageExtractor::extract_word_count(html);
    if words < MIN_WORD_COUNT {
        push(
            issues,
            Priority::Medium,
            "content",
            format!("Page has only {} words of content", words),
            None,
            "Thin content ranks poorly; aim for at least 300 words",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::validators::test_support::snapshot;

    fn rich_page() -> String {
        let body_text = "word ".repeat(320);
        format!(
            r#"<!DOCTYPE html><html lang="en"><head>
            <title>A Fifty To Sixty Character Title For The Test Page</title>
            <meta name="description" content="{}">
            <meta name="viewport" content="width=device-width, initial-scale=1">
            <meta property="og:title" content="t"><meta property="og:description" content="d">
            <meta property="og:image" content="https://example.com/i.png">
            <meta name="twitter:card" content="summary">
            <link rel="canonical" href="https://example.com/page">
            <script type="application/ld+json">{{}}</script>
            </head><body><h1>Main heading</h1><p>{}</p>
            <a href="/a">internal one</a><a href="/b">internal two</a><a href="/c">internal three</a>
            </body></html>"#,
            "d".repeat(155),
            body_text
        )
    }

    fn local_validator() -> SeoValidator {
        SeoValidator::new(&AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn rich_page_scores_100() {
        let snap = snapshot("https://example.com/page", &rich_page());
        let result = local_validator().validate(&snap).await.unwrap();
        assert!(result.issues.is_empty(), "unexpected issues: {:?}", result.issues);
        assert_eq!(result.score, Some(100));
        assert_eq!(result.data_source, Some(DataSource::SeoHeuristics));
    }

    #[tokio::test]
    async fn empty_page_flags_the_high_priority_basics() {
        let snap = snapshot("https://example.com", "<html><body><p>tiny</p></body></html>");
        let result = local_validator().validate(&snap).await.unwrap();
        let high: Vec<&str> = result
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .map(|i| i.message.as_str())
            .collect();
        assert!(high.iter().any(|m| m.contains("no title")));
        assert!(high.iter().any(|m| m.contains("no meta description")));
        assert!(high.iter().any(|m| m.contains("no H1")));
        assert!(high.iter().any(|m| m.contains("no viewport")));
    }

    #[tokio::test]
    async fn meta_keywords_is_informational_and_unscored() {
        let mut page = rich_page();
        page = page.replace(
            "<meta name=\"viewport\"",
            "<meta name=\"keywords\" content=\"a,b\"><meta name=\"viewport\"",
        );
        let snap = snapshot("https://example.com/page", &page);
        let result = local_validator().validate(&snap).await.unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::Info);
        assert_eq!(result.score, Some(100), "informational findings never deduct");
    }

    #[tokio::test]
    async fn relative_canonical_is_low_priority() {
        let page = rich_page().replace("https://example.com/page\"", "/page\"");
        let snap = snapshot("https://example.com/page", &page);
        let result = local_validator().validate(&snap).await.unwrap();
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].message.contains("not absolute"));
        assert_eq!(result.issues[0].severity, Severity::Minor);
        assert_eq!(result.score, Some(98));
    }

    #[tokio::test]
    async fn strict_weights_force_error_status_on_high_priority() {
        let mut config = AnalyzerConfig::default();
        config.seo_weights = SeoWeights::Strict;
        let validator = SeoValidator::new(&config);

        // only failing check: missing viewport (high). Strict: 100-20=80
        let page = rich_page().replace(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "",
        );
        let snap = snapshot("https://example.com/page", &page);
        let result = validator.validate(&snap).await.unwrap();
        assert_eq!(result.score, Some(80));
        assert_eq!(
            result.status,
            ValidatorStatus::Error,
            "any high-priority issue forces error under strict weights"
        );
    }

    #[tokio::test]
    async fn external_service_result_is_used_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/analyze")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"score": 73, "issues": [
                    {"priority": "high", "category": "meta", "message": "Duplicate title detected",
                     "recommendation": "Deduplicate titles"}
                ]}"#,
            )
            .create_async()
            .await;

        let mut config = AnalyzerConfig::default();
        config.seo_service_url = Some(format!("{}/analyze", server.url()));
        config.seo_service_key = Some("test-key".to_string());
        let validator = SeoValidator::new(&config);

        let snap = snapshot("https://example.com", "<html></html>");
        let result = validator.validate(&snap).await.unwrap();
        assert_eq!(result.data_source, Some(DataSource::SeoService));
        assert_eq!(result.score, Some(73));
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn failed_service_falls_back_to_local_analysis() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/analyze")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let mut config = AnalyzerConfig::default();
        config.seo_service_url = Some(format!("{}/analyze", server.url()));
        config.seo_service_key = Some("test-key".to_string());
        let validator = SeoValidator::new(&config);

        let snap = snapshot("https://example.com/page", &rich_page());
        let result = validator.validate(&snap).await.unwrap();
        assert_eq!(
            result.data_source,
            Some(DataSource::SeoHeuristics),
            "fallback must be visible in the data source"
        );
        assert_eq!(result.score, Some(100));
    }
}
