//! Accessibility validator.
//!
//! Runs a set of local heuristic checks over the snapshot markup. When
//! a third-party DOM rule engine is wired in and reachable, its
//! findings replace the local set entirely (impact levels map 1:1 onto
//! the same four-tier taxonomy); on engine failure the local heuristics
//! are the fallback.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::AnalyzerConfig;
use crate::domain::models::{
    DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult,
};
use crate::error::Result;
use crate::extractor::PageExtractor;
use crate::service::assembler::ResultAssembler;
use crate::service::scoring::{self, status_for};
use crate::service::validators::Validator;

/// One finding reported by a delegate rule engine.
#[derive(Debug, Clone)]
pub struct EngineFinding {
    pub impact: Severity,
    pub message: String,
    pub selector: Option<String>,
    pub guideline: Option<String>,
    pub recommendation: Option<String>,
}

/// Delegate DOM accessibility rule engine (axe-style).
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Capability probe; engines that need credentials or a runtime
    /// report availability here.
    fn is_available(&self) -> bool;

    async fn run(&self, snapshot: &PageSnapshot) -> anyhow::Result<Vec<EngineFinding>>;

    fn name(&self) -> &'static str;
}

const GENERIC_LINK_TEXTS: &[&str] = &["click here", "read more", "learn more", "here", "link", "more"];
const MAX_ALT_LEN: usize = 125;

const NON_INTERACTIVE_TAGS: &[&str] = &["div", "span", "img", "li", "td", "section", "article", "p"];

pub struct AccessibilityValidator {
    engine: Option<Arc<dyn RuleEngine>>,
    assembler: ResultAssembler,
}

impl AccessibilityValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            engine: None,
            assembler: ResultAssembler::new(config.max_issues_per_result),
        }
    }

    /// Attach a delegate rule engine for the upgrade path.
    pub fn with_engine(mut self, engine: Arc<dyn RuleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    async fn run_engine(&self, snapshot: &PageSnapshot) -> Option<Vec<Issue>> {
        let engine = self.engine.as_ref()?;
        if !engine.is_available() {
            log::debug!("[A11Y] Rule engine {} not available", engine.name());
            return None;
        }

        match engine.run(snapshot).await {
            Ok(findings) => {
                log::info!("[A11Y] Rule engine {} returned {} findings", engine.name(), findings.len());
                Some(findings.into_iter().map(engine_finding_to_issue).collect())
            }
            Err(e) => {
                log::warn!("[A11Y] Rule engine {} failed, using local checks: {}", engine.name(), e);
                None
            }
        }
    }

    fn run_local_checks(&self, html: &Html, snapshot: &PageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();

        check_document_language(html, &mut issues);
        check_document_title(html, &mut issues);
        check_image_alt(html, snapshot, &mut issues);
        check_form_labels(html, &mut issues);
        check_heading_hierarchy(html, &mut issues);
        check_landmarks(html, &mut issues);
        check_dangling_aria_references(html, &mut issues);
        check_keyboard_access(html, &mut issues);
        check_positive_tabindex(html, &mut issues);
        check_accessible_names(html, &mut issues);
        check_generic_link_text(html, &mut issues);

        issues
    }
}

#[async_trait]
impl Validator for AccessibilityValidator {
    fn id(&self) -> &'static str {
        "accessibility"
    }

    fn label(&self) -> &'static str {
        "Accessibility"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        let (issues, policy, source) = match self.run_engine(snapshot).await {
            Some(issues) => (issues, scoring::ACCESSIBILITY_ENGINE, DataSource::RuleEngine),
            None => {
                let html = Html::parse_document(&snapshot.raw_html);
                let issues = self.run_local_checks(&html, snapshot);
                (issues, scoring::ACCESSIBILITY_LOCAL, DataSource::AccessibilityHeuristics)
            }
        };

        let score = policy.score(&issues);
        log::debug!("[A11Y] {} issues via {}, score {}", issues.len(), source.as_str(), score);

        let message = if issues.is_empty() {
            "No accessibility problems detected".to_string()
        } else {
            let critical = issues.iter().filter(|i| i.severity == Severity::Critical).count();
            format!("{} accessibility issues found ({} critical)", issues.len(), critical)
        };

        Ok(self.assembler.assemble(
            self.id(),
            self.label(),
            status_for(score),
            Some(score),
            message,
            issues,
            source,
        ))
    }
}

fn engine_finding_to_issue(finding: EngineFinding) -> Issue {
    let kind = match finding.impact {
        Severity::Critical | Severity::Serious => IssueKind::Error,
        Severity::Moderate | Severity::Minor => IssueKind::Warning,
    };
    let mut issue = Issue::new(kind, finding.impact, finding.message);
    if let Some(selector) = finding.selector {
        issue = issue.with_locator(selector);
    }
    if let Some(guideline) = finding.guideline {
        issue = issue.with_guideline(guideline);
    }
    if let Some(recommendation) = finding.recommendation {
        issue = issue.with_recommendation(recommendation);
    }
    issue
}

// ====== Local heuristic checks ======

fn check_document_language(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("html").unwrap());

    let lang = html
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::trim);

    if lang.map(|l| l.is_empty()).unwrap_or(true) {
        issues.push(
            Issue::new(
                IssueKind::Error,
                Severity::Serious,
                "Document is missing a lang attribute on the <html> element",
            )
            .with_locator("html")
            .with_guideline("WCAG 3.1.1")
            .with_recommendation("Declare the page language, e.g. <html lang=\"en\">"),
        );
    }
}

fn check_document_title(html: &Html, issues: &mut Vec<Issue>) {
    if PageExtractor::extract_title(html).is_none() {
        issues.push(
            Issue::new(IssueKind::Error, Severity::Serious, "Document has no <title> element")
                .with_locator("title")
                .with_guideline("WCAG 2.4.2")
                .with_recommendation("Add a descriptive page title"),
        );
    }
}

fn check_image_alt(html: &Html, snapshot: &PageSnapshot, issues: &mut Vec<Issue>) {
    for image in PageExtractor::extract_images(html, &snapshot.source_url) {
        match &image.alt {
            None => issues.push(
                Issue::new(
                    IssueKind::Error,
                    Severity::Serious,
                    format!("Image {} is missing an alt attribute", image.src),
                )
                .with_locator("img")
                .with_guideline("WCAG 1.1.1")
                .with_recommendation("Add alt text describing the image, or alt=\"\" if decorative"),
            ),
            Some(alt) if alt.is_empty() => issues.push(
                Issue::new(
                    IssueKind::Info,
                    Severity::Minor,
                    format!("Image {} has an empty alt attribute; confirm it is decorative", image.src),
                )
                .with_locator("img")
                .with_guideline("WCAG 1.1.1"),
            ),
            Some(alt) if alt.len() > MAX_ALT_LEN => issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Minor,
                    format!("Image alt text is {} characters; screen readers read it in full", alt.len()),
                )
                .with_locator("img")
                .with_guideline("WCAG 1.1.1")
                .with_recommendation("Keep alt text under 125 characters"),
            ),
            _ => {}
        }
    }
}

fn check_form_labels(html: &Html, issues: &mut Vec<Issue>) {
    static INPUT_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let input_selector = INPUT_SELECTOR
        .get_or_init(|| Selector::parse("input, select, textarea").unwrap());

    static LABEL_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let label_selector = LABEL_SELECTOR.get_or_init(|| Selector::parse("label[for]").unwrap());

    let labeled_ids: HashSet<String> = html
        .select(label_selector)
        .filter_map(|el| el.value().attr("for"))
        .map(|s| s.to_string())
        .collect();

    for control in html.select(input_selector) {
        let el = control.value();
        let input_type = el.attr("type").unwrap_or("text");
        if matches!(input_type, "hidden" | "submit" | "button" | "reset" | "image") {
            continue;
        }

        let has_label = el
            .attr("id")
            .map(|id| labeled_ids.contains(id))
            .unwrap_or(false)
            || el.attr("aria-label").map(|v| !v.trim().is_empty()).unwrap_or(false)
            || el.attr("aria-labelledby").is_some()
            || el.attr("title").is_some();

        if !has_label {
            issues.push(
                Issue::new(
                    IssueKind::Error,
                    Severity::Critical,
                    format!("Form control <{}> has no associated label", el.name()),
                )
                .with_locator(el.name().to_string())
                .with_guideline("WCAG 3.3.2")
                .with_recommendation("Associate a <label for> or add aria-label"),
            );
        }

        if el.attr("required").is_some() && el.attr("aria-required").is_none() {
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Minor,
                    format!("Required <{}> lacks an aria-required hint", el.name()),
                )
                .with_locator(el.name().to_string())
                .with_guideline("WCAG 3.3.2")
                .with_recommendation("Add aria-required=\"true\" to required controls"),
            );
        }
    }
}

fn check_heading_hierarchy(html: &Html, issues: &mut Vec<Issue>) {
    let headings = PageExtractor::extract_headings(html);
    let h1_count = headings.iter().filter(|h| h.level == 1).count();

    if h1_count == 0 {
        issues.push(
            Issue::new(IssueKind::Error, Severity::Serious, "Page has no top-level heading")
                .with_locator("h1")
                .with_guideline("WCAG 1.3.1")
                .with_recommendation("Add exactly one <h1> describing the page"),
        );
    } else if h1_count > 1 {
        issues.push(
            Issue::new(
                IssueKind::Warning,
                Severity::Moderate,
                format!("Page has {} top-level headings; screen reader users expect one", h1_count),
            )
            .with_locator("h1")
            .with_guideline("WCAG 1.3.1")
            .with_recommendation("Use a single <h1> per page"),
        );
    }

    let mut previous_level = 0u8;
    for heading in &headings {
        if previous_level > 0 && heading.level > previous_level + 1 {
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Moderate,
                    format!("Heading level skips from h{} to h{}", previous_level, heading.level),
                )
                .with_locator(format!("h{}", heading.level))
                .with_guideline("WCAG 1.3.1")
                .with_recommendation("Keep heading levels sequential"),
            );
        }
        previous_level = heading.level;
    }
}

fn check_landmarks(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| {
        Selector::parse(
            "main, nav, header, footer, [role='main'], [role='navigation'], [role='banner'], [role='contentinfo']",
        )
        .unwrap()
    });

    if html.select(selector).next().is_none() {
        issues.push(
            Issue::new(
                IssueKind::Warning,
                Severity::Moderate,
                "Page defines no ARIA landmarks or sectioning elements",
            )
            .with_guideline("WCAG 1.3.1")
            .with_recommendation("Wrap page regions in <main>, <nav>, <header> and <footer>"),
        );
    }
}

fn check_dangling_aria_references(html: &Html, issues: &mut Vec<Issue>) {
    static ID_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let id_selector = ID_SELECTOR.get_or_init(|| Selector::parse("[id]").unwrap());

    static REF_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let ref_selector = REF_SELECTOR
        .get_or_init(|| Selector::parse("[aria-labelledby], [aria-describedby]").unwrap());

    let known_ids: HashSet<String> = html
        .select(id_selector)
        .filter_map(|el| el.value().attr("id"))
        .map(|s| s.to_string())
        .collect();

    for element in html.select(ref_selector) {
        for attr in ["aria-labelledby", "aria-describedby"] {
            let Some(refs) = element.value().attr(attr) else { continue };
            for id in refs.split_whitespace() {
                if !known_ids.contains(id) {
                    issues.push(
                        Issue::new(
                            IssueKind::Error,
                            Severity::Serious,
                            format!("{} references missing id \"{}\"", attr, id),
                        )
                        .with_locator(element.value().name().to_string())
                        .with_guideline("WCAG 4.1.2")
                        .with_recommendation("Point ARIA references at ids that exist in the document"),
                    );
                }
            }
        }
    }
}

/// Click-handled non-interactive elements that keyboard users cannot reach.
fn check_keyboard_access(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("[onclick]").unwrap());

    for element in html.select(selector) {
        let el = element.value();
        if !NON_INTERACTIVE_TAGS.contains(&el.name()) {
            continue;
        }
        if el.attr("tabindex").is_some() || el.attr("role") == Some("button") {
            continue;
        }
        issues.push(
            Issue::new(
                IssueKind::Error,
                Severity::Serious,
                format!("<{}> handles clicks but is not keyboard accessible", el.name()),
            )
            .with_locator(el.name().to_string())
            .with_guideline("WCAG 2.1.1")
            .with_recommendation("Use a <button>, or add tabindex=\"0\" and role=\"button\""),
        );
    }
}

fn check_positive_tabindex(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("[tabindex]").unwrap());

    for element in html.select(selector) {
        let Some(value) = element.value().attr("tabindex") else { continue };
        if value.parse::<i32>().map(|v| v > 0).unwrap_or(false) {
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Moderate,
                    format!(
                        "<{}> has tabindex=\"{}\"; positive values disrupt natural tab order",
                        element.value().name(),
                        value
                    ),
                )
                .with_locator(element.value().name().to_string())
                .with_guideline("WCAG 2.4.3")
                .with_recommendation("Remove the tabindex or use tabindex=\"0\""),
            );
        }
    }
}

fn check_accessible_names(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("a[href], button").unwrap());

    static IMG_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let img_selector = IMG_SELECTOR.get_or_init(|| Selector::parse("img[alt]").unwrap());

    for element in html.select(selector) {
        let el = element.value();
        let text = element.text().collect::<String>().trim().to_string();
        let has_name = !text.is_empty()
            || el.attr("aria-label").map(|v| !v.trim().is_empty()).unwrap_or(false)
            || el.attr("aria-labelledby").is_some()
            || el.attr("title").is_some()
            || element
                .select(img_selector)
                .any(|img| img.value().attr("alt").map(|a| !a.trim().is_empty()).unwrap_or(false));

        if !has_name {
            issues.push(
                Issue::new(
                    IssueKind::Error,
                    Severity::Serious,
                    format!("<{}> has no accessible name", el.name()),
                )
                .with_locator(el.name().to_string())
                .with_guideline("WCAG 4.1.2")
                .with_recommendation("Give links and buttons visible text or an aria-label"),
            );
        }
    }
}

fn check_generic_link_text(html: &Html, issues: &mut Vec<Issue>) {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = SELECTOR.get_or_init(|| Selector::parse("a[href]").unwrap());

    for element in html.select(selector) {
        let text = element.text().collect::<String>().trim().to_lowercase();
        if GENERIC_LINK_TEXTS.contains(&text.as_str()) {
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Minor,
                    format!("Link text \"{}\" does not describe its destination", text),
                )
                .with_locator("a")
                .with_guideline("WCAG 2.4.4")
                .with_recommendation("Write link text that makes sense out of context"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::validators::test_support::snapshot;

    const CLEAN_PAGE: &str = r#"<!DOCTYPE html>
        <html lang="en"><head><title>Fine Page</title></head>
        <body>
          <header><h1>Welcome</h1></header>
          <main>
            <h2>Section</h2>
            <img src="/chart.png" alt="Revenue chart">
            <form><label for="q">Search</label><input id="q" type="text"></form>
            <a href="/docs">Product documentation</a>
          </main>
          <footer><p>footer</p></footer>
        </body></html>"#;

    fn validator() -> AccessibilityValidator {
        AccessibilityValidator::new(&AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn clean_page_scores_100() {
        let result = validator().validate(&snapshot("https://example.com", CLEAN_PAGE)).await.unwrap();
        assert!(result.issues.is_empty(), "unexpected issues: {:?}", result.issues);
        assert_eq!(result.score, Some(100));
        assert_eq!(result.data_source, Some(DataSource::AccessibilityHeuristics));
    }

    #[tokio::test]
    async fn missing_lang_title_and_h1_are_flagged() {
        let snap = snapshot("https://example.com", "<html><body><main><p>hi</p></main></body></html>");
        let result = validator().validate(&snap).await.unwrap();
        let messages: Vec<&str> = result.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("lang attribute")));
        assert!(messages.iter().any(|m| m.contains("no <title>")));
        assert!(messages.iter().any(|m| m.contains("top-level heading")));
    }

    #[tokio::test]
    async fn unlabeled_input_is_critical() {
        let snap = snapshot(
            "https://example.com",
            r#"<html lang="en"><head><title>T</title></head>
               <body><main><h1>H</h1><form><input type="email"></form></main></body></html>"#,
        );
        let result = validator().validate(&snap).await.unwrap();
        let critical: Vec<_> =
            result.issues.iter().filter(|i| i.severity == Severity::Critical).collect();
        assert_eq!(critical.len(), 1);
        assert!(critical[0].message.contains("no associated label"));
        // local weights: one critical deducts 10
        assert_eq!(result.score, Some(90));
    }

    #[tokio::test]
    async fn skipped_heading_level_and_positive_tabindex() {
        let snap = snapshot(
            "https://example.com",
            r#"<html lang="en"><head><title>T</title></head>
               <body><main><h1>H</h1><h4>Deep</h4><a href="/x" tabindex="3">Go somewhere</a></main></body></html>"#,
        );
        let result = validator().validate(&snap).await.unwrap();
        assert!(result.issues.iter().any(|i| i.message.contains("skips from h1 to h4")));
        assert!(result.issues.iter().any(|i| i.message.contains("tabindex=\"3\"")));
    }

    #[tokio::test]
    async fn dangling_aria_reference_is_flagged() {
        let snap = snapshot(
            "https://example.com",
            r#"<html lang="en"><head><title>T</title></head>
               <body><main><h1>H</h1><div aria-labelledby="missing-id">content</div></main></body></html>"#,
        );
        let result = validator().validate(&snap).await.unwrap();
        assert!(result
            .issues
            .iter()
            .any(|i| i.message.contains("missing-id")));
    }

    #[tokio::test]
    async fn clickable_div_without_keyboard_support() {
        let snap = snapshot(
            "https://example.com",
            r#"<html lang="en"><head><title>T</title></head>
               <body><main><h1>H</h1><div onclick="go()">open panel</div></main></body></html>"#,
        );
        let result = validator().validate(&snap).await.unwrap();
        assert!(result.issues.iter().any(|i| i.message.contains("not keyboard accessible")));
    }

    #[tokio::test]
    async fn generic_link_text_is_minor() {
        let snap = snapshot(
            "https://example.com",
            r#"<html lang="en"><head><title>T</title></head>
               <body><main><h1>H</h1><a href="/more">read more</a></main></body></html>"#,
        );
        let result = validator().validate(&snap).await.unwrap();
        let minor: Vec<_> = result.issues.iter().filter(|i| i.severity == Severity::Minor).collect();
        assert_eq!(minor.len(), 1);
        assert_eq!(result.score, Some(99));
    }

    // ====== Delegate engine path ======

    struct StubEngine {
        available: bool,
        fail: bool,
    }

    #[async_trait]
    impl RuleEngine for StubEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn run(&self, _snapshot: &PageSnapshot) -> anyhow::Result<Vec<EngineFinding>> {
            if self.fail {
                anyhow::bail!("engine crashed");
            }
            Ok(vec![EngineFinding {
                impact: Severity::Critical,
                message: "button has no discernible text".to_string(),
                selector: Some("#buy".to_string()),
                guideline: Some("WCAG 4.1.2".to_string()),
                recommendation: Some("Add an accessible name".to_string()),
            }])
        }

        fn name(&self) -> &'static str {
            "stub-engine"
        }
    }

    #[tokio::test]
    async fn engine_findings_replace_local_results() {
        // page full of local issues; the engine result must win outright
        let snap = snapshot("https://example.com", "<html><body><p>bare</p></body></html>");
        let validator = validator().with_engine(Arc::new(StubEngine { available: true, fail: false }));
        let result = validator.validate(&snap).await.unwrap();

        assert_eq!(result.data_source, Some(DataSource::RuleEngine));
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].locator.as_deref(), Some("#buy"));
        // engine weights: one critical deducts 20
        assert_eq!(result.score, Some(80));
    }

    #[tokio::test]
    async fn engine_failure_falls_back_to_local_checks() {
        let snap = snapshot("https://example.com", CLEAN_PAGE);
        let validator = validator().with_engine(Arc::new(StubEngine { available: true, fail: true }));
        let result = validator.validate(&snap).await.unwrap();
        assert_eq!(result.data_source, Some(DataSource::AccessibilityHeuristics));
        assert_eq!(result.score, Some(100));
    }

    #[tokio::test]
    async fn unavailable_engine_is_skipped_silently() {
        let snap = snapshot("https://example.com", CLEAN_PAGE);
        let validator = validator().with_engine(Arc::new(StubEngine { available: false, fail: false }));
        let result = validator.validate(&snap).await.unwrap();
        assert_eq!(result.data_source, Some(DataSource::AccessibilityHeuristics));
    }
}
