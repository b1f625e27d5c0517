//! Markup validator - structural HTML validation.
//!
//! Primary path submits the raw HTML to a remote Nu-style validation
//! service and parses its GNU-format text output. When the service is
//! unreachable the local heuristic fallback runs instead: doctype and
//! skeleton-element presence, a coarse tag-balance check, image alt
//! attributes and a title element.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use rquest::Client;

use crate::config::AnalyzerConfig;
use crate::domain::models::{
    DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult,
};
use crate::error::Result;
use crate::service::assembler::ResultAssembler;
use crate::service::http::{create_client, ClientType};
use crate::service::scoring::{self, status_for};
use crate::service::validators::Validator;

/// Open/close tag-count difference tolerated before the coarse balance
/// check fires. Intentionally approximate, this is not a parser.
const TAG_BALANCE_TOLERANCE: usize = 5;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr", "!doctype",
];

pub struct MarkupValidator {
    client: Client,
    service_url: Option<String>,
    assembler: ResultAssembler,
}

impl MarkupValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: create_client(ClientType::Plain).expect("Failed to create HTTP client"),
            service_url: config.markup_service_url.clone(),
            assembler: ResultAssembler::new(config.max_issues_per_result),
        }
    }

    /// Submit the document to the remote validation service and parse
    /// its textual output into issues.
    async fn validate_remote(&self, url: &str, raw_html: &str) -> anyhow::Result<Vec<Issue>> {
        log::debug!("[MARKUP] Submitting {} bytes to {}", raw_html.len(), url);

        let response = self
            .client
            .post(url)
            .query(&[("out", "gnu")])
            .header("Content-Type", "text/html; charset=utf-8")
            .body(raw_html.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("validation service returned status {}", response.status());
        }

        let body = response.text().await?;
        Ok(Self::parse_gnu_output(&body))
    }

    /// GNU output lines look like `:12.5-12.40: error: message` or
    /// `:3.1-3.8: info warning: message`.
    fn parse_gnu_output(body: &str) -> Vec<Issue> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^[^:]*:([0-9.\-]+):\s*(error|info warning|warning|info):\s*(.+)$").unwrap()
        });

        let mut issues = Vec::new();
        for line in body.lines() {
            let Some(caps) = re.captures(line.trim()) else { continue };
            let location = caps[1].to_string();
            let message = caps[3].trim().to_string();

            let (kind, severity) = match &caps[2] {
                "error" => (IssueKind::Error, Severity::Serious),
                "info" => (IssueKind::Info, Severity::Minor),
                _ => (IssueKind::Warning, Severity::Moderate),
            };

            issues.push(
                Issue::new(kind, severity, message)
                    .with_locator(format!("line {}", location))
                    .with_recommendation("Correct the markup reported by the validator"),
            );
        }
        issues
    }

    /// Local heuristic fallback. Deliberately coarse; it catches gross
    /// structural problems, not standards conformance.
    fn validate_local(&self, raw_html: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        let lower = raw_html.to_lowercase();

        if !lower.trim_start().starts_with("<!doctype") {
            issues.push(
                Issue::new(
                    IssueKind::Error,
                    Severity::Serious,
                    "Missing document type declaration",
                )
                .with_locator("line 1")
                .with_recommendation("Start the document with <!DOCTYPE html>"),
            );
        }

        for tag in ["html", "head", "body"] {
            if !has_element(&lower, tag) {
                issues.push(
                    Issue::new(
                        IssueKind::Error,
                        Severity::Serious,
                        format!("Missing <{}> element", tag),
                    )
                    .with_recommendation(format!("Add the <{}> document skeleton element", tag)),
                );
            }
        }

        let (opens, closes) = count_tags(&lower);
        let imbalance = opens.abs_diff(closes);
        if imbalance > TAG_BALANCE_TOLERANCE {
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Moderate,
                    format!(
                        "Open and close tag counts differ by {} ({} open, {} close)",
                        imbalance, opens, closes
                    ),
                )
                .with_recommendation("Check for unclosed elements"),
            );
        }

        issues.extend(find_images_without_alt(raw_html));

        if !has_element(&lower, "title") {
            issues.push(
                Issue::new(IssueKind::Error, Severity::Serious, "Missing <title> element")
                    .with_locator("head")
                    .with_recommendation("Add a <title> inside <head>"),
            );
        }

        issues
    }
}

#[async_trait]
impl Validator for MarkupValidator {
    fn id(&self) -> &'static str {
        "markup"
    }

    fn label(&self) -> &'static str {
        "HTML Markup"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        let (issues, source) = match &self.service_url {
            Some(url) => match self.validate_remote(url, &snapshot.raw_html).await {
                Ok(issues) => (issues, DataSource::W3cValidator),
                Err(e) => {
                    log::warn!("[MARKUP] Remote validation failed, using local checks: {}", e);
                    (self.validate_local(&snapshot.raw_html), DataSource::MarkupHeuristics)
                }
            },
            None => (self.validate_local(&snapshot.raw_html), DataSource::MarkupHeuristics),
        };

        let errors = issues.iter().filter(|i| i.kind == IssueKind::Error).count();
        let warnings = issues.iter().filter(|i| i.kind == IssueKind::Warning).count();
        let score = scoring::MARKUP.score(&issues);

        log::debug!("[MARKUP] {} errors, {} warnings via {}, score {}", errors, warnings, source.as_str(), score);

        let message = if issues.is_empty() {
            "Markup is structurally valid".to_string()
        } else {
            format!("{} markup errors and {} warnings found", errors, warnings)
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

/// Raw-text element presence; the DOM parser would insert skeleton
/// elements that are absent from the source.
fn has_element(lower_html: &str, tag: &str) -> bool {
    let needle = format!("<{}", tag);
    lower_html.match_indices(&needle).any(|(idx, matched)| {
        matches!(
            lower_html.as_bytes().get(idx + matched.len()),
            Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')
        )
    })
}

fn count_tags(lower_html: &str) -> (usize, usize) {
    static OPEN_RE: OnceLock<Regex> = OnceLock::new();
    let open_re = OPEN_RE.get_or_init(|| Regex::new(r"<([a-z][a-z0-9-]*)[\s>/]").unwrap());

    static CLOSE_RE: OnceLock<Regex> = OnceLock::new();
    let close_re = CLOSE_RE.get_or_init(|| Regex::new(r"</([a-z][a-z0-9-]*)\s*>").unwrap());

    let opens = open_re
        .captures_iter(lower_html)
        .filter(|caps| !VOID_ELEMENTS.contains(&&caps[1]))
        .count();
    let closes = close_re.captures_iter(lower_html).count();
    (opens, closes)
}

fn find_images_without_alt(raw_html: &str) -> Vec<Issue> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

    static ALT_RE: OnceLock<Regex> = OnceLock::new();
    let alt_re = ALT_RE.get_or_init(|| Regex::new(r#"(?i)\balt\s*="#).unwrap());

    re.find_iter(raw_html)
        .filter(|tag| !alt_re.is_match(tag.as_str()))
        .map(|_| {
            Issue::new(
                IssueKind::Error,
                Severity::Serious,
                "<img> element is missing the alt attribute",
            )
            .with_locator("img")
            .with_recommendation("Every <img> must carry an alt attribute")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ValidatorStatus;
    use crate::service::validators::test_support::snapshot;

    fn local_validator() -> MarkupValidator {
        let mut config = AnalyzerConfig::default();
        config.markup_service_url = None;
        MarkupValidator::new(&config)
    }

    #[tokio::test]
    async fn valid_document_scores_100() {
        let html = r#"<!DOCTYPE html>
            <html lang="en"><head><title>Ok</title></head>
            <body><p>content</p><img src="a.png" alt="a"></body></html>"#;
        let result = local_validator().validate(&snapshot("https://example.com", html)).await.unwrap();
        assert!(result.issues.is_empty(), "unexpected issues: {:?}", result.issues);
        assert_eq!(result.score, Some(100));
        assert_eq!(result.data_source, Some(DataSource::MarkupHeuristics));
    }

    #[tokio::test]
    async fn missing_doctype_and_img_alt_scores_84_success() {
        // boundary case of the 80 threshold: two errors, 100 - 16 = 84
        let html = r#"<html lang="en"><head><title>Ok</title></head>
            <body><p>content</p><img src="a.png"></body></html>"#;
        let result = local_validator().validate(&snapshot("https://example.com", html)).await.unwrap();
        let errors = result.issues.iter().filter(|i| i.kind == IssueKind::Error).count();
        assert_eq!(errors, 2, "issues: {:?}", result.issues);
        assert_eq!(result.score, Some(84));
        assert_eq!(result.status, ValidatorStatus::Success);
    }

    #[tokio::test]
    async fn tag_imbalance_is_a_warning_not_an_error() {
        let mut html = String::from(
            "<!DOCTYPE html><html><head><title>T</title></head><body>",
        );
        for _ in 0..8 {
            html.push_str("<div><p>");
        }
        html.push_str("</body></html>");
        let result = local_validator().validate(&snapshot("https://example.com", &html)).await.unwrap();
        let imbalance: Vec<_> = result
            .issues
            .iter()
            .filter(|i| i.message.contains("tag counts differ"))
            .collect();
        assert_eq!(imbalance.len(), 1);
        assert_eq!(imbalance[0].kind, IssueKind::Warning);
    }

    #[test]
    fn gnu_output_parsing() {
        let body = "\
:5.3-5.20: error: Element head is missing a required instance of child element title.
:9.1-9.12: info warning: Consider adding a lang attribute.
not a diagnostic line";
        let issues = MarkupValidator::parse_gnu_output(body);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::Error);
        assert_eq!(issues[0].locator.as_deref(), Some("line 5.3-5.20"));
        assert_eq!(issues[1].kind, IssueKind::Warning);
    }

    #[tokio::test]
    async fn remote_service_output_is_used_when_reachable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/nu/")
            .match_query(mockito::Matcher::UrlEncoded("out".into(), "gnu".into()))
            .with_status(200)
            .with_body(":1.1-1.5: error: Stray end tag.\n")
            .create_async()
            .await;

        let mut config = AnalyzerConfig::default();
        config.markup_service_url = Some(format!("{}/nu/", server.url()));
        let validator = MarkupValidator::new(&config);

        let result = validator
            .validate(&snapshot("https://example.com", "<html></html>"))
            .await
            .unwrap();
        assert_eq!(result.data_source, Some(DataSource::W3cValidator));
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.score, Some(92));
    }

    #[tokio::test]
    async fn unreachable_service_falls_back_to_local_checks() {
        let mut config = AnalyzerConfig::default();
        // nothing listens here
        config.markup_service_url = Some("http://127.0.0.1:1/nu/".to_string());
        let validator = MarkupValidator::new(&config);

        let html = r#"<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>"#;
        let result = validator.validate(&snapshot("https://example.com", html)).await.unwrap();
        assert_eq!(result.data_source, Some(DataSource::MarkupHeuristics));
        assert_eq!(result.score, Some(100));
    }
}
