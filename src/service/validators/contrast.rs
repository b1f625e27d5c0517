//! Color contrast validator - WCAG AA text/background distinguishability.
//!
//! Primary pass resolves effective colors from inline styles (nearest
//! declaration on the element or an ancestor). When that pass finds
//! nothing to report, a weaker literal-pattern scan over the raw markup
//! emits advisory warnings instead.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::color::{contrast_ratio, is_large_text, parse_color, required_ratio, Rgb};
use crate::config::AnalyzerConfig;
use crate::domain::models::{
    DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult,
};
use crate::error::Result;
use crate::service::assembler::ResultAssembler;
use crate::service::scoring::{self, status_for};
use crate::service::validators::Validator;

use async_trait::async_trait;

/// Minimum resolved text length for an element to be checked.
const MIN_TEXT_LEN: usize = 3;
const DEFAULT_FONT_SIZE_PX: f64 = 16.0;

pub struct ContrastValidator {
    assembler: ResultAssembler,
}

impl ContrastValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self { assembler: ResultAssembler::new(config.max_issues_per_result) }
    }

    fn analyze(&self, html: &Html) -> Vec<Issue> {
        let mut issues = Vec::new();

        for element in html.root_element().descendants().filter_map(ElementRef::wrap) {
            let text = direct_text(&element);
            if text.len() < MIN_TEXT_LEN {
                continue;
            }

            let Some(fg) = resolve_style_color(&element, &["color"]) else { continue };
            let Some(bg) = resolve_style_color(&element, &["background-color", "background"])
            else {
                continue;
            };

            let font_size = resolve_style_value(&element, "font-size")
                .and_then(|v| parse_px(&v))
                .unwrap_or(DEFAULT_FONT_SIZE_PX);
            let font_weight =
                resolve_style_value(&element, "font-weight").unwrap_or_else(|| "normal".to_string());

            let large = is_large_text(font_size, &font_weight);
            let required = required_ratio(large);
            let ratio = contrast_ratio(fg, bg);

            if ratio < required {
                let standard = if large { "AA large text" } else { "AA" };
                let (kind, severity) = if ratio < 0.7 * required {
                    (IssueKind::Error, Severity::Serious)
                } else {
                    (IssueKind::Warning, Severity::Moderate)
                };
                let tag = element.value().name();
                issues.push(
                    Issue::new(
                        kind,
                        severity,
                        format!(
                            "Contrast ratio {:.2} on <{}> is below the {} requirement of {}",
                            ratio, tag, standard, required
                        ),
                    )
                    .with_locator(tag.to_string())
                    .with_guideline("WCAG 1.4.3")
                    .with_recommendation(format!(
                        "Increase contrast between text and background to at least {}:1",
                        required
                    )),
                );
            }
        }

        issues
    }

    /// Fallback scan of the raw markup for known-bad light-gray color
    /// literals. Runs only when the style pass produced nothing; the
    /// findings are advisory, not measurements.
    fn scan_literal_patterns(&self, raw_html: &str) -> Vec<Issue> {
        static RE: OnceLock<Regex> = OnceLock::new();
        // leading [^-] keeps background-color declarations out
        let re = RE.get_or_init(|| {
            Regex::new(r"(?i)(?:^|[^-])color\s*:\s*#(aaa|aaaaaa|bbb|bbbbbb|ccc|cccccc|ddd|dddddd|eee|eeeeee)\b")
                .unwrap()
        });

        let mut seen = Vec::new();
        let mut issues = Vec::new();
        for caps in re.captures_iter(raw_html) {
            let literal = caps[1].to_lowercase();
            if seen.contains(&literal) {
                continue;
            }
            seen.push(literal.clone());
            issues.push(
                Issue::new(
                    IssueKind::Warning,
                    Severity::Moderate,
                    format!(
                        "Light gray text color #{} found in markup and is likely to fail AA contrast",
                        literal
                    ),
                )
                .with_guideline("WCAG 1.4.3")
                .with_recommendation("Verify text colors against their backgrounds with a contrast checker"),
            );
        }
        issues
    }
}

#[async_trait]
impl Validator for ContrastValidator {
    fn id(&self) -> &'static str {
        "contrast"
    }

    fn label(&self) -> &'static str {
        "Color Contrast"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        let html = Html::parse_document(&snapshot.raw_html);
        let mut issues = self.analyze(&html);

        if issues.is_empty() {
            issues = self.scan_literal_patterns(&snapshot.raw_html);
        }

        let errors = issues.iter().filter(|i| i.kind == IssueKind::Error).count();
        let warnings = issues.iter().filter(|i| i.kind == IssueKind::Warning).count();
        let score = scoring::CONTRAST.score(&issues);

        log::debug!("[CONTRAST] {} errors, {} warnings, score {}", errors, warnings, score);

        let message = if issues.is_empty() {
            "No contrast problems detected".to_string()
        } else {
            format!("{} contrast failures and {} borderline elements found", errors, warnings)
        };

        Ok(self.assembler.assemble(
            self.id(),
            self.label(),
            status_for(score),
            Some(score),
            message,
            issues,
            DataSource::ContrastAnalysis,
        ))
    }
}

/// Text belonging directly to this element (not to child elements).
fn direct_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(text.trim().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Nearest inline-style declaration for any of `properties`, walking
/// from the element up through its ancestors.
fn resolve_style_color(element: &ElementRef, properties: &[&str]) -> Option<Rgb> {
    resolve_style(element, properties).and_then(|v| parse_color(&v))
}

fn resolve_style_value(element: &ElementRef, property: &str) -> Option<String> {
    resolve_style(element, &[property])
}

fn resolve_style(element: &ElementRef, properties: &[&str]) -> Option<String> {
    let mut current = Some(*element);
    while let Some(el) = current {
        if let Some(style) = el.value().attr("style") {
            for property in properties {
                if let Some(value) = style_property(style, property) {
                    return Some(value);
                }
            }
        }
        current = el.parent().and_then(ElementRef::wrap);
    }
    None
}

/// Pull one property value out of an inline style string.
fn style_property(style: &str, property: &str) -> Option<String> {
    for declaration in style.split(';') {
        let (name, value) = declaration.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().strip_suffix("px")?.trim().parse::<f64>().ok()
}
