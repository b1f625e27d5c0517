//! Security header validator.
//!
//! Issues one header-only fetch against the target URL and inspects
//! the transport-security response headers. No page body is read.

use async_trait::async_trait;
use rquest::header::HeaderMap;
use rquest::Client;
use url::Url;

use crate::config::AnalyzerConfig;
use crate::domain::models::{
    DataSource, Issue, IssueKind, PageSnapshot, Severity, ValidatorResult,
};
use crate::error::{AppError, Result};
use crate::service::assembler::ResultAssembler;
use crate::service::http::{create_client, ClientType};
use crate::service::scoring::{self, status_for};
use crate::service::validators::Validator;

/// One year, the minimum acceptable HSTS max-age.
const HSTS_MIN_MAX_AGE: u64 = 31_536_000;

const DANGEROUS_METHODS: &[&str] = &["TRACE", "TRACK", "PUT", "DELETE", "CONNECT"];

/// Severity tiers for header findings: high, medium, low.
fn high(message: String, locator: &str, recommendation: &str) -> Issue {
    Issue::new(IssueKind::Error, Severity::Critical, message)
        .with_locator(locator.to_string())
        .with_recommendation(recommendation.to_string())
}

fn medium(message: String, locator: &str, recommendation: &str) -> Issue {
    Issue::new(IssueKind::Warning, Severity::Moderate, message)
        .with_locator(locator.to_string())
        .with_recommendation(recommendation.to_string())
}

fn low(message: String, locator: &str, recommendation: &str) -> Issue {
    Issue::new(IssueKind::Warning, Severity::Minor, message)
        .with_locator(locator.to_string())
        .with_recommendation(recommendation.to_string())
}

pub struct SecurityValidator {
    client: Client,
    assembler: ResultAssembler,
}

impl SecurityValidator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            client: create_client(ClientType::Plain).expect("Failed to create HTTP client"),
            assembler: ResultAssembler::new(config.max_issues_per_result),
        }
    }

    async fn fetch_headers(&self, url: &str) -> Result<HeaderMap> {
        log::debug!("[SECURITY] HEAD {}", url);
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| AppError::network(format!("header fetch failed: {}", e)))?;
        Ok(response.headers().clone())
    }

    fn check_headers(&self, url: &Url, headers: &HeaderMap) -> Vec<Issue> {
        let mut issues = Vec::new();
        let https = url.scheme() == "https";

        if !https {
            issues.push(high(
                "Page is served over plain HTTP".to_string(),
                "transport",
                "Serve the site over HTTPS and redirect HTTP traffic",
            ));
        }

        if https {
            check_hsts(headers, &mut issues);
        }
        check_csp(headers, &mut issues);
        check_frame_options(headers, &mut issues);
        check_content_type_options(headers, &mut issues);
        check_xss_protection(headers, &mut issues);
        check_referrer_policy(headers, &mut issues);
        check_permissions_policy(headers, &mut issues);
        check_information_disclosure(headers, &mut issues);
        check_cookies(headers, &mut issues);
        check_allowed_methods(headers, &mut issues);

        issues
    }
}

#[async_trait]
impl Validator for SecurityValidator {
    fn id(&self) -> &'static str {
        "security"
    }

    fn label(&self) -> &'static str {
        "Security Headers"
    }

    async fn validate(&self, snapshot: &PageSnapshot) -> Result<ValidatorResult> {
        let url = Url::parse(&snapshot.source_url)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", snapshot.source_url, e)))?;

        let headers = self.fetch_headers(&snapshot.source_url).await?;
        let issues = self.check_headers(&url, &headers);

        let score = scoring::SECURITY.score(&issues);
        log::debug!("[SECURITY] {} findings, score {}", issues.len(), score);

        let message = if issues.is_empty() {
            "Transport security headers are well configured".to_string()
        } else {
            let highs = issues.iter().filter(|i| i.severity == Severity::Critical).count();
            format!("{} security header findings ({} high severity)", issues.len(), highs)
        };

        Ok(self.assembler.assemble(
            self.id(),
            self.label(),
            status_for(score),
            Some(score),
            message,
            issues,
            DataSource::HeaderProbe,
        ))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn check_hsts(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    let Some(value) = header_str(headers, "strict-transport-security") else {
        issues.push(high(
            "Strict-Transport-Security header is missing".to_string(),
            "strict-transport-security",
            "Add HSTS with a max-age of at least one year",
        ));
        return;
    };

    let lower = value.to_lowercase();
    let max_age = lower
        .split(';')
        .find_map(|d| d.trim().strip_prefix("max-age=").map(str::to_string))
        .and_then(|v| v.trim().parse::<u64>().ok());

    match max_age {
        Some(age) if age >= HSTS_MIN_MAX_AGE => {}
        Some(age) => issues.push(medium(
            format!("HSTS max-age is {} seconds; one year is the accepted minimum", age),
            "strict-transport-security",
            "Raise max-age to at least 31536000",
        )),
        None => issues.push(medium(
            "HSTS header has no parseable max-age".to_string(),
            "strict-transport-security",
            "Declare max-age in the HSTS header",
        )),
    }

    if !lower.contains("includesubdomains") {
        issues.push(low(
            "HSTS does not cover subdomains".to_string(),
            "strict-transport-security",
            "Add includeSubDomains once all subdomains support HTTPS",
        ));
    }
}

fn check_csp(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    let Some(value) = header_str(headers, "content-security-policy") else {
        issues.push(high(
            "Content-Security-Policy header is missing".to_string(),
            "content-security-policy",
            "Define a CSP to mitigate cross-site scripting",
        ));
        return;
    };

    let lower = value.to_lowercase();
    if lower.contains("unsafe-inline") {
        issues.push(medium(
            "CSP allows unsafe-inline".to_string(),
            "content-security-policy",
            "Replace unsafe-inline with nonces or hashes",
        ));
    }
    if lower.contains("unsafe-eval") {
        issues.push(medium(
            "CSP allows unsafe-eval".to_string(),
            "content-security-policy",
            "Remove unsafe-eval from the policy",
        ));
    }
    if has_wildcard_directive(&lower) {
        issues.push(medium(
            "CSP contains a wildcard source".to_string(),
            "content-security-policy",
            "Restrict sources to explicit origins",
        ));
    }
}

/// A bare `*` source in any directive.
fn has_wildcard_directive(csp: &str) -> bool {
    csp.split(';').any(|directive| {
        directive
            .split_whitespace()
            .skip(1)
            .any(|source| source == "*")
    })
}

fn check_frame_options(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    match header_str(headers, "x-frame-options") {
        None => issues.push(high(
            "X-Frame-Options header is missing".to_string(),
            "x-frame-options",
            "Add X-Frame-Options: DENY or SAMEORIGIN to prevent clickjacking",
        )),
        Some(value) => {
            let upper = value.to_uppercase();
            if upper != "DENY" && upper != "SAMEORIGIN" {
                issues.push(medium(
                    format!("X-Frame-Options has unrecognized value \"{}\"", value),
                    "x-frame-options",
                    "Use DENY or SAMEORIGIN",
                ));
            }
        }
    }
}

fn check_content_type_options(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    let nosniff = header_str(headers, "x-content-type-options")
        .map(|v| v.eq_ignore_ascii_case("nosniff"))
        .unwrap_or(false);
    if !nosniff {
        issues.push(medium(
            "X-Content-Type-Options is not set to nosniff".to_string(),
            "x-content-type-options",
            "Add X-Content-Type-Options: nosniff",
        ));
    }
}

fn check_xss_protection(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    // deprecated header; absence is advisory only and never scored
    if header_str(headers, "x-xss-protection").is_none() {
        issues.push(
            Issue::new(
                IssueKind::Info,
                Severity::Minor,
                "X-XSS-Protection header is absent (deprecated; CSP supersedes it)",
            )
            .with_locator("x-xss-protection"),
        );
    }
}

fn check_referrer_policy(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    match header_str(headers, "referrer-policy") {
        None => issues.push(low(
            "Referrer-Policy header is missing".to_string(),
            "referrer-policy",
            "Add a Referrer-Policy such as strict-origin-when-cross-origin",
        )),
        Some(value) if value.eq_ignore_ascii_case("unsafe-url") => issues.push(medium(
            "Referrer-Policy unsafe-url leaks full URLs to other origins".to_string(),
            "referrer-policy",
            "Use strict-origin-when-cross-origin or stricter",
        )),
        _ => {}
    }
}

fn check_permissions_policy(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    if header_str(headers, "permissions-policy").is_none() {
        issues.push(low(
            "Permissions-Policy header is missing".to_string(),
            "permissions-policy",
            "Declare a Permissions-Policy restricting powerful browser features",
        ));
    }
}

fn check_information_disclosure(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    if let Some(server) = header_str(headers, "server") {
        if server.chars().any(|c| c.is_ascii_digit()) {
            issues.push(low(
                format!("Server header discloses software version: \"{}\"", server),
                "server",
                "Strip version details from the Server header",
            ));
        }
    }
    if let Some(powered) = header_str(headers, "x-powered-by") {
        issues.push(low(
            format!("X-Powered-By discloses the technology stack: \"{}\"", powered),
            "x-powered-by",
            "Remove the X-Powered-By header",
        ));
    }
}

fn check_cookies(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    for value in headers.get_all("set-cookie") {
        let Ok(cookie) = value.to_str() else {
            issues.push(
                Issue::new(
                    IssueKind::Info,
                    Severity::Minor,
                    "Analysis incomplete: a Set-Cookie header could not be decoded",
                )
                .with_locator("set-cookie"),
            );
            continue;
        };
        let lower = cookie.to_lowercase();
        let name = cookie.split('=').next().unwrap_or("cookie").trim();

        if !lower.contains("secure") {
            issues.push(medium(
                format!("Cookie \"{}\" is set without the Secure attribute", name),
                "set-cookie",
                "Mark cookies Secure so they never travel over plain HTTP",
            ));
        }
        if !lower.contains("httponly") {
            issues.push(medium(
                format!("Cookie \"{}\" is set without HttpOnly", name),
                "set-cookie",
                "Mark cookies HttpOnly to keep them away from scripts",
            ));
        }
        if !lower.contains("samesite") {
            issues.push(low(
                format!("Cookie \"{}\" has no SameSite attribute", name),
                "set-cookie",
                "Declare SameSite=Lax or Strict",
            ));
        }
    }
}

fn check_allowed_methods(headers: &HeaderMap, issues: &mut Vec<Issue>) {
    let Some(allow) = header_str(headers, "allow") else { return };
    let advertised: Vec<String> = allow
        .split(',')
        .map(|m| m.trim().to_uppercase())
        .filter(|m| DANGEROUS_METHODS.contains(&m.as_str()))
        .collect();

    if !advertised.is_empty() {
        issues.push(medium(
            format!("Server advertises dangerous HTTP methods: {}", advertised.join(", ")),
            "allow",
            "Disable methods the application does not need",
        ));
    }
}
