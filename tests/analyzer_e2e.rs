//! End-to-end integration tests for the analysis pipeline.
//!
//! A mockito server stands in for the analyzed site so the full
//! snapshot -> fan-out -> collect path runs without touching the
//! network.

use sitelens::config::AnalyzerConfig;
use sitelens::domain::models::{DataSource, ValidatorStatus};
use sitelens::Analyzer;

const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en"><head>
<title>A Fifty To Sixty Character Title For The Test Page</title>
<meta name="description" content="A meta description that has been padded out with additional explanatory words until it comfortably sits inside the one hundred fifty to one sixty band.">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta property="og:title" content="t"><meta property="og:description" content="d">
<meta property="og:image" content="https://example.com/i.png">
<meta name="twitter:card" content="summary">
<link rel="canonical" href="https://example.com/page">
<script type="application/ld+json">{}</script>
</head><body>
<header><h1>Welcome to the sample page</h1></header>
<main>
<p>PLACEHOLDER_BODY</p>
<img src="/chart.png" alt="A chart">
<a href="/a">internal link one</a>
<a href="/b">internal link two</a>
<a href="/c">internal link three</a>
</main>
<footer><p>footer text</p></footer>
</body></html>"#;

fn sample_page() -> String {
    SAMPLE_PAGE.replace("PLACEHOLDER_BODY", &"content word ".repeat(200))
}

/// Offline config: no markup service, no SEO service, no metrics key.
fn offline_config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.markup_service_url = None;
    config
}

async fn serve_sample_page(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(sample_page())
        .create_async()
        .await
}

#[tokio::test]
async fn full_run_returns_one_result_per_validator() {
    let mut server = mockito::Server::new_async().await;
    let _page = serve_sample_page(&mut server).await;
    let _head = server.mock("HEAD", "/").with_status(200).create_async().await;

    let analyzer = Analyzer::new(offline_config());
    let results = analyzer.analyze(&server.url()).await.expect("analysis should succeed");

    assert_eq!(results.len(), 6);

    // consumers match by id, not position
    let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(
        ids,
        vec!["accessibility", "contrast", "markup", "performance", "security", "seo"]
    );

    for result in &results {
        if let Some(score) = result.score {
            assert!(score <= 100, "{}: score {} out of range", result.id, score);
        }
        assert!(result.report_id.is_some(), "{}: missing report id", result.id);
        assert!(!result.message.is_empty(), "{}: empty message", result.id);
    }
}

#[tokio::test]
async fn results_are_json_serializable_with_the_wire_fields() {
    let mut server = mockito::Server::new_async().await;
    let _page = serve_sample_page(&mut server).await;
    let _head = server.mock("HEAD", "/").with_status(200).create_async().await;

    let analyzer = Analyzer::new(offline_config());
    let results = analyzer.analyze(&server.url()).await.unwrap();

    let json = serde_json::to_value(&results).unwrap();
    let array = json.as_array().unwrap();
    assert_eq!(array.len(), 6);

    for entry in array {
        let object = entry.as_object().unwrap();
        for field in ["id", "label", "status", "message", "issues", "recommendations", "timestamp"] {
            assert!(object.contains_key(field), "missing wire field {}", field);
        }
        for absent in ["data_source", "report_id"] {
            assert!(!object.contains_key(absent), "snake_case leaked: {}", absent);
        }
    }
}

#[tokio::test]
async fn performance_without_configuration_is_marked_simulated() {
    let mut server = mockito::Server::new_async().await;
    let _page = serve_sample_page(&mut server).await;
    let _head = server.mock("HEAD", "/").with_status(200).create_async().await;

    let analyzer = Analyzer::new(offline_config());
    let results = analyzer.analyze(&server.url()).await.unwrap();

    let performance = results.iter().find(|r| r.id == "performance").unwrap();
    assert_eq!(performance.data_source, Some(DataSource::Simulated));
    assert_ne!(performance.data_source, Some(DataSource::PageSpeedApi));
    assert_eq!(performance.score, Some(85));
}

#[tokio::test]
async fn security_findings_for_a_headerless_server() {
    let mut server = mockito::Server::new_async().await;
    let _page = serve_sample_page(&mut server).await;
    let _head = server.mock("HEAD", "/").with_status(200).create_async().await;

    let analyzer = Analyzer::new(offline_config());
    let results = analyzer.analyze(&server.url()).await.unwrap();

    let security = results.iter().find(|r| r.id == "security").unwrap();
    assert_eq!(security.data_source, Some(DataSource::HeaderProbe));
    // mockito serves plain http, so the transport finding leads
    assert!(security
        .issues
        .iter()
        .any(|issue| issue.message.contains("plain HTTP")));
    assert_eq!(security.status, ValidatorStatus::Error);
}

#[tokio::test]
async fn unreachable_site_fails_the_whole_run() {
    let analyzer = Analyzer::new(offline_config());
    let err = analyzer.analyze("http://127.0.0.1:1/unreachable.page").await.unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("acquisition failed"),
        "expected a top-level acquisition error, got: {}",
        message
    );
}

#[tokio::test]
async fn markup_service_is_used_when_configured() {
    let mut server = mockito::Server::new_async().await;
    let _page = serve_sample_page(&mut server).await;
    let _head = server.mock("HEAD", "/").with_status(200).create_async().await;
    let _nu = server
        .mock("POST", "/nu/")
        .match_query(mockito::Matcher::UrlEncoded("out".into(), "gnu".into()))
        .with_status(200)
        .with_body(":2.1-2.9: error: An img element must have an alt attribute.\n")
        .create_async()
        .await;

    let mut config = offline_config();
    config.markup_service_url = Some(format!("{}/nu/", server.url()));

    let analyzer = Analyzer::new(config);
    let results = analyzer.analyze(&server.url()).await.unwrap();

    let markup = results.iter().find(|r| r.id == "markup").unwrap();
    assert_eq!(markup.data_source, Some(DataSource::W3cValidator));
    assert_eq!(markup.score, Some(92));
    assert_eq!(markup.issues.len(), 1);
}
