pub mod color;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod service;

pub use config::AnalyzerConfig;
pub use domain::models::{Issue, PageSnapshot, ValidatorResult};
pub use service::orchestrator::Analyzer;

/// Initialize logging with tracing_subscriber.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sitelens=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .compact()
        .with_target(false)
        .with_ansi(true)
        .init();
}
