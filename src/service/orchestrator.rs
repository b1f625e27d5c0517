//! Analysis orchestrator.
//!
//! One run: acquire a snapshot, fan the enabled validators out
//! concurrently against it, and collect one result per validator.
//! A validator that fails or panics degrades to an error-status result
//! without disturbing its siblings. Acquisition failure ends the run
//! with a single top-level error and no validator output.

use std::sync::Arc;

use tokio::time::Instant;

use crate::config::AnalyzerConfig;
use crate::domain::models::ValidatorResult;
use crate::error::{AppError, Result};
use crate::service::assembler::ResultAssembler;
use crate::service::snapshot::{SnapshotFetcher, SnapshotProvider};
use crate::service::validators::{build_validator, Validator};

use regex::Regex;
use std::sync::OnceLock;

/// Phases of one analysis run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Acquiring,
    FanOut,
    Collecting,
    Done,
}

impl RunState {
    fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Acquiring => "acquiring",
            RunState::FanOut => "fan-out",
            RunState::Collecting => "collecting",
            RunState::Done => "done",
        }
    }
}

pub struct Analyzer {
    provider: Arc<dyn SnapshotProvider>,
    validators: Vec<Arc<dyn Validator>>,
    config: AnalyzerConfig,
    assembler: ResultAssembler,
}

impl Analyzer {
    /// Analyzer with the bundled HTTP snapshot provider and the
    /// validators enabled in the config's descriptor list.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_provider(config, Arc::new(SnapshotFetcher::new()))
    }

    pub fn with_provider(config: AnalyzerConfig, provider: Arc<dyn SnapshotProvider>) -> Self {
        let validators = config
            .validators
            .iter()
            .filter(|descriptor| descriptor.enabled)
            .filter_map(|descriptor| {
                let validator = build_validator(descriptor.id, &config);
                if validator.is_none() {
                    log::warn!("[RUN] Unknown validator id in config: {}", descriptor.id);
                }
                validator
            })
            .collect();

        Self::with_parts(config, provider, validators)
    }

    /// Fully explicit construction; the seam tests use to inject
    /// misbehaving validators.
    pub fn with_parts(
        config: AnalyzerConfig,
        provider: Arc<dyn SnapshotProvider>,
        validators: Vec<Arc<dyn Validator>>,
    ) -> Self {
        let assembler = ResultAssembler::new(config.max_issues_per_result);
        Self { provider, validators, config, assembler }
    }

    /// Run the full pipeline for one URL.
    ///
    /// Returns one result per enabled validator, in no particular
    /// order; consumers match results by `id`.
    pub async fn analyze(&self, url: &str) -> Result<Vec<ValidatorResult>> {
        let mut state = RunState::Idle;

        if !is_analyzable_url(url) {
            return Err(AppError::InvalidUrl(url.to_string()));
        }

        state = transition(state, RunState::Acquiring, url);
        let snapshot = self.provider.acquire(url).await.map_err(|e| match e {
            AppError::AcquisitionFailed(_) => e,
            other => AppError::acquisition(other.to_string()),
        })?;
        let snapshot = Arc::new(snapshot);

        state = transition(state, RunState::FanOut, url);
        let deadline = Instant::now() + self.config.run_timeout;
        let handles: Vec<_> = self
            .validators
            .iter()
            .map(|validator| {
                let validator = Arc::clone(validator);
                let snapshot = Arc::clone(&snapshot);
                let id = validator.id();
                let label = validator.label();
                let handle = tokio::spawn(async move { validator.validate(&snapshot).await });
                (id, label, handle)
            })
            .collect();

        state = transition(state, RunState::Collecting, url);
        let joined = futures::future::join_all(handles.into_iter().map(
            |(id, label, handle)| async move {
                (id, label, tokio::time::timeout_at(deadline, handle).await)
            },
        ))
        .await;

        let mut results = Vec::with_capacity(joined.len());
        for (id, label, outcome) in joined {
            let result = match outcome {
                Ok(Ok(Ok(result))) => result,
                Ok(Ok(Err(e))) => {
                    log::error!("[RUN] Validator {} failed: {}", id, e);
                    self.assembler.error_result(id, label, e.to_string())
                }
                Ok(Err(join_error)) => {
                    log::error!("[RUN] Validator {} panicked: {}", id, join_error);
                    self.assembler
                        .error_result(id, label, format!("validator crashed: {}", join_error))
                }
                Err(_elapsed) => {
                    log::error!("[RUN] Validator {} timed out", id);
                    self.assembler.error_result(
                        id,
                        label,
                        format!("validator did not complete within {:?}", self.config.run_timeout),
                    )
                }
            };
            results.push(result);
        }

        transition(state, RunState::Done, url);
        Ok(results)
    }

    /// Snapshot provider in use, mainly for diagnostics.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

fn transition(from: RunState, to: RunState, url: &str) -> RunState {
    log::debug!("[RUN] {} -> {} ({})", from.as_str(), to.as_str(), url);
    to
}

/// The caller-side precondition on pipeline input.
pub fn is_analyzable_url(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^https?://.+\..+").unwrap());
    re.is_match(url)
}
