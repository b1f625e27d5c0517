//! ResultAssembler - turns raw validator output into normalized results.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::{DataSource, Issue, ValidatorResult, ValidatorStatus};

const MAX_RECOMMENDATIONS: usize = 10;

/// Builds the normalized `ValidatorResult` every validator returns:
/// issues ordered by severity, truncated to the most significant N,
/// recommendations deduplicated from issue-level advice, stamped with
/// a timestamp and an opaque report id.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    max_issues: usize,
}

impl ResultAssembler {
    pub fn new(max_issues: usize) -> Self {
        Self { max_issues }
    }

    pub fn assemble(
        &self,
        id: &str,
        label: &str,
        status: ValidatorStatus,
        score: Option<u8>,
        message: impl Into<String>,
        mut issues: Vec<Issue>,
        data_source: DataSource,
    ) -> ValidatorResult {
        issues.sort_by_key(|issue| issue.severity);

        let recommendations = Self::collect_recommendations(&issues);
        issues.truncate(self.max_issues);

        ValidatorResult {
            id: id.to_string(),
            label: label.to_string(),
            status,
            score,
            message: message.into(),
            issues,
            recommendations,
            timestamp: Utc::now(),
            data_source: Some(data_source),
            report_id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Degraded result for a validator that failed outright.
    pub fn error_result(&self, id: &str, label: &str, cause: impl Into<String>) -> ValidatorResult {
        ValidatorResult {
            id: id.to_string(),
            label: label.to_string(),
            status: ValidatorStatus::Error,
            score: None,
            message: cause.into(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            timestamp: Utc::now(),
            data_source: None,
            report_id: Some(Uuid::new_v4().to_string()),
        }
    }

    fn collect_recommendations(issues: &[Issue]) -> Vec<String> {
        let mut seen = Vec::new();
        for issue in issues {
            if let Some(rec) = &issue.recommendation {
                if !seen.contains(rec) {
                    seen.push(rec.clone());
                }
                if seen.len() >= MAX_RECOMMENDATIONS {
                    break;
                }
            }
        }
        seen
    }
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::new(25)
    }
}
